//! Appointment handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{AppointmentId, BranchId, PaymentId};
use domain_booking::{AppointmentStatus, BookingRequest};

use crate::auth::{has_role, permissions, Claims};
use crate::dto::appointments::{
    AppointmentActionRequest, AppointmentResponse, CreateAppointmentRequest,
};
use crate::{error::ApiError, AppState};

/// Books an appointment funded by a settled payment
pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<AppointmentResponse>), ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let caller = claims.user_id().map_err(|_| ApiError::Unauthorized)?;

    let booking = BookingRequest {
        branch_id: BranchId::from(request.branch_id),
        scheduled_at: request.appointment_date,
        treatment_type: request.treatment_type,
        notes: request.notes,
        payment_id: PaymentId::from(request.payment_id),
    };

    let appointment = state.booking.book(caller, booking).await?;
    Ok((
        StatusCode::CREATED,
        Json(AppointmentResponse::from(&appointment)),
    ))
}

/// Applies a reschedule, cancel, or administrative status action
pub async fn update_appointment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<AppointmentActionRequest>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let caller = claims.user_id().map_err(|_| ApiError::Unauthorized)?;
    let appointment_id = AppointmentId::from(id);

    let appointment = match request {
        AppointmentActionRequest::Reschedule { new_date } => {
            state
                .booking
                .reschedule(caller, appointment_id, new_date)
                .await?
        }
        AppointmentActionRequest::Cancel => state.booking.cancel(caller, appointment_id).await?,
        AppointmentActionRequest::UpdateStatus { status, admin_note } => {
            if !has_role(&claims, permissions::APPOINTMENT_ADMIN) {
                return Err(ApiError::Forbidden(
                    "status updates require an elevated role".to_string(),
                ));
            }
            let status: AppointmentStatus = status
                .parse()
                .map_err(|_| ApiError::BadRequest("unknown appointment status".to_string()))?;
            state
                .booking
                .update_status(appointment_id, status, admin_note)
                .await?
        }
    };

    Ok(Json(AppointmentResponse::from(&appointment)))
}

/// Returns one appointment
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let caller = claims.user_id().map_err(|_| ApiError::Unauthorized)?;

    let appointments = state.booking.appointments_for(caller).await?;
    if let Some(appointment) = appointments.iter().find(|a| *a.id.as_uuid() == id) {
        return Ok(Json(AppointmentResponse::from(appointment)));
    }

    if has_role(&claims, permissions::APPOINTMENT_ADMIN) {
        let all = state.booking.all_appointments().await?;
        if let Some(appointment) = all.iter().find(|a| *a.id.as_uuid() == id) {
            return Ok(Json(AppointmentResponse::from(appointment)));
        }
    }

    Err(ApiError::NotFound(format!("appointment not found: {}", id)))
}

/// Lists appointments: the caller's own, or every branch's for admins
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<AppointmentResponse>>, ApiError> {
    let caller = claims.user_id().map_err(|_| ApiError::Unauthorized)?;

    let appointments = if has_role(&claims, permissions::APPOINTMENT_ADMIN) {
        state.booking.all_appointments().await?
    } else {
        state.booking.appointments_for(caller).await?
    };

    Ok(Json(
        appointments.iter().map(AppointmentResponse::from).collect(),
    ))
}
