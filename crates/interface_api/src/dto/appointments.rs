//! Appointments DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_booking::Appointment;

/// Request body for creating an appointment
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAppointmentRequest {
    pub branch_id: Uuid,
    pub appointment_date: DateTime<Utc>,
    #[validate(length(min = 1))]
    pub treatment_type: String,
    pub notes: Option<String>,
    pub payment_id: Uuid,
}

/// Request body for the appointment PATCH actions
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AppointmentActionRequest {
    /// Owner moves the appointment to a new time
    Reschedule { new_date: DateTime<Utc> },
    /// Owner cancels the appointment
    Cancel,
    /// Administrator transitions the status, optionally leaving a note
    UpdateStatus {
        status: String,
        admin_note: Option<String>,
    },
}

/// An appointment as returned by the API
#[derive(Debug, Serialize)]
pub struct AppointmentResponse {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub user_id: Uuid,
    pub appointment_date: DateTime<Utc>,
    pub treatment_type: String,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Appointment> for AppointmentResponse {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: *appointment.id.as_uuid(),
            branch_id: *appointment.branch_id.as_uuid(),
            user_id: *appointment.user_id.as_uuid(),
            appointment_date: appointment.scheduled_at,
            treatment_type: appointment.treatment_type.clone(),
            notes: appointment.notes.clone(),
            status: appointment.status.as_str().to_string(),
            created_at: appointment.created_at,
            updated_at: appointment.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_deserialization() {
        let reschedule: AppointmentActionRequest = serde_json::from_str(
            r#"{"action": "reschedule", "new_date": "2025-07-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert!(matches!(
            reschedule,
            AppointmentActionRequest::Reschedule { .. }
        ));

        let cancel: AppointmentActionRequest =
            serde_json::from_str(r#"{"action": "cancel"}"#).unwrap();
        assert!(matches!(cancel, AppointmentActionRequest::Cancel));

        let update: AppointmentActionRequest = serde_json::from_str(
            r#"{"action": "update_status", "status": "confirmed", "admin_note": "slot verified"}"#,
        )
        .unwrap();
        assert!(matches!(
            update,
            AppointmentActionRequest::UpdateStatus { .. }
        ));
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result: Result<AppointmentActionRequest, _> =
            serde_json::from_str(r#"{"action": "archive"}"#);
        assert!(result.is_err());
    }
}
