//! Payment handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{Currency, Money, PaymentId};
use domain_payments::{
    BankDetails, ChargeRequest, CustomerDetails, PaymentMethod, ProviderKind,
};

use crate::auth::{has_role, permissions, Claims};
use crate::dto::payments::{CreatePaymentRequest, PaymentDto, PaymentResponse};
use crate::{error::ApiError, AppState};

/// Creates a payment by routing a charge to a provider
///
/// Raw card fields are rejected here before anything else happens; the
/// payment record manager repeats the check as defense in depth.
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    let raw_fields = request.raw_card_fields();
    if !raw_fields.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "raw card data must not be submitted; offending fields: {}",
            raw_fields.join(", ")
        )));
    }
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let identity = claims
        .identity_claims()
        .map_err(|_| ApiError::Unauthorized)?;

    let currency: Currency = request
        .currency
        .as_deref()
        .unwrap_or(&state.config.booking_currency)
        .parse()
        .map_err(|_| ApiError::BadRequest("unknown currency code".to_string()))?;
    let amount = Money::positive(request.amount, currency)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let method: PaymentMethod = request
        .payment_method
        .parse()
        .map_err(|_| ApiError::BadRequest(format!(
            "unknown payment method: {}",
            request.payment_method
        )))?;

    let override_provider = request
        .provider
        .as_deref()
        .map(str::parse::<ProviderKind>)
        .transpose()
        .map_err(|_| ApiError::BadRequest("unknown provider".to_string()))?;

    let bank = match (&request.bank_name, &request.account_number) {
        (Some(bank_name), Some(account_number)) => Some(BankDetails {
            bank_name: bank_name.clone(),
            account_number: account_number.clone(),
            notes: request.bank_notes.clone(),
        }),
        _ => None,
    };

    // The opaque booking details ride along in the metadata bag so the
    // client can recover them after settlement.
    let mut metadata = request.metadata;
    if let Some(data) = &request.appointment_data {
        metadata.insert("appointment_data".to_string(), data.to_string());
    }

    let charge = ChargeRequest {
        user_id: identity.user_id,
        amount,
        method,
        customer: CustomerDetails {
            email: identity.email.clone(),
            name: identity.full_name.clone(),
            phone: request.phone_number.clone().or_else(|| identity.phone.clone()),
        },
        bank,
        metadata,
    };

    let payment = state
        .payments
        .record_payment(&identity, charge, override_provider)
        .await?;

    Ok((StatusCode::CREATED, Json(PaymentResponse::from(&payment))))
}

/// Returns the current state of a payment
///
/// This is the polling target for asynchronous rails: a pending payment
/// is re-verified with its provider on each read, so the client sees the
/// settlement as soon as the provider reports it.
pub async fn get_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentDto>, ApiError> {
    let caller = claims.user_id().map_err(|_| ApiError::Unauthorized)?;

    let payment = state
        .payments
        .verify_and_refresh(PaymentId::from(id))
        .await?;

    // A payment owned by someone else reads as missing.
    if payment.user_id != caller && !has_role(&claims, permissions::PAYMENT_READ) {
        return Err(ApiError::NotFound(format!("payment not found: {}", id)));
    }

    Ok(Json(PaymentDto::from(&payment)))
}
