//! API error handling
//!
//! Maps domain errors onto the HTTP taxonomy: 409 specifically for slot
//! unavailability, 403 for authorization, 400 with detail for validation
//! (including raw-card rejection and unmet prerequisites), 502-class for
//! provider outages with a retry-safe message, and 500-class for
//! misconfiguration - the operational case that should alert.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use core_kernel::{CoreError, PortError};
use domain_booking::BookingError;
use domain_payments::{PaymentError, ProviderError};

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Booking prerequisites not met")]
    PrerequisitesNotMet(Vec<String>),

    #[error("Upstream provider unavailable")]
    UpstreamUnavailable,

    #[error("Service misconfigured: {0}")]
    Misconfigured(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
                None,
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::PrerequisitesNotMet(reasons) => (
                StatusCode::BAD_REQUEST,
                "prerequisites_not_met",
                "booking prerequisites are not met".to_string(),
                Some(reasons),
            ),
            ApiError::UpstreamUnavailable => (
                StatusCode::BAD_GATEWAY,
                "provider_unavailable",
                "the payment provider is temporarily unavailable, please retry".to_string(),
                None,
            ),
            ApiError::Misconfigured(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "misconfigured",
                msg,
                None,
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg,
                None,
            ),
            ApiError::Database(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                msg,
                None,
            ),
            ApiError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg,
                None,
            ),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Database(err.to_string())
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            PortError::Validation { .. } => ApiError::BadRequest(err.to_string()),
            PortError::Conflict { .. } => ApiError::Conflict(err.to_string()),
            PortError::Unauthorized { .. } => ApiError::Unauthorized,
            e if e.is_transient() => ApiError::UpstreamUnavailable,
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => ApiError::NotFound(msg),
            CoreError::Configuration(msg) => ApiError::Misconfigured(msg),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Misconfigured { .. } => ApiError::Misconfigured(err.to_string()),
            ProviderError::RejectedInput(msg) => ApiError::BadRequest(msg),
            ProviderError::ProviderRejected { reason } => ApiError::BadRequest(reason),
            ProviderError::ProviderUnavailable { .. } => ApiError::UpstreamUnavailable,
            ProviderError::UnsupportedMethod(_) | ProviderError::UnregisteredProvider(_) => {
                ApiError::BadRequest(err.to_string())
            }
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::RawCardData { .. } | PaymentError::AmountNotPositive => {
                ApiError::BadRequest(err.to_string())
            }
            PaymentError::NotFound(_) => ApiError::NotFound(err.to_string()),
            PaymentError::AccountNotProvisioned => ApiError::Validation(err.to_string()),
            PaymentError::Provider(e) => e.into(),
            PaymentError::Store(e) => e.into(),
            PaymentError::Core(e) => e.into(),
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::PrerequisitesNotMet { reasons } => {
                ApiError::PrerequisitesNotMet(reasons)
            }
            BookingError::SlotUnavailable => ApiError::Conflict(err.to_string()),
            BookingError::NotOwner => ApiError::Forbidden(err.to_string()),
            BookingError::AppointmentNotFound(_) => ApiError::NotFound(err.to_string()),
            BookingError::PaymentNotFound(_)
            | BookingError::FeeMismatch { .. }
            | BookingError::PaymentNotSettled { .. }
            | BookingError::PaymentAlreadyUsed(_)
            | BookingError::PastAppointment
            | BookingError::InvalidRequest(_) => ApiError::BadRequest(err.to_string()),
            BookingError::Linkage { .. } => ApiError::Internal(err.to_string()),
            BookingError::Store(e) => e.into(),
            BookingError::Core(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::PaymentId;

    #[test]
    fn test_slot_conflict_maps_to_409() {
        let api: ApiError = BookingError::SlotUnavailable.into();
        assert!(matches!(api, ApiError::Conflict(_)));
    }

    #[test]
    fn test_prerequisites_carry_reasons() {
        let api: ApiError = BookingError::PrerequisitesNotMet {
            reasons: vec!["intake form incomplete".to_string()],
        }
        .into();
        match api {
            ApiError::PrerequisitesNotMet(reasons) => assert_eq!(reasons.len(), 1),
            other => panic!("unexpected mapping: {:?}", other),
        }
    }

    #[test]
    fn test_ownership_failure_maps_to_403() {
        let api: ApiError = BookingError::NotOwner.into();
        assert!(matches!(api, ApiError::Forbidden(_)));
    }

    #[test]
    fn test_raw_card_rejection_maps_to_400() {
        let api: ApiError = PaymentError::RawCardData {
            fields: vec!["card_number".to_string()],
        }
        .into();
        assert!(matches!(api, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_provider_outage_hides_detail() {
        let api: ApiError = PaymentError::Provider(ProviderError::ProviderUnavailable {
            provider: domain_payments::ProviderKind::CardGateway,
            detail: "connection reset by peer".to_string(),
        })
        .into();
        assert!(matches!(api, ApiError::UpstreamUnavailable));
    }

    #[test]
    fn test_misconfiguration_is_distinct() {
        let api: ApiError = PaymentError::Provider(ProviderError::Misconfigured {
            provider: domain_payments::ProviderKind::CardGateway,
            missing: "secret_key",
        })
        .into();
        assert!(matches!(api, ApiError::Misconfigured(_)));
    }

    #[test]
    fn test_missing_payment_maps_to_404() {
        let api: ApiError = PaymentError::NotFound(PaymentId::new()).into();
        assert!(matches!(api, ApiError::NotFound(_)));
    }
}
