//! Booking domain errors

use thiserror::Error;

use core_kernel::{AppointmentId, CoreError, Money, PaymentId, PortError};
use domain_payments::PaymentStatus;

/// Errors surfaced by the booking orchestrator
#[derive(Debug, Error)]
pub enum BookingError {
    /// The external prerequisite gate blocked the booking
    #[error("booking prerequisites not met: {}", reasons.join("; "))]
    PrerequisitesNotMet { reasons: Vec<String> },

    /// No payment with this id belongs to the caller
    #[error("payment not found: {0}")]
    PaymentNotFound(PaymentId),

    /// The payment amount does not equal the booking fee
    #[error("payment amount {actual} does not match the booking fee of {expected}")]
    FeeMismatch { expected: Money, actual: Money },

    /// The payment has not settled
    #[error("payment has not completed (status: {status})")]
    PaymentNotSettled { status: PaymentStatus },

    /// The payment already funds another appointment
    #[error("payment {0} already funds another appointment")]
    PaymentAlreadyUsed(PaymentId),

    /// Another appointment occupies the requested slot at this branch
    #[error("the requested slot is unavailable at this branch")]
    SlotUnavailable,

    /// The requested time has already passed
    #[error("appointment time must be in the future")]
    PastAppointment,

    /// The request failed shape validation
    #[error("invalid booking request: {0}")]
    InvalidRequest(String),

    /// No appointment with this id
    #[error("appointment not found: {0}")]
    AppointmentNotFound(AppointmentId),

    /// The caller does not own this appointment
    #[error("only the appointment owner may perform this action")]
    NotOwner,

    /// The payment link could not be written; the appointment was rolled
    /// back by the compensating delete
    #[error("booking could not be completed; the reserved slot was released")]
    Linkage {
        #[source]
        source: PortError,
    },

    /// A store port failed
    #[error(transparent)]
    Store(#[from] PortError),

    /// A kernel-level invariant was violated
    #[error(transparent)]
    Core(#[from] CoreError),
}
