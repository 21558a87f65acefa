//! Payments domain errors

use thiserror::Error;

use core_kernel::{CoreError, PaymentId, PortError};

use crate::provider::ProviderError;

/// Errors surfaced by the payment record manager
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The request carried raw card data; rejected before any provider
    /// call regardless of method
    #[error("raw card data must not be submitted; offending fields: {}", fields.join(", "))]
    RawCardData { fields: Vec<String> },

    /// The charge amount was zero or negative
    #[error("payment amount must be positive")]
    AmountNotPositive,

    /// No payment with this id
    #[error("payment not found: {0}")]
    NotFound(PaymentId),

    /// The user row is still missing after synthesis; the caller should
    /// retry shortly
    #[error("account not fully provisioned, retry shortly")]
    AccountNotProvisioned,

    /// A provider adapter or the router failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A store or directory port failed
    #[error(transparent)]
    Store(#[from] PortError),

    /// A kernel-level invariant was violated
    #[error(transparent)]
    Core(#[from] CoreError),
}
