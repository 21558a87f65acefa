//! Payment provider contract
//!
//! Defines the contract every payment rail adapter implements, the
//! normalized request/result shapes shared by all of them, and the error
//! taxonomy the router relies on to decide retry policy.
//!
//! # Design
//!
//! - **Rail agnostic**: one contract regardless of provider wire protocol
//! - **Normalized results**: adapters translate provider payloads into
//!   `ChargeOutcome`; raw provider responses never cross this boundary
//! - **Fail fast**: missing credentials and raw card data are rejected
//!   before any network call is attempted

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use core_kernel::{DomainPort, Money, UserId};

use crate::payment::{PaymentMethod, PaymentStatus, ProviderKind};

/// Request field names that carry raw card data
///
/// Any of these appearing in a charge request is grounds for immediate
/// rejection; card entry happens exclusively on the provider's hosted page.
pub const RAW_CARD_FIELDS: [&str; 4] = ["card_number", "card_expiry", "card_name", "card_pin"];

/// Customer contact details forwarded to the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// Destination bank details for transfer-style methods
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankDetails {
    pub bank_name: String,
    pub account_number: String,
    pub notes: Option<String>,
}

/// A normalized charge request, independent of provider wire protocol
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub user_id: UserId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub customer: CustomerDetails,
    pub bank: Option<BankDetails>,
    /// Opaque pass-through metadata persisted on the payment record
    pub metadata: HashMap<String, String>,
}

impl ChargeRequest {
    /// Returns the raw card field names present in the request metadata
    ///
    /// Non-empty means the request must be rejected before any network
    /// call.
    pub fn raw_card_fields(&self) -> Vec<String> {
        RAW_CARD_FIELDS
            .iter()
            .filter(|field| self.metadata.contains_key(**field))
            .map(|field| field.to_string())
            .collect()
    }
}

/// The normalized result shape shared by process, verify, and refund
#[derive(Debug, Clone)]
pub struct ChargeOutcome {
    /// Settlement state as reported by the provider
    pub status: PaymentStatus,
    /// Provider transaction reference; becomes the idempotency key
    pub provider_transaction_id: Option<String>,
    /// Hosted checkout URL for redirect flows
    pub payment_url: Option<String>,
    /// Human-readable instruction for the customer (push charges,
    /// transfer instructions)
    pub display_text: Option<String>,
    /// Provider-sourced metadata worth persisting
    pub metadata: HashMap<String, String>,
}

impl ChargeOutcome {
    /// A pending outcome with the given transaction reference
    pub fn pending(reference: impl Into<String>) -> Self {
        Self {
            status: PaymentStatus::Pending,
            provider_transaction_id: Some(reference.into()),
            payment_url: None,
            display_text: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_display_text(mut self, text: impl Into<String>) -> Self {
        self.display_text = Some(text.into());
        self
    }
}

/// Errors surfaced by provider adapters and the payment router
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credentials for the provider are not configured. Operational:
    /// should alert, never silently no-op.
    #[error("provider {provider} is not configured: missing {missing}")]
    Misconfigured {
        provider: ProviderKind,
        missing: &'static str,
    },

    /// The request carried input this adapter refuses to handle
    /// (raw card data, missing phone for a push charge)
    #[error("rejected input: {0}")]
    RejectedInput(String),

    /// The provider processed the request and declined it
    #[error("provider rejected the charge: {reason}")]
    ProviderRejected { reason: String },

    /// The provider could not be reached; distinct from rejection so the
    /// caller can decide retry policy
    #[error("provider {provider} unavailable: {detail}")]
    ProviderUnavailable {
        provider: ProviderKind,
        detail: String,
    },

    /// No adapter handles this payment method / provider combination
    #[error("unsupported payment method: {0}")]
    UnsupportedMethod(String),

    /// The resolved provider is not in the registry allow-list
    #[error("provider {0} is not registered")]
    UnregisteredProvider(ProviderKind),
}

impl ProviderError {
    /// Returns true if the failure is transient and the same request may
    /// succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::ProviderUnavailable { .. })
    }
}

/// Contract implemented by every payment rail adapter
///
/// `process_payment` initiates a charge; `verify_payment` queries the
/// settlement state for a previously-initiated charge; `refund_payment`
/// reverses a settled charge. All three return the same normalized shape.
#[async_trait]
pub trait PaymentProvider: DomainPort {
    /// The registry key this adapter serves
    fn kind(&self) -> ProviderKind;

    /// Initiates a charge with the provider
    async fn process_payment(&self, request: &ChargeRequest) -> Result<ChargeOutcome, ProviderError>;

    /// Queries the settlement state of a previously-initiated charge
    async fn verify_payment(&self, transaction_ref: &str) -> Result<ChargeOutcome, ProviderError>;

    /// Reverses a settled charge
    async fn refund_payment(
        &self,
        transaction_ref: &str,
        amount: Money,
    ) -> Result<ChargeOutcome, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn request_with_metadata(metadata: HashMap<String, String>) -> ChargeRequest {
        ChargeRequest {
            user_id: UserId::new(),
            amount: Money::new(dec!(100.00), Currency::GHS),
            method: PaymentMethod::Card,
            customer: CustomerDetails {
                email: "ama@example.com".to_string(),
                name: None,
                phone: None,
            },
            bank: None,
            metadata,
        }
    }

    #[test]
    fn test_raw_card_fields_detected() {
        let mut metadata = HashMap::new();
        metadata.insert("card_number".to_string(), "4111111111111111".to_string());
        metadata.insert("card_pin".to_string(), "1234".to_string());
        metadata.insert("colour".to_string(), "blue".to_string());

        let fields = request_with_metadata(metadata).raw_card_fields();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains(&"card_number".to_string()));
        assert!(fields.contains(&"card_pin".to_string()));
    }

    #[test]
    fn test_clean_request_has_no_raw_card_fields() {
        let mut metadata = HashMap::new();
        metadata.insert("referrer".to_string(), "walk-in".to_string());

        assert!(request_with_metadata(metadata).raw_card_fields().is_empty());
    }

    #[test]
    fn test_only_unavailable_is_transient() {
        let unavailable = ProviderError::ProviderUnavailable {
            provider: ProviderKind::CardGateway,
            detail: "connection reset".to_string(),
        };
        assert!(unavailable.is_transient());

        let rejected = ProviderError::ProviderRejected {
            reason: "insufficient funds".to_string(),
        };
        assert!(!rejected.is_transient());
    }
}
