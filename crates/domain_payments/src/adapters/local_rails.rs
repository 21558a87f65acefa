//! Local rails adapter
//!
//! Deployment-local stand-in for bank transfer, GhQR, wallet and
//! mobile-money rails that have no settlement API in this deployment.
//! Charges are accepted immediately as pending with an instruction for
//! the customer; settlement is recorded out-of-band by clinic staff.
//!
//! The adapter conforms to the full `PaymentProvider` contract so it is
//! interchangeable with the real gateways in routing and in tests.

use async_trait::async_trait;
use chrono::Utc;
use std::time::Instant;
use tracing::debug;
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, DomainPort, HealthCheckable, HealthCheckResult, Money,
};

use crate::payment::{PaymentMethod, PaymentStatus, ProviderKind};
use crate::provider::{ChargeOutcome, ChargeRequest, PaymentProvider, ProviderError};

/// Adapter for locally-settled rails
#[derive(Debug, Default)]
pub struct LocalRailsAdapter;

impl LocalRailsAdapter {
    pub fn new() -> Self {
        Self
    }

    fn instruction_for(request: &ChargeRequest) -> String {
        match request.method {
            PaymentMethod::BankTransfer => match &request.bank {
                Some(bank) => format!(
                    "Transfer {} from your {} account {} and quote the payment reference; \
                     the booking is confirmed once the transfer is sighted",
                    request.amount, bank.bank_name, bank.account_number
                ),
                None => format!(
                    "Transfer {} to the clinic account and quote the payment reference",
                    request.amount
                ),
            },
            PaymentMethod::GhQr => format!(
                "Scan the clinic GhQR code at reception and pay {}",
                request.amount
            ),
            PaymentMethod::CashOnDelivery => format!(
                "Pay {} in cash at the front desk before your appointment",
                request.amount
            ),
            _ => format!(
                "Send {} to the clinic wallet and quote the payment reference",
                request.amount
            ),
        }
    }
}

impl DomainPort for LocalRailsAdapter {}

#[async_trait]
impl PaymentProvider for LocalRailsAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::LocalRails
    }

    async fn process_payment(&self, request: &ChargeRequest) -> Result<ChargeOutcome, ProviderError> {
        let raw_fields = request.raw_card_fields();
        if !raw_fields.is_empty() {
            return Err(ProviderError::RejectedInput(format!(
                "raw card data is not accepted (fields: {})",
                raw_fields.join(", ")
            )));
        }
        if request.method == PaymentMethod::Card {
            // Card has a real gateway; it never settles locally.
            return Err(ProviderError::UnsupportedMethod(request.method.to_string()));
        }

        let reference = format!("LOCAL-{}", Uuid::new_v4().simple());
        debug!(%reference, method = %request.method, "accepted local-rails charge");

        Ok(ChargeOutcome::pending(reference)
            .with_display_text(Self::instruction_for(request)))
    }

    async fn verify_payment(&self, transaction_ref: &str) -> Result<ChargeOutcome, ProviderError> {
        // No settlement API: the charge stays pending until staff record
        // the settlement against the payment row directly.
        Ok(ChargeOutcome::pending(transaction_ref.to_string()))
    }

    async fn refund_payment(
        &self,
        transaction_ref: &str,
        _amount: Money,
    ) -> Result<ChargeOutcome, ProviderError> {
        let mut outcome = ChargeOutcome::pending(transaction_ref.to_string());
        outcome.status = PaymentStatus::Refunded;
        Ok(outcome)
    }
}

#[async_trait]
impl HealthCheckable for LocalRailsAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        HealthCheckResult {
            adapter_id: "local-rails-adapter".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: start.elapsed().as_millis() as u64,
            message: None,
            checked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{BankDetails, CustomerDetails};
    use core_kernel::{Currency, UserId};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn request(method: PaymentMethod) -> ChargeRequest {
        ChargeRequest {
            user_id: UserId::new(),
            amount: Money::new(dec!(100.00), Currency::GHS),
            method,
            customer: CustomerDetails {
                email: "kofi@example.com".to_string(),
                name: None,
                phone: Some("+233207654321".to_string()),
            },
            bank: None,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_charge_is_pending_with_reference_and_instruction() {
        let adapter = LocalRailsAdapter::new();
        let outcome = adapter
            .process_payment(&request(PaymentMethod::BankTransfer))
            .await
            .unwrap();

        assert_eq!(outcome.status, PaymentStatus::Pending);
        assert!(outcome
            .provider_transaction_id
            .as_deref()
            .unwrap()
            .starts_with("LOCAL-"));
        assert!(outcome.display_text.is_some());
    }

    #[tokio::test]
    async fn test_bank_details_appear_in_instruction() {
        let adapter = LocalRailsAdapter::new();
        let mut req = request(PaymentMethod::BankTransfer);
        req.bank = Some(BankDetails {
            bank_name: "GCB".to_string(),
            account_number: "0011223344".to_string(),
            notes: None,
        });

        let outcome = adapter.process_payment(&req).await.unwrap();
        let text = outcome.display_text.unwrap();
        assert!(text.contains("GCB"));
        assert!(text.contains("0011223344"));
    }

    #[tokio::test]
    async fn test_card_is_not_settled_locally() {
        let adapter = LocalRailsAdapter::new();
        let err = adapter.process_payment(&request(PaymentMethod::Card)).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedMethod(_)));
    }

    #[tokio::test]
    async fn test_verification_stays_pending() {
        let adapter = LocalRailsAdapter::new();
        let outcome = adapter.verify_payment("LOCAL-abc").await.unwrap();
        assert_eq!(outcome.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_raw_card_data_rejected() {
        let adapter = LocalRailsAdapter::new();
        let mut req = request(PaymentMethod::Wallet);
        req.metadata
            .insert("card_expiry".to_string(), "12/27".to_string());

        let err = adapter.process_payment(&req).await.unwrap_err();
        assert!(matches!(err, ProviderError::RejectedInput(_)));
    }
}
