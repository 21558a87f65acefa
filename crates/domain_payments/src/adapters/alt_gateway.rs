//! Alternative gateway adapter
//!
//! Adapter for the synchronous initialize/verify gateway. Charges are
//! keyed by a transaction reference; verification goes through one of two
//! endpoints depending on the reference shape - the gateway issues purely
//! numeric ids for charges it originated and accepts caller-supplied
//! textual references otherwise, and the two are looked up differently.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use core_kernel::{
    AdapterHealth, DomainPort, HealthCheckable, HealthCheckResult, Money,
};

use crate::payment::{PaymentStatus, ProviderKind};
use crate::provider::{ChargeOutcome, ChargeRequest, PaymentProvider, ProviderError};

/// Configuration for the alternative gateway adapter
#[derive(Debug, Clone)]
pub struct AltGatewayConfig {
    /// Base URL of the gateway API
    pub base_url: String,
    /// API key
    pub api_key: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AltGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.altgateway.example".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Adapter for the alternative gateway rail
#[derive(Debug)]
pub struct AltGatewayAdapter {
    config: AltGatewayConfig,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct InitializeBody<'a> {
    amount: i64,
    currency: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct RefundBody<'a> {
    transaction: &'a str,
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    id: Option<i64>,
    reference: Option<String>,
    status: Option<String>,
    authorization_url: Option<String>,
}

/// Returns true when a reference is a gateway-issued numeric id
fn is_numeric_reference(reference: &str) -> bool {
    !reference.is_empty() && reference.bytes().all(|b| b.is_ascii_digit())
}

impl AltGatewayAdapter {
    /// Creates a new adapter with the given configuration
    pub fn new(config: AltGatewayConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { config, http }
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        if self.config.api_key.is_empty() {
            return Err(ProviderError::Misconfigured {
                provider: ProviderKind::AltGateway,
                missing: "api_key",
            });
        }
        Ok(())
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.config.api_key)
    }

    fn map_status(status: Option<&str>) -> PaymentStatus {
        match status {
            Some("successful") | Some("success") => PaymentStatus::Completed,
            Some("failed") | Some("cancelled") => PaymentStatus::Failed,
            Some("refunded") => PaymentStatus::Refunded,
            _ => PaymentStatus::Pending,
        }
    }

    fn transport_error(err: reqwest::Error) -> ProviderError {
        warn!(provider = %ProviderKind::AltGateway, error = %err, "alt gateway transport failure");
        ProviderError::ProviderUnavailable {
            provider: ProviderKind::AltGateway,
            detail: if err.is_timeout() {
                "request timed out".to_string()
            } else {
                "transport error".to_string()
            },
        }
    }

    async fn unwrap_envelope(
        response: reqwest::Response,
    ) -> Result<TransactionData, ProviderError> {
        let http_status = response.status();
        let envelope: Envelope<TransactionData> =
            response.json().await.map_err(Self::transport_error)?;

        if !http_status.is_success() || !envelope.status {
            let reason = envelope
                .message
                .unwrap_or_else(|| format!("gateway returned {}", http_status));
            return Err(ProviderError::ProviderRejected { reason });
        }

        envelope.data.ok_or(ProviderError::ProviderRejected {
            reason: "gateway response missing transaction data".to_string(),
        })
    }

    fn outcome_from(data: TransactionData) -> ChargeOutcome {
        let reference = data
            .reference
            .or_else(|| data.id.map(|id| id.to_string()));

        ChargeOutcome {
            status: Self::map_status(data.status.as_deref()),
            provider_transaction_id: reference,
            payment_url: data.authorization_url,
            display_text: None,
            metadata: HashMap::new(),
        }
    }
}

impl DomainPort for AltGatewayAdapter {}

#[async_trait]
impl PaymentProvider for AltGatewayAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AltGateway
    }

    async fn process_payment(&self, request: &ChargeRequest) -> Result<ChargeOutcome, ProviderError> {
        let raw_fields = request.raw_card_fields();
        if !raw_fields.is_empty() {
            return Err(ProviderError::RejectedInput(format!(
                "raw card data is not accepted (fields: {})",
                raw_fields.join(", ")
            )));
        }
        self.ensure_configured()?;

        debug!(amount = request.amount.minor_units(), "initializing transaction");
        let body = InitializeBody {
            amount: request.amount.minor_units(),
            currency: request.amount.currency().code(),
            email: &request.customer.email,
        };
        let response = self
            .http
            .post(format!("{}/transactions/initialize", self.config.base_url))
            .header(AUTHORIZATION, self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let data = Self::unwrap_envelope(response).await?;
        Ok(Self::outcome_from(data))
    }

    async fn verify_payment(&self, transaction_ref: &str) -> Result<ChargeOutcome, ProviderError> {
        self.ensure_configured()?;

        // Numeric ids are gateway-issued and verified directly; textual
        // references go through the by-reference lookup.
        let url = if is_numeric_reference(transaction_ref) {
            format!(
                "{}/transactions/{}/verify",
                self.config.base_url, transaction_ref
            )
        } else {
            format!(
                "{}/transactions/verify_by_reference/{}",
                self.config.base_url, transaction_ref
            )
        };

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(Self::transport_error)?;

        let data = Self::unwrap_envelope(response).await?;
        Ok(Self::outcome_from(data))
    }

    async fn refund_payment(
        &self,
        transaction_ref: &str,
        amount: Money,
    ) -> Result<ChargeOutcome, ProviderError> {
        self.ensure_configured()?;

        let body = RefundBody {
            transaction: transaction_ref,
            amount: amount.minor_units(),
        };
        let response = self
            .http
            .post(format!("{}/refunds", self.config.base_url))
            .header(AUTHORIZATION, self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let data = Self::unwrap_envelope(response).await?;
        let mut outcome = Self::outcome_from(data);
        outcome.status = PaymentStatus::Refunded;
        if outcome.provider_transaction_id.is_none() {
            outcome.provider_transaction_id = Some(transaction_ref.to_string());
        }
        Ok(outcome)
    }
}

#[async_trait]
impl HealthCheckable for AltGatewayAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let (status, message) = if self.config.api_key.is_empty() {
            (
                AdapterHealth::Unhealthy,
                Some("api key not configured".to_string()),
            )
        } else {
            (AdapterHealth::Healthy, None)
        };

        HealthCheckResult {
            adapter_id: "alt-gateway-adapter".to_string(),
            status,
            latency_ms: start.elapsed().as_millis() as u64,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_reference_detection() {
        assert!(is_numeric_reference("4092840938"));
        assert!(!is_numeric_reference("TX-4092840938"));
        assert!(!is_numeric_reference("clinic_ref_8812"));
        assert!(!is_numeric_reference(""));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AltGatewayAdapter::map_status(Some("successful")),
            PaymentStatus::Completed
        );
        assert_eq!(
            AltGatewayAdapter::map_status(Some("cancelled")),
            PaymentStatus::Failed
        );
        assert_eq!(
            AltGatewayAdapter::map_status(Some("processing")),
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_missing_api_key_is_misconfigured() {
        let adapter = AltGatewayAdapter::new(AltGatewayConfig::default());
        let err = adapter.verify_payment("12345").await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Misconfigured { missing: "api_key", .. }
        ));
    }
}
