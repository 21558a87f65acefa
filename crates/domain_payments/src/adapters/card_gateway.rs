//! Card gateway adapter
//!
//! Adapter for the hosted-checkout card gateway. Card payments go through
//! the gateway's hosted page - this adapter never touches card numbers,
//! and refuses any request that carries them. Mobile-money methods routed
//! here are charged with a "push" to the customer's phone: the gateway
//! returns a pending charge with a display instruction, and settlement is
//! discovered later through `verify_payment`.
//!
//! # Error handling
//!
//! - Missing secret key -> `ProviderError::Misconfigured`, before any call
//! - Raw card fields in the request -> `ProviderError::RejectedInput`,
//!   before any call
//! - Gateway declines -> `ProviderError::ProviderRejected` with the
//!   gateway's message (raw payloads stay inside this module)
//! - Transport failures -> `ProviderError::ProviderUnavailable`

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

use crate::payment::{PaymentMethod, PaymentStatus, ProviderKind};
use crate::provider::{ChargeOutcome, ChargeRequest, PaymentProvider, ProviderError};

/// Configuration for the card gateway adapter
#[derive(Debug, Clone)]
pub struct CardGatewayConfig {
    /// Base URL of the gateway API
    pub base_url: String,
    /// Secret API key
    pub secret_key: String,
    /// URL the hosted page redirects back to after checkout
    pub callback_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for CardGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cardgateway.example".to_string(),
            secret_key: String::new(),
            callback_url: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Adapter for the card gateway rail
#[derive(Debug)]
pub struct CardGatewayAdapter {
    config: CardGatewayConfig,
    http: reqwest::Client,
}

// Wire types for the gateway API. The gateway wraps every response in a
// status/message/data envelope.

#[derive(Debug, Serialize)]
struct InitCheckoutBody<'a> {
    amount: i64,
    currency: &'a str,
    email: &'a str,
    callback_url: &'a str,
}

#[derive(Debug, Serialize)]
struct PushChargeBody<'a> {
    amount: i64,
    currency: &'a str,
    email: &'a str,
    phone: &'a str,
    network: &'a str,
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
struct ChargeData {
    reference: String,
    status: Option<String>,
    authorization_url: Option<String>,
    display_text: Option<String>,
    channel: Option<String>,
}

impl CardGatewayAdapter {
    /// Creates a new adapter with the given configuration
    pub fn new(config: CardGatewayConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { config, http }
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        if self.config.secret_key.is_empty() {
            return Err(ProviderError::Misconfigured {
                provider: ProviderKind::CardGateway,
                missing: "secret_key",
            });
        }
        Ok(())
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.config.secret_key)
    }

    /// Maps a mobile-money method to the gateway's network code
    fn network_code(method: PaymentMethod) -> Option<&'static str> {
        match method {
            PaymentMethod::MtnMomo => Some("mtn"),
            PaymentMethod::VodafoneCash => Some("vod"),
            PaymentMethod::AirtelTigoMoney => Some("atl"),
            _ => None,
        }
    }

    fn map_status(status: Option<&str>) -> PaymentStatus {
        match status {
            Some("success") | Some("completed") => PaymentStatus::Completed,
            Some("failed") | Some("abandoned") => PaymentStatus::Failed,
            Some("reversed") | Some("refunded") => PaymentStatus::Refunded,
            _ => PaymentStatus::Pending,
        }
    }

    fn transport_error(err: reqwest::Error) -> ProviderError {
        let detail = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            "connection failed".to_string()
        } else {
            "transport error".to_string()
        };
        warn!(provider = %ProviderKind::CardGateway, error = %err, "card gateway transport failure");
        ProviderError::ProviderUnavailable {
            provider: ProviderKind::CardGateway,
            detail,
        }
    }

    async fn unwrap_envelope(
        response: reqwest::Response,
    ) -> Result<ChargeData, ProviderError> {
        let http_status = response.status();
        let envelope: Envelope<ChargeData> = response
            .json()
            .await
            .map_err(Self::transport_error)?;

        if !http_status.is_success() || !envelope.status {
            let reason = envelope
                .message
                .unwrap_or_else(|| format!("gateway returned {}", http_status));
            return Err(ProviderError::ProviderRejected { reason });
        }

        envelope.data.ok_or(ProviderError::ProviderRejected {
            reason: "gateway response missing charge data".to_string(),
        })
    }

    fn outcome_from(data: ChargeData) -> ChargeOutcome {
        let mut metadata = HashMap::new();
        if let Some(channel) = &data.channel {
            metadata.insert("channel".to_string(), channel.clone());
        }

        ChargeOutcome {
            status: Self::map_status(data.status.as_deref()),
            provider_transaction_id: Some(data.reference),
            payment_url: data.authorization_url,
            display_text: data.display_text,
            metadata,
        }
    }
}

impl DomainPort for CardGatewayAdapter {}

#[async_trait]
impl PaymentProvider for CardGatewayAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::CardGateway
    }

    async fn process_payment(&self, request: &ChargeRequest) -> Result<ChargeOutcome, ProviderError> {
        // Both checks run before any network traffic.
        let raw_fields = request.raw_card_fields();
        if !raw_fields.is_empty() {
            return Err(ProviderError::RejectedInput(format!(
                "raw card data is not accepted; card entry happens on the hosted page (fields: {})",
                raw_fields.join(", ")
            )));
        }
        self.ensure_configured()?;

        let amount = request.amount.minor_units();
        let currency = request.amount.currency().code();

        match request.method {
            PaymentMethod::Card => {
                debug!(amount, "initializing hosted checkout");
                let body = InitCheckoutBody {
                    amount,
                    currency,
                    email: &request.customer.email,
                    callback_url: &self.config.callback_url,
                };
                let response = self
                    .http
                    .post(format!("{}/checkout", self.config.base_url))
                    .header(AUTHORIZATION, self.auth_header())
                    .json(&body)
                    .send()
                    .await
                    .map_err(Self::transport_error)?;

                let data = Self::unwrap_envelope(response).await?;
                Ok(Self::outcome_from(data))
            }
            method if method.is_mobile_money() => {
                let network = Self::network_code(method).ok_or_else(|| {
                    ProviderError::UnsupportedMethod(method.to_string())
                })?;
                let phone = request.customer.phone.as_deref().ok_or_else(|| {
                    ProviderError::RejectedInput(
                        "phone_number is required for mobile-money push charges".to_string(),
                    )
                })?;

                debug!(amount, network, "issuing push charge");
                let body = PushChargeBody {
                    amount,
                    currency,
                    email: &request.customer.email,
                    phone,
                    network,
                };
                let response = self
                    .http
                    .post(format!("{}/push-charges", self.config.base_url))
                    .header(AUTHORIZATION, self.auth_header())
                    .json(&body)
                    .send()
                    .await
                    .map_err(Self::transport_error)?;

                let data = Self::unwrap_envelope(response).await?;
                let mut outcome = Self::outcome_from(data);
                // Push charges always complete asynchronously.
                outcome.status = PaymentStatus::Pending;
                if outcome.display_text.is_none() {
                    outcome.display_text = Some(
                        "Approve the payment prompt on your phone to complete the charge"
                            .to_string(),
                    );
                }
                Ok(outcome)
            }
            other => Err(ProviderError::UnsupportedMethod(other.to_string())),
        }
    }

    async fn verify_payment(&self, transaction_ref: &str) -> Result<ChargeOutcome, ProviderError> {
        self.ensure_configured()?;

        let response = self
            .http
            .get(format!("{}/charges/{}", self.config.base_url, transaction_ref))
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
        Ok(outcome)
    }
}

#[async_trait]
impl HealthCheckable for CardGatewayAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let (status, message) = if self.config.secret_key.is_empty() {
            (
                AdapterHealth::Unhealthy,
                Some("secret key not configured".to_string()),
            )
        } else {
            (AdapterHealth::Healthy, None)
        };

        HealthCheckResult {
            adapter_id: "card-gateway-adapter".to_string(),
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
    use core_kernel::{Currency, UserId};
    use crate::provider::CustomerDetails;
    use rust_decimal_macros::dec;

    fn configured() -> CardGatewayAdapter {
        CardGatewayAdapter::new(CardGatewayConfig {
            secret_key: "sk_test_123".to_string(),
            callback_url: "https://clinic.example/payments/callback".to_string(),
            ..Default::default()
        })
    }

    fn request(method: PaymentMethod) -> ChargeRequest {
        ChargeRequest {
            user_id: UserId::new(),
            amount: Money::new(dec!(100.00), Currency::GHS),
            method,
            customer: CustomerDetails {
                email: "ama@example.com".to_string(),
                name: Some("Ama Mensah".to_string()),
                phone: Some("+233201234567".to_string()),
            },
            bank: None,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_raw_card_data_rejected_before_configuration_check() {
        // Even an unconfigured adapter must reject card data first; the
        // rejection never depends on reaching the network.
        let adapter = CardGatewayAdapter::new(CardGatewayConfig::default());
        let mut req = request(PaymentMethod::Card);
        req.metadata
            .insert("card_number".to_string(), "4111111111111111".to_string());

        let err = adapter.process_payment(&req).await.unwrap_err();
        assert!(matches!(err, ProviderError::RejectedInput(_)));
    }

    #[tokio::test]
    async fn test_missing_secret_key_is_misconfigured() {
        let adapter = CardGatewayAdapter::new(CardGatewayConfig::default());

        let err = adapter.process_payment(&request(PaymentMethod::Card)).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Misconfigured { missing: "secret_key", .. }
        ));

        let err = adapter.verify_payment("TX123").await.unwrap_err();
        assert!(matches!(err, ProviderError::Misconfigured { .. }));
    }

    #[tokio::test]
    async fn test_push_charge_requires_phone() {
        let adapter = configured();
        let mut req = request(PaymentMethod::MtnMomo);
        req.customer.phone = None;

        let err = adapter.process_payment(&req).await.unwrap_err();
        assert!(matches!(err, ProviderError::RejectedInput(_)));
    }

    #[tokio::test]
    async fn test_unsupported_method_rejected_without_network() {
        let adapter = configured();
        let err = adapter
            .process_payment(&request(PaymentMethod::CashOnDelivery))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedMethod(_)));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            CardGatewayAdapter::map_status(Some("success")),
            PaymentStatus::Completed
        );
        assert_eq!(
            CardGatewayAdapter::map_status(Some("failed")),
            PaymentStatus::Failed
        );
        assert_eq!(
            CardGatewayAdapter::map_status(Some("send_otp")),
            PaymentStatus::Pending
        );
        assert_eq!(CardGatewayAdapter::map_status(None), PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_health_reflects_configuration() {
        let unconfigured = CardGatewayAdapter::new(CardGatewayConfig::default());
        assert_eq!(
            unconfigured.health_check().await.status,
            AdapterHealth::Unhealthy
        );

        assert_eq!(configured().health_check().await.status, AdapterHealth::Healthy);
    }
}
