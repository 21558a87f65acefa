//! API configuration
//!
//! Environment-driven configuration for the server, the database, the
//! provider credentials, and the deployment-tunable booking rules. The
//! business-rule values build the `BookingPolicy` and `PollConfig`
//! structs that get passed explicitly into the domain layer.

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::time::Duration as StdDuration;

use core_kernel::{CoreError, Currency, Money};
use domain_booking::{BookingPolicy, CollaboratorConfig};
use domain_payments::adapters::{AltGatewayConfig, CardGatewayConfig};
use domain_payments::PollConfig;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,

    /// Fixed booking fee amount
    pub booking_fee: Decimal,
    /// Currency the booking fee is charged in
    pub booking_currency: String,
    /// Conflict window radius in minutes
    pub conflict_window_minutes: i64,
    /// Late-action window in hours
    pub late_window_hours: i64,

    /// Settlement poll interval in seconds
    pub poll_interval_secs: u64,
    /// Settlement poll attempt budget
    pub poll_max_attempts: u32,

    /// Card gateway API base URL
    pub card_gateway_base_url: String,
    /// Card gateway secret key
    pub card_gateway_secret_key: String,
    /// URL the hosted checkout redirects back to
    pub card_gateway_callback_url: String,

    /// Alternative gateway API base URL
    pub alt_gateway_base_url: String,
    /// Alternative gateway API key
    pub alt_gateway_api_key: String,

    /// Prerequisite gate service base URL
    pub gate_base_url: String,
    /// Prerequisite gate API key
    pub gate_api_key: String,

    /// Notification dispatch service base URL
    pub notify_base_url: String,
    /// Notification dispatch API key
    pub notify_api_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/clinic".to_string(),
            log_level: "info".to_string(),
            booking_fee: dec!(100.00),
            booking_currency: "GHS".to_string(),
            conflict_window_minutes: 60,
            late_window_hours: 24,
            poll_interval_secs: 10,
            poll_max_attempts: 30,
            card_gateway_base_url: "https://api.cardgateway.example".to_string(),
            card_gateway_secret_key: String::new(),
            card_gateway_callback_url: String::new(),
            alt_gateway_base_url: "https://api.altgateway.example".to_string(),
            alt_gateway_api_key: String::new(),
            gate_base_url: String::new(),
            gate_api_key: String::new(),
            notify_base_url: String::new(),
            notify_api_key: String::new(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Builds the booking policy from the configured business rules
    pub fn booking_policy(&self) -> Result<BookingPolicy, CoreError> {
        let currency: Currency = self.booking_currency.parse()?;
        let policy = BookingPolicy {
            booking_fee: Money::positive(self.booking_fee, currency)?,
            conflict_radius: Duration::minutes(self.conflict_window_minutes),
            late_window: Duration::hours(self.late_window_hours),
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Builds the settlement polling schedule
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: StdDuration::from_secs(self.poll_interval_secs),
            max_attempts: self.poll_max_attempts,
        }
    }

    /// Builds the card gateway adapter configuration
    pub fn card_gateway_config(&self) -> CardGatewayConfig {
        CardGatewayConfig {
            base_url: self.card_gateway_base_url.clone(),
            secret_key: self.card_gateway_secret_key.clone(),
            callback_url: self.card_gateway_callback_url.clone(),
            timeout_secs: 30,
        }
    }

    /// Builds the alternative gateway adapter configuration
    pub fn alt_gateway_config(&self) -> AltGatewayConfig {
        AltGatewayConfig {
            base_url: self.alt_gateway_base_url.clone(),
            api_key: self.alt_gateway_api_key.clone(),
            timeout_secs: 30,
        }
    }

    /// Builds the prerequisite gate collaborator configuration
    pub fn gate_config(&self) -> CollaboratorConfig {
        CollaboratorConfig {
            base_url: self.gate_base_url.clone(),
            api_key: self.gate_api_key.clone(),
            timeout_secs: 10,
        }
    }

    /// Builds the notification dispatch collaborator configuration
    pub fn notifier_config(&self) -> CollaboratorConfig {
        CollaboratorConfig {
            base_url: self.notify_base_url.clone(),
            api_key: self.notify_api_key.clone(),
            timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_builds() {
        let config = ApiConfig::default();
        let policy = config.booking_policy().unwrap();

        assert_eq!(policy.booking_fee, Money::new(dec!(100.00), Currency::GHS));
        assert_eq!(policy.conflict_radius, Duration::hours(1));
    }

    #[test]
    fn test_unknown_currency_is_a_configuration_error() {
        let config = ApiConfig {
            booking_currency: "DOUBLOONS".to_string(),
            ..Default::default()
        };
        assert!(config.booking_policy().is_err());
    }

    #[test]
    fn test_poll_config_uses_configured_budget() {
        let config = ApiConfig {
            poll_interval_secs: 5,
            poll_max_attempts: 12,
            ..Default::default()
        };
        let poll = config.poll_config();
        assert_eq!(poll.interval, StdDuration::from_secs(5));
        assert_eq!(poll.max_attempts, 12);
    }
}
