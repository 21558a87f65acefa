//! External collaborator adapters
//!
//! REST adapters for the two collaborators the orchestrator consumes but
//! does not own: the prerequisite evaluation service and the
//! notification dispatch service. Both translate between the collaborator
//! APIs and the domain ports; neither leaks wire types past this module.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use core_kernel::{
    AdapterHealth, DomainPort, HealthCheckable, HealthCheckResult, PortError, UserId,
};

use crate::appointment::Appointment;
use crate::ports::{BookingGate, GateDecision, Notifier};

/// Configuration for a collaborator REST endpoint
#[derive(Debug, Clone)]
pub struct CollaboratorConfig {
    /// Base URL of the collaborator API
    pub base_url: String,
    /// API key for service-to-service calls
    pub api_key: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Prerequisite gate backed by the platform's eligibility service
#[derive(Debug)]
pub struct PrerequisiteApiGate {
    config: CollaboratorConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct EligibilityResponse {
    can_proceed: bool,
    #[serde(default)]
    reasons: Vec<String>,
}

impl PrerequisiteApiGate {
    pub fn new(config: CollaboratorConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { config, http }
    }
}

impl DomainPort for PrerequisiteApiGate {}

#[async_trait]
impl BookingGate for PrerequisiteApiGate {
    async fn evaluate(&self, user_id: UserId) -> Result<GateDecision, PortError> {
        if self.config.base_url.is_empty() {
            // The gate must not be bypassable; an unconfigured gate is an
            // operational fault, never an implicit allow.
            return Err(PortError::internal(
                "prerequisite gate endpoint is not configured",
            ));
        }

        let url = format!(
            "{}/users/{}/booking-eligibility",
            self.config.base_url,
            user_id.as_uuid()
        );
        debug!(%user_id, "evaluating booking prerequisites");

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .send()
            .await
            .map_err(|e| PortError::Connection {
                message: "prerequisite service unreachable".to_string(),
                source: Some(Box::new(e)),
            })?;

        if !response.status().is_success() {
            return Err(PortError::ServiceUnavailable {
                service: "prerequisite-gate".to_string(),
            });
        }

        let body: EligibilityResponse = response.json().await.map_err(|e| PortError::Internal {
            message: "malformed eligibility response".to_string(),
            source: Some(Box::new(e)),
        })?;

        Ok(if body.can_proceed {
            GateDecision::allow()
        } else {
            GateDecision::deny(body.reasons)
        })
    }
}

#[async_trait]
impl HealthCheckable for PrerequisiteApiGate {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let (status, message) = if self.config.base_url.is_empty() {
            (
                AdapterHealth::Unhealthy,
                Some("endpoint not configured".to_string()),
            )
        } else {
            (AdapterHealth::Healthy, None)
        };
        HealthCheckResult {
            adapter_id: "prerequisite-gate".to_string(),
            status,
            latency_ms: start.elapsed().as_millis() as u64,
            message,
            checked_at: Utc::now(),
        }
    }
}

/// Notifier backed by the platform's dispatch service
///
/// The dispatch service fans a single event out to email and WhatsApp.
/// Failures here are reported to the caller, which logs and moves on.
#[derive(Debug)]
pub struct DispatchNotifier {
    config: CollaboratorConfig,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct NotificationEvent<'a> {
    event: &'a str,
    user_id: String,
    appointment_id: String,
    scheduled_at: String,
    status: &'a str,
    note: Option<&'a str>,
}

impl DispatchNotifier {
    pub fn new(config: CollaboratorConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { config, http }
    }

    async fn dispatch(&self, event: NotificationEvent<'_>) -> Result<(), PortError> {
        if self.config.base_url.is_empty() {
            // No dispatch service in this deployment; the caller treats
            // notification failure as non-fatal anyway.
            warn!(event = event.event, "notification dispatch not configured, dropping event");
            return Ok(());
        }

        let response = self
            .http
            .post(format!("{}/notifications", self.config.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .json(&event)
            .send()
            .await
            .map_err(|e| PortError::Connection {
                message: "notification service unreachable".to_string(),
                source: Some(Box::new(e)),
            })?;

        if !response.status().is_success() {
            return Err(PortError::ServiceUnavailable {
                service: "notification-dispatch".to_string(),
            });
        }
        Ok(())
    }

    fn event_for<'a>(
        event: &'a str,
        appointment: &'a Appointment,
        note: Option<&'a str>,
    ) -> NotificationEvent<'a> {
        NotificationEvent {
            event,
            user_id: appointment.user_id.to_string(),
            appointment_id: appointment.id.to_string(),
            scheduled_at: appointment.scheduled_at.to_rfc3339(),
            status: appointment.status.as_str(),
            note,
        }
    }
}

impl DomainPort for DispatchNotifier {}

#[async_trait]
impl Notifier for DispatchNotifier {
    async fn booking_created(&self, appointment: &Appointment) -> Result<(), PortError> {
        self.dispatch(Self::event_for("booking_created", appointment, None))
            .await
    }

    async fn appointment_updated(
        &self,
        appointment: &Appointment,
        note: Option<&str>,
    ) -> Result<(), PortError> {
        self.dispatch(Self::event_for("appointment_updated", appointment, note))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_gate_fails_closed() {
        let gate = PrerequisiteApiGate::new(CollaboratorConfig::default());
        let err = gate.evaluate(UserId::new()).await.unwrap_err();
        assert!(matches!(err, PortError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_unconfigured_notifier_drops_silently() {
        use chrono::Duration;
        use core_kernel::BranchId;

        let notifier = DispatchNotifier::new(CollaboratorConfig::default());
        let appointment = Appointment::new(
            BranchId::new(),
            UserId::new(),
            Utc::now() + Duration::days(1),
            "checkup",
            None,
        );

        // Dropping the event is acceptable; failing the booking is not.
        notifier.booking_created(&appointment).await.unwrap();
    }

    #[tokio::test]
    async fn test_gate_health_reflects_configuration() {
        let gate = PrerequisiteApiGate::new(CollaboratorConfig::default());
        assert_eq!(gate.health_check().await.status, AdapterHealth::Unhealthy);

        let configured = PrerequisiteApiGate::new(CollaboratorConfig {
            base_url: "https://platform.example/api".to_string(),
            api_key: "key".to_string(),
            timeout_secs: 10,
        });
        assert_eq!(configured.health_check().await.status, AdapterHealth::Healthy);
    }
}
