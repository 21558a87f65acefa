//! Booking domain ports
//!
//! Store and collaborator traits the orchestrator depends on. The
//! appointment store is implemented by `infra_db`; the gate and notifier
//! are external collaborators consumed through these seams; the
//! reconciliation queue records compensation failures durably.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AppointmentId, BranchId, DomainPort, PaymentId, PortError, TimeWindow, UserId};

use crate::appointment::Appointment;

/// Durable store of appointments
#[async_trait]
pub trait AppointmentStore: DomainPort {
    /// Inserts a new appointment row
    async fn insert(&self, appointment: &Appointment) -> Result<(), PortError>;

    /// Loads an appointment by id
    async fn find_by_id(&self, id: AppointmentId) -> Result<Option<Appointment>, PortError>;

    /// Returns slot-occupying appointments at a branch inside a window
    ///
    /// Only pending and confirmed appointments count; cancelled and
    /// completed ones release their slot.
    async fn find_active_in_window(
        &self,
        branch_id: BranchId,
        window: TimeWindow,
    ) -> Result<Vec<Appointment>, PortError>;

    /// Persists changed fields of an existing appointment
    async fn update(&self, appointment: &Appointment) -> Result<(), PortError>;

    /// Deletes an appointment row
    ///
    /// Idempotent: deleting a row that is already gone returns
    /// `Ok(false)`. The orchestrator relies on this for compensation
    /// retries.
    async fn delete(&self, id: AppointmentId) -> Result<bool, PortError>;

    /// Lists a user's appointments, newest first
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Appointment>, PortError>;

    /// Lists every appointment, newest first
    async fn list_all(&self) -> Result<Vec<Appointment>, PortError>;
}

/// Outcome of the booking prerequisite evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDecision {
    pub can_proceed: bool,
    pub reasons: Vec<String>,
}

impl GateDecision {
    /// A decision that allows the booking to proceed
    pub fn allow() -> Self {
        Self {
            can_proceed: true,
            reasons: Vec::new(),
        }
    }

    /// A decision that blocks the booking with the given reasons
    pub fn deny(reasons: Vec<String>) -> Self {
        Self {
            can_proceed: false,
            reasons,
        }
    }
}

/// External prerequisite evaluator (intake forms, verification)
///
/// The gate runs server-side on every booking attempt; a client-side
/// pre-check never substitutes for it.
#[async_trait]
pub trait BookingGate: DomainPort {
    async fn evaluate(&self, user_id: UserId) -> Result<GateDecision, PortError>;
}

/// Outbound notification dispatch (email / WhatsApp)
///
/// Dispatch is fire-and-forget from the orchestrator's point of view:
/// failures are logged by the caller and never roll back a booking.
#[async_trait]
pub trait Notifier: DomainPort {
    /// A booking was created and linked to its payment
    async fn booking_created(&self, appointment: &Appointment) -> Result<(), PortError>;

    /// An appointment changed (status update, reschedule, cancel)
    async fn appointment_updated(
        &self,
        appointment: &Appointment,
        note: Option<&str>,
    ) -> Result<(), PortError>;
}

/// A durable marker that manual reconciliation is needed
///
/// Recorded when compensation could not undo a partially-committed
/// booking; an operator has to resolve the orphaned state by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationEvent {
    pub appointment_id: AppointmentId,
    pub payment_id: PaymentId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

impl ReconciliationEvent {
    pub fn new(
        appointment_id: AppointmentId,
        payment_id: PaymentId,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            appointment_id,
            payment_id,
            reason: reason.into(),
            occurred_at: Utc::now(),
        }
    }
}

/// Durable queue of reconciliation events
#[async_trait]
pub trait ReconciliationQueue: DomainPort {
    async fn record(&self, event: ReconciliationEvent) -> Result<(), PortError>;
}
