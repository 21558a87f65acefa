//! Booking orchestrator
//!
//! Drives one booking attempt through its state machine:
//!
//! 1. prerequisite gate (mandatory, re-run server-side)
//! 2. payment validation (ownership, settlement, exact fee)
//! 3. slot conflict check (coarse window at the branch)
//! 4. appointment insert
//! 5. payment link, with a compensating delete when the link fails
//! 6. best-effort notification
//!
//! The appointment insert and payment link span two rows with no shared
//! transaction; the compensating delete in step 5 is the mechanism that
//! prevents an appointment existing without an attached payment. The
//! delete is idempotent and retried with exponential backoff; if the
//! retries are exhausted a durable reconciliation event is recorded and
//! the failure is logged as a data-integrity alert.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{error, info, instrument, warn};

use core_kernel::{AppointmentId, BranchId, PaymentId, UserId};
use domain_payments::{Payment, PaymentStatus, PaymentStore};

use crate::appointment::{Appointment, AppointmentStatus};
use crate::error::BookingError;
use crate::policy::BookingPolicy;
use crate::ports::{
    AppointmentStore, BookingGate, Notifier, ReconciliationEvent, ReconciliationQueue,
};

/// Retry schedule for the compensating delete
#[derive(Debug, Clone)]
pub struct CompensationConfig {
    /// Attempts before giving up and recording a reconciliation event
    pub max_attempts: u32,
    /// Base delay; doubles after each failed attempt
    pub base_delay: StdDuration,
}

impl Default for CompensationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: StdDuration::from_millis(200),
        }
    }
}

/// A proposed booking
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub branch_id: BranchId,
    pub scheduled_at: DateTime<Utc>,
    pub treatment_type: String,
    pub notes: Option<String>,
    pub payment_id: PaymentId,
}

/// Orchestrates payment-funded appointment creation and the appointment
/// lifecycle operations
pub struct BookingOrchestrator {
    gate: Arc<dyn BookingGate>,
    appointments: Arc<dyn AppointmentStore>,
    payments: Arc<dyn PaymentStore>,
    notifier: Arc<dyn Notifier>,
    reconciliation: Arc<dyn ReconciliationQueue>,
    policy: BookingPolicy,
    compensation: CompensationConfig,
}

impl BookingOrchestrator {
    /// Creates a new orchestrator
    pub fn new(
        gate: Arc<dyn BookingGate>,
        appointments: Arc<dyn AppointmentStore>,
        payments: Arc<dyn PaymentStore>,
        notifier: Arc<dyn Notifier>,
        reconciliation: Arc<dyn ReconciliationQueue>,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            gate,
            appointments,
            payments,
            notifier,
            reconciliation,
            policy,
            compensation: CompensationConfig::default(),
        }
    }

    /// Overrides the compensation retry schedule
    pub fn with_compensation(mut self, compensation: CompensationConfig) -> Self {
        self.compensation = compensation;
        self
    }

    /// Returns the active booking policy
    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    /// Runs one booking attempt end to end
    #[instrument(skip(self, request), fields(user_id = %caller, branch_id = %request.branch_id, payment_id = %request.payment_id))]
    pub async fn book(
        &self,
        caller: UserId,
        request: BookingRequest,
    ) -> Result<Appointment, BookingError> {
        if request.treatment_type.trim().is_empty() {
            return Err(BookingError::InvalidRequest(
                "treatment_type must not be empty".to_string(),
            ));
        }
        if request.scheduled_at <= Utc::now() {
            return Err(BookingError::PastAppointment);
        }

        // Step 1: the gate is mandatory here even when the client already
        // ran its own pre-check.
        let decision = self.gate.evaluate(caller).await?;
        if !decision.can_proceed {
            info!(reasons = ?decision.reasons, "booking blocked by prerequisite gate");
            return Err(BookingError::PrerequisitesNotMet {
                reasons: decision.reasons,
            });
        }

        // Step 2: the payment must belong to the caller, be settled,
        // match the fee exactly, and not fund another appointment.
        let payment = self.validate_payment(caller, request.payment_id).await?;

        // Step 3: coarse mutual exclusion over the branch slot window.
        let window = self.policy.conflict_window(request.scheduled_at)?;
        let occupied = self
            .appointments
            .find_active_in_window(request.branch_id, window)
            .await?;
        if !occupied.is_empty() {
            info!(count = occupied.len(), "slot conflict at branch");
            return Err(BookingError::SlotUnavailable);
        }

        // Step 4: create the appointment.
        let appointment = Appointment::new(
            request.branch_id,
            caller,
            request.scheduled_at,
            request.treatment_type,
            request.notes,
        );
        self.appointments.insert(&appointment).await?;

        // Step 5: link the payment; roll the appointment back if the
        // second write of the commit fails.
        if let Err(link_err) = self
            .payments
            .link_appointment(payment.id, appointment.id)
            .await
        {
            warn!(error = %link_err, "payment link failed, compensating");
            self.compensate(&appointment, payment.id, &link_err).await;
            return Err(BookingError::Linkage { source: link_err });
        }

        info!(appointment_id = %appointment.id, "booking committed");

        // Step 6: notification is not part of the commit.
        if let Err(e) = self.notifier.booking_created(&appointment).await {
            warn!(error = %e, "booking notification failed");
        }

        Ok(appointment)
    }

    /// Administrative status transition
    ///
    /// Role authorization happens at the API boundary; this method only
    /// applies the transition, appends the optional admin note, and
    /// notifies the patient.
    #[instrument(skip(self, admin_note))]
    pub async fn update_status(
        &self,
        id: AppointmentId,
        new_status: AppointmentStatus,
        admin_note: Option<String>,
    ) -> Result<Appointment, BookingError> {
        let mut appointment = self.load(id).await?;

        appointment.set_status(new_status);
        if let Some(note) = &admin_note {
            appointment.append_note(note);
        }
        self.appointments.update(&appointment).await?;

        info!(appointment_id = %id, status = %new_status, "appointment status updated");
        if let Err(e) = self
            .notifier
            .appointment_updated(&appointment, admin_note.as_deref())
            .await
        {
            warn!(error = %e, "status notification failed");
        }

        Ok(appointment)
    }

    /// Owner-initiated reschedule
    ///
    /// The new time must be strictly in the future and the target slot
    /// free; the appointment returns to pending for re-confirmation.
    #[instrument(skip(self))]
    pub async fn reschedule(
        &self,
        caller: UserId,
        id: AppointmentId,
        new_time: DateTime<Utc>,
    ) -> Result<Appointment, BookingError> {
        let mut appointment = self.load_owned(caller, id).await?;

        if new_time <= Utc::now() {
            return Err(BookingError::PastAppointment);
        }

        let window = self.policy.conflict_window(new_time)?;
        let occupied = self
            .appointments
            .find_active_in_window(appointment.branch_id, window)
            .await?;
        if occupied.iter().any(|a| a.id != appointment.id) {
            return Err(BookingError::SlotUnavailable);
        }

        appointment.reschedule(new_time);
        self.appointments.update(&appointment).await?;

        info!(appointment_id = %id, "appointment rescheduled");
        if let Err(e) = self.notifier.appointment_updated(&appointment, None).await {
            warn!(error = %e, "reschedule notification failed");
        }

        Ok(appointment)
    }

    /// Owner-initiated cancellation
    ///
    /// Late cancellations (inside the policy's late window) are currently
    /// permitted outright; they are logged so the volume of the policy
    /// gap stays visible.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        caller: UserId,
        id: AppointmentId,
    ) -> Result<Appointment, BookingError> {
        let mut appointment = self.load_owned(caller, id).await?;

        let now = Utc::now();
        if self.policy.is_late_action(now, appointment.scheduled_at) {
            warn!(appointment_id = %id, scheduled_at = %appointment.scheduled_at, "late cancellation accepted");
        }

        appointment.cancel();
        self.appointments.update(&appointment).await?;

        info!(appointment_id = %id, "appointment cancelled");
        if let Err(e) = self.notifier.appointment_updated(&appointment, None).await {
            warn!(error = %e, "cancellation notification failed");
        }

        Ok(appointment)
    }

    /// Lists the caller's appointments
    pub async fn appointments_for(&self, user_id: UserId) -> Result<Vec<Appointment>, BookingError> {
        Ok(self.appointments.list_for_user(user_id).await?)
    }

    /// Lists all appointments (administrative view)
    pub async fn all_appointments(&self) -> Result<Vec<Appointment>, BookingError> {
        Ok(self.appointments.list_all().await?)
    }

    async fn load(&self, id: AppointmentId) -> Result<Appointment, BookingError> {
        self.appointments
            .find_by_id(id)
            .await?
            .ok_or(BookingError::AppointmentNotFound(id))
    }

    async fn load_owned(
        &self,
        caller: UserId,
        id: AppointmentId,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.load(id).await?;
        if appointment.user_id != caller {
            return Err(BookingError::NotOwner);
        }
        Ok(appointment)
    }

    async fn validate_payment(
        &self,
        caller: UserId,
        payment_id: PaymentId,
    ) -> Result<Payment, BookingError> {
        let payment = self
            .payments
            .find_by_id(payment_id)
            .await?
            // A payment owned by someone else is indistinguishable from a
            // missing one to the caller.
            .filter(|p| p.user_id == caller)
            .ok_or(BookingError::PaymentNotFound(payment_id))?;

        if payment.status != PaymentStatus::Completed {
            return Err(BookingError::PaymentNotSettled {
                status: payment.status,
            });
        }
        if payment.amount != self.policy.booking_fee {
            return Err(BookingError::FeeMismatch {
                expected: self.policy.booking_fee,
                actual: payment.amount,
            });
        }
        if payment.appointment_id.is_some() {
            return Err(BookingError::PaymentAlreadyUsed(payment_id));
        }

        Ok(payment)
    }

    /// Undoes the appointment insert after a failed payment link
    ///
    /// The delete is idempotent, so a retry that follows a
    /// partially-applied attempt is harmless. Exhausting the retries
    /// leaves an orphaned appointment; that is recorded durably and
    /// logged at error level for paging.
    async fn compensate(
        &self,
        appointment: &Appointment,
        payment_id: PaymentId,
        cause: &core_kernel::PortError,
    ) {
        let mut delay = self.compensation.base_delay;

        for attempt in 1..=self.compensation.max_attempts {
            match self.appointments.delete(appointment.id).await {
                Ok(_) => {
                    info!(appointment_id = %appointment.id, attempt, "compensating delete applied");
                    return;
                }
                Err(e) => {
                    warn!(appointment_id = %appointment.id, attempt, error = %e, "compensating delete failed");
                    if attempt < self.compensation.max_attempts {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        error!(
            appointment_id = %appointment.id,
            payment_id = %payment_id,
            cause = %cause,
            "compensation exhausted; orphaned appointment requires manual reconciliation"
        );
        let event = ReconciliationEvent::new(
            appointment.id,
            payment_id,
            format!("appointment delete failed after payment link error: {}", cause),
        );
        if let Err(e) = self.reconciliation.record(event).await {
            error!(appointment_id = %appointment.id, error = %e, "failed to record reconciliation event");
        }
    }
}
