//! In-memory port doubles
//!
//! Each double implements a domain port over a mutex-guarded map and
//! records its interactions. Failure injection is explicit per double so
//! tests read as scripts, not as configuration puzzles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use core_kernel::{
    AppointmentId, BranchId, DomainPort, Money, PaymentId, PortError, TimeWindow, UserId,
};
use domain_booking::{
    Appointment, AppointmentStore, BookingGate, GateDecision, Notifier, ReconciliationEvent,
    ReconciliationQueue,
};
use domain_payments::poller::PaymentStatusSource;
use domain_payments::{
    ChargeOutcome, ChargeRequest, IdentityClaims, Payment, PaymentProvider, PaymentStatus,
    PaymentStore, ProviderError, ProviderKind, User, UserDirectory,
};

// ============================================================================
// Payment provider double
// ============================================================================

/// A provider that counts its calls and returns a scripted outcome
///
/// The call counters are what the raw-card tests assert on: a rejected
/// request must never reach the provider.
pub struct CountingProvider {
    kind: ProviderKind,
    reference: String,
    status: PaymentStatus,
    process_calls: AtomicU32,
    verify_calls: AtomicU32,
    refund_calls: AtomicU32,
    verify_script: Mutex<VecDeque<PaymentStatus>>,
    fail_processing: AtomicBool,
}

impl CountingProvider {
    /// A provider that accepts every charge as pending with `reference`
    pub fn pending(kind: ProviderKind, reference: impl Into<String>) -> Self {
        Self::with_status(kind, reference, PaymentStatus::Pending)
    }

    /// A provider that settles every charge instantly
    pub fn instant(kind: ProviderKind, reference: impl Into<String>) -> Self {
        Self::with_status(kind, reference, PaymentStatus::Completed)
    }

    fn with_status(kind: ProviderKind, reference: impl Into<String>, status: PaymentStatus) -> Self {
        Self {
            kind,
            reference: reference.into(),
            status,
            process_calls: AtomicU32::new(0),
            verify_calls: AtomicU32::new(0),
            refund_calls: AtomicU32::new(0),
            verify_script: Mutex::new(VecDeque::new()),
            fail_processing: AtomicBool::new(false),
        }
    }

    /// Scripts the statuses returned by successive verify calls; once the
    /// script runs dry the provider keeps returning its default status
    pub fn script_verifications(&self, statuses: impl IntoIterator<Item = PaymentStatus>) {
        self.verify_script.lock().unwrap().extend(statuses);
    }

    /// Makes every subsequent process call fail as unavailable
    pub fn go_offline(&self) {
        self.fail_processing.store(true, Ordering::SeqCst);
    }

    pub fn process_calls(&self) -> u32 {
        self.process_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> u32 {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn refund_calls(&self) -> u32 {
        self.refund_calls.load(Ordering::SeqCst)
    }
}

impl DomainPort for CountingProvider {}

#[async_trait]
impl PaymentProvider for CountingProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn process_payment(&self, _request: &ChargeRequest) -> Result<ChargeOutcome, ProviderError> {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_processing.load(Ordering::SeqCst) {
            return Err(ProviderError::ProviderUnavailable {
                provider: self.kind,
                detail: "scripted outage".to_string(),
            });
        }
        let mut outcome = ChargeOutcome::pending(self.reference.clone());
        outcome.status = self.status;
        Ok(outcome)
    }

    async fn verify_payment(&self, transaction_ref: &str) -> Result<ChargeOutcome, ProviderError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let status = self
            .verify_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.status);
        let mut outcome = ChargeOutcome::pending(transaction_ref.to_string());
        outcome.status = status;
        Ok(outcome)
    }

    async fn refund_payment(
        &self,
        transaction_ref: &str,
        _amount: Money,
    ) -> Result<ChargeOutcome, ProviderError> {
        self.refund_calls.fetch_add(1, Ordering::SeqCst);
        let mut outcome = ChargeOutcome::pending(transaction_ref.to_string());
        outcome.status = PaymentStatus::Refunded;
        Ok(outcome)
    }
}

// ============================================================================
// Payment store double
// ============================================================================

/// In-memory payment store with injectable link failure
#[derive(Default)]
pub struct InMemoryPaymentStore {
    rows: Mutex<HashMap<PaymentId, Payment>>,
    fail_link: AtomicBool,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with an existing payment
    pub fn seed(&self, payment: Payment) {
        self.rows.lock().unwrap().insert(payment.id, payment);
    }

    /// Makes every subsequent link attempt fail
    pub fn fail_next_links(&self) {
        self.fail_link.store(true, Ordering::SeqCst);
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn get(&self, id: PaymentId) -> Option<Payment> {
        self.rows.lock().unwrap().get(&id).cloned()
    }
}

impl DomainPort for InMemoryPaymentStore {}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: &Payment) -> Result<(), PortError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(reference) = &payment.provider_transaction_id {
            let duplicate = rows.values().any(|p| {
                p.user_id == payment.user_id
                    && p.provider_transaction_id.as_deref() == Some(reference)
            });
            if duplicate {
                return Err(PortError::conflict("duplicate provider reference"));
            }
        }
        rows.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, PortError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_provider_reference(
        &self,
        user_id: UserId,
        reference: &str,
    ) -> Result<Option<Payment>, PortError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|p| {
                p.user_id == user_id && p.provider_transaction_id.as_deref() == Some(reference)
            })
            .cloned())
    }

    async fn update_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        completed_at: Option<DateTime<Utc>>,
        notes: Option<&str>,
    ) -> Result<(), PortError> {
        let mut rows = self.rows.lock().unwrap();
        let payment = rows
            .get_mut(&id)
            .ok_or_else(|| PortError::not_found("Payment", id))?;
        payment.status = status;
        if completed_at.is_some() {
            payment.completed_at = completed_at;
        }
        if let Some(notes) = notes {
            payment.notes = Some(notes.to_string());
        }
        Ok(())
    }

    async fn link_appointment(
        &self,
        id: PaymentId,
        appointment_id: AppointmentId,
    ) -> Result<(), PortError> {
        if self.fail_link.load(Ordering::SeqCst) {
            return Err(PortError::internal("scripted link failure"));
        }
        let mut rows = self.rows.lock().unwrap();
        let payment = rows
            .get_mut(&id)
            .ok_or_else(|| PortError::not_found("Payment", id))?;
        if payment.appointment_id.is_some() {
            return Err(PortError::conflict("payment already linked"));
        }
        payment.appointment_id = Some(appointment_id);
        Ok(())
    }
}

// ============================================================================
// User directory double
// ============================================================================

/// In-memory user directory with an injectable creation race
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: Mutex<HashMap<UserId, User>>,
    lose_creation_race: AtomicBool,
    create_calls: AtomicU32,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an existing user row
    pub fn seed(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    /// Simulates losing the synthesis race: the next create reports a
    /// conflict while the row appears as if the racing writer won
    pub fn lose_creation_race(&self) {
        self.lose_creation_race.store(true, Ordering::SeqCst);
    }

    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.users.lock().unwrap().contains_key(&id)
    }

    fn user_from(claims: &IdentityClaims) -> User {
        User {
            id: claims.user_id,
            email: claims.email.clone(),
            full_name: claims.full_name.clone(),
            phone: claims.phone.clone(),
            email_verified: claims.email_verified,
            created_at: Utc::now(),
        }
    }
}

impl DomainPort for InMemoryUserDirectory {}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, PortError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn create_user(&self, claims: &IdentityClaims) -> Result<User, PortError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut users = self.users.lock().unwrap();

        if self.lose_creation_race.swap(false, Ordering::SeqCst) {
            users.insert(claims.user_id, Self::user_from(claims));
            return Err(PortError::conflict("user row already exists"));
        }
        if users.contains_key(&claims.user_id) {
            return Err(PortError::conflict("user row already exists"));
        }

        let user = Self::user_from(claims);
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

// ============================================================================
// Appointment store double
// ============================================================================

/// In-memory appointment store with injectable delete failures
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    rows: Mutex<HashMap<AppointmentId, Appointment>>,
    failing_deletes: AtomicU32,
    delete_calls: AtomicU32,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, appointment: Appointment) {
        self.rows
            .lock()
            .unwrap()
            .insert(appointment.id, appointment);
    }

    /// Makes the next `n` delete calls fail
    pub fn fail_deletes(&self, n: u32) {
        self.failing_deletes.store(n, Ordering::SeqCst);
    }

    pub fn delete_calls(&self) -> u32 {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn get(&self, id: AppointmentId) -> Option<Appointment> {
        self.rows.lock().unwrap().get(&id).cloned()
    }
}

impl DomainPort for InMemoryAppointmentStore {}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, appointment: &Appointment) -> Result<(), PortError> {
        self.rows
            .lock()
            .unwrap()
            .insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: AppointmentId) -> Result<Option<Appointment>, PortError> {
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn find_active_in_window(
        &self,
        branch_id: BranchId,
        window: TimeWindow,
    ) -> Result<Vec<Appointment>, PortError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|a| {
                a.branch_id == branch_id
                    && a.status.occupies_slot()
                    && window.contains(a.scheduled_at)
            })
            .cloned()
            .collect())
    }

    async fn update(&self, appointment: &Appointment) -> Result<(), PortError> {
        let mut rows = self.rows.lock().unwrap();
        if !rows.contains_key(&appointment.id) {
            return Err(PortError::not_found("Appointment", appointment.id));
        }
        rows.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn delete(&self, id: AppointmentId) -> Result<bool, PortError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failing_deletes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_deletes.store(remaining - 1, Ordering::SeqCst);
            return Err(PortError::connection("scripted delete failure"));
        }
        Ok(self.rows.lock().unwrap().remove(&id).is_some())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Appointment>, PortError> {
        let mut list: Vec<Appointment> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by_key(|a| std::cmp::Reverse(a.created_at));
        Ok(list)
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, PortError> {
        let mut list: Vec<Appointment> = self.rows.lock().unwrap().values().cloned().collect();
        list.sort_by_key(|a| std::cmp::Reverse(a.created_at));
        Ok(list)
    }
}

// ============================================================================
// Gate, notifier, and reconciliation doubles
// ============================================================================

/// A gate that returns a fixed decision
pub struct ScriptedGate {
    decision: Mutex<GateDecision>,
    calls: AtomicU32,
}

impl ScriptedGate {
    pub fn allowing() -> Self {
        Self {
            decision: Mutex::new(GateDecision::allow()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn denying(reasons: Vec<String>) -> Self {
        Self {
            decision: Mutex::new(GateDecision::deny(reasons)),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DomainPort for ScriptedGate {}

#[async_trait]
impl BookingGate for ScriptedGate {
    async fn evaluate(&self, _user_id: UserId) -> Result<GateDecision, PortError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.decision.lock().unwrap().clone())
    }
}

/// A notifier that records events and optionally fails
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every dispatch fail
    pub fn go_dark(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn dispatch(&self, event: String) -> Result<(), PortError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::ServiceUnavailable {
                service: "notifications".to_string(),
            });
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

impl DomainPort for RecordingNotifier {}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn booking_created(&self, appointment: &Appointment) -> Result<(), PortError> {
        self.dispatch(format!("booking_created:{}", appointment.id))
    }

    async fn appointment_updated(
        &self,
        appointment: &Appointment,
        _note: Option<&str>,
    ) -> Result<(), PortError> {
        self.dispatch(format!(
            "appointment_updated:{}:{}",
            appointment.id, appointment.status
        ))
    }
}

/// A reconciliation queue that records events in memory
#[derive(Default)]
pub struct RecordingReconciliationQueue {
    events: Mutex<Vec<ReconciliationEvent>>,
}

impl RecordingReconciliationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ReconciliationEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl DomainPort for RecordingReconciliationQueue {}

#[async_trait]
impl ReconciliationQueue for RecordingReconciliationQueue {
    async fn record(&self, event: ReconciliationEvent) -> Result<(), PortError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

// ============================================================================
// Poller status source double
// ============================================================================

/// A status source that replays a script, then repeats its final answer
pub struct ScriptedStatusSource {
    script: Mutex<VecDeque<Result<PaymentStatus, PortError>>>,
    fallback: PaymentStatus,
    queries: AtomicU32,
}

impl ScriptedStatusSource {
    /// A source that always reports the given status
    pub fn always(status: PaymentStatus) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: status,
            queries: AtomicU32::new(0),
        }
    }

    /// A source that replays `script` and then repeats `fallback`
    pub fn sequence(
        script: impl IntoIterator<Item = Result<PaymentStatus, PortError>>,
        fallback: PaymentStatus,
    ) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            queries: AtomicU32::new(0),
        }
    }

    pub fn queries(&self) -> u32 {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentStatusSource for ScriptedStatusSource {
    async fn payment_status(&self, _id: PaymentId) -> Result<PaymentStatus, PortError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(self.fallback))
    }
}
