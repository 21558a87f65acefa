//! Comprehensive tests for domain_booking

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};

use core_kernel::{BranchId, PaymentId, UserId};
use domain_booking::{
    AppointmentStatus, BookingError, BookingOrchestrator, BookingPolicy, BookingRequest,
    CompensationConfig,
};
use domain_payments::{PaymentStatus, ProviderKind};
use test_utils::{
    AppointmentBuilder, InMemoryAppointmentStore, InMemoryPaymentStore, MoneyFixtures,
    PaymentBuilder, RecordingNotifier, RecordingReconciliationQueue, ScriptedGate,
};

/// Bundles an orchestrator with handles to its doubles
struct Harness {
    orchestrator: BookingOrchestrator,
    gate: Arc<ScriptedGate>,
    appointments: Arc<InMemoryAppointmentStore>,
    payments: Arc<InMemoryPaymentStore>,
    notifier: Arc<RecordingNotifier>,
    reconciliation: Arc<RecordingReconciliationQueue>,
}

fn harness_with_gate(gate: ScriptedGate) -> Harness {
    let gate = Arc::new(gate);
    let appointments = Arc::new(InMemoryAppointmentStore::new());
    let payments = Arc::new(InMemoryPaymentStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let reconciliation = Arc::new(RecordingReconciliationQueue::new());

    let orchestrator = BookingOrchestrator::new(
        gate.clone(),
        appointments.clone(),
        payments.clone(),
        notifier.clone(),
        reconciliation.clone(),
        BookingPolicy::default(),
    )
    .with_compensation(CompensationConfig {
        max_attempts: 3,
        base_delay: StdDuration::from_millis(1),
    });

    Harness {
        orchestrator,
        gate,
        appointments,
        payments,
        notifier,
        reconciliation,
    }
}

fn harness() -> Harness {
    harness_with_gate(ScriptedGate::allowing())
}

fn request_for(payment_id: PaymentId, branch: BranchId) -> BookingRequest {
    BookingRequest {
        branch_id: branch,
        scheduled_at: Utc::now() + Duration::days(7),
        treatment_type: "dental_cleaning".to_string(),
        notes: None,
        payment_id,
    }
}

/// Seeds a settled booking-fee payment for `user` and returns its id
fn seed_settled_payment(h: &Harness, user: UserId, reference: &str) -> PaymentId {
    let payment = PaymentBuilder::new()
        .with_user(user)
        .with_reference(reference)
        .build();
    let id = payment.id;
    h.payments.seed(payment);
    id
}

// ============================================================================
// Happy path
// ============================================================================

mod booking_tests {
    use super::*;

    #[tokio::test]
    async fn settled_payment_books_and_links() {
        let h = harness();
        let user = UserId::new();
        let branch = BranchId::new();
        let payment_id = seed_settled_payment(&h, user, "TX123");

        let appointment = h
            .orchestrator
            .book(user, request_for(payment_id, branch))
            .await
            .unwrap();

        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert_eq!(appointment.user_id, user);

        // Both halves of the commit landed.
        assert!(h.appointments.get(appointment.id).is_some());
        assert_eq!(
            h.payments.get(payment_id).unwrap().appointment_id,
            Some(appointment.id)
        );

        // The gate ran server-side and the patient was notified.
        assert_eq!(h.gate.calls(), 1);
        assert!(h
            .notifier
            .events()
            .iter()
            .any(|e| e.starts_with("booking_created")));
    }

    #[tokio::test]
    async fn notification_failure_never_rolls_back_a_booking() {
        let h = harness();
        h.notifier.go_dark();
        let user = UserId::new();
        let payment_id = seed_settled_payment(&h, user, "TX124");

        let appointment = h
            .orchestrator
            .book(user, request_for(payment_id, BranchId::new()))
            .await
            .unwrap();

        assert!(h.appointments.get(appointment.id).is_some());
        assert_eq!(
            h.payments.get(payment_id).unwrap().appointment_id,
            Some(appointment.id)
        );
    }
}

// ============================================================================
// Prerequisite gate
// ============================================================================

mod gate_tests {
    use super::*;

    #[tokio::test]
    async fn gate_denial_carries_every_reason() {
        let h = harness_with_gate(ScriptedGate::denying(vec![
            "intake form incomplete".to_string(),
            "phone number unverified".to_string(),
        ]));
        let user = UserId::new();
        let payment_id = seed_settled_payment(&h, user, "TX200");

        let err = h
            .orchestrator
            .book(user, request_for(payment_id, BranchId::new()))
            .await
            .unwrap_err();

        match err {
            BookingError::PrerequisitesNotMet { reasons } => {
                assert_eq!(reasons.len(), 2);
                assert!(reasons.contains(&"intake form incomplete".to_string()));
            }
            other => panic!("expected PrerequisitesNotMet, got {:?}", other),
        }
        assert_eq!(h.appointments.row_count(), 0);
        assert!(h.payments.get(payment_id).unwrap().appointment_id.is_none());
    }
}

// ============================================================================
// Payment validation
// ============================================================================

mod payment_validation_tests {
    use super::*;

    #[tokio::test]
    async fn wrong_amount_never_produces_an_appointment() {
        let h = harness();
        let user = UserId::new();
        let payment = PaymentBuilder::new()
            .with_user(user)
            .with_amount(MoneyFixtures::wrong_fee())
            .build();
        let payment_id = payment.id;
        h.payments.seed(payment);

        let err = h
            .orchestrator
            .book(user, request_for(payment_id, BranchId::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::FeeMismatch { .. }));
        assert_eq!(h.appointments.row_count(), 0);
    }

    #[tokio::test]
    async fn pending_payment_cannot_book() {
        let h = harness();
        let user = UserId::new();
        let payment = PaymentBuilder::new()
            .with_user(user)
            .with_status(PaymentStatus::Pending)
            .build();
        let payment_id = payment.id;
        h.payments.seed(payment);

        let err = h
            .orchestrator
            .book(user, request_for(payment_id, BranchId::new()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BookingError::PaymentNotSettled {
                status: PaymentStatus::Pending
            }
        ));
    }

    #[tokio::test]
    async fn refunded_payment_cannot_book() {
        let h = harness();
        let user = UserId::new();
        let payment = PaymentBuilder::new()
            .with_user(user)
            .with_status(PaymentStatus::Refunded)
            .build();
        let payment_id = payment.id;
        h.payments.seed(payment);

        let err = h
            .orchestrator
            .book(user, request_for(payment_id, BranchId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::PaymentNotSettled { .. }));
    }

    #[tokio::test]
    async fn someone_elses_payment_reads_as_not_found() {
        let h = harness();
        let owner = UserId::new();
        let caller = UserId::new();
        let payment_id = seed_settled_payment(&h, owner, "TX300");

        let err = h
            .orchestrator
            .book(caller, request_for(payment_id, BranchId::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::PaymentNotFound(id) if id == payment_id));
    }

    #[tokio::test]
    async fn linked_payment_cannot_fund_a_second_booking() {
        let h = harness();
        let user = UserId::new();
        let payment = PaymentBuilder::new()
            .with_user(user)
            .linked_to(core_kernel::AppointmentId::new())
            .build();
        let payment_id = payment.id;
        h.payments.seed(payment);

        let err = h
            .orchestrator
            .book(user, request_for(payment_id, BranchId::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::PaymentAlreadyUsed(id) if id == payment_id));
    }

    #[tokio::test]
    async fn missing_payment_reads_as_not_found() {
        let h = harness();
        let err = h
            .orchestrator
            .book(UserId::new(), request_for(PaymentId::new(), BranchId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::PaymentNotFound(_)));
    }
}

// ============================================================================
// Slot conflicts
// ============================================================================

mod conflict_tests {
    use super::*;

    #[tokio::test]
    async fn window_around_existing_booking_is_blocked() {
        let h = harness();
        let branch = BranchId::new();
        let t = Utc::now() + Duration::days(7);

        h.appointments.seed(
            AppointmentBuilder::new()
                .with_branch(branch)
                .at(t)
                .with_status(AppointmentStatus::Confirmed)
                .build(),
        );

        let user = UserId::new();
        for offset in [
            Duration::hours(-1),
            Duration::minutes(-30),
            Duration::zero(),
            Duration::minutes(45),
            Duration::hours(1),
        ] {
            let payment_id = seed_settled_payment(&h, user, &format!("TX4{}", offset.num_minutes()));
            let mut request = request_for(payment_id, branch);
            request.scheduled_at = t + offset;

            let err = h.orchestrator.book(user, request).await.unwrap_err();
            assert!(
                matches!(err, BookingError::SlotUnavailable),
                "offset {} should conflict",
                offset
            );
        }
    }

    #[tokio::test]
    async fn two_hours_away_is_free() {
        let h = harness();
        let branch = BranchId::new();
        let t = Utc::now() + Duration::days(7);

        h.appointments.seed(
            AppointmentBuilder::new()
                .with_branch(branch)
                .at(t)
                .with_status(AppointmentStatus::Confirmed)
                .build(),
        );

        let user = UserId::new();
        let payment_id = seed_settled_payment(&h, user, "TX500");
        let mut request = request_for(payment_id, branch);
        request.scheduled_at = t + Duration::hours(2);

        h.orchestrator.book(user, request).await.unwrap();
    }

    #[tokio::test]
    async fn other_branches_do_not_conflict() {
        let h = harness();
        let t = Utc::now() + Duration::days(7);

        h.appointments.seed(
            AppointmentBuilder::new()
                .at(t)
                .with_status(AppointmentStatus::Confirmed)
                .build(),
        );

        let user = UserId::new();
        let payment_id = seed_settled_payment(&h, user, "TX501");
        let mut request = request_for(payment_id, BranchId::new());
        request.scheduled_at = t;

        h.orchestrator.book(user, request).await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_appointments_release_their_slot() {
        let h = harness();
        let branch = BranchId::new();
        let t = Utc::now() + Duration::days(7);

        h.appointments.seed(
            AppointmentBuilder::new()
                .with_branch(branch)
                .at(t)
                .with_status(AppointmentStatus::Cancelled)
                .build(),
        );

        let user = UserId::new();
        let payment_id = seed_settled_payment(&h, user, "TX502");
        let mut request = request_for(payment_id, branch);
        request.scheduled_at = t;

        h.orchestrator.book(user, request).await.unwrap();
    }
}

// ============================================================================
// Compensation (the two-write commit)
// ============================================================================

mod compensation_tests {
    use super::*;

    #[tokio::test]
    async fn failed_link_rolls_back_the_appointment() {
        let h = harness();
        let user = UserId::new();
        let payment_id = seed_settled_payment(&h, user, "TX600");
        h.payments.fail_next_links();

        let err = h
            .orchestrator
            .book(user, request_for(payment_id, BranchId::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::Linkage { .. }));
        // No orphan: the compensating delete removed the appointment.
        assert_eq!(h.appointments.row_count(), 0);
        assert!(h.payments.get(payment_id).unwrap().appointment_id.is_none());
        assert!(h.notifier.events().is_empty(), "no notification for a rolled-back booking");
        assert!(h.reconciliation.events().is_empty());
    }

    #[tokio::test]
    async fn compensation_retries_until_the_delete_lands() {
        let h = harness();
        let user = UserId::new();
        let payment_id = seed_settled_payment(&h, user, "TX601");
        h.payments.fail_next_links();
        h.appointments.fail_deletes(2);

        let err = h
            .orchestrator
            .book(user, request_for(payment_id, BranchId::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::Linkage { .. }));
        assert_eq!(h.appointments.delete_calls(), 3, "two failures then success");
        assert_eq!(h.appointments.row_count(), 0);
        assert!(h.reconciliation.events().is_empty());
    }

    #[tokio::test]
    async fn exhausted_compensation_records_a_reconciliation_event() {
        let h = harness();
        let user = UserId::new();
        let payment_id = seed_settled_payment(&h, user, "TX602");
        h.payments.fail_next_links();
        h.appointments.fail_deletes(10);

        let err = h
            .orchestrator
            .book(user, request_for(payment_id, BranchId::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::Linkage { .. }));
        assert_eq!(h.appointments.delete_calls(), 3, "budget bounds the retries");

        let events = h.reconciliation.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payment_id, payment_id);
    }
}

// ============================================================================
// Lifecycle actions
// ============================================================================

mod lifecycle_tests {
    use super::*;

    async fn booked(h: &Harness, user: UserId) -> core_kernel::AppointmentId {
        let payment_id = seed_settled_payment(h, user, &format!("TX7-{}", user));
        h.orchestrator
            .book(user, request_for(payment_id, BranchId::new()))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn admin_transition_appends_note_and_notifies() {
        let h = harness();
        let user = UserId::new();
        let id = booked(&h, user).await;

        h.orchestrator
            .update_status(id, AppointmentStatus::Confirmed, Some("slot verified".to_string()))
            .await
            .unwrap();
        let updated = h
            .orchestrator
            .update_status(id, AppointmentStatus::Cancelled, Some("patient called in".to_string()))
            .await
            .unwrap();

        assert_eq!(updated.status, AppointmentStatus::Cancelled);
        let notes = updated.notes.as_deref().unwrap();
        assert!(notes.contains("slot verified"));
        assert!(notes.contains("patient called in"), "notes append, not replace");

        assert!(h
            .notifier
            .events()
            .iter()
            .any(|e| e.contains("cancelled")));
    }

    #[tokio::test]
    async fn reschedule_requires_future_time_and_resets_status() {
        let h = harness();
        let user = UserId::new();
        let id = booked(&h, user).await;
        h.orchestrator
            .update_status(id, AppointmentStatus::Confirmed, None)
            .await
            .unwrap();

        let err = h
            .orchestrator
            .reschedule(user, id, Utc::now() - Duration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::PastAppointment));

        let new_time = Utc::now() + Duration::days(10);
        let updated = h.orchestrator.reschedule(user, id, new_time).await.unwrap();

        assert_eq!(updated.scheduled_at, new_time);
        assert_eq!(
            updated.status,
            AppointmentStatus::Pending,
            "reschedule requires re-confirmation"
        );
    }

    #[tokio::test]
    async fn reschedule_respects_the_conflict_window() {
        let h = harness();
        let user = UserId::new();
        let id = booked(&h, user).await;

        let appointment = h.appointments.get(id).unwrap();
        let other_time = Utc::now() + Duration::days(14);
        h.appointments.seed(
            AppointmentBuilder::new()
                .with_branch(appointment.branch_id)
                .at(other_time)
                .with_status(AppointmentStatus::Confirmed)
                .build(),
        );

        let err = h
            .orchestrator
            .reschedule(user, id, other_time + Duration::minutes(30))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::SlotUnavailable));
    }

    #[tokio::test]
    async fn reschedule_does_not_conflict_with_itself() {
        let h = harness();
        let user = UserId::new();
        let id = booked(&h, user).await;
        let current = h.appointments.get(id).unwrap().scheduled_at;

        // Nudging within the appointment's own window must succeed.
        h.orchestrator
            .reschedule(user, id, current + Duration::minutes(15))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn only_the_owner_may_reschedule_or_cancel() {
        let h = harness();
        let owner = UserId::new();
        let stranger = UserId::new();
        let id = booked(&h, owner).await;

        let err = h
            .orchestrator
            .reschedule(stranger, id, Utc::now() + Duration::days(10))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotOwner));

        let err = h.orchestrator.cancel(stranger, id).await.unwrap_err();
        assert!(matches!(err, BookingError::NotOwner));
    }

    #[tokio::test]
    async fn late_cancellation_is_currently_permitted() {
        let h = harness();
        let user = UserId::new();
        let payment_id = seed_settled_payment(&h, user, "TX800");

        let mut request = request_for(payment_id, BranchId::new());
        request.scheduled_at = Utc::now() + Duration::hours(4);
        let appointment = h.orchestrator.book(user, request).await.unwrap();

        let cancelled = h.orchestrator.cancel(user, appointment.id).await.unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    }
}

// ============================================================================
// End-to-end scenario (push charge -> poll -> book -> duplicate retry)
// ============================================================================

mod scenario_tests {
    use super::*;
    use std::collections::HashMap;
    use domain_payments::{
        ChargeRequest, CustomerDetails, IdentityClaims, PaymentMethod, PaymentRouter,
        PaymentService, PollConfig, PollOutcome, SettlementPoller,
    };
    use test_utils::{CountingProvider, InMemoryUserDirectory};

    #[tokio::test]
    async fn push_charge_settles_then_books_then_dedupes() {
        // Payment side: a push charge through the card gateway.
        let provider = Arc::new(CountingProvider::pending(ProviderKind::CardGateway, "TX123"));
        let payments = Arc::new(InMemoryPaymentStore::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let router = PaymentRouter::new().with_provider(provider.clone());
        let service = Arc::new(PaymentService::new(
            Arc::new(router),
            payments.clone(),
            users.clone(),
        ));

        let user = UserId::new();
        let claims = IdentityClaims {
            user_id: user,
            email: "ama@example.com".to_string(),
            full_name: Some("Ama Mensah".to_string()),
            phone: Some("+233201234567".to_string()),
            email_verified: true,
        };
        let charge = ChargeRequest {
            user_id: user,
            amount: MoneyFixtures::booking_fee(),
            method: PaymentMethod::MtnMomo,
            customer: CustomerDetails {
                email: "ama@example.com".to_string(),
                name: Some("Ama Mensah".to_string()),
                phone: Some("+233201234567".to_string()),
            },
            bank: None,
            metadata: HashMap::new(),
        };

        let payment = service
            .record_payment(&claims, charge.clone(), Some(ProviderKind::CardGateway))
            .await
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);

        // Polls 1-5 find the charge pending; poll 6 sees it settled.
        provider.script_verifications([
            PaymentStatus::Pending,
            PaymentStatus::Pending,
            PaymentStatus::Pending,
            PaymentStatus::Pending,
            PaymentStatus::Pending,
            PaymentStatus::Completed,
        ]);
        let poller = SettlementPoller::new(
            service.clone(),
            PollConfig {
                interval: StdDuration::from_millis(1),
                max_attempts: 30,
            },
        );
        assert_eq!(
            poller.poll_until_settled(payment.id).await,
            PollOutcome::Completed { attempts: 6 }
        );

        // Booking side: the settled payment funds exactly one appointment.
        let appointments = Arc::new(InMemoryAppointmentStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let orchestrator = BookingOrchestrator::new(
            Arc::new(ScriptedGate::allowing()),
            appointments.clone(),
            payments.clone(),
            notifier.clone(),
            Arc::new(RecordingReconciliationQueue::new()),
            BookingPolicy::default(),
        );

        let appointment = orchestrator
            .book(user, request_for(payment.id, BranchId::new()))
            .await
            .unwrap();
        assert_eq!(
            payments.get(payment.id).unwrap().appointment_id,
            Some(appointment.id)
        );

        // A concurrent duplicate submission reusing TX123 returns the same
        // payment row instead of creating a second one.
        let duplicate = service
            .record_payment(&claims, charge, Some(ProviderKind::CardGateway))
            .await
            .unwrap();
        assert_eq!(duplicate.id, payment.id);
        assert_eq!(payments.row_count(), 1);
    }
}
