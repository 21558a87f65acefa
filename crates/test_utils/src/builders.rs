//! Test Data Builders
//!
//! Builder patterns for constructing test data with sensible defaults.
//! Tests specify only the fields they assert on.

use chrono::{DateTime, Utc};

use core_kernel::{AppointmentId, BranchId, Money, UserId};
use domain_booking::{Appointment, AppointmentStatus};
use domain_payments::{Payment, PaymentMethod, PaymentStatus, ProviderKind};

use crate::fixtures::{IdFixtures, MoneyFixtures, TemporalFixtures};

/// Builder for payment records
///
/// Defaults to a settled, correctly-priced, unlinked mobile-money payment
/// - the kind a successful booking consumes.
pub struct PaymentBuilder {
    user_id: UserId,
    amount: Money,
    method: PaymentMethod,
    provider: ProviderKind,
    status: PaymentStatus,
    reference: Option<String>,
    appointment_id: Option<AppointmentId>,
}

impl Default for PaymentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentBuilder {
    pub fn new() -> Self {
        Self {
            user_id: IdFixtures::user(),
            amount: MoneyFixtures::booking_fee(),
            method: PaymentMethod::MtnMomo,
            provider: ProviderKind::LocalRails,
            status: PaymentStatus::Completed,
            reference: Some("TX123".to_string()),
            appointment_id: None,
        }
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn linked_to(mut self, appointment_id: AppointmentId) -> Self {
        self.appointment_id = Some(appointment_id);
        self
    }

    pub fn build(self) -> Payment {
        let mut payment = Payment::new(self.user_id, self.amount, self.method, self.provider);
        payment.provider_transaction_id = self.reference;
        payment.status = self.status;
        if self.status == PaymentStatus::Completed {
            payment.completed_at = Some(Utc::now());
        }
        payment.appointment_id = self.appointment_id;
        payment
    }
}

/// Builder for appointments
pub struct AppointmentBuilder {
    branch_id: BranchId,
    user_id: UserId,
    scheduled_at: DateTime<Utc>,
    treatment_type: String,
    status: AppointmentStatus,
}

impl Default for AppointmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentBuilder {
    pub fn new() -> Self {
        Self {
            branch_id: IdFixtures::branch(),
            user_id: IdFixtures::user(),
            scheduled_at: TemporalFixtures::next_week(),
            treatment_type: "dental_cleaning".to_string(),
            status: AppointmentStatus::Confirmed,
        }
    }

    pub fn with_branch(mut self, branch_id: BranchId) -> Self {
        self.branch_id = branch_id;
        self
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn at(mut self, scheduled_at: DateTime<Utc>) -> Self {
        self.scheduled_at = scheduled_at;
        self
    }

    pub fn with_status(mut self, status: AppointmentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> Appointment {
        let mut appointment = Appointment::new(
            self.branch_id,
            self.user_id,
            self.scheduled_at,
            self.treatment_type,
            None,
        );
        appointment.status = self.status;
        appointment
    }
}
