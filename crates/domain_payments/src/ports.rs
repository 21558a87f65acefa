//! Payments domain ports
//!
//! Store and directory traits implemented by `infra_db` (PostgreSQL) and
//! by the in-memory doubles in `test_utils`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AppointmentId, DomainPort, PaymentId, PortError, UserId};

use crate::payment::{Payment, PaymentStatus};

/// A first-class user row in the local projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Identity attributes available from the authenticated principal
///
/// When the identity provider has created the principal but replication
/// has not materialized the user row yet, these claims are enough to
/// synthesize it.
#[derive(Debug, Clone)]
pub struct IdentityClaims {
    pub user_id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email_verified: bool,
}

/// Directory of user projections
#[async_trait]
pub trait UserDirectory: DomainPort {
    /// Looks up a user row by id
    async fn find_user(&self, id: UserId) -> Result<Option<User>, PortError>;

    /// Creates a user row from identity claims
    ///
    /// A lost creation race surfaces as `PortError::Conflict`; callers
    /// treat that as success and re-read.
    async fn create_user(&self, claims: &IdentityClaims) -> Result<User, PortError>;
}

/// Durable store of payment records
#[async_trait]
pub trait PaymentStore: DomainPort {
    /// Inserts a new payment row
    ///
    /// A missing user row surfaces as `PortError::Validation` with field
    /// `user_id`; a duplicate (user, provider reference) pair surfaces as
    /// `PortError::Conflict`.
    async fn insert(&self, payment: &Payment) -> Result<(), PortError>;

    /// Loads a payment by id
    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, PortError>;

    /// Idempotency lookup: the payment previously recorded for this
    /// user and provider transaction reference, if any
    async fn find_by_provider_reference(
        &self,
        user_id: UserId,
        reference: &str,
    ) -> Result<Option<Payment>, PortError>;

    /// Applies a settlement state change
    async fn update_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        completed_at: Option<DateTime<Utc>>,
        notes: Option<&str>,
    ) -> Result<(), PortError>;

    /// Sets the appointment link, only if no link exists yet
    ///
    /// Returns `PortError::Conflict` when the payment is already linked;
    /// this conditional write is what keeps a payment funding at most one
    /// appointment under concurrent bookings.
    async fn link_appointment(
        &self,
        id: PaymentId,
        appointment_id: AppointmentId,
    ) -> Result<(), PortError>;
}
