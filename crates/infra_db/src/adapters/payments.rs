//! PostgreSQL payment store adapter
//!
//! Implements the payments domain's `PaymentStore` and `UserDirectory`
//! ports over the row repositories, translating between database rows and
//! domain types and classifying constraint violations into the port
//! errors the domain layer acts on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::debug;

use core_kernel::{
    AppointmentId, Currency, DomainPort, Money, PaymentId, PortError, UserId,
};
use domain_payments::{
    IdentityClaims, Payment, PaymentMethod, PaymentStatus, PaymentStore, ProviderKind, User,
    UserDirectory,
};

use crate::error::DatabaseError;
use crate::repositories::{NewUser, PaymentRepository, PaymentRow, UserRepository, UserRow};

/// PostgreSQL-backed implementation of the `PaymentStore` port
#[derive(Debug, Clone)]
pub struct PostgresPaymentStore {
    repository: PaymentRepository,
}

impl PostgresPaymentStore {
    /// Creates a new adapter over the given pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: PaymentRepository::new(pool),
        }
    }
}

fn serialization(err: impl std::fmt::Display) -> DatabaseError {
    DatabaseError::SerializationError(err.to_string())
}

fn payment_from_row(row: PaymentRow) -> Result<Payment, DatabaseError> {
    let currency: Currency = row.currency.parse().map_err(serialization)?;
    let method: PaymentMethod = row.method.parse().map_err(serialization)?;
    let provider: ProviderKind = row.provider.parse().map_err(serialization)?;
    let status: PaymentStatus = row.status.parse().map_err(serialization)?;
    let metadata: HashMap<String, String> =
        serde_json::from_str(&row.metadata).map_err(serialization)?;

    Ok(Payment {
        id: PaymentId::from(row.payment_id),
        user_id: UserId::from(row.user_id),
        amount: Money::new(row.amount, currency),
        method,
        provider,
        status,
        provider_transaction_id: row.provider_transaction_id,
        appointment_id: row.appointment_id.map(AppointmentId::from),
        payment_url: row.payment_url,
        display_text: row.display_text,
        metadata,
        notes: row.notes,
        created_at: row.created_at,
        completed_at: row.completed_at,
    })
}

fn row_from_payment(payment: &Payment) -> Result<PaymentRow, DatabaseError> {
    let metadata = serde_json::to_string(&payment.metadata).map_err(serialization)?;

    Ok(PaymentRow {
        payment_id: (*payment.id.as_uuid()),
        user_id: (*payment.user_id.as_uuid()),
        amount: payment.amount.amount(),
        currency: payment.amount.currency().code().to_string(),
        method: payment.method.as_str().to_string(),
        provider: payment.provider.as_str().to_string(),
        status: payment.status.as_str().to_string(),
        provider_transaction_id: payment.provider_transaction_id.clone(),
        appointment_id: payment.appointment_id.map(|id| *id.as_uuid()),
        payment_url: payment.payment_url.clone(),
        display_text: payment.display_text.clone(),
        metadata,
        notes: payment.notes.clone(),
        created_at: payment.created_at,
        completed_at: payment.completed_at,
    })
}

impl DomainPort for PostgresPaymentStore {}

#[async_trait]
impl PaymentStore for PostgresPaymentStore {
    async fn insert(&self, payment: &Payment) -> Result<(), PortError> {
        let row = row_from_payment(payment)?;
        debug!(payment_id = %payment.id, "inserting payment row");

        self.repository.insert(&row).await.map_err(|e| {
            // The user projection is still missing; the caller surfaces
            // this as a retry-shortly error.
            if e.is_foreign_key_violation() {
                PortError::validation_field("user row does not exist", "user_id")
            } else {
                e.into()
            }
        })
    }

    async fn find_by_id(&self, id: PaymentId) -> Result<Option<Payment>, PortError> {
        let row = self.repository.find_by_id(*id.as_uuid()).await?;
        row.map(payment_from_row).transpose().map_err(Into::into)
    }

    async fn find_by_provider_reference(
        &self,
        user_id: UserId,
        reference: &str,
    ) -> Result<Option<Payment>, PortError> {
        let row = self
            .repository
            .find_by_user_and_reference(*user_id.as_uuid(), reference)
            .await?;
        row.map(payment_from_row).transpose().map_err(Into::into)
    }

    async fn update_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        completed_at: Option<DateTime<Utc>>,
        notes: Option<&str>,
    ) -> Result<(), PortError> {
        self.repository
            .update_status(*id.as_uuid(), status.as_str(), completed_at, notes)
            .await
            .map_err(Into::into)
    }

    async fn link_appointment(
        &self,
        id: PaymentId,
        appointment_id: AppointmentId,
    ) -> Result<(), PortError> {
        self.repository
            .link_appointment(*id.as_uuid(), *appointment_id.as_uuid())
            .await
            .map_err(Into::into)
    }
}

/// PostgreSQL-backed implementation of the `UserDirectory` port
#[derive(Debug, Clone)]
pub struct PostgresUserDirectory {
    repository: UserRepository,
}

impl PostgresUserDirectory {
    /// Creates a new adapter over the given pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: UserRepository::new(pool),
        }
    }
}

fn user_from_row(row: UserRow) -> User {
    User {
        id: UserId::from(row.user_id),
        email: row.email,
        full_name: row.full_name,
        phone: row.phone,
        email_verified: row.email_verified,
        created_at: row.created_at,
    }
}

impl DomainPort for PostgresUserDirectory {}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, PortError> {
        let row = self.repository.find(*id.as_uuid()).await?;
        Ok(row.map(user_from_row))
    }

    async fn create_user(&self, claims: &IdentityClaims) -> Result<User, PortError> {
        let new_user = NewUser {
            user_id: *claims.user_id.as_uuid(),
            email: claims.email.clone(),
            full_name: claims.full_name.clone(),
            phone: claims.phone.clone(),
            email_verified: claims.email_verified,
        };

        // A duplicate here converts to PortError::Conflict; the payment
        // service treats that lost race as success and re-reads.
        let row = self.repository.insert(new_user).await?;
        Ok(user_from_row(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_payment() -> Payment {
        let mut payment = Payment::new(
            UserId::new(),
            Money::new(dec!(100.00), Currency::GHS),
            PaymentMethod::MtnMomo,
            ProviderKind::LocalRails,
        );
        payment.provider_transaction_id = Some("TX123".to_string());
        payment
            .metadata
            .insert("email".to_string(), "ama@example.com".to_string());
        payment
    }

    #[test]
    fn test_payment_row_roundtrip() {
        let payment = sample_payment();
        let row = row_from_payment(&payment).unwrap();
        let back = payment_from_row(row).unwrap();

        assert_eq!(back.id, payment.id);
        assert_eq!(back.amount, payment.amount);
        assert_eq!(back.method, payment.method);
        assert_eq!(back.provider, payment.provider);
        assert_eq!(back.status, payment.status);
        assert_eq!(back.metadata, payment.metadata);
    }

    #[test]
    fn test_unknown_status_in_row_is_a_serialization_error() {
        let payment = sample_payment();
        let mut row = row_from_payment(&payment).unwrap();
        row.status = "archived".to_string();

        assert!(matches!(
            payment_from_row(row),
            Err(DatabaseError::SerializationError(_))
        ));
    }
}
