//! Payment repository
//!
//! Row-level access to the payments table. The table carries a unique
//! index over (user_id, provider_transaction_id), which is what makes the
//! idempotency lookup race-safe: a concurrent retry that slips past the
//! lookup dies on the index, and the caller re-reads the winner.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Repository for payment rows
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

/// Database row for a payment
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub method: String,
    pub provider: String,
    pub status: String,
    pub provider_transaction_id: Option<String>,
    pub appointment_id: Option<Uuid>,
    pub payment_url: Option<String>,
    pub display_text: Option<String>,
    /// JSON-encoded key-value metadata
    pub metadata: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

const SELECT_COLUMNS: &str = r#"
    payment_id, user_id, amount, currency, method, provider, status,
    provider_transaction_id, appointment_id, payment_url, display_text,
    metadata, notes, created_at, completed_at
"#;

impl PaymentRepository {
    /// Creates a new repository over the given pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a payment row
    pub async fn insert(&self, row: &PaymentRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                payment_id, user_id, amount, currency, method, provider, status,
                provider_transaction_id, appointment_id, payment_url, display_text,
                metadata, notes, created_at, completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(row.payment_id)
        .bind(row.user_id)
        .bind(row.amount)
        .bind(&row.currency)
        .bind(&row.method)
        .bind(&row.provider)
        .bind(&row.status)
        .bind(&row.provider_transaction_id)
        .bind(row.appointment_id)
        .bind(&row.payment_url)
        .bind(&row.display_text)
        .bind(&row.metadata)
        .bind(&row.notes)
        .bind(row.created_at)
        .bind(row.completed_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(())
    }

    /// Loads a payment by id
    pub async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentRow>, DatabaseError> {
        sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE payment_id = $1",
            SELECT_COLUMNS
        ))
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Idempotency lookup over (user, provider transaction reference)
    pub async fn find_by_user_and_reference(
        &self,
        user_id: Uuid,
        reference: &str,
    ) -> Result<Option<PaymentRow>, DatabaseError> {
        sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM payments WHERE user_id = $1 AND provider_transaction_id = $2",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Applies a settlement state change
    pub async fn update_status(
        &self,
        payment_id: Uuid,
        status: &str,
        completed_at: Option<DateTime<Utc>>,
        notes: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $2,
                completed_at = COALESCE($3, completed_at),
                notes = COALESCE($4, notes)
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id)
        .bind(status)
        .bind(completed_at)
        .bind(notes)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("payment {}", payment_id)));
        }
        Ok(())
    }

    /// Sets the appointment link, only when no link exists yet
    ///
    /// The conditional `appointment_id IS NULL` makes the link a
    /// compare-and-set: exactly one of two racing bookings can claim a
    /// payment.
    pub async fn link_appointment(
        &self,
        payment_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET appointment_id = $2
            WHERE payment_id = $1 AND appointment_id IS NULL
            "#,
        )
        .bind(payment_id)
        .bind(appointment_id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if result.rows_affected() == 0 {
            // Distinguish a missing payment from one already claimed.
            return match self.find_by_id(payment_id).await? {
                Some(_) => Err(DatabaseError::ConstraintViolation(format!(
                    "payment {} is already linked to an appointment",
                    payment_id
                ))),
                None => Err(DatabaseError::NotFound(format!("payment {}", payment_id))),
            };
        }
        Ok(())
    }
}
