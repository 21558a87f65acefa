//! Reconciliation event repository
//!
//! Durable records of compensation failures. Rows here mean an orphaned
//! appointment exists and an operator has to resolve it by hand, so the
//! insert path is kept as simple as possible.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use core_kernel::ReconciliationId;

use crate::error::DatabaseError;

/// Repository for reconciliation events
#[derive(Debug, Clone)]
pub struct ReconciliationRepository {
    pool: PgPool,
}

/// Data for recording a reconciliation event
#[derive(Debug, Clone)]
pub struct NewReconciliationEvent {
    pub appointment_id: Uuid,
    pub payment_id: Uuid,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

impl ReconciliationRepository {
    /// Creates a new repository over the given pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records a reconciliation event
    pub async fn insert(
        &self,
        event: NewReconciliationEvent,
    ) -> Result<ReconciliationId, DatabaseError> {
        let event_id = ReconciliationId::new();

        sqlx::query(
            r#"
            INSERT INTO reconciliation_events (
                event_id, appointment_id, payment_id, reason, occurred_at, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*event_id.as_uuid())
        .bind(event.appointment_id)
        .bind(event.payment_id)
        .bind(&event.reason)
        .bind(event.occurred_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(event_id)
    }
}
