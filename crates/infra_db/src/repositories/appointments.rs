//! Appointment repository
//!
//! Row-level access to the appointments table, including the windowed
//! conflict query the orchestrator runs before every insert.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Repository for appointment rows
#[derive(Debug, Clone)]
pub struct AppointmentRepository {
    pool: PgPool,
}

/// Database row for an appointment
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppointmentRow {
    pub appointment_id: Uuid,
    pub branch_id: Uuid,
    pub user_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub treatment_type: String,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SELECT_COLUMNS: &str = r#"
    appointment_id, branch_id, user_id, scheduled_at, treatment_type,
    notes, status, created_at, updated_at
"#;

impl AppointmentRepository {
    /// Creates a new repository over the given pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts an appointment row
    pub async fn insert(&self, row: &AppointmentRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO appointments (
                appointment_id, branch_id, user_id, scheduled_at, treatment_type,
                notes, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(row.appointment_id)
        .bind(row.branch_id)
        .bind(row.user_id)
        .bind(row.scheduled_at)
        .bind(&row.treatment_type)
        .bind(&row.notes)
        .bind(&row.status)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(())
    }

    /// Loads an appointment by id
    pub async fn find_by_id(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<AppointmentRow>, DatabaseError> {
        sqlx::query_as::<_, AppointmentRow>(&format!(
            "SELECT {} FROM appointments WHERE appointment_id = $1",
            SELECT_COLUMNS
        ))
        .bind(appointment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Returns slot-occupying appointments at a branch inside a window
    ///
    /// The window bounds are inclusive on both sides, matching the
    /// ±radius conflict policy.
    pub async fn find_active_between(
        &self,
        branch_id: Uuid,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<AppointmentRow>, DatabaseError> {
        sqlx::query_as::<_, AppointmentRow>(&format!(
            r#"
            SELECT {}
            FROM appointments
            WHERE branch_id = $1
              AND scheduled_at BETWEEN $2 AND $3
              AND status IN ('pending', 'confirmed')
            ORDER BY scheduled_at
            "#,
            SELECT_COLUMNS
        ))
        .bind(branch_id)
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Persists changed fields of an existing appointment
    pub async fn update(&self, row: &AppointmentRow) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE appointments
            SET scheduled_at = $2, treatment_type = $3, notes = $4,
                status = $5, updated_at = $6
            WHERE appointment_id = $1
            "#,
        )
        .bind(row.appointment_id)
        .bind(row.scheduled_at)
        .bind(&row.treatment_type)
        .bind(&row.notes)
        .bind(&row.status)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "appointment {}",
                row.appointment_id
            )));
        }
        Ok(())
    }

    /// Deletes an appointment row; returns whether a row was removed
    pub async fn delete(&self, appointment_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM appointments WHERE appointment_id = $1")
            .bind(appointment_id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists a user's appointments, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<AppointmentRow>, DatabaseError> {
        sqlx::query_as::<_, AppointmentRow>(&format!(
            "SELECT {} FROM appointments WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Lists every appointment, newest first
    pub async fn list_all(&self) -> Result<Vec<AppointmentRow>, DatabaseError> {
        sqlx::query_as::<_, AppointmentRow>(&format!(
            "SELECT {} FROM appointments ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
