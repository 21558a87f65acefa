//! PostgreSQL booking adapters
//!
//! Implements the booking domain's `AppointmentStore` and
//! `ReconciliationQueue` ports over the row repositories.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use core_kernel::{
    AppointmentId, BranchId, DomainPort, PortError, TimeWindow, UserId,
};
use domain_booking::{
    Appointment, AppointmentStatus, AppointmentStore, ReconciliationEvent, ReconciliationQueue,
};

use crate::error::DatabaseError;
use crate::repositories::{
    AppointmentRepository, AppointmentRow, NewReconciliationEvent, ReconciliationRepository,
};

/// PostgreSQL-backed implementation of the `AppointmentStore` port
#[derive(Debug, Clone)]
pub struct PostgresAppointmentStore {
    repository: AppointmentRepository,
}

impl PostgresAppointmentStore {
    /// Creates a new adapter over the given pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: AppointmentRepository::new(pool),
        }
    }
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    let status: AppointmentStatus = row
        .status
        .parse()
        .map_err(|e| DatabaseError::SerializationError(format!("{}", e)))?;

    Ok(Appointment {
        id: AppointmentId::from(row.appointment_id),
        branch_id: BranchId::from(row.branch_id),
        user_id: UserId::from(row.user_id),
        scheduled_at: row.scheduled_at,
        treatment_type: row.treatment_type,
        notes: row.notes,
        status,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn row_from_appointment(appointment: &Appointment) -> AppointmentRow {
    AppointmentRow {
        appointment_id: *appointment.id.as_uuid(),
        branch_id: *appointment.branch_id.as_uuid(),
        user_id: *appointment.user_id.as_uuid(),
        scheduled_at: appointment.scheduled_at,
        treatment_type: appointment.treatment_type.clone(),
        notes: appointment.notes.clone(),
        status: appointment.status.as_str().to_string(),
        created_at: appointment.created_at,
        updated_at: appointment.updated_at,
    }
}

impl DomainPort for PostgresAppointmentStore {}

#[async_trait]
impl AppointmentStore for PostgresAppointmentStore {
    async fn insert(&self, appointment: &Appointment) -> Result<(), PortError> {
        debug!(appointment_id = %appointment.id, "inserting appointment row");
        self.repository
            .insert(&row_from_appointment(appointment))
            .await
            .map_err(Into::into)
    }

    async fn find_by_id(&self, id: AppointmentId) -> Result<Option<Appointment>, PortError> {
        let row = self.repository.find_by_id(*id.as_uuid()).await?;
        row.map(appointment_from_row)
            .transpose()
            .map_err(Into::into)
    }

    async fn find_active_in_window(
        &self,
        branch_id: BranchId,
        window: TimeWindow,
    ) -> Result<Vec<Appointment>, PortError> {
        let rows = self
            .repository
            .find_active_between(*branch_id.as_uuid(), window.start(), window.end())
            .await?;
        rows.into_iter()
            .map(appointment_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    async fn update(&self, appointment: &Appointment) -> Result<(), PortError> {
        self.repository
            .update(&row_from_appointment(appointment))
            .await
            .map_err(Into::into)
    }

    async fn delete(&self, id: AppointmentId) -> Result<bool, PortError> {
        self.repository
            .delete(*id.as_uuid())
            .await
            .map_err(Into::into)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Appointment>, PortError> {
        let rows = self.repository.list_for_user(*user_id.as_uuid()).await?;
        rows.into_iter()
            .map(appointment_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, PortError> {
        let rows = self.repository.list_all().await?;
        rows.into_iter()
            .map(appointment_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}

/// PostgreSQL-backed implementation of the `ReconciliationQueue` port
#[derive(Debug, Clone)]
pub struct PostgresReconciliationQueue {
    repository: ReconciliationRepository,
}

impl PostgresReconciliationQueue {
    /// Creates a new adapter over the given pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ReconciliationRepository::new(pool),
        }
    }
}

impl DomainPort for PostgresReconciliationQueue {}

#[async_trait]
impl ReconciliationQueue for PostgresReconciliationQueue {
    async fn record(&self, event: ReconciliationEvent) -> Result<(), PortError> {
        self.repository
            .insert(NewReconciliationEvent {
                appointment_id: *event.appointment_id.as_uuid(),
                payment_id: *event.payment_id.as_uuid(),
                reason: event.reason,
                occurred_at: event.occurred_at,
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_appointment_row_roundtrip() {
        let appointment = Appointment::new(
            BranchId::new(),
            UserId::new(),
            Utc::now() + Duration::days(2),
            "orthodontic_review",
            Some("first visit".to_string()),
        );

        let row = row_from_appointment(&appointment);
        let back = appointment_from_row(row).unwrap();

        assert_eq!(back.id, appointment.id);
        assert_eq!(back.branch_id, appointment.branch_id);
        assert_eq!(back.status, appointment.status);
        assert_eq!(back.treatment_type, appointment.treatment_type);
        assert_eq!(back.notes, appointment.notes);
    }

    #[test]
    fn test_unknown_status_is_a_serialization_error() {
        let appointment = Appointment::new(
            BranchId::new(),
            UserId::new(),
            Utc::now() + Duration::days(2),
            "checkup",
            None,
        );
        let mut row = row_from_appointment(&appointment);
        row.status = "no_show".to_string();

        assert!(matches!(
            appointment_from_row(row),
            Err(DatabaseError::SerializationError(_))
        ));
    }
}
