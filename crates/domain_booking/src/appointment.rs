//! Appointment records
//!
//! This module defines the Appointment entity and its lifecycle. An
//! appointment is only ever created by the booking orchestrator once a
//! settled, correctly-priced payment exists; afterwards it moves between
//! statuses through administrative updates and owner-initiated
//! reschedule/cancel actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{AppointmentId, BranchId, CoreError, UserId};

/// Appointment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Created, awaiting clinic confirmation
    Pending,
    /// Confirmed by the clinic
    Confirmed,
    /// The visit happened
    Completed,
    /// Cancelled by either side
    Cancelled,
}

impl AppointmentStatus {
    /// Returns true if appointments in this status occupy their slot for
    /// the purposes of the conflict check
    pub fn occupies_slot(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(CoreError::validation(format!(
                "unknown appointment status: {}",
                other
            ))),
        }
    }
}

/// A booked appointment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    /// Unique identifier
    pub id: AppointmentId,
    /// Branch where the visit takes place
    pub branch_id: BranchId,
    /// Patient who owns the booking
    pub user_id: UserId,
    /// Scheduled visit time
    pub scheduled_at: DateTime<Utc>,
    /// Requested treatment
    pub treatment_type: String,
    /// Free-text notes; admin notes are appended, never replaced
    pub notes: Option<String>,
    /// Status
    pub status: AppointmentStatus,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Creates a new pending appointment
    pub fn new(
        branch_id: BranchId,
        user_id: UserId,
        scheduled_at: DateTime<Utc>,
        treatment_type: impl Into<String>,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AppointmentId::new_v7(),
            branch_id,
            user_id,
            scheduled_at,
            treatment_type: treatment_type.into(),
            notes,
            status: AppointmentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies an administrative status transition
    ///
    /// Administrators move appointments freely among the four statuses.
    pub fn set_status(&mut self, status: AppointmentStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Appends a note to the existing notes
    pub fn append_note(&mut self, note: &str) {
        self.notes = Some(match self.notes.take() {
            Some(existing) => format!("{}\n{}", existing, note),
            None => note.to_string(),
        });
        self.updated_at = Utc::now();
    }

    /// Moves the appointment to a new time
    ///
    /// Rescheduling resets the status to pending; the clinic confirms the
    /// new slot again.
    pub fn reschedule(&mut self, new_time: DateTime<Utc>) {
        self.scheduled_at = new_time;
        self.status = AppointmentStatus::Pending;
        self.updated_at = Utc::now();
    }

    /// Cancels the appointment
    pub fn cancel(&mut self) {
        self.set_status(AppointmentStatus::Cancelled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn appointment() -> Appointment {
        Appointment::new(
            BranchId::new(),
            UserId::new(),
            Utc::now() + Duration::days(3),
            "dental_cleaning",
            None,
        )
    }

    #[test]
    fn test_new_appointment_is_pending() {
        let a = appointment();
        assert_eq!(a.status, AppointmentStatus::Pending);
        assert!(a.status.occupies_slot());
    }

    #[test]
    fn test_cancelled_does_not_occupy_slot() {
        let mut a = appointment();
        a.cancel();
        assert!(!a.status.occupies_slot());
    }

    #[test]
    fn test_notes_are_appended_not_replaced() {
        let mut a = appointment();
        a.append_note("patient requested morning slot");
        a.append_note("confirmed by front desk");

        let notes = a.notes.as_deref().unwrap();
        assert!(notes.contains("patient requested morning slot"));
        assert!(notes.contains("confirmed by front desk"));
    }

    #[test]
    fn test_reschedule_resets_to_pending() {
        let mut a = appointment();
        a.set_status(AppointmentStatus::Confirmed);

        let new_time = Utc::now() + Duration::days(5);
        a.reschedule(new_time);

        assert_eq!(a.scheduled_at, new_time);
        assert_eq!(a.status, AppointmentStatus::Pending);
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<AppointmentStatus>().unwrap(), status);
        }
    }
}
