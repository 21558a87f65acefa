//! Port adapters
//!
//! Database-backed implementations of the domain ports, one module per
//! domain.

pub mod payments;
pub mod booking;

pub use payments::{PostgresPaymentStore, PostgresUserDirectory};
pub use booking::{PostgresAppointmentStore, PostgresReconciliationQueue};
