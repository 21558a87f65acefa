//! Row-level repositories
//!
//! One repository per table; conversions to and from domain types live in
//! the adapters, keeping these modules purely about SQL.

pub mod users;
pub mod payments;
pub mod appointments;
pub mod reconciliation;

pub use users::{NewUser, UserRepository, UserRow};
pub use payments::{PaymentRepository, PaymentRow};
pub use appointments::{AppointmentRepository, AppointmentRow};
pub use reconciliation::{NewReconciliationEvent, ReconciliationRepository};
