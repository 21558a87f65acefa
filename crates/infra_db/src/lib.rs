//! Database Infrastructure Layer
//!
//! PostgreSQL persistence for the clinic booking system using SQLx:
//!
//! - **Pool management**: connection pool configuration and creation
//! - **Repositories**: row-level access, one per table
//! - **Adapters**: implementations of the domain store ports with
//!   database-to-domain type translation and constraint-violation
//!   classification
//!
//! The schema is managed externally; see the repository modules for the
//! columns each table is expected to carry. Two constraints matter to
//! correctness: the unique index over
//! `payments (user_id, provider_transaction_id)` backing idempotency, and
//! the foreign key from `payments.user_id` to `users` backing the
//! account-provisioning error path.

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use adapters::{
    PostgresAppointmentStore, PostgresPaymentStore, PostgresReconciliationQueue,
    PostgresUserDirectory,
};
