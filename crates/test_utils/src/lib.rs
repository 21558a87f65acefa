//! Test Utilities
//!
//! Shared fixtures, builders, and in-memory port doubles used by the
//! domain and API test suites. The doubles record their interactions so
//! tests can assert on call counts and captured events, not just return
//! values.

pub mod fixtures;
pub mod builders;
pub mod mocks;

pub use fixtures::{IdFixtures, MoneyFixtures, TemporalFixtures};
pub use builders::{AppointmentBuilder, PaymentBuilder};
pub use mocks::{
    CountingProvider, InMemoryAppointmentStore, InMemoryPaymentStore, InMemoryUserDirectory,
    RecordingNotifier, RecordingReconciliationQueue, ScriptedGate, ScriptedStatusSource,
};
