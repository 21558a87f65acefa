//! Booking Domain - Appointment lifecycle and payment-funded booking
//!
//! This crate implements the booking half of the flow: validating a
//! settled payment against the booking policy, enforcing the branch slot
//! conflict window, and committing the two-row booking (appointment
//! insert + payment link) with a compensating rollback when the second
//! write fails.
//!
//! # Booking commit
//!
//! The appointment and payment rows live in the same database but are
//! written without a shared transaction, mirroring the deployment where
//! the writes go through independent data-access paths. The orchestrator
//! therefore owns an explicit compensating delete: an appointment whose
//! payment link cannot be written is removed again, so no appointment
//! exists without an attached payment.

pub mod appointment;
pub mod policy;
pub mod ports;
pub mod orchestrator;
pub mod adapters;
pub mod error;

pub use appointment::{Appointment, AppointmentStatus};
pub use policy::BookingPolicy;
pub use ports::{
    AppointmentStore, BookingGate, GateDecision, Notifier, ReconciliationEvent,
    ReconciliationQueue,
};
pub use orchestrator::{BookingOrchestrator, BookingRequest, CompensationConfig};
pub use adapters::{CollaboratorConfig, DispatchNotifier, PrerequisiteApiGate};
pub use error::BookingError;
