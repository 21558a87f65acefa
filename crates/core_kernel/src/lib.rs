//! Core Kernel - Foundational types and utilities for the clinic booking system
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Time windows for scheduling conflict checks
//! - Common identifiers and value objects
//! - Port abstractions for the ports-and-adapters pattern

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use temporal::{TimeWindow, TemporalError};
pub use identifiers::{PaymentId, AppointmentId, UserId, BranchId, ReconciliationId};
pub use error::CoreError;
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
