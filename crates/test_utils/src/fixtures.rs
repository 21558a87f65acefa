//! Common test fixtures
//!
//! Deterministic values shared across test suites so assertions read the
//! same everywhere.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal_macros::dec;

use core_kernel::{BranchId, Currency, Money, UserId};

/// Monetary fixtures
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// The deployment booking fee
    pub fn booking_fee() -> Money {
        Money::new(dec!(100.00), Currency::GHS)
    }

    /// An amount that fails the booking fee gate
    pub fn wrong_fee() -> Money {
        Money::new(dec!(80.00), Currency::GHS)
    }
}

/// Identifier fixtures
pub struct IdFixtures;

impl IdFixtures {
    pub fn user() -> UserId {
        UserId::new()
    }

    pub fn branch() -> BranchId {
        BranchId::new()
    }
}

/// Temporal fixtures
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// A fixed reference instant for window arithmetic
    pub fn reference_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap()
    }

    /// A slot comfortably in the future
    pub fn next_week() -> DateTime<Utc> {
        Utc::now() + Duration::days(7)
    }

    /// A slot inside the late-action window
    pub fn in_a_few_hours() -> DateTime<Utc> {
        Utc::now() + Duration::hours(4)
    }
}
