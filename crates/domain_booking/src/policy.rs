//! Booking policy
//!
//! Deployment-tunable business rules for the booking flow. These were
//! once constants buried in request handlers; they now travel as an
//! explicitly-passed configuration struct so each deployment can tune
//! them without touching orchestration code.

use chrono::{DateTime, Duration, Utc};
use rust_decimal_macros::dec;

use core_kernel::{CoreError, Currency, Money, TimeWindow};

/// Business rules applied by the booking orchestrator
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    /// The fixed booking fee a payment must match exactly
    pub booking_fee: Money,
    /// Radius of the slot conflict window on each side of the requested
    /// time
    pub conflict_radius: Duration,
    /// How close to the appointment an owner action counts as late;
    /// late cancellations are currently permitted but logged
    pub late_window: Duration,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            booking_fee: Money::new(dec!(100.00), Currency::GHS),
            conflict_radius: Duration::hours(1),
            late_window: Duration::hours(24),
        }
    }
}

impl BookingPolicy {
    /// Validates the policy values
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.booking_fee.is_positive() {
            return Err(CoreError::configuration(
                "booking fee must be a positive amount",
            ));
        }
        if self.conflict_radius <= Duration::zero() {
            return Err(CoreError::configuration(
                "conflict window radius must be positive",
            ));
        }
        Ok(())
    }

    /// Builds the conflict window around a requested appointment time
    pub fn conflict_window(&self, at: DateTime<Utc>) -> Result<TimeWindow, CoreError> {
        Ok(TimeWindow::around(at, self.conflict_radius)?)
    }

    /// Returns true when `at` is inside the late-action window relative
    /// to `now`
    pub fn is_late_action(&self, now: DateTime<Utc>, at: DateTime<Utc>) -> bool {
        at > now && at - now < self.late_window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_policy_is_valid() {
        BookingPolicy::default().validate().unwrap();
    }

    #[test]
    fn test_invalid_fee_rejected() {
        let policy = BookingPolicy {
            booking_fee: Money::zero(Currency::GHS),
            ..Default::default()
        };
        assert!(matches!(
            policy.validate(),
            Err(CoreError::Configuration(_))
        ));
    }

    #[test]
    fn test_conflict_window_uses_radius() {
        let policy = BookingPolicy::default();
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let window = policy.conflict_window(t).unwrap();

        assert_eq!(window.start(), t - Duration::hours(1));
        assert_eq!(window.end(), t + Duration::hours(1));
    }

    #[test]
    fn test_late_action_detection() {
        let policy = BookingPolicy::default();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        assert!(policy.is_late_action(now, now + Duration::hours(5)));
        assert!(!policy.is_late_action(now, now + Duration::hours(30)));
        assert!(!policy.is_late_action(now, now - Duration::hours(1)));
    }
}
