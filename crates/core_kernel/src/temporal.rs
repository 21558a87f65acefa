//! Time window types for scheduling
//!
//! This module provides the `TimeWindow` type used by the booking conflict
//! check: a closed interval around a proposed appointment time. A window is
//! deliberately coarse - it exists to keep clinically-infeasible
//! back-to-back bookings out, not to detect identical instants.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid window: start {start} must not be after end {end}")]
    InvalidWindow { start: String, end: String },

    #[error("Window radius must be positive")]
    NonPositiveRadius,
}

/// A closed time interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a window from explicit bounds
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Creates a symmetric window of `radius` on each side of `center`
    ///
    /// This is the conflict-window constructor: `around(t, 1h)` yields
    /// `[t - 1h, t + 1h]`.
    pub fn around(center: DateTime<Utc>, radius: Duration) -> Result<Self, TemporalError> {
        if radius <= Duration::zero() {
            return Err(TemporalError::NonPositiveRadius);
        }
        Ok(Self {
            start: center - radius,
            end: center + radius,
        })
    }

    /// Returns the inclusive start of the window
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Returns the inclusive end of the window
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns true if the timestamp lies within the window (inclusive)
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }

    /// Returns true if the two windows share any instant
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Returns the width of the window
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_around_is_symmetric() {
        let w = TimeWindow::around(ts(12), Duration::hours(1)).unwrap();
        assert_eq!(w.start(), ts(11));
        assert_eq!(w.end(), ts(13));
        assert_eq!(w.duration(), Duration::hours(2));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let w = TimeWindow::around(ts(12), Duration::hours(1)).unwrap();
        assert!(w.contains(ts(11)));
        assert!(w.contains(ts(12)));
        assert!(w.contains(ts(13)));
        assert!(!w.contains(ts(14)));
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        assert!(matches!(
            TimeWindow::new(ts(13), ts(12)),
            Err(TemporalError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_non_positive_radius_rejected() {
        assert_eq!(
            TimeWindow::around(ts(12), Duration::zero()),
            Err(TemporalError::NonPositiveRadius)
        );
    }

    #[test]
    fn test_overlap() {
        let a = TimeWindow::new(ts(10), ts(12)).unwrap();
        let b = TimeWindow::new(ts(12), ts(14)).unwrap();
        let c = TimeWindow::new(ts(13), ts(15)).unwrap();

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&c));
        assert!(!a.overlaps(&c));
    }
}
