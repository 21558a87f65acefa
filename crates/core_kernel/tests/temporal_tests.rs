//! Integration tests for time windows

use chrono::{Duration, TimeZone, Utc};

use core_kernel::{TimeWindow, TemporalError};

#[test]
fn conflict_window_spans_one_hour_each_side() {
    let t = Utc.with_ymd_and_hms(2025, 6, 1, 10, 30, 0).unwrap();
    let window = TimeWindow::around(t, Duration::hours(1)).unwrap();

    assert!(window.contains(t - Duration::minutes(59)));
    assert!(window.contains(t + Duration::hours(1)));
    assert!(!window.contains(t + Duration::hours(2)));
}

#[test]
fn window_boundaries_are_inclusive_both_sides() {
    let t = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
    let window = TimeWindow::around(t, Duration::hours(1)).unwrap();

    assert!(window.contains(window.start()));
    assert!(window.contains(window.end()));
}

#[test]
fn degenerate_windows_are_rejected() {
    let t = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();

    assert_eq!(
        TimeWindow::around(t, Duration::minutes(-5)),
        Err(TemporalError::NonPositiveRadius)
    );
    assert!(TimeWindow::new(t, t).is_ok());
}
