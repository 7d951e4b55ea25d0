//! Custom assertions for testing
//!
//! Provides assertion macros and functions for common testing scenarios.

#![allow(clippy::missing_panics_doc)]

use std::time::Duration;

/// Assert that an error's display output contains a specific substring
///
/// # Examples
///
/// ```
/// let result: Result<(), String> = Err("command 'inventory' timed out".to_string());
/// bulwark_common::assert_error_contains!(result, "timed out");
/// ```
#[macro_export]
macro_rules! assert_error_contains {
    ($result:expr, $substring:expr) => {
        match &$result {
            Ok(_) => panic!("Expected error but got Ok"),
            Err(e) => {
                let error_msg = format!("{}", e);
                assert!(
                    error_msg.contains($substring),
                    "Error message '{}' does not contain '{}'",
                    error_msg,
                    $substring
                );
            }
        }
    };
}

/// Assert that two values are approximately equal (for floats)
///
/// # Examples
///
/// ```
/// use bulwark_common::testing::assertions::assert_approx_eq;
///
/// assert_approx_eq(31.0 / 7.0, 4.43, 0.01);
/// ```
pub fn assert_approx_eq(actual: f64, expected: f64, epsilon: f64) {
    let diff = (actual - expected).abs();
    assert!(
        diff < epsilon,
        "Values not approximately equal: {} vs {} (diff: {})",
        actual,
        expected,
        diff
    );
}

/// Assert that a duration is within an acceptable range
///
/// Timeout races are measured on a real clock, so tests compare elapsed time
/// against the configured deadline with a tolerance.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bulwark_common::testing::assertions::assert_duration_in_range;
///
/// let actual = Duration::from_millis(105);
/// assert_duration_in_range(actual, Duration::from_millis(100), Duration::from_millis(10));
/// ```
pub fn assert_duration_in_range(actual: Duration, expected: Duration, tolerance: Duration) {
    let min = expected.saturating_sub(tolerance);
    let max = expected + tolerance;

    assert!(
        actual >= min && actual <= max,
        "Duration {:?} not in range [{:?}, {:?}]",
        actual,
        min,
        max
    );
}
