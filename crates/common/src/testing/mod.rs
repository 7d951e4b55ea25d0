//! Testing utilities and helpers
//!
//! - **[`assertions`]**: approximate float/duration assertions and
//!   error-message matching used across the engine's test suites
//!
//! Enable the `test-utils` feature to use these from another crate's tests.
//!
//! ```rust,ignore
//! use bulwark_common::testing::assert_approx_eq;
//!
//! assert_approx_eq(snapshot.mean(), 4.43, 0.01);
//! ```

pub mod assertions;

// Re-export assertion functions (macros are exported at the crate root)
pub use assertions::{assert_approx_eq, assert_duration_in_range};
