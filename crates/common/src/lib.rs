//! Foundation utilities shared across Bulwark crates.
//!
//! # Safety and Quality
//!
//! This crate holds the pieces every Bulwark component leans on and that
//! carry no execution policy of their own:
//! - `error`: the common error taxonomy and classification trait
//! - `time`: clock abstraction with a deterministic mock for tests
//! - `collections`: bounded ring buffer used for latency reservoirs
//! - `utils`: serde helpers (behind the `serde` feature)
//! - `testing`: assertion helpers (behind `test-utils`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod collections;
pub mod error;
pub mod time;
pub mod utils;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
pub use collections::RingBuffer;
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
pub use time::{Clock, MockClock, SystemClock};
#[cfg(feature = "serde")]
pub use utils::serde::duration_millis;
