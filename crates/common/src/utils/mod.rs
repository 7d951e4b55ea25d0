//! Common utility functions
//!
//! - **[`serde`]**: serialization helpers for configuration types (requires
//!   the `serde` feature)

#[cfg(feature = "serde")]
pub mod serde;

// Re-export commonly used items for convenience
#[cfg(feature = "serde")]
pub use self::serde::duration_millis;
