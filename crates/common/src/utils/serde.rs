//! Serialization utilities for common data types
//!
//! Command configuration is written by operators in milliseconds
//! (`executionTimeoutInMilliseconds = 250`) but handled in code as
//! [`Duration`]. The helpers here bridge the two.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Custom serialization module for Duration as milliseconds
///
/// # Usage
/// ```rust
/// use std::time::Duration;
///
/// use bulwark_common::duration_millis;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct Example {
///     #[serde(with = "duration_millis", rename = "sleepWindowInMilliseconds")]
///     sleep_window: Duration,
/// }
///
/// let parsed: Example = serde_json::from_str(r#"{"sleepWindowInMilliseconds":5000}"#).unwrap();
/// assert_eq!(parsed.sleep_window, Duration::from_secs(5));
/// ```
pub mod duration_millis {
    use super::*;

    /// Serde serialization result type
    type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

    /// Serialize a Duration as milliseconds (u64)
    pub fn serialize<S>(duration: &Duration, serializer: S) -> SerializeResult<S>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    /// Deserialize milliseconds (u64) into a Duration
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
