//! Common error types and utilities for Bulwark
//!
//! This module provides the error vocabulary shared by every Bulwark crate.
//! It is deliberately small: the execution engine defines its own
//! caller-facing error (`bulwark_core::command::CommandError`) and composes
//! with [`CommonError`] only for ambient concerns such as configuration
//! loading and serialization.
//!
//! # Error Handling Architecture
//!
//! 1. **`CommonError`**: error patterns that recur across modules
//!    (configuration, serialization, timeouts, bulkhead rejection, ...)
//!
//! 2. **`ErrorClassification` trait**: a standard interface for classifying
//!    errors by retryability and severity
//!
//! 3. **`ErrorSeverity` enum**: severity levels for logging and alerting
//!
//! ## Standard Error Patterns
//!
//! | Pattern | CommonError Variant | When to Use |
//! |---------|-------------------|-------------|
//! | **Circuit Breaker** | `CircuitBreakerOpen` | Call short-circuited by an open breaker |
//! | **Bulkhead** | `Rejected` | Concurrency limit reached |
//! | **Timeouts** | `Timeout` | Operation deadlines |
//! | **Serialization** | `Serialization` | JSON/TOML parsing |
//! | **Configuration** | `Config` | Invalid settings, missing config |
//! | **Persistence** | `Persistence` | File I/O |
//! | **Validation** | `Validation` | Invalid input values |
//! | **Internal** | `Internal` | Invariant violations |
//!
//! ## Examples
//!
//! ```rust
//! use bulwark_common::error::{CommonError, CommonResult};
//!
//! fn parse_limit(raw: &str) -> CommonResult<u32> {
//!     raw.parse::<u32>().map_err(|e| CommonError::config_field("limit", e.to_string()))
//! }
//!
//! assert!(parse_limit("ten").is_err());
//! ```

use std::fmt;
use std::time::Duration;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Common error variants that appear across multiple modules
#[derive(Debug, Clone)]
pub enum CommonError {
    /// Configuration-related errors
    Config { message: String, field: Option<String> },

    /// Circuit breaker is open, preventing operations
    CircuitBreakerOpen { service: String, retry_after: Option<Duration> },

    /// Concurrency limit reached
    Rejected { resource: String, limit: Option<u64> },

    /// Serialization or deserialization errors
    Serialization { message: String, format: Option<String> },

    /// File I/O errors
    Persistence { message: String },

    /// Timeout errors; the deadline is omitted when the caller never saw it
    Timeout { operation: String, duration: Option<Duration> },

    /// Validation errors
    Validation { field: String, message: String },

    /// Failures raised inside an operation, or invariant violations
    Internal { message: String, context: Option<String> },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message, field } => {
                if let Some(field) = field {
                    write!(f, "Configuration error in field '{}': {}", field, message)
                } else {
                    write!(f, "Configuration error: {}", message)
                }
            }
            Self::CircuitBreakerOpen { service, retry_after } => {
                if let Some(retry) = retry_after {
                    write!(f, "Circuit breaker open for '{}' (retry in {:?})", service, retry)
                } else {
                    write!(f, "Circuit breaker open for '{}'", service)
                }
            }
            Self::Rejected { resource, limit } => {
                if let Some(limit) = limit {
                    write!(f, "'{}' rejected: concurrency limit of {} reached", resource, limit)
                } else {
                    write!(f, "'{}' rejected: concurrency limit reached", resource)
                }
            }
            Self::Serialization { message, format } => {
                if let Some(format) = format {
                    write!(f, "Serialization error ({}): {}", format, message)
                } else {
                    write!(f, "Serialization error: {}", message)
                }
            }
            Self::Persistence { message } => write!(f, "Persistence error: {}", message),
            Self::Timeout { operation, duration: Some(duration) } => {
                write!(f, "Operation '{}' timed out after {:?}", operation, duration)
            }
            Self::Timeout { operation, duration: None } => {
                write!(f, "Operation '{}' timed out", operation)
            }
            Self::Validation { field, message } => {
                write!(f, "Validation error for field '{}': {}", field, message)
            }
            Self::Internal { message, context } => {
                if let Some(ctx) = context {
                    write!(f, "Internal error in '{}': {}", ctx, message)
                } else {
                    write!(f, "Internal error: {}", message)
                }
            }
        }
    }
}

impl std::error::Error for CommonError {}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::CircuitBreakerOpen { .. } | Self::Rejected { .. } | Self::Timeout { .. }
        )
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config { .. } => ErrorSeverity::Error,
            Self::CircuitBreakerOpen { .. } => ErrorSeverity::Warning,
            Self::Rejected { .. } => ErrorSeverity::Warning,
            Self::Serialization { .. } => ErrorSeverity::Error,
            Self::Persistence { .. } => ErrorSeverity::Error,
            Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::Validation { .. } => ErrorSeverity::Error,
            Self::Internal { .. } => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::CircuitBreakerOpen { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl CommonError {
    /// Create a simple configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), field: None }
    }

    /// Create a configuration error for a specific field
    pub fn config_field<F: Into<String>, S: Into<String>>(field: F, message: S) -> Self {
        Self::Config { message: message.into(), field: Some(field.into()) }
    }

    /// Create a circuit breaker error
    pub fn circuit_breaker<S: Into<String>>(service: S) -> Self {
        Self::CircuitBreakerOpen { service: service.into(), retry_after: None }
    }

    /// Create a circuit breaker error with retry timing
    pub fn circuit_breaker_with_retry<S: Into<String>>(service: S, retry_after: Duration) -> Self {
        Self::CircuitBreakerOpen { service: service.into(), retry_after: Some(retry_after) }
    }

    /// Create a bulkhead rejection error
    pub fn rejected<S: Into<String>>(resource: S, limit: Option<u64>) -> Self {
        Self::Rejected { resource: resource.into(), limit }
    }

    /// Create a serialization error with format information
    pub fn serialization_format<F: Into<String>, S: Into<String>>(format: F, message: S) -> Self {
        Self::Serialization { message: message.into(), format: Some(format.into()) }
    }

    /// Create a simple persistence error
    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Self::Persistence { message: message.into() }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S, duration: Duration) -> Self {
        Self::Timeout { operation: operation.into(), duration: Some(duration) }
    }

    /// Create a validation error
    pub fn validation<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into(), context: None }
    }

    /// Create an internal error with context
    pub fn internal_with_context<S: Into<String>, C: Into<String>>(message: S, context: C) -> Self {
        Self::Internal { message: message.into(), context: Some(context.into()) }
    }

    /// Convert error to structured logging fields
    ///
    /// ```rust
    /// use std::time::Duration;
    ///
    /// use bulwark_common::CommonError;
    ///
    /// let err = CommonError::timeout("inventory", Duration::from_millis(250));
    /// let fields = err.as_tracing_fields();
    /// assert_eq!(fields[0], ("error_type", "timeout".to_string()));
    /// ```
    pub fn as_tracing_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("error_type", self.error_type_name().to_string())];

        match self {
            Self::Config { message, field } => {
                fields.push(("message", message.clone()));
                if let Some(field) = field {
                    fields.push(("field", field.clone()));
                }
            }
            Self::CircuitBreakerOpen { service, retry_after } => {
                fields.push(("service", service.clone()));
                if let Some(retry) = retry_after {
                    fields.push(("retry_after_ms", retry.as_millis().to_string()));
                }
            }
            Self::Rejected { resource, limit } => {
                fields.push(("resource", resource.clone()));
                if let Some(limit) = limit {
                    fields.push(("limit", limit.to_string()));
                }
            }
            Self::Serialization { message, format } => {
                fields.push(("message", message.clone()));
                if let Some(format) = format {
                    fields.push(("format", format.clone()));
                }
            }
            Self::Persistence { message } => {
                fields.push(("message", message.clone()));
            }
            Self::Timeout { operation, duration } => {
                fields.push(("operation", operation.clone()));
                if let Some(duration) = duration {
                    fields.push(("duration_ms", duration.as_millis().to_string()));
                }
            }
            Self::Validation { field, message } => {
                fields.push(("field", field.clone()));
                fields.push(("message", message.clone()));
            }
            Self::Internal { message, context } => {
                fields.push(("message", message.clone()));
                if let Some(ctx) = context {
                    fields.push(("context", ctx.clone()));
                }
            }
        }

        fields
    }

    fn error_type_name(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::CircuitBreakerOpen { .. } => "circuit_breaker_open",
            Self::Rejected { .. } => "rejected",
            Self::Serialization { .. } => "serialization",
            Self::Persistence { .. } => "persistence",
            Self::Timeout { .. } => "timeout",
            Self::Validation { .. } => "validation",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Error classification trait for consistent error handling across modules
///
/// Callers of a guarded command branch on these answers rather than on
/// concrete error variants: an infrastructure failure (timeout, rejection,
/// short-circuit) is usually worth retrying later, a caller fault is not.
pub trait ErrorClassification {
    /// Check if this error is retryable
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    ///
    /// Used for logging and alerting decisions.
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

// Standard conversions from common error types
impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_format("JSON", err.to_string())
    }
}

impl From<std::io::Error> for CommonError {
    fn from(err: std::io::Error) -> Self {
        Self::persistence(err.to_string())
    }
}

impl From<toml::de::Error> for CommonError {
    fn from(err: toml::de::Error) -> Self {
        Self::serialization_format("TOML", err.to_string())
    }
}
