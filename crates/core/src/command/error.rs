//! Errors surfaced to callers of a command.
//!
//! Every service-failure path (timeout, short-circuit, rejection, operation
//! error, fallback failure) produces [`CommandError::Resilience`] tagged with
//! a [`FailureType`], so callers can tell infrastructure failures from
//! application failures without inspecting the cause. Bad requests keep the
//! operation's error unchanged.

use std::fmt;
use std::time::Duration;

use bulwark_common::error::{CommonError, ErrorClassification, ErrorSeverity};
use thiserror::Error;

/// Why a command did not return the operation's own result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureType {
    Timeout,
    RejectedSemaphoreExecution,
    RejectedSemaphoreFallback,
    ShortCircuit,
    CommandException,
    BadRequest,
}

impl FailureType {
    pub const fn as_str(self) -> &'static str {
        match self {
            FailureType::Timeout => "TIMEOUT",
            FailureType::RejectedSemaphoreExecution => "REJECTED_SEMAPHORE_EXECUTION",
            FailureType::RejectedSemaphoreFallback => "REJECTED_SEMAPHORE_FALLBACK",
            FailureType::ShortCircuit => "SHORTCIRCUIT",
            FailureType::CommandException => "COMMAND_EXCEPTION",
            FailureType::BadRequest => "BAD_REQUEST",
        }
    }

    /// Short phrase used in error messages.
    pub(crate) const fn describe(self) -> &'static str {
        match self {
            FailureType::Timeout => "timed out",
            FailureType::RejectedSemaphoreExecution => "could not acquire an execution permit",
            FailureType::RejectedSemaphoreFallback => "could not acquire a fallback permit",
            FailureType::ShortCircuit => "short-circuited",
            FailureType::CommandException => "failed",
            FailureType::BadRequest => "rejected a bad request",
        }
    }
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a guarded command invocation.
#[derive(Debug, Error)]
pub enum CommandError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// A service failure, possibly followed by a failed or rejected fallback.
    #[error("{command} {message}")]
    Resilience {
        failure_type: FailureType,
        command: String,
        message: String,
        /// The operation's own error, when it returned one
        #[source]
        cause: Option<E>,
        /// The fallback's error, when the fallback ran and failed
        fallback_error: Option<E>,
    },

    /// The operation rejected its input; no fallback was attempted.
    #[error("{command} rejected a bad request: {source}")]
    BadRequest {
        command: String,
        #[source]
        source: E,
    },

    /// The executor was already used.
    #[error("{command} has already been executed; an executor runs at most once")]
    AlreadyExecuted { command: String },
}

impl<E> CommandError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Failure tag, or `None` for [`CommandError::AlreadyExecuted`].
    pub fn failure_type(&self) -> Option<FailureType> {
        match self {
            CommandError::Resilience { failure_type, .. } => Some(*failure_type),
            CommandError::BadRequest { .. } => Some(FailureType::BadRequest),
            CommandError::AlreadyExecuted { .. } => None,
        }
    }

    pub fn command_name(&self) -> &str {
        match self {
            CommandError::Resilience { command, .. }
            | CommandError::BadRequest { command, .. }
            | CommandError::AlreadyExecuted { command } => command,
        }
    }

    /// The operation's error, if it produced one.
    pub fn cause(&self) -> Option<&E> {
        match self {
            CommandError::Resilience { cause, .. } => cause.as_ref(),
            CommandError::BadRequest { source, .. } => Some(source),
            CommandError::AlreadyExecuted { .. } => None,
        }
    }

    /// The fallback's error, if the fallback ran and failed.
    pub fn fallback_error(&self) -> Option<&E> {
        match self {
            CommandError::Resilience { fallback_error, .. } => fallback_error.as_ref(),
            _ => None,
        }
    }

    pub fn is_bad_request(&self) -> bool {
        matches!(self, CommandError::BadRequest { .. })
    }

    /// Recover the operation's original error from a bad request.
    pub fn into_source(self) -> Option<E> {
        match self {
            CommandError::BadRequest { source, .. } => Some(source),
            CommandError::Resilience { cause, .. } => cause,
            CommandError::AlreadyExecuted { .. } => None,
        }
    }
}

impl<E> ErrorClassification for CommandError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn is_retryable(&self) -> bool {
        matches!(
            self.failure_type(),
            Some(
                FailureType::Timeout
                    | FailureType::ShortCircuit
                    | FailureType::RejectedSemaphoreExecution
                    | FailureType::RejectedSemaphoreFallback
            )
        )
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            CommandError::BadRequest { .. } => ErrorSeverity::Warning,
            CommandError::AlreadyExecuted { .. } => ErrorSeverity::Critical,
            CommandError::Resilience { failure_type, .. } => match failure_type {
                FailureType::ShortCircuit
                | FailureType::RejectedSemaphoreExecution
                | FailureType::RejectedSemaphoreFallback => ErrorSeverity::Warning,
                _ => ErrorSeverity::Error,
            },
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, CommandError::AlreadyExecuted { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Erases the operation's error type, keeping the failure category.
impl<E> From<CommandError<E>> for CommonError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: CommandError<E>) -> Self {
        let message = err.to_string();
        match err {
            CommandError::Resilience { failure_type, command, .. } => match failure_type {
                FailureType::ShortCircuit => CommonError::circuit_breaker(command),
                FailureType::RejectedSemaphoreExecution
                | FailureType::RejectedSemaphoreFallback => CommonError::rejected(command, None),
                FailureType::Timeout => CommonError::Timeout { operation: command, duration: None },
                FailureType::CommandException | FailureType::BadRequest => {
                    CommonError::internal_with_context(message, command)
                }
            },
            CommandError::BadRequest { command, source } => {
                CommonError::validation(command, source.to_string())
            }
            CommandError::AlreadyExecuted { command } => {
                CommonError::internal_with_context(message, command)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[derive(Debug, Error, PartialEq)]
    #[error("upstream said {0}")]
    struct Upstream(&'static str);

    fn resilience(failure_type: FailureType, cause: Option<Upstream>) -> CommandError<Upstream> {
        CommandError::Resilience {
            failure_type,
            command: "inventory".to_string(),
            message: format!("{} and no fallback provided", failure_type.describe()),
            cause,
            fallback_error: None,
        }
    }

    #[test]
    fn test_failure_type_display() {
        assert_eq!(FailureType::ShortCircuit.to_string(), "SHORTCIRCUIT");
        assert_eq!(
            FailureType::RejectedSemaphoreFallback.to_string(),
            "REJECTED_SEMAPHORE_FALLBACK"
        );
    }

    #[test]
    fn test_resilience_error_message_and_source() {
        let err = resilience(FailureType::CommandException, Some(Upstream("503")));
        assert_eq!(err.to_string(), "inventory failed and no fallback provided");
        assert_eq!(err.failure_type(), Some(FailureType::CommandException));
        assert_eq!(err.command_name(), "inventory");
        assert_eq!(err.source().map(ToString::to_string), Some("upstream said 503".to_string()));
    }

    #[test]
    fn test_timeout_has_no_source() {
        let err = resilience(FailureType::Timeout, None);
        assert!(err.source().is_none());
        assert!(err.cause().is_none());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_bad_request_carries_original_error() {
        let err = CommandError::BadRequest {
            command: "inventory".to_string(),
            source: Upstream("missing sku"),
        };
        assert!(err.is_bad_request());
        assert!(!err.is_retryable());
        assert_eq!(err.failure_type(), Some(FailureType::BadRequest));
        assert_eq!(err.into_source(), Some(Upstream("missing sku")));
    }

    /// Validates conversion into the common taxonomy keeps retryability.
    #[test]
    fn test_into_common_error() {
        let err: CommonError = resilience(FailureType::ShortCircuit, None).into();
        assert!(matches!(err, CommonError::CircuitBreakerOpen { ref service, .. } if service == "inventory"));
        assert!(err.is_retryable());

        let err: CommonError = resilience(FailureType::Timeout, None).into();
        assert_eq!(err.to_string(), "Operation 'inventory' timed out");

        let err: CommonError = resilience(FailureType::CommandException, Some(Upstream("503"))).into();
        assert!(matches!(err, CommonError::Internal { .. }));
        assert!(!err.is_retryable());

        let err: CommonError = CommandError::BadRequest {
            command: "inventory".to_string(),
            source: Upstream("missing sku"),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Validation error for field 'inventory': upstream said missing sku"
        );
    }

    #[test]
    fn test_already_executed() {
        let err: CommandError<Upstream> =
            CommandError::AlreadyExecuted { command: "inventory".to_string() };
        assert_eq!(err.failure_type(), None);
        assert!(err.is_critical());
        assert!(err.to_string().contains("already been executed"));
    }
}
