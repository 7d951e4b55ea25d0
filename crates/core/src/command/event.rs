//! Outcome tags recorded by a command invocation.

use std::fmt;

/// Every outcome a command execution can report to its metrics.
///
/// The discriminant doubles as the slot index inside a counter bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// The operation completed with a value
    Success,
    /// The operation returned an error
    Failure,
    /// The operation lost the race against its timeout
    Timeout,
    /// The breaker was open and the operation was never attempted
    ShortCircuited,
    /// No execution permit was available
    SemaphoreRejected,
    /// The fallback produced a value
    FallbackSuccess,
    /// The fallback returned an error
    FallbackFailure,
    /// No fallback permit was available
    FallbackRejection,
    /// An error was surfaced to the caller without attempting the fallback
    ExceptionThrown,
    /// The operation failed because of its input
    BadRequest,
    /// The value was served from a request cache
    ResponseFromCache,
}

impl EventType {
    /// Number of distinct event types.
    pub const COUNT: usize = 11;

    /// All event types, in slot order.
    pub const ALL: [EventType; Self::COUNT] = [
        EventType::Success,
        EventType::Failure,
        EventType::Timeout,
        EventType::ShortCircuited,
        EventType::SemaphoreRejected,
        EventType::FallbackSuccess,
        EventType::FallbackFailure,
        EventType::FallbackRejection,
        EventType::ExceptionThrown,
        EventType::BadRequest,
        EventType::ResponseFromCache,
    ];

    /// Slot index of this event inside a counter bucket.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether the event counts against the command's health.
    pub const fn is_error(self) -> bool {
        matches!(
            self,
            EventType::Failure
                | EventType::Timeout
                | EventType::ShortCircuited
                | EventType::SemaphoreRejected
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            EventType::Success => "SUCCESS",
            EventType::Failure => "FAILURE",
            EventType::Timeout => "TIMEOUT",
            EventType::ShortCircuited => "SHORT_CIRCUITED",
            EventType::SemaphoreRejected => "SEMAPHORE_REJECTED",
            EventType::FallbackSuccess => "FALLBACK_SUCCESS",
            EventType::FallbackFailure => "FALLBACK_FAILURE",
            EventType::FallbackRejection => "FALLBACK_REJECTION",
            EventType::ExceptionThrown => "EXCEPTION_THROWN",
            EventType::BadRequest => "BAD_REQUEST",
            EventType::ResponseFromCache => "RESPONSE_FROM_CACHE",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
