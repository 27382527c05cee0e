use resilient_http_core::ClientEvent;
use std::time::{Duration, Instant};

/// Why a failed attempt was judged retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// The response status was in the retryable status set.
    Status,
    /// The attempt timed out.
    Timeout,
    /// A network-level error occurred (connection refused, reset, DNS).
    Net,
}

impl RetryReason {
    /// Label used for the `retries_total` metric.
    pub fn as_label(&self) -> &'static str {
        match self {
            RetryReason::Status => "status",
            RetryReason::Timeout => "timeout",
            RetryReason::Net => "net",
        }
    }
}

/// Events emitted by the retry middleware.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// A retry attempt is about to be made.
    Retry {
        layer_name: String,
        timestamp: Instant,
        attempt: usize,
        delay: Duration,
        reason: RetryReason,
    },
    /// The operation succeeded (either on first try or after retries).
    Success {
        layer_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// The operation failed after exhausting all retry attempts.
    Error {
        layer_name: String,
        timestamp: Instant,
        attempts: usize,
    },
    /// An error occurred but was not retried (non-idempotent request, or
    /// outcome not in the retryable set).
    IgnoredError {
        layer_name: String,
        timestamp: Instant,
    },
}

impl ClientEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Error { .. } => "error",
            RetryEvent::IgnoredError { .. } => "ignored_error",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Error { timestamp, .. }
            | RetryEvent::IgnoredError { timestamp, .. } => *timestamp,
        }
    }

    fn layer_name(&self) -> &str {
        match self {
            RetryEvent::Retry { layer_name, .. }
            | RetryEvent::Success { layer_name, .. }
            | RetryEvent::Error { layer_name, .. }
            | RetryEvent::IgnoredError { layer_name, .. } => layer_name,
        }
    }
}
