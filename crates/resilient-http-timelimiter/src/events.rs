use resilient_http_core::ClientEvent;
use std::time::{Duration, Instant};

/// Events emitted by the time limiter middleware.
#[derive(Debug, Clone)]
pub enum TimeLimiterEvent {
    /// The call completed within the timeout.
    Success {
        layer_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// The call failed with an error before the timeout elapsed.
    Error {
        layer_name: String,
        timestamp: Instant,
        duration: Duration,
    },
    /// The call did not complete within the timeout.
    Timeout {
        layer_name: String,
        timestamp: Instant,
        timeout_duration: Duration,
    },
}

impl ClientEvent for TimeLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TimeLimiterEvent::Success { .. } => "success",
            TimeLimiterEvent::Error { .. } => "error",
            TimeLimiterEvent::Timeout { .. } => "timeout",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TimeLimiterEvent::Success { timestamp, .. }
            | TimeLimiterEvent::Error { timestamp, .. }
            | TimeLimiterEvent::Timeout { timestamp, .. } => *timestamp,
        }
    }

    fn layer_name(&self) -> &str {
        match self {
            TimeLimiterEvent::Success { layer_name, .. }
            | TimeLimiterEvent::Error { layer_name, .. }
            | TimeLimiterEvent::Timeout { layer_name, .. } => layer_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        let now = Instant::now();
        let success = TimeLimiterEvent::Success {
            layer_name: "test".to_string(),
            timestamp: now,
            duration: Duration::from_millis(10),
        };
        assert_eq!(success.event_type(), "success");

        let error = TimeLimiterEvent::Error {
            layer_name: "test".to_string(),
            timestamp: now,
            duration: Duration::from_millis(10),
        };
        assert_eq!(error.event_type(), "error");

        let timeout = TimeLimiterEvent::Timeout {
            layer_name: "test".to_string(),
            timestamp: now,
            timeout_duration: Duration::from_secs(5),
        };
        assert_eq!(timeout.event_type(), "timeout");
    }
}
