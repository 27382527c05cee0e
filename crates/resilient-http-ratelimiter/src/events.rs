use std::time::{Duration, Instant};
use resilient_http_core::ClientEvent;

/// Events emitted by the token-bucket limiter.
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// A permit was granted, possibly after waiting for a refill.
    PermitAcquired {
        layer_name: String,
        timestamp: Instant,
        wait_duration: Duration,
    },
}

impl ClientEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::PermitAcquired { .. } => "permit_acquired",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::PermitAcquired { timestamp, .. } => *timestamp,
        }
    }

    fn layer_name(&self) -> &str {
        match self {
            RateLimiterEvent::PermitAcquired { layer_name, .. } => layer_name,
        }
    }
}
