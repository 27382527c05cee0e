use crate::events::RateLimiterEvent;
use resilient_http_core::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for the token-bucket limiter.
pub struct RateLimiterConfig {
    pub(crate) capacity: f64,
    pub(crate) refill_rate_per_sec: f64,
    pub(crate) event_listeners: EventListeners<RateLimiterEvent>,
    pub(crate) name: String,
}

impl RateLimiterConfig {
    /// Starts building a config with the default capacity and refill rate.
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }
}

/// Builder for [`RateLimiterConfig`].
pub struct RateLimiterConfigBuilder {
    capacity: f64,
    refill_rate_per_sec: f64,
    event_listeners: EventListeners<RateLimiterEvent>,
    name: String,
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults: `capacity = 50`, `refill_rate_per_sec = 50.0`, `name = "<unnamed>"`.
    pub fn new() -> Self {
        Self {
            capacity: 50.0,
            refill_rate_per_sec: 50.0,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the bucket's burst capacity (maximum tokens it can hold).
    pub fn capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the sustained rate at which tokens refill, in tokens per second.
    pub fn refill_rate_per_sec(mut self, rate: f64) -> Self {
        self.refill_rate_per_sec = rate;
        self
    }

    /// Convenience alias matching common rate-limiter vocabulary: allows
    /// `requests_per_second` requests/sec with a burst of `burst`.
    pub fn requests_per_second(mut self, requests_per_second: f64, burst: f64) -> Self {
        self.refill_rate_per_sec = requests_per_second;
        self.capacity = burst;
        self
    }

    /// Sets the name for this limiter instance (used in events).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked every time a permit is granted.
    ///
    /// `Fn(Duration)` receives how long the caller waited for the permit;
    /// close to zero when the bucket had tokens to spare.
    pub fn on_permit_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            let RateLimiterEvent::PermitAcquired { wait_duration, .. } = event;
            f(*wait_duration);
        }));
        self
    }

    /// Builds the rate limiter layer.
    pub fn build(self) -> crate::RateLimiterLayer {
        let config = RateLimiterConfig {
            capacity: self.capacity,
            refill_rate_per_sec: self.refill_rate_per_sec,
            event_listeners: self.event_listeners,
            name: self.name,
        };

        crate::RateLimiterLayer::new(config)
    }
}
