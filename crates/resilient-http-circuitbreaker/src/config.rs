use crate::classifier::{DefaultClassifier, FailureClassifier};
use crate::events::CircuitBreakerEvent;
use resilient_http_core::{EventListeners, FnListener};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a [`crate::CircuitBreaker`].
pub struct CircuitBreakerConfig<Res, Err> {
    /// Consecutive failures (while closed) before the breaker opens.
    pub(crate) failure_threshold: u32,
    /// Consecutive successes (while half-open) before the breaker closes.
    pub(crate) success_threshold: u32,
    /// How long the breaker stays open before admitting a half-open probe.
    pub(crate) open_timeout: Duration,
    /// Classifies a call outcome as success or failure.
    pub(crate) failure_classifier: Arc<dyn FailureClassifier<Res, Err>>,
    /// Registered event listeners.
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    /// Name used in events, logs, and metrics labels.
    pub(crate) name: String,
}

impl<Res, Err> Clone for CircuitBreakerConfig<Res, Err> {
    fn clone(&self) -> Self {
        Self {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            open_timeout: self.open_timeout,
            failure_classifier: Arc::clone(&self.failure_classifier),
            event_listeners: self.event_listeners.clone(),
            name: self.name.clone(),
        }
    }
}

impl<Res, Err> CircuitBreakerConfig<Res, Err>
where
    Res: 'static,
    Err: 'static,
{
    /// Starts building a config with the default classifier.
    pub fn builder() -> CircuitBreakerConfigBuilder<Res, Err, DefaultClassifier> {
        CircuitBreakerConfigBuilder::new()
    }

    /// Named preset matching the default config table: 5 consecutive
    /// failures to open, 3 consecutive successes to close, 60s open timeout.
    pub fn standard() -> Self
    where
        DefaultClassifier: FailureClassifier<Res, Err>,
    {
        Self::builder().build()
    }

    /// Preset that opens faster and recovers slower, for protecting a
    /// fragile downstream dependency.
    pub fn fast_fail() -> Self
    where
        DefaultClassifier: FailureClassifier<Res, Err>,
    {
        Self::builder()
            .failure_threshold(2)
            .success_threshold(3)
            .open_timeout(Duration::from_secs(120))
            .build()
    }

    /// Preset that tolerates more failures before opening and recovers
    /// faster, for flaky but generally healthy dependencies.
    pub fn tolerant() -> Self
    where
        DefaultClassifier: FailureClassifier<Res, Err>,
    {
        Self::builder()
            .failure_threshold(10)
            .success_threshold(1)
            .open_timeout(Duration::from_secs(15))
            .build()
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder<Res, Err, C = DefaultClassifier> {
    failure_threshold: u32,
    success_threshold: u32,
    open_timeout: Duration,
    failure_classifier: C,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
    _phantom: std::marker::PhantomData<(Res, Err)>,
}

impl<Res, Err> CircuitBreakerConfigBuilder<Res, Err, DefaultClassifier> {
    fn new() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 3,
            open_timeout: Duration::from_secs(60),
            failure_classifier: DefaultClassifier,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<Res, Err, C> CircuitBreakerConfigBuilder<Res, Err, C> {
    /// Sets the number of consecutive failures before the breaker opens.
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the number of consecutive half-open successes before closing.
    pub fn success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Sets how long the breaker stays open before probing again.
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Sets the name used in events, logs, and metrics labels.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the entire event listener collection.
    pub fn event_listeners(mut self, listeners: EventListeners<CircuitBreakerEvent>) -> Self {
        self.event_listeners = listeners;
        self
    }

    /// Replaces the failure classifier with a custom implementation.
    pub fn failure_classifier<C2>(self, classifier: C2) -> CircuitBreakerConfigBuilder<Res, Err, C2>
    where
        C2: FailureClassifier<Res, Err>,
    {
        CircuitBreakerConfigBuilder {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            open_timeout: self.open_timeout,
            failure_classifier: classifier,
            event_listeners: self.event_listeners,
            name: self.name,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Registers a callback invoked on every state transition.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(&CircuitBreakerEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |e: &CircuitBreakerEvent| {
            if matches!(e, CircuitBreakerEvent::StateTransition { .. }) {
                f(e);
            }
        }));
        self
    }

    /// Registers a callback invoked whenever a call is permitted.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(&CircuitBreakerEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |e: &CircuitBreakerEvent| {
            if matches!(e, CircuitBreakerEvent::CallPermitted { .. }) {
                f(e);
            }
        }));
        self
    }

    /// Registers a callback invoked whenever a call is rejected.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&CircuitBreakerEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |e: &CircuitBreakerEvent| {
            if matches!(e, CircuitBreakerEvent::CallRejected { .. }) {
                f(e);
            }
        }));
        self
    }

    /// Registers a callback invoked whenever a success is recorded.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(&CircuitBreakerEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |e: &CircuitBreakerEvent| {
            if matches!(e, CircuitBreakerEvent::SuccessRecorded { .. }) {
                f(e);
            }
        }));
        self
    }

    /// Registers a callback invoked whenever a failure is recorded.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(&CircuitBreakerEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |e: &CircuitBreakerEvent| {
            if matches!(e, CircuitBreakerEvent::FailureRecorded { .. }) {
                f(e);
            }
        }));
        self
    }

    /// Builds the config.
    pub fn build(self) -> CircuitBreakerConfig<Res, Err>
    where
        C: FailureClassifier<Res, Err> + 'static,
    {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            open_timeout: self.open_timeout,
            failure_classifier: Arc::new(self.failure_classifier),
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}
