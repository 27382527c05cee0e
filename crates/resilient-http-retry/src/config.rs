use crate::events::{RetryEvent, RetryReason};
use crate::policy::{RetryPolicy, RetryPolicyBuilder};
use resilient_http_backoff::{Backoff, CappedExponential, Constant};
use resilient_http_core::{EventListeners, FnListener};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Source for determining the maximum number of retry attempts.
#[derive(Clone)]
pub enum MaxAttemptsSource<Req> {
    /// Fixed max attempts for all requests.
    Fixed(usize),
    /// Dynamic max attempts extracted from the request.
    Dynamic(Arc<dyn Fn(&Req) -> usize + Send + Sync>),
}

impl<Req> MaxAttemptsSource<Req> {
    /// Get the max attempts for a request.
    pub fn get_max_attempts(&self, req: &Req) -> usize {
        match self {
            MaxAttemptsSource::Fixed(n) => *n,
            MaxAttemptsSource::Dynamic(f) => f(req),
        }
    }
}

impl<Req> Default for MaxAttemptsSource<Req> {
    fn default() -> Self {
        MaxAttemptsSource::Fixed(3)
    }
}

/// Configuration for the retry middleware.
pub struct RetryConfig<Req, Res, Err> {
    pub(crate) policy: RetryPolicy<Req, Res, Err>,
    pub(crate) max_attempts_source: MaxAttemptsSource<Req>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<Req, Res, Err> {
    max_attempts_source: MaxAttemptsSource<Req>,
    policy_builder: RetryPolicyBuilder<Req, Res, Err>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
    _phantom: PhantomData<(Req, Res, Err)>,
}

impl<Req, Res, Err> Default for RetryConfigBuilder<Req, Res, Err> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Res, Err> RetryConfigBuilder<Req, Res, Err> {
    /// Creates a new builder with defaults.
    ///
    /// Defaults: max_attempts=3, capped-exponential backoff with a 100ms
    /// base, 30s cap and 20% jitter, name `"<unnamed>"`.
    pub fn new() -> Self {
        Self {
            max_attempts_source: MaxAttemptsSource::default(),
            policy_builder: RetryPolicyBuilder::new(),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
            _phantom: PhantomData,
        }
    }

    /// Sets a fixed maximum number of retry attempts for all requests,
    /// including the initial attempt.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts_source = MaxAttemptsSource::Fixed(max_attempts);
        self
    }

    /// Sets a dynamic max attempts extractor function.
    pub fn max_attempts_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Req) -> usize + Send + Sync + 'static,
    {
        self.max_attempts_source = MaxAttemptsSource::Dynamic(Arc::new(f));
        self
    }

    /// Sets a fixed backoff interval.
    pub fn fixed_backoff(mut self, duration: Duration) -> Self {
        self.policy_builder = self.policy_builder.backoff(Arc::new(Constant(duration)));
        self
    }

    /// Sets capped-exponential backoff with the given base interval, a 30s
    /// cap, and 20% jitter.
    pub fn exponential_backoff(mut self, base: Duration) -> Self {
        self.policy_builder = self.policy_builder.backoff(Arc::new(CappedExponential {
            base,
            max: Duration::from_secs(30),
            jitter: 0.2,
        }));
        self
    }

    /// Sets a custom backoff calculator.
    pub fn backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.policy_builder = self.policy_builder.backoff(backoff);
        self
    }

    /// Sets the maximum delay between attempts regardless of source
    /// (backoff calculator or `Retry-After`).
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.policy_builder = self.policy_builder.max_delay(max_delay);
        self
    }

    /// Sets the predicate that decides whether a request is retryable at
    /// all (e.g. method safety, idempotency key presence), independent of
    /// any particular attempt's outcome.
    pub fn is_retryable_request<F>(mut self, f: F) -> Self
    where
        F: Fn(&Req) -> bool + Send + Sync + 'static,
    {
        self.policy_builder = self.policy_builder.is_retryable_request(f);
        self
    }

    /// Sets the outcome classifier: given a completed attempt's result,
    /// returns `Some(reason)` if it should be retried, `None` otherwise.
    pub fn classify<F>(mut self, f: F) -> Self
    where
        F: Fn(&Result<Res, Err>) -> Option<RetryReason> + Send + Sync + 'static,
    {
        self.policy_builder = self.policy_builder.classify(f);
        self
    }

    /// Sets an extractor that reads a server-requested delay (e.g.
    /// `Retry-After`) off a response; when present it takes priority over
    /// the backoff calculator for that attempt.
    pub fn retry_after<F>(mut self, f: F) -> Self
    where
        F: Fn(&Res) -> Option<Duration> + Send + Sync + 'static,
    {
        self.policy_builder = self.policy_builder.retry_after(f);
        self
    }

    /// Sets the name for this retry instance (used in events, logs, and
    /// metrics labels).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback when a retry attempt is about to be made.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &RetryEvent| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback when an operation succeeds, called with the
    /// total number of attempts made (1 means no retries were needed).
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &RetryEvent| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback when all retry attempts are exhausted.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &RetryEvent| {
            if let RetryEvent::Error { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback when an error is judged non-retryable.
    pub fn on_ignored_error<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &RetryEvent| {
            if matches!(event, RetryEvent::IgnoredError { .. }) {
                f();
            }
        }));
        self
    }

    /// Builds the retry layer.
    pub fn build(self) -> crate::RetryLayer<Req, Res, Err> {
        let config = RetryConfig {
            policy: self.policy_builder.build(),
            max_attempts_source: self.max_attempts_source,
            event_listeners: self.event_listeners,
            name: self.name,
        };

        crate::RetryLayer::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RetryLayer;

    #[test]
    fn test_builder_defaults() {
        let _layer: RetryLayer<(), (), std::io::Error> = RetryLayer::builder().build();
    }

    #[test]
    fn test_builder_custom_values() {
        let _layer: RetryLayer<(), (), std::io::Error> = RetryLayer::builder()
            .max_attempts(5)
            .fixed_backoff(Duration::from_secs(2))
            .name("test-retry")
            .build();
    }

    #[test]
    fn test_event_listeners() {
        let _layer: RetryLayer<(), (), std::io::Error> = RetryLayer::builder()
            .on_retry(|_, _| {})
            .on_success(|_| {})
            .build();
    }

    #[test]
    fn test_max_attempts_fn() {
        #[derive(Clone)]
        struct MyRequest {
            is_idempotent: bool,
        }

        let _layer: RetryLayer<MyRequest, (), std::io::Error> = RetryLayer::builder()
            .max_attempts_fn(|req: &MyRequest| if req.is_idempotent { 5 } else { 1 })
            .build();
    }

    #[test]
    fn test_max_attempts_source_fixed() {
        let source: MaxAttemptsSource<()> = MaxAttemptsSource::Fixed(5);
        assert_eq!(source.get_max_attempts(&()), 5);
    }

    #[test]
    fn test_max_attempts_source_dynamic() {
        #[derive(Clone)]
        struct Req {
            retries: usize,
        }

        let source: MaxAttemptsSource<Req> =
            MaxAttemptsSource::Dynamic(Arc::new(|req: &Req| req.retries));
        let req = Req { retries: 10 };
        assert_eq!(source.get_max_attempts(&req), 10);
    }

    #[test]
    fn test_preset_exponential_backoff() {
        let _layer: RetryLayer<(), (), std::io::Error> = RetryLayer::exponential_backoff().build();
    }

    #[test]
    fn test_preset_aggressive() {
        let _layer: RetryLayer<(), (), std::io::Error> = RetryLayer::aggressive().build();
    }

    #[test]
    fn test_preset_conservative() {
        let _layer: RetryLayer<(), (), std::io::Error> = RetryLayer::conservative().build();
    }
}
