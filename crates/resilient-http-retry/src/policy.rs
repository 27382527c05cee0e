use crate::events::RetryReason;
use resilient_http_backoff::{Backoff, CappedExponential};
use std::sync::Arc;
use std::time::Duration;

/// Classifies a completed attempt's outcome for retry purposes.
///
/// Returns `None` when the outcome should not be retried (success, or a
/// failure outside the retryable set). Returns `Some(reason)` when the
/// outcome is retryable, tagged with the reason used for the
/// `retries_total` metric label.
pub type OutcomeClassifier<Res, Err> =
    Arc<dyn Fn(&Result<Res, Err>) -> Option<RetryReason> + Send + Sync>;

/// Extracts a server-requested delay (e.g. from a `Retry-After` header) from
/// a response, already resolved to a concrete `Duration`.
pub type RetryAfterExtractor<Res> = Arc<dyn Fn(&Res) -> Option<Duration> + Send + Sync>;

/// Decides whether a request is eligible for retries at all, independent of
/// the outcome of any particular attempt — e.g. a GET is always retryable,
/// a POST only when it carries an idempotency key.
pub type IdempotencyPredicate<Req> = Arc<dyn Fn(&Req) -> bool + Send + Sync>;

/// Retry policy: idempotency gating, outcome classification, backoff, and
/// optional `Retry-After` honoring.
pub struct RetryPolicy<Req, Res, Err> {
    pub(crate) is_retryable_request: IdempotencyPredicate<Req>,
    pub(crate) classify: OutcomeClassifier<Res, Err>,
    pub(crate) retry_after: Option<RetryAfterExtractor<Res>>,
    pub(crate) backoff: Arc<dyn Backoff>,
    pub(crate) max_delay: Duration,
}

impl<Req, Res, Err> Clone for RetryPolicy<Req, Res, Err> {
    fn clone(&self) -> Self {
        Self {
            is_retryable_request: Arc::clone(&self.is_retryable_request),
            classify: Arc::clone(&self.classify),
            retry_after: self.retry_after.clone(),
            backoff: Arc::clone(&self.backoff),
            max_delay: self.max_delay,
        }
    }
}

impl<Req, Res, Err> RetryPolicy<Req, Res, Err> {
    /// Creates a policy that retries every request (the `is_retryable_request`
    /// predicate always returns true) and classifies every `Err` as a
    /// network-level failure. Suitable for generic Tower services that don't
    /// carry HTTP method/header semantics; HTTP clients should override both
    /// via [`RetryPolicyBuilder`].
    pub fn new(backoff: Arc<dyn Backoff>) -> Self {
        Self {
            is_retryable_request: Arc::new(|_| true),
            classify: Arc::new(|result: &Result<Res, Err>| {
                result.as_ref().err().map(|_| RetryReason::Net)
            }),
            retry_after: None,
            backoff,
            max_delay: Duration::from_secs(30),
        }
    }

    /// `is_retryable_request(req)`: requests that fail this check never
    /// retry, regardless of outcome.
    pub fn is_retryable_request(&self, req: &Req) -> bool {
        (self.is_retryable_request)(req)
    }

    /// Classifies a completed attempt's outcome, independent of attempt
    /// count or request retryability.
    pub fn classify(&self, outcome: &Result<Res, Err>) -> Option<RetryReason> {
        (self.classify)(outcome)
    }

    /// `should_retry(req, attempt, max_attempts, outcome)`.
    pub fn should_retry(
        &self,
        req: &Req,
        attempt: usize,
        max_attempts: usize,
        outcome: &Result<Res, Err>,
    ) -> Option<RetryReason> {
        if attempt >= max_attempts {
            return None;
        }
        if !self.is_retryable_request(req) {
            return None;
        }
        (self.classify)(outcome)
    }

    /// `next_delay(attempt, resp)`: honors `Retry-After` when configured and
    /// present, clamped to `max_delay`; otherwise defers to the backoff
    /// calculator.
    pub fn next_delay(&self, attempt: usize, resp: Option<&Res>) -> Duration {
        if let (Some(extractor), Some(resp)) = (&self.retry_after, resp) {
            if let Some(delay) = extractor(resp) {
                return delay.min(self.max_delay);
            }
        }
        self.backoff.delay(attempt as u32).min(self.max_delay)
    }
}

/// Builder for [`RetryPolicy`].
pub struct RetryPolicyBuilder<Req, Res, Err> {
    is_retryable_request: IdempotencyPredicate<Req>,
    classify: OutcomeClassifier<Res, Err>,
    retry_after: Option<RetryAfterExtractor<Res>>,
    backoff: Arc<dyn Backoff>,
    max_delay: Duration,
}

impl<Req, Res, Err> Default for RetryPolicyBuilder<Req, Res, Err> {
    fn default() -> Self {
        Self {
            is_retryable_request: Arc::new(|_| true),
            classify: Arc::new(|result: &Result<Res, Err>| {
                result.as_ref().err().map(|_| RetryReason::Net)
            }),
            retry_after: None,
            backoff: Arc::new(CappedExponential {
                base: Duration::from_millis(100),
                max: Duration::from_secs(30),
                jitter: 0.2,
            }),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl<Req, Res, Err> RetryPolicyBuilder<Req, Res, Err> {
    /// Creates a new builder with a capped-exponential backoff default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the idempotency predicate used by `is_retryable_request`.
    pub fn is_retryable_request<F>(mut self, f: F) -> Self
    where
        F: Fn(&Req) -> bool + Send + Sync + 'static,
    {
        self.is_retryable_request = Arc::new(f);
        self
    }

    /// Sets the outcome classifier.
    pub fn classify<F>(mut self, f: F) -> Self
    where
        F: Fn(&Result<Res, Err>) -> Option<RetryReason> + Send + Sync + 'static,
    {
        self.classify = Arc::new(f);
        self
    }

    /// Sets a `Retry-After`-style extractor; when it returns `Some`, its
    /// value takes priority over the backoff calculator for that attempt.
    pub fn retry_after<F>(mut self, f: F) -> Self
    where
        F: Fn(&Res) -> Option<Duration> + Send + Sync + 'static,
    {
        self.retry_after = Some(Arc::new(f));
        self
    }

    /// Sets the backoff calculator.
    pub fn backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the maximum delay between attempts, regardless of source.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Builds the policy.
    pub fn build(self) -> RetryPolicy<Req, Res, Err> {
        RetryPolicy {
            is_retryable_request: self.is_retryable_request,
            classify: self.classify,
            retry_after: self.retry_after,
            backoff: self.backoff,
            max_delay: self.max_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_retries_any_error() {
        let policy: RetryPolicy<(), (), &str> =
            RetryPolicyBuilder::new().max_delay(Duration::from_secs(1)).build();

        assert_eq!(
            policy.should_retry(&(), 0, 3, &Err("boom")),
            Some(RetryReason::Net)
        );
        assert_eq!(policy.should_retry(&(), 0, 3, &Ok(())), None);
    }

    #[test]
    fn exhausted_attempts_never_retry() {
        let policy: RetryPolicy<(), (), &str> = RetryPolicyBuilder::new().build();
        assert_eq!(policy.should_retry(&(), 3, 3, &Err("boom")), None);
    }

    #[test]
    fn non_retryable_request_never_retries() {
        let policy: RetryPolicy<bool, (), &str> = RetryPolicyBuilder::new()
            .is_retryable_request(|idempotent: &bool| *idempotent)
            .build();

        assert_eq!(policy.should_retry(&false, 0, 3, &Err("boom")), None);
        assert_eq!(
            policy.should_retry(&true, 0, 3, &Err("boom")),
            Some(RetryReason::Net)
        );
    }

    #[test]
    fn retry_after_overrides_backoff() {
        let policy: RetryPolicy<(), Duration, &str> = RetryPolicyBuilder::new()
            .classify(|_: &Result<Duration, &str>| Some(RetryReason::Status))
            .retry_after(|resp: &Duration| Some(*resp))
            .max_delay(Duration::from_secs(10))
            .build();

        let delay = policy.next_delay(1, Some(&Duration::from_secs(5)));
        assert_eq!(delay, Duration::from_secs(5));

        let clamped = policy.next_delay(1, Some(&Duration::from_secs(999)));
        assert_eq!(clamped, Duration::from_secs(10));
    }
}
