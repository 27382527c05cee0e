use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Lazily-refilled token bucket.
///
/// Refill only happens when a caller checks in: `tokens = min(capacity,
/// tokens + elapsed * rate)`. There is no background task ticking the
/// bucket, so an idle limiter costs nothing between calls.
#[derive(Debug)]
struct TokenBucketState {
    capacity: f64,
    refill_rate_per_sec: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucketState {
    fn new(capacity: f64, refill_rate_per_sec: f64) -> Self {
        Self {
            capacity,
            refill_rate_per_sec,
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Attempts to take one token. Returns `Ok(())` if granted, or
    /// `Err(wait)` with the time until a token should next be available.
    fn try_take(&mut self) -> Result<(), Duration> {
        let now = Instant::now();
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(deficit / self.refill_rate_per_sec))
        }
    }

    fn available(&mut self) -> f64 {
        self.refill(Instant::now());
        self.tokens
    }
}

/// Shared, mutex-guarded token bucket that can be cloned across services.
///
/// Fairness is best-effort: contending callers serialize on the single
/// mutex guarding `tokens`/`last_refill`; there is no reservation queue, so
/// a caller that wakes first is not guaranteed to be the one that arrived
/// first.
#[derive(Debug, Clone)]
pub(crate) struct SharedTokenBucket {
    state: std::sync::Arc<Mutex<TokenBucketState>>,
}

impl SharedTokenBucket {
    pub(crate) fn new(capacity: f64, refill_rate_per_sec: f64) -> Self {
        Self {
            state: std::sync::Arc::new(Mutex::new(TokenBucketState::new(capacity, refill_rate_per_sec))),
        }
    }

    /// Blocks until a token is available, returning the total time spent
    /// waiting. Cancellation is the caller's responsibility: dropping this
    /// future (e.g. via `tokio::select!` against a deadline) abandons the
    /// wait without ever having taken a token.
    pub(crate) async fn acquire(&self) -> Duration {
        let mut waited = Duration::ZERO;

        loop {
            let outcome = {
                let mut state = self.state.lock().unwrap();
                state.try_take()
            };

            match outcome {
                Ok(()) => return waited,
                Err(wait) => {
                    sleep(wait).await;
                    waited += wait;
                }
            }
        }
    }

    #[allow(dead_code)]
    pub(crate) fn available_tokens(&self) -> f64 {
        self.state.lock().unwrap().available()
    }
}
