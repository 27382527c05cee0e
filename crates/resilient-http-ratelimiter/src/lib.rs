//! Token-bucket rate limiting for the resilient HTTP client.
//!
//! Every attempt passes through a shared token bucket before it reaches the
//! transport. Refill is lazy — there's no background ticker — so an idle
//! limiter costs nothing: `tokens = min(capacity, tokens + elapsed * rate)`
//! is recomputed on each `acquire`. When the bucket is empty the caller
//! sleeps for the time until the next token, then rechecks.
//!
//! # Examples
//!
//! ```
//! use resilient_http_ratelimiter::RateLimiterConfig;
//! use tower::ServiceBuilder;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Allow 50 requests/sec with bursts up to 10.
//! let rate_limiter = RateLimiterConfig::builder()
//!     .requests_per_second(50.0, 10.0)
//!     .on_permit_acquired(|wait_duration| {
//!         println!("permit acquired after {:?}", wait_duration);
//!     })
//!     .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(rate_limiter)
//!     .service(tower::service_fn(|req: String| async move {
//!         Ok::<_, std::io::Error>(format!("Response: {}", req))
//!     }));
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod events;
mod layer;
mod limiter;

pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use error::RateLimiterError;
pub use events::RateLimiterEvent;
pub use layer::RateLimiterLayer;

use crate::limiter::SharedTokenBucket;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::Service;

/// A Tower [`Service`] that gates requests behind a token bucket.
pub struct RateLimiter<S> {
    inner: S,
    config: Arc<RateLimiterConfig>,
    bucket: SharedTokenBucket,
}

impl<S> RateLimiter<S> {
    /// Creates a new `RateLimiter` wrapping the given service.
    pub fn new(inner: S, config: Arc<RateLimiterConfig>) -> Self {
        let bucket = SharedTokenBucket::new(config.capacity, config.refill_rate_per_sec);

        Self {
            inner,
            config,
            bucket,
        }
    }
}

impl<S> Clone for RateLimiter<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
            bucket: self.bucket.clone(),
        }
    }
}

impl<S, Req> Service<Req> for RateLimiter<S>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = RateLimiterError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(RateLimiterError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let bucket = self.bucket.clone();
        let config = Arc::clone(&self.config);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let wait_duration = bucket.acquire().await;

            let event = RateLimiterEvent::PermitAcquired {
                layer_name: config.name.clone(),
                timestamp: Instant::now(),
                wait_duration,
            };
            config.event_listeners.emit(&event);

            inner.call(req).await.map_err(RateLimiterError::Inner)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::service_fn;
    use tower::{Layer, ServiceExt};

    #[tokio::test]
    async fn allows_requests_within_burst() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let cc = Arc::clone(&call_count);

        let service = service_fn(move |req: String| {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<_, std::io::Error>(format!("Response: {}", req))
            }
        });

        let layer = RateLimiterConfig::builder().requests_per_second(50.0, 10.0).build();

        let mut service = layer.layer(service);

        for _ in 0..10 {
            let result = service
                .ready()
                .await
                .unwrap()
                .call("test".to_string())
                .await;
            assert!(result.is_ok());
        }

        assert_eq!(call_count.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn blocks_until_refill_then_succeeds() {
        let service =
            service_fn(|req: String| async move { Ok::<_, std::io::Error>(format!("ok: {req}")) });

        let layer = RateLimiterConfig::builder().requests_per_second(10.0, 1.0).build();

        let mut service = layer.layer(service);

        assert!(service.ready().await.unwrap().call("1".into()).await.is_ok());

        let start = std::time::Instant::now();
        let result = service.ready().await.unwrap().call("2".into()).await;
        assert!(result.is_ok());
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn event_listener_observes_wait_duration() {
        let observed = Arc::new(AtomicUsize::new(0));
        let clone = Arc::clone(&observed);

        let service = service_fn(|_req: String| async move { Ok::<_, std::io::Error>("ok".to_string()) });

        let layer = RateLimiterConfig::builder()
            .requests_per_second(1000.0, 5.0)
            .on_permit_acquired(move |_| {
                clone.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        let mut service = layer.layer(service);
        let _ = service.ready().await.unwrap().call("1".into()).await;
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }
}
