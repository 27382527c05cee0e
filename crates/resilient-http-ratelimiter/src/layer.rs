use crate::{RateLimiter, RateLimiterConfig, RateLimiterConfigBuilder};
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that gates a service behind a token-bucket limiter.
///
/// # Examples
///
/// ```
/// use resilient_http_ratelimiter::RateLimiterConfig;
/// use tower::ServiceBuilder;
///
/// # async fn example() {
/// let rate_limiter = RateLimiterConfig::builder()
///     .requests_per_second(50.0, 10.0)
///     .build();
///
/// let service = ServiceBuilder::new()
///     .layer(rate_limiter)
///     .service(my_service());
/// # }
/// # fn my_service() -> impl tower::Service<String, Response = String, Error = std::io::Error> {
/// #     tower::service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) })
/// # }
/// ```
#[derive(Clone)]
pub struct RateLimiterLayer {
    config: Arc<RateLimiterConfig>,
}

impl RateLimiterLayer {
    /// Creates a new `RateLimiterLayer` with the given configuration.
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Starts building a layer with the default capacity and refill rate.
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiter<S>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimiter::new(service, Arc::clone(&self.config))
    }
}
