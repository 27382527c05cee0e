use crate::{CircuitBreaker, CircuitBreakerConfig};
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that wraps a service with circuit breaker logic.
///
/// # Examples
///
/// ```rust
/// use resilient_http_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerLayer};
/// use tower::ServiceBuilder;
/// use std::time::Duration;
///
/// # async fn example() {
/// let config: CircuitBreakerConfig<String, std::io::Error> = CircuitBreakerConfig::builder()
///     .failure_threshold(5)
///     .success_threshold(3)
///     .open_timeout(Duration::from_secs(60))
///     .build();
///
/// let service = ServiceBuilder::new()
///     .layer(CircuitBreakerLayer::new(config))
///     .service(my_service());
/// # }
/// # fn my_service() -> impl tower::Service<String, Response = String, Error = std::io::Error> + Clone {
/// #     tower::service_fn(|req: String| async move { Ok::<_, std::io::Error>(req) })
/// # }
/// ```
pub struct CircuitBreakerLayer<Res, Err> {
    config: Arc<CircuitBreakerConfig<Res, Err>>,
}

impl<Res, Err> CircuitBreakerLayer<Res, Err> {
    /// Creates a new `CircuitBreakerLayer` from the given configuration.
    pub fn new(config: CircuitBreakerConfig<Res, Err>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<Res, Err> Clone for CircuitBreakerLayer<Res, Err> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Res, Err> Layer<S> for CircuitBreakerLayer<Res, Err>
where
    Res: Clone,
{
    type Service = CircuitBreaker<S, Res, Err>;

    fn layer(&self, service: S) -> Self::Service {
        CircuitBreaker::new(service, Arc::clone(&self.config))
    }
}
