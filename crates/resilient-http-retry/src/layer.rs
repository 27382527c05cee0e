use crate::{Retry, RetryConfig};
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that applies retry logic to a service.
///
/// # Examples
///
/// ```
/// use resilient_http_retry::RetryLayer;
/// use tower::ServiceBuilder;
/// use std::time::Duration;
///
/// # #[derive(Debug, Clone)]
/// # struct MyError;
/// # async fn example() {
/// let retry_layer = RetryLayer::<String, String, MyError>::builder()
///     .max_attempts(5)
///     .exponential_backoff(Duration::from_millis(100))
///     .build();
///
/// let service = ServiceBuilder::new()
///     .layer(retry_layer)
///     .service(my_service());
/// # }
/// # fn my_service() -> impl tower::Service<String, Response = String, Error = MyError> + Clone {
/// #     tower::service_fn(|req: String| async move { Ok::<_, MyError>(req) })
/// # }
/// ```
///
/// ## Per-request max attempts (dynamic)
///
/// ```
/// use resilient_http_retry::RetryLayer;
/// use std::time::Duration;
///
/// #[derive(Clone)]
/// struct MyRequest {
///     is_idempotent: bool,
///     data: String,
/// }
///
/// # #[derive(Debug, Clone)]
/// # struct MyError;
/// # async fn example() {
/// let retry_layer = RetryLayer::<MyRequest, String, MyError>::builder()
///     .max_attempts_fn(|req: &MyRequest| if req.is_idempotent { 5 } else { 1 })
///     .exponential_backoff(Duration::from_millis(100))
///     .build();
/// # }
/// ```
#[derive(Clone)]
pub struct RetryLayer<Req, Res, Err> {
    config: Arc<RetryConfig<Req, Res, Err>>,
}

impl<Req, Res, Err> RetryLayer<Req, Res, Err> {
    /// Creates a new `RetryLayer` with the given configuration.
    pub fn new(config: RetryConfig<Req, Res, Err>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new builder for configuring a retry layer.
    pub fn builder() -> crate::RetryConfigBuilder<Req, Res, Err> {
        crate::RetryConfigBuilder::new()
    }

    /// Preset: standard exponential backoff. 3 attempts, 100ms base.
    ///
    /// A balanced configuration suitable for most use cases.
    pub fn exponential_backoff() -> crate::RetryConfigBuilder<Req, Res, Err> {
        use std::time::Duration;
        Self::builder()
            .max_attempts(3)
            .exponential_backoff(Duration::from_millis(100))
    }

    /// Preset: aggressive retries for latency-sensitive operations.
    /// 5 attempts, 50ms base.
    pub fn aggressive() -> crate::RetryConfigBuilder<Req, Res, Err> {
        use std::time::Duration;
        Self::builder()
            .max_attempts(5)
            .exponential_backoff(Duration::from_millis(50))
    }

    /// Preset: conservative retries for resource-constrained scenarios.
    /// 2 attempts, 500ms base.
    pub fn conservative() -> crate::RetryConfigBuilder<Req, Res, Err> {
        use std::time::Duration;
        Self::builder()
            .max_attempts(2)
            .exponential_backoff(Duration::from_millis(500))
    }
}

impl<S, Req, Res, Err> Layer<S> for RetryLayer<Req, Res, Err>
where
    Req: 'static,
{
    type Service = Retry<S, Req, Res, Err>;

    fn layer(&self, service: S) -> Self::Service {
        Retry::new(service, Arc::clone(&self.config))
    }
}
