//! Assembles the per-attempt service stack: `limiter → breaker →
//! middleware → transport`, flattening each layer's wrapper error down to a
//! single [`PipelineError`] the client façade's retry loop can classify.

use crate::error::TransportError;
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use futures::future::BoxFuture;
use resilient_http_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerLayer};
use resilient_http_ratelimiter::{RateLimiter, RateLimiterLayer};
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// The outcome of one pass through the per-attempt pipeline, already
/// flattened from the nested breaker/limiter wrapper errors.
#[derive(Debug)]
pub enum PipelineError {
    /// The inner transport (or user middleware) failed.
    Transport(TransportError),
    /// The breaker short-circuited the attempt; carries the cached
    /// last-failure response, if one has ever been recorded.
    BreakerOpen(Option<HttpResponse>),
}

impl PipelineError {
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            PipelineError::Transport(e) => Some(e),
            PipelineError::BreakerOpen(_) => None,
        }
    }
}

/// Flattens [`CircuitBreakerError`] into [`PipelineError`].
#[derive(Clone)]
pub struct FlattenBreaker<S> {
    inner: CircuitBreaker<S, HttpResponse, TransportError>,
}

impl<S> FlattenBreaker<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = TransportError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    pub fn new(inner: S, config: CircuitBreakerConfig<HttpResponse, TransportError>) -> Self {
        Self {
            inner: CircuitBreakerLayer::new(config).layer(inner),
        }
    }

    /// Exposes the underlying breaker for out-of-band inspection (state,
    /// force-open/closed, reset).
    pub fn breaker(&self) -> &CircuitBreaker<S, HttpResponse, TransportError> {
        &self.inner
    }
}

impl<S> Service<HttpRequest> for FlattenBreaker<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = TransportError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = HttpResponse;
    type Error = PipelineError;
    type Future = BoxFuture<'static, Result<HttpResponse, PipelineError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(flatten_breaker_error)
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        let fut = self.inner.call(req);
        Box::pin(async move { fut.await.map_err(flatten_breaker_error) })
    }
}

fn flatten_breaker_error(err: CircuitBreakerError<HttpResponse, TransportError>) -> PipelineError {
    match err {
        CircuitBreakerError::OpenCircuit { cached_response } => PipelineError::BreakerOpen(cached_response),
        CircuitBreakerError::Inner(e) => PipelineError::Transport(e),
    }
}

/// Flattens `RateLimiterError<PipelineError>` — the limiter never rejects a
/// call itself, so this is always a transparent unwrap.
#[derive(Clone)]
pub struct FlattenLimiter<S> {
    inner: RateLimiter<S>,
}

impl<S> FlattenLimiter<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = PipelineError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    pub fn new(inner: S, layer: RateLimiterLayer) -> Self {
        Self {
            inner: layer.layer(inner),
        }
    }
}

impl<S> Service<HttpRequest> for FlattenLimiter<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = PipelineError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = HttpResponse;
    type Error = PipelineError;
    type Future = BoxFuture<'static, Result<HttpResponse, PipelineError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(|e| e.into_inner())
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        let fut = self.inner.call(req);
        Box::pin(async move { fut.await.map_err(|e| e.into_inner()) })
    }
}
