use crate::body::ResponseBody;
use crate::error::TransportError;
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use futures::future::BoxFuture;
use std::fmt;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

/// Marker error produced when the per-attempt timeout elapses, carried as
/// the source of a [`TransportError::timeout`].
#[derive(Debug)]
struct AttemptElapsed;

impl fmt::Display for AttemptElapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "per-attempt timeout elapsed")
    }
}

impl std::error::Error for AttemptElapsed {}

/// The innermost [`Service`] of the pipeline: dispatches one attempt through
/// `reqwest` and materializes the response body, per component G's
/// per-attempt lifecycle.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Service<HttpRequest> for ReqwestTransport {
    type Response = HttpResponse;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        let client = self.client.clone();
        Box::pin(async move {
            let method = req.method.clone();
            let url_string = req.url.to_string();

            let mut builder = client.request(req.method.clone(), req.url.clone());
            builder = builder.headers(req.headers.clone());
            if !matches!(req.body, crate::body::RequestBody::Empty) {
                builder = builder.body(req.body.as_bytes());
            }

            let response = builder.send().await.map_err(classify_reqwest_error)?;

            let status = response.status();
            let headers = response.headers().clone();
            let bytes = response.bytes().await.map_err(classify_reqwest_error)?;

            Ok(HttpResponse {
                status,
                headers,
                body: ResponseBody::new(bytes),
                method,
                url: url_string,
            })
        })
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::timeout(err)
    } else {
        TransportError::net(err)
    }
}

/// Wraps a transport service with the per-attempt timeout (component G,
/// steps 1-2), flattening [`resilient_http_timelimiter::TimeLimiterError`]
/// back into a bare [`TransportError`] so it composes transparently with
/// the rest of the pipeline.
#[derive(Clone)]
pub struct PerAttemptTimeout<S> {
    inner: resilient_http_timelimiter::TimeLimiter<S, HttpRequest>,
}

impl<S> PerAttemptTimeout<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = TransportError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    /// `default_timeout` applies when a request carries no per-attempt
    /// override; the client façade sets `req.per_attempt_timeout` on every
    /// attempt to the already-deadline-clamped effective value, so this is
    /// only a fallback for requests dispatched outside that loop.
    pub fn new(inner: S, default_timeout: Duration) -> Self {
        use resilient_http_timelimiter::TimeLimiterLayer;
        use tower::Layer;

        let layer = TimeLimiterLayer::<HttpRequest>::builder()
            .timeout_fn(move |req: &HttpRequest| req.per_attempt_timeout.unwrap_or(default_timeout))
            .build();

        Self {
            inner: layer.layer(inner),
        }
    }
}

impl<S> Service<HttpRequest> for PerAttemptTimeout<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = TransportError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = HttpResponse;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<HttpResponse, TransportError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(flatten_timeout_error)
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        let fut = self.inner.call(req);
        Box::pin(async move { fut.await.map_err(flatten_timeout_error) })
    }
}

fn flatten_timeout_error(
    err: resilient_http_timelimiter::TimeLimiterError<TransportError>,
) -> TransportError {
    match err {
        resilient_http_timelimiter::TimeLimiterError::Timeout => {
            TransportError::timeout(AttemptElapsed)
        }
        resilient_http_timelimiter::TimeLimiterError::Inner(inner) => inner,
    }
}
