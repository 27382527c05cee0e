//! Built-in middleware: thin [`tower::Layer`]s that decorate a request
//! before the transport sees it, or observe the outcome after. Per the
//! chain contract, user middleware composed via [`tower::ServiceBuilder`]
//! sits between the breaker and the transport, so it observes exactly the
//! attempt the transport sees.

use crate::error::TransportError;
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use futures::future::BoxFuture;
use http::{HeaderName, HeaderValue};
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};

macro_rules! header_decorator {
    ($layer:ident, $svc:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone)]
        pub struct $layer {
            name: HeaderName,
            value: HeaderValue,
        }

        impl $layer {
            pub fn new(name: HeaderName, value: HeaderValue) -> Self {
                Self { name, value }
            }
        }

        impl<S> Layer<S> for $layer {
            type Service = $svc<S>;

            fn layer(&self, inner: S) -> Self::Service {
                $svc {
                    inner,
                    name: self.name.clone(),
                    value: self.value.clone(),
                }
            }
        }

        #[derive(Clone)]
        pub struct $svc<S> {
            inner: S,
            name: HeaderName,
            value: HeaderValue,
        }

        impl<S> Service<HttpRequest> for $svc<S>
        where
            S: Service<HttpRequest, Response = HttpResponse, Error = TransportError> + Send + 'static,
            S::Future: Send + 'static,
        {
            type Response = HttpResponse;
            type Error = TransportError;
            type Future = BoxFuture<'static, Result<HttpResponse, TransportError>>;

            fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
                self.inner.poll_ready(cx)
            }

            fn call(&mut self, mut req: HttpRequest) -> Self::Future {
                req.headers.insert(self.name.clone(), self.value.clone());
                Box::pin(self.inner.call(req))
            }
        }
    };
}

header_decorator!(BearerAuthLayer, BearerAuth, "Adds `Authorization: Bearer <token>` to every request.");
header_decorator!(ApiKeyLayer, ApiKey, "Adds a configurable API-key header to every request.");
header_decorator!(UserAgentLayer, UserAgentMiddleware, "Overrides the `User-Agent` header on every request.");

impl BearerAuthLayer {
    pub fn token(token: &str) -> Self {
        Self::new(
            HeaderName::from_static("authorization"),
            HeaderValue::try_from(format!("Bearer {token}")).expect("token must be a valid header value"),
        )
    }
}

impl ApiKeyLayer {
    pub fn header(header: &str, key: &str) -> Self {
        Self::new(
            HeaderName::try_from(header).expect("must be a valid header name"),
            HeaderValue::try_from(key).expect("must be a valid header value"),
        )
    }
}

impl UserAgentLayer {
    pub fn value(ua: &str) -> Self {
        Self::new(
            HeaderName::from_static("user-agent"),
            HeaderValue::try_from(ua).expect("must be a valid header value"),
        )
    }
}

/// Adds HTTP Basic authentication to every request.
#[derive(Clone)]
pub struct BasicAuthLayer {
    header_value: HeaderValue,
}

impl BasicAuthLayer {
    pub fn new(username: &str, password: &str) -> Self {
        use base64::Engine;
        let raw = format!("{username}:{password}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(raw.as_bytes());
        Self {
            header_value: HeaderValue::try_from(format!("Basic {encoded}"))
                .expect("must be a valid header value"),
        }
    }
}

impl<S> Layer<S> for BasicAuthLayer {
    type Service = BasicAuth<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BasicAuth {
            inner,
            header_value: self.header_value.clone(),
        }
    }
}

#[derive(Clone)]
pub struct BasicAuth<S> {
    inner: S,
    header_value: HeaderValue,
}

impl<S> Service<HttpRequest> for BasicAuth<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = TransportError> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = HttpResponse;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<HttpResponse, TransportError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: HttpRequest) -> Self::Future {
        req.headers
            .insert(http::header::AUTHORIZATION, self.header_value.clone());
        Box::pin(self.inner.call(req))
    }
}

/// Records start/finish of each attempt via `tracing`, without consuming
/// the response body.
#[derive(Clone, Default)]
pub struct LoggingLayer;

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logging { inner }
    }
}

#[derive(Clone)]
pub struct Logging<S> {
    inner: S,
}

impl<S> Service<HttpRequest> for Logging<S>
where
    S: Service<HttpRequest, Response = HttpResponse, Error = TransportError> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = HttpResponse;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<HttpResponse, TransportError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: HttpRequest) -> Self::Future {
        let method = req.method.clone();
        let url = req.url.clone();
        let start = Instant::now();
        let fut = self.inner.call(req);

        Box::pin(async move {
            #[cfg(feature = "tracing")]
            tracing::debug!(%method, %url, "dispatching attempt");

            let result = fut.await;
            let elapsed = start.elapsed();

            #[cfg(feature = "tracing")]
            match &result {
                Ok(resp) => tracing::debug!(%method, %url, status = %resp.status, ?elapsed, "attempt completed"),
                Err(err) => tracing::debug!(%method, %url, %err, ?elapsed, "attempt failed"),
            }
            #[cfg(not(feature = "tracing"))]
            let _ = elapsed;

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_encodes_known_vector() {
        let layer = BasicAuthLayer::new("user", "pass");
        assert_eq!(layer.header_value, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
    }
}
