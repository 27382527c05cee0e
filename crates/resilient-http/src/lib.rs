//! A resilient HTTP client built from composable Tower services.
//!
//! Every request passes through a fixed pipeline, outermost first:
//!
//! ```text
//! rate limiter → circuit breaker → user middleware → per-attempt timeout → transport
//! ```
//!
//! The client façade ([`Client`]) owns this pipeline and drives it from a
//! retry loop: it computes the overall deadline, dispatches one attempt at a
//! time, records metrics, and decides whether to retry based on an
//! idempotency-aware [`resilient_http_retry::RetryPolicy`].
//!
//! # Quick Start
//!
//! ```toml
//! [dependencies]
//! resilient-http = "0.1"
//! ```
//!
//! ```rust,no_run
//! use resilient_http::{Client, ClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::builder()
//!     .config(ClientConfig::aggressive())
//!     .build("payments-api")?;
//!
//! let resp = client.execute(client.get("https://api.example.com/health")?.build()).await?;
//! println!("status: {}", resp.status);
//! # Ok(())
//! # }
//! ```
//!
//! # Resilience in One Call
//!
//! - **Timeouts** — an overall deadline across every attempt, and a
//!   per-attempt timeout that shrinks to whatever's left of the deadline.
//! - **Retry** — GET/HEAD/OPTIONS/PUT/DELETE retry by default; POST/PATCH
//!   only with an `Idempotency-Key` header. Honors `Retry-After`.
//! - **Circuit breaker** — opens after consecutive failures, short-circuits
//!   with the last cached response while open, and probes half-open after a
//!   cooldown.
//! - **Rate limiter** — a token bucket shared across attempts, so bursts are
//!   smoothed rather than rejected.
//! - **Middleware** — auth headers, logging, and any user-supplied
//!   [`tower::Layer`] compose between the breaker and the transport.
//!
//! ### Anti-Patterns
//!
//! ❌ **Retrying non-idempotent requests without an idempotency key**: duplicate writes
//! ✅ Set [`RequestOptions::idempotency_key`] on POST/PATCH before enabling retries
//!
//! ❌ **Per-attempt timeout longer than the overall timeout**: rejected at build time
//! ✅ Keep `per_attempt_timeout <= overall_timeout`
//!
//! ❌ **Ignoring [`ClientError::BreakerOpen`]**: callers see confusing cached responses
//! ✅ Check `is_breaker_open()` and apply a fallback
//!
//! # Observability
//!
//! Enable the `metrics` feature for a Prometheus-style provider via the
//! `metrics` facade crate, or `otel` for an OpenTelemetry meter. Enable
//! `tracing` for structured per-attempt spans. Both are optional; the
//! default [`metrics::NoopMetrics`] keeps the hot path allocation-free.

mod body;
mod client;
mod config;
mod error;
mod metrics;
mod middleware;
mod pipeline;
mod request;
mod response;
mod transport;

pub use body::{RequestBody, ResponseBody};
pub use client::{Client, ClientBuilder};
pub use config::{BreakerSettings, ClientConfig, ClientConfigBuilder, LimiterSettings, RetrySettings};
#[cfg(feature = "json")]
pub use error::DecodeError;
pub use error::{
    ClientError, ClosedBodyError, ConfigurationError, ErrorKind, HTTPError, MaxAttemptsExceeded,
    TimeoutError, TimeoutKind, TransportError,
};
pub use metrics::{DurationLabels, MetricsProvider, NoopMetrics, RequestLabels, DURATION_BUCKETS, SIZE_BUCKETS};
pub use middleware::{ApiKey, ApiKeyLayer, BasicAuth, BasicAuthLayer, BearerAuth, BearerAuthLayer, Logging, LoggingLayer, UserAgentLayer, UserAgentMiddleware};
pub use request::{HttpRequest, RequestOptions, IDEMPOTENCY_KEY_HEADER};
pub use response::HttpResponse;

#[cfg(feature = "metrics")]
pub use metrics::prometheus::PrometheusMetrics;
#[cfg(feature = "otel")]
pub use metrics::otel::OtelMetrics;
