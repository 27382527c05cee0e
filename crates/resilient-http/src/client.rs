use crate::config::ClientConfig;
use crate::error::{
    ClientError, ConfigurationError, MaxAttemptsExceeded, TimeoutError, TimeoutKind, TransportError,
};
use crate::metrics::{DurationLabels, MetricsProvider, RequestLabels};
use crate::middleware::LoggingLayer;
use crate::pipeline::{FlattenBreaker, FlattenLimiter, PipelineError};
use crate::request::{HttpRequest, RequestOptions};
use crate::response::HttpResponse;
use crate::transport::{PerAttemptTimeout, ReqwestTransport};
use http::Method;
use resilient_http_circuitbreaker::classifier::FnClassifier;
use resilient_http_circuitbreaker::CircuitBreakerConfig;
use resilient_http_ratelimiter::RateLimiterLayer;
use resilient_http_retry::{RetryPolicy, RetryPolicyBuilder};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::util::BoxCloneService;
use tower::{Layer, Service, ServiceExt};
use url::Url;

type BoxedTransport = BoxCloneService<HttpRequest, HttpResponse, TransportError>;
type PipelineService = FlattenLimiter<FlattenBreaker<BoxedTransport>>;

fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(secs) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let when = httpdate::parse_http_date(value.trim()).ok()?;
    let now = std::time::SystemTime::now();
    when.duration_since(now).ok()
}

fn classify_outcome(
    retryable_status: Arc<std::collections::HashSet<u16>>,
) -> impl Fn(&Result<HttpResponse, TransportError>) -> Option<resilient_http_retry::RetryReason> + Send + Sync + 'static {
    use resilient_http_retry::RetryReason;
    move |outcome| match outcome {
        Ok(resp) if retryable_status.contains(&resp.status.as_u16()) => Some(RetryReason::Status),
        Ok(_) => None,
        Err(e) if e.is_timeout() => Some(RetryReason::Timeout),
        Err(_) => Some(RetryReason::Net),
    }
}

/// Guards the inflight gauge for the lifetime of one logical call,
/// regardless of which return path is taken.
struct InflightGuard {
    metrics: Arc<dyn MetricsProvider>,
    client_name: String,
    method: String,
    host: String,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.metrics.inflight_dec(&self.client_name, &self.method, &self.host);
    }
}

/// A resilient HTTP client: timeouts, retries, circuit breaking, and rate
/// limiting composed around an underlying `reqwest` transport.
#[derive(Clone)]
pub struct Client {
    client_name: String,
    config: ClientConfig,
    metrics: Arc<dyn MetricsProvider>,
    retry_policy: RetryPolicy<HttpRequest, HttpResponse, TransportError>,
    pipeline: PipelineService,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Starts building a request; apply options, then pass to [`Client::execute`].
    pub fn request(&self, method: Method, url: &str) -> Result<RequestOptions, ConfigurationError> {
        let url = Url::parse(url).map_err(|e| ConfigurationError {
            field: "url",
            value: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(RequestOptions::new(method, url))
    }

    pub fn get(&self, url: &str) -> Result<RequestOptions, ConfigurationError> {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: &str) -> Result<RequestOptions, ConfigurationError> {
        self.request(Method::POST, url)
    }

    pub fn put(&self, url: &str) -> Result<RequestOptions, ConfigurationError> {
        self.request(Method::PUT, url)
    }

    pub fn patch(&self, url: &str) -> Result<RequestOptions, ConfigurationError> {
        self.request(Method::PATCH, url)
    }

    pub fn delete(&self, url: &str) -> Result<RequestOptions, ConfigurationError> {
        self.request(Method::DELETE, url)
    }

    pub fn head(&self, url: &str) -> Result<RequestOptions, ConfigurationError> {
        self.request(Method::HEAD, url)
    }

    /// Runs the per-call algorithm: deadline computation, inflight
    /// tracking, and the attempt loop composing limiter, breaker,
    /// middleware, transport, and the retry decision.
    pub async fn execute(&self, req: HttpRequest) -> Result<HttpResponse, ClientError> {
        let retry_enabled = self.config.retry.enabled;
        let retryable = req.is_retryable_by_default();

        if retry_enabled && retryable && !req.body.is_rewindable() {
            return Err(ClientError::Configuration(ConfigurationError {
                field: "body",
                value: "non-rewindable".into(),
                message: "retries are enabled for a retryable request but the body cannot be replayed".into(),
            }));
        }

        let max_attempts = if retry_enabled && retryable {
            self.config.retry.max_attempts
        } else {
            1
        };

        let method = req.method.as_str().to_string();
        let host = req.host();
        let deadline = Instant::now() + self.config.overall_timeout;

        self.metrics.inflight_inc(&self.client_name, &method, &host);
        let _guard = InflightGuard {
            metrics: Arc::clone(&self.metrics),
            client_name: self.client_name.clone(),
            method: method.clone(),
            host: host.clone(),
        };

        let mut attempt = 0usize;
        let mut last_resp: Option<HttpResponse> = None;
        let mut last_err: Option<TransportError> = None;
        let call_start = Instant::now();

        loop {
            attempt += 1;

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let remaining = deadline - now;
            let effective_timeout = remaining.min(
                req.per_attempt_timeout
                    .unwrap_or(self.config.per_attempt_timeout),
            );

            let mut attempt_req = req.clone();
            attempt_req.per_attempt_timeout = Some(effective_timeout);

            let start = Instant::now();
            let mut pipeline = self.pipeline.clone();
            let result = match pipeline.ready().await {
                Ok(svc) => svc.call(attempt_req).await,
                Err(e) => Err(e),
            };
            let dur = start.elapsed();

            // Per component D, a breaker-open short-circuit is not a real
            // attempt: no request/retry metrics are recorded for it.
            if let Err(PipelineError::BreakerOpen(cached)) = result {
                return Err(ClientError::BreakerOpen { cached });
            }

            let outcome: Result<HttpResponse, TransportError> = match result {
                Ok(resp) => Ok(resp),
                Err(PipelineError::Transport(e)) => Err(e),
                Err(PipelineError::BreakerOpen(_)) => unreachable!("handled above"),
            };

            let status_label = match &outcome {
                Ok(resp) => resp.status.as_u16().to_string(),
                Err(_) => "0".to_string(),
            };

            self.metrics.record_request(RequestLabels {
                client_name: &self.client_name,
                method: &method,
                host: &host,
                status: &status_label,
                retry: attempt > 1,
                error: outcome.is_err(),
            });
            self.metrics.record_duration(
                DurationLabels {
                    client_name: &self.client_name,
                    method: &method,
                    host: &host,
                    status: &status_label,
                    attempt,
                },
                dur.as_secs_f64(),
            );
            if let Some(len) = req.body.len() {
                self.metrics.record_request_size(&self.client_name, &method, &host, len as u64);
            }
            if let Ok(resp) = &outcome {
                if let Ok(bytes) = resp.bytes() {
                    self.metrics
                        .record_response_size(&self.client_name, &method, &host, bytes.len() as u64);
                }
            }

            let should_retry = if retry_enabled && retryable {
                self.retry_policy
                    .should_retry(&req, attempt, max_attempts, &outcome)
            } else {
                None
            };

            if let Some(reason) = should_retry {
                self.metrics
                    .record_retry(&self.client_name, reason.as_label(), &method, &host);

                let delay = self.retry_policy.next_delay(attempt, outcome.as_ref().ok());
                let remaining_after = deadline.saturating_duration_since(Instant::now());
                let sleep_for = delay.min(remaining_after);

                if let Ok(resp) = &outcome {
                    resp.close();
                }

                match outcome {
                    Ok(resp) => last_resp = Some(resp),
                    Err(e) => last_err = Some(e),
                }

                tokio::time::sleep(sleep_for).await;
                continue;
            }

            return match outcome {
                Ok(resp) => Ok(resp),
                Err(e) => {
                    let elapsed = call_start.elapsed();
                    if e.is_timeout() {
                        Err(ClientError::Timeout(TimeoutError {
                            method: req.method.clone(),
                            url: req.url.to_string(),
                            host,
                            overall: self.config.overall_timeout,
                            per_try: self.config.per_attempt_timeout,
                            elapsed,
                            attempt,
                            max: max_attempts,
                            kind: TimeoutKind::PerTry,
                            suggestions: vec![
                                "increase per_attempt_timeout".to_string(),
                                "increase overall_timeout".to_string(),
                            ],
                            source: e,
                        }))
                    } else {
                        Err(ClientError::MaxAttemptsExceeded(MaxAttemptsExceeded {
                            max: max_attempts,
                            last_error: e,
                            last_status: None,
                        }))
                    }
                }
            };
        }

        // The overall deadline elapsed between attempts.
        if let Some(resp) = last_resp {
            return Ok(resp);
        }
        let elapsed = call_start.elapsed();
        match last_err {
            Some(e) if e.is_timeout() => Err(ClientError::Timeout(TimeoutError {
                method: req.method.clone(),
                url: req.url.to_string(),
                host,
                overall: self.config.overall_timeout,
                per_try: self.config.per_attempt_timeout,
                elapsed,
                attempt,
                max: max_attempts,
                kind: TimeoutKind::Overall,
                suggestions: vec!["increase overall_timeout".to_string()],
                source: e,
            })),
            Some(e) => Err(ClientError::MaxAttemptsExceeded(MaxAttemptsExceeded {
                max: max_attempts,
                last_error: e,
                last_status: None,
            })),
            None => Err(ClientError::Timeout(TimeoutError {
                method: req.method.clone(),
                url: req.url.to_string(),
                host,
                overall: self.config.overall_timeout,
                per_try: self.config.per_attempt_timeout,
                elapsed,
                attempt,
                max: max_attempts,
                kind: TimeoutKind::Overall,
                suggestions: vec!["increase overall_timeout".to_string()],
                source: TransportError::timeout(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "overall deadline elapsed before any attempt completed",
                )),
            })),
        }
    }
}

/// Builds a [`Client`], composing the transport with optional user
/// middleware before wiring up the breaker and limiter stages.
pub struct ClientBuilder {
    config: ClientConfig,
    http_client: Option<reqwest::Client>,
    middleware: Vec<Box<dyn FnOnce(BoxedTransport) -> BoxedTransport + Send>>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            config: ClientConfig::default(),
            http_client: None,
            middleware: Vec::new(),
        }
    }
}

impl ClientBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Adds a user middleware layer, inserted between the breaker and the
    /// transport, per the chain ordering contract.
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedTransport> + Send + 'static,
        L::Service: Service<HttpRequest, Response = HttpResponse, Error = TransportError> + Clone + Send + 'static,
        <L::Service as Service<HttpRequest>>::Future: Send + 'static,
    {
        self.middleware.push(Box::new(move |svc| BoxedTransport::new(layer.layer(svc))));
        self
    }

    pub fn build(self, client_name: impl Into<String>) -> Result<Client, ConfigurationError> {
        let client_name = client_name.into();
        if client_name.is_empty() {
            return Err(ConfigurationError {
                field: "client_name",
                value: String::new(),
                message: "must be non-empty".into(),
            });
        }

        let reqwest_client = self.http_client.unwrap_or_else(|| {
            reqwest::Client::builder()
                .build()
                .expect("default reqwest client configuration is always valid")
        });

        let transport = PerAttemptTimeout::new(ReqwestTransport::new(reqwest_client), self.config.per_attempt_timeout);
        let mut chain: BoxedTransport = BoxCloneService::new(
            LoggingLayer.layer(transport),
        );
        for mw in self.middleware {
            chain = mw(chain);
        }

        let breaker_config = build_breaker_config(&self.config);
        let breaker = FlattenBreaker::new(chain, breaker_config);

        let limiter_layer = build_limiter_layer(&self.config);
        let pipeline = FlattenLimiter::new(breaker, limiter_layer);

        let retry_policy = build_retry_policy(&self.config);
        let metrics = self.config.metrics_provider(&client_name);

        Ok(Client {
            client_name,
            config: self.config,
            metrics,
            retry_policy,
            pipeline,
        })
    }
}

fn build_breaker_config(config: &ClientConfig) -> CircuitBreakerConfig<HttpResponse, TransportError> {
    let failure_status: Arc<std::collections::HashSet<u16>> = Arc::new(config.breaker.failure_status.clone());

    let failure_threshold = if config.breaker.enabled {
        config.breaker.failure_threshold
    } else {
        u32::MAX
    };

    CircuitBreakerConfig::builder()
        .failure_threshold(failure_threshold)
        .success_threshold(config.breaker.success_threshold.max(1))
        .open_timeout(config.breaker.open_timeout)
        .failure_classifier(FnClassifier::new(move |result: &Result<HttpResponse, TransportError>| match result {
            Ok(resp) => failure_status.contains(&resp.status.as_u16()) || resp.status.as_u16() >= 500,
            Err(_) => true,
        }))
        .build()
}

fn build_limiter_layer(config: &ClientConfig) -> RateLimiterLayer {
    if config.limiter.enabled {
        RateLimiterLayer::builder()
            .requests_per_second(config.limiter.requests_per_second, config.limiter.burst)
            .build()
    } else {
        RateLimiterLayer::builder()
            .requests_per_second(f64::MAX / 2.0, f64::MAX / 2.0)
            .build()
    }
}

fn build_retry_policy(config: &ClientConfig) -> RetryPolicy<HttpRequest, HttpResponse, TransportError> {
    use resilient_http_backoff::CappedExponential;

    let retryable_status: Arc<std::collections::HashSet<u16>> = Arc::new(config.retry.retryable_status.clone());
    let respect_retry_after = config.retry.respect_retry_after;

    let mut builder = RetryPolicyBuilder::new()
        .is_retryable_request(|req: &HttpRequest| req.is_retryable_by_default())
        .classify(classify_outcome(Arc::clone(&retryable_status)))
        .backoff(Arc::new(CappedExponential {
            base: config.retry.base_delay,
            max: config.retry.max_delay,
            jitter: config.retry.jitter,
        }))
        .max_delay(config.retry.max_delay);

    if respect_retry_after {
        builder = builder.retry_after(|resp: &HttpResponse| {
            resp.headers
                .get(http::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after)
        });
    }

    builder.build()
}
