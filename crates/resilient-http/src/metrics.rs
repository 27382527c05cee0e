//! The metric schema described by the client façade: stable names and
//! label sets, behind a provider abstraction so hosts can swap in
//! Prometheus, OpenTelemetry, or nothing at all.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// Default histogram buckets (seconds) for `http_client_request_duration_seconds`.
pub const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 7.0, 10.0, 13.0, 16.0,
    20.0, 25.0, 30.0, 40.0, 50.0, 60.0,
];

/// Default histogram buckets (bytes) for the request/response size histograms.
pub const SIZE_BUCKETS: &[f64] = &[
    256.0, 1024.0, 4096.0, 16384.0, 65536.0, 262144.0, 1048576.0, 4194304.0, 16777216.0,
];

/// Labels attached to `http_client_requests_total`.
#[derive(Clone, Debug)]
pub struct RequestLabels<'a> {
    pub client_name: &'a str,
    pub method: &'a str,
    pub host: &'a str,
    pub status: &'a str,
    pub retry: bool,
    pub error: bool,
}

/// Labels attached to `http_client_request_duration_seconds`.
#[derive(Clone, Debug)]
pub struct DurationLabels<'a> {
    pub client_name: &'a str,
    pub method: &'a str,
    pub host: &'a str,
    pub status: &'a str,
    pub attempt: usize,
}

/// Abstract sink for the client's metric schema. Every operation must be
/// safe under concurrent calls from multiple attempts and calls.
pub trait MetricsProvider: Send + Sync {
    fn record_request(&self, labels: RequestLabels<'_>);
    fn record_duration(&self, labels: DurationLabels<'_>, seconds: f64);
    fn record_retry(&self, client_name: &str, reason: &str, method: &str, host: &str);
    fn record_request_size(&self, client_name: &str, method: &str, host: &str, bytes: u64);
    fn record_response_size(&self, client_name: &str, method: &str, host: &str, bytes: u64);
    fn inflight_inc(&self, client_name: &str, method: &str, host: &str);
    fn inflight_dec(&self, client_name: &str, method: &str, host: &str);
    /// Released when the owning client is dropped; a no-op for most providers.
    fn close(&self) {}
}

/// The default provider: every operation is a no-op.
#[derive(Default, Debug, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsProvider for NoopMetrics {
    fn record_request(&self, _labels: RequestLabels<'_>) {}
    fn record_duration(&self, _labels: DurationLabels<'_>, _seconds: f64) {}
    fn record_retry(&self, _client_name: &str, _reason: &str, _method: &str, _host: &str) {}
    fn record_request_size(&self, _client_name: &str, _method: &str, _host: &str, _bytes: u64) {}
    fn record_response_size(&self, _client_name: &str, _method: &str, _host: &str, _bytes: u64) {}
    fn inflight_inc(&self, _client_name: &str, _method: &str, _host: &str) {}
    fn inflight_dec(&self, _client_name: &str, _method: &str, _host: &str) {}
}

/// Providers are cached by `client_name` so that two clients constructed
/// with the same name share one set of registered instruments instead of
/// panicking on double registration.
static PROVIDER_CACHE: OnceLock<Mutex<HashMap<String, Arc<dyn MetricsProvider>>>> = OnceLock::new();

pub(crate) fn cached_provider(
    client_name: &str,
    factory: impl FnOnce() -> Arc<dyn MetricsProvider>,
) -> Arc<dyn MetricsProvider> {
    let cache = PROVIDER_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut guard = cache.lock().expect("metrics provider cache poisoned");
    guard
        .entry(client_name.to_string())
        .or_insert_with(factory)
        .clone()
}

#[cfg(feature = "metrics")]
pub mod prometheus {
    use super::*;
    use metrics::{counter, describe_counter, describe_histogram, gauge, histogram};
    use std::sync::Once;

    static INIT: Once = Once::new();

    fn describe() {
        INIT.call_once(|| {
            describe_counter!("http_client_requests_total", "Total HTTP client requests by outcome");
            describe_histogram!(
                "http_client_request_duration_seconds",
                "Observed duration of each HTTP client attempt"
            );
            describe_counter!("http_client_retries_total", "Total scheduled retries by reason");
            describe_counter!("http_client_inflight_requests", "In-flight HTTP client requests");
            describe_histogram!("http_client_request_size_bytes", "Request body size in bytes");
            describe_histogram!("http_client_response_size_bytes", "Response body size in bytes");
        });
    }

    /// A [`MetricsProvider`] backed by the `metrics` facade crate, compatible
    /// with any installed Prometheus-style exporter.
    #[derive(Default, Debug, Clone, Copy)]
    pub struct PrometheusMetrics;

    impl PrometheusMetrics {
        pub fn new() -> Self {
            describe();
            Self
        }
    }

    impl MetricsProvider for PrometheusMetrics {
        fn record_request(&self, l: RequestLabels<'_>) {
            counter!(
                "http_client_requests_total",
                "client_name" => l.client_name.to_string(),
                "method" => l.method.to_string(),
                "host" => l.host.to_string(),
                "status" => l.status.to_string(),
                "retry" => l.retry.to_string(),
                "error" => l.error.to_string(),
            )
            .increment(1);
        }

        fn record_duration(&self, l: DurationLabels<'_>, seconds: f64) {
            histogram!(
                "http_client_request_duration_seconds",
                "client_name" => l.client_name.to_string(),
                "method" => l.method.to_string(),
                "host" => l.host.to_string(),
                "status" => l.status.to_string(),
                "attempt" => l.attempt.to_string(),
            )
            .record(seconds);
        }

        fn record_retry(&self, client_name: &str, reason: &str, method: &str, host: &str) {
            counter!(
                "http_client_retries_total",
                "client_name" => client_name.to_string(),
                "reason" => reason.to_string(),
                "method" => method.to_string(),
                "host" => host.to_string(),
            )
            .increment(1);
        }

        fn record_request_size(&self, client_name: &str, method: &str, host: &str, bytes: u64) {
            histogram!(
                "http_client_request_size_bytes",
                "client_name" => client_name.to_string(),
                "method" => method.to_string(),
                "host" => host.to_string(),
            )
            .record(bytes as f64);
        }

        fn record_response_size(&self, client_name: &str, method: &str, host: &str, bytes: u64) {
            histogram!(
                "http_client_response_size_bytes",
                "client_name" => client_name.to_string(),
                "method" => method.to_string(),
                "host" => host.to_string(),
            )
            .record(bytes as f64);
        }

        fn inflight_inc(&self, client_name: &str, method: &str, host: &str) {
            gauge!(
                "http_client_inflight_requests",
                "client_name" => client_name.to_string(),
                "method" => method.to_string(),
                "host" => host.to_string(),
            )
            .increment(1.0);
        }

        fn inflight_dec(&self, client_name: &str, method: &str, host: &str) {
            gauge!(
                "http_client_inflight_requests",
                "client_name" => client_name.to_string(),
                "method" => method.to_string(),
                "host" => host.to_string(),
            )
            .decrement(1.0);
        }
    }
}

#[cfg(feature = "otel")]
pub mod otel {
    use super::*;
    use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};
    use opentelemetry::KeyValue;

    /// A [`MetricsProvider`] backed by an OpenTelemetry [`Meter`].
    pub struct OtelMetrics {
        requests_total: Counter<u64>,
        duration_seconds: Histogram<f64>,
        retries_total: Counter<u64>,
        request_size_bytes: Histogram<u64>,
        response_size_bytes: Histogram<u64>,
        inflight: UpDownCounter<i64>,
    }

    impl OtelMetrics {
        pub fn new(meter: &Meter) -> Self {
            Self {
                requests_total: meter.u64_counter("http_client_requests_total").build(),
                duration_seconds: meter
                    .f64_histogram("http_client_request_duration_seconds")
                    .build(),
                retries_total: meter.u64_counter("http_client_retries_total").build(),
                request_size_bytes: meter.u64_histogram("http_client_request_size_bytes").build(),
                response_size_bytes: meter
                    .u64_histogram("http_client_response_size_bytes")
                    .build(),
                inflight: meter.i64_up_down_counter("http_client_inflight_requests").build(),
            }
        }
    }

    impl MetricsProvider for OtelMetrics {
        fn record_request(&self, l: RequestLabels<'_>) {
            self.requests_total.add(
                1,
                &[
                    KeyValue::new("client_name", l.client_name.to_string()),
                    KeyValue::new("method", l.method.to_string()),
                    KeyValue::new("host", l.host.to_string()),
                    KeyValue::new("status", l.status.to_string()),
                    KeyValue::new("retry", l.retry),
                    KeyValue::new("error", l.error),
                ],
            );
        }

        fn record_duration(&self, l: DurationLabels<'_>, seconds: f64) {
            self.duration_seconds.record(
                seconds,
                &[
                    KeyValue::new("client_name", l.client_name.to_string()),
                    KeyValue::new("method", l.method.to_string()),
                    KeyValue::new("host", l.host.to_string()),
                    KeyValue::new("status", l.status.to_string()),
                    KeyValue::new("attempt", l.attempt as i64),
                ],
            );
        }

        fn record_retry(&self, client_name: &str, reason: &str, method: &str, host: &str) {
            self.retries_total.add(
                1,
                &[
                    KeyValue::new("client_name", client_name.to_string()),
                    KeyValue::new("reason", reason.to_string()),
                    KeyValue::new("method", method.to_string()),
                    KeyValue::new("host", host.to_string()),
                ],
            );
        }

        fn record_request_size(&self, client_name: &str, method: &str, host: &str, bytes: u64) {
            self.request_size_bytes.record(
                bytes,
                &[
                    KeyValue::new("client_name", client_name.to_string()),
                    KeyValue::new("method", method.to_string()),
                    KeyValue::new("host", host.to_string()),
                ],
            );
        }

        fn record_response_size(&self, client_name: &str, method: &str, host: &str, bytes: u64) {
            self.response_size_bytes.record(
                bytes,
                &[
                    KeyValue::new("client_name", client_name.to_string()),
                    KeyValue::new("method", method.to_string()),
                    KeyValue::new("host", host.to_string()),
                ],
            );
        }

        fn inflight_inc(&self, client_name: &str, method: &str, host: &str) {
            self.inflight.add(
                1,
                &[
                    KeyValue::new("client_name", client_name.to_string()),
                    KeyValue::new("method", method.to_string()),
                    KeyValue::new("host", host.to_string()),
                ],
            );
        }

        fn inflight_dec(&self, client_name: &str, method: &str, host: &str) {
            self.inflight.add(
                -1,
                &[
                    KeyValue::new("client_name", client_name.to_string()),
                    KeyValue::new("method", method.to_string()),
                    KeyValue::new("host", host.to_string()),
                ],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_provider_does_nothing_observable() {
        let m = NoopMetrics;
        m.record_request(RequestLabels {
            client_name: "svc",
            method: "GET",
            host: "example.com",
            status: "200",
            retry: false,
            error: false,
        });
        m.inflight_inc("svc", "GET", "example.com");
        m.inflight_dec("svc", "GET", "example.com");
    }

    #[test]
    fn cached_provider_reuses_instance_for_same_name() {
        let a = cached_provider("dedupe-test", || Arc::new(NoopMetrics));
        let b = cached_provider("dedupe-test", || {
            panic!("factory should not run twice for the same client_name")
        });
        assert!(Arc::ptr_eq(&a, &b));
    }
}
