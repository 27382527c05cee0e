//! End-to-end scenarios against a real `wiremock` server, one per testable
//! property in the resilience contract: retry, idempotency, breaker, rate
//! limiter, `Retry-After`, and the response-body lifecycle.

use resilient_http::{
    BreakerSettings, Client, ClientConfig, DurationLabels, LimiterSettings, MetricsProvider,
    RequestLabels, RetrySettings,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Counts `record_request`/`record_duration` calls, to assert breaker-open
/// short-circuits never reach the metrics provider.
#[derive(Default)]
struct CountingMetrics {
    requests: AtomicUsize,
    durations: AtomicUsize,
}

impl MetricsProvider for CountingMetrics {
    fn record_request(&self, _labels: RequestLabels<'_>) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
    fn record_duration(&self, _labels: DurationLabels<'_>, _seconds: f64) {
        self.durations.fetch_add(1, Ordering::SeqCst);
    }
    fn record_retry(&self, _client_name: &str, _reason: &str, _method: &str, _host: &str) {}
    fn record_request_size(&self, _client_name: &str, _method: &str, _host: &str, _bytes: u64) {}
    fn record_response_size(&self, _client_name: &str, _method: &str, _host: &str, _bytes: u64) {}
    fn inflight_inc(&self, _client_name: &str, _method: &str, _host: &str) {}
    fn inflight_dec(&self, _client_name: &str, _method: &str, _host: &str) {}
}

fn retrying_config(max_attempts: usize, base_delay: Duration) -> ClientConfig {
    ClientConfig::builder()
        .overall_timeout(Duration::from_secs(5))
        .per_attempt_timeout(Duration::from_secs(2))
        .retry(RetrySettings {
            enabled: true,
            max_attempts,
            base_delay,
            max_delay: Duration::from_millis(200),
            jitter: 0.0,
            ..RetrySettings::default()
        })
        .build()
        .expect("valid test config")
}

// E1: GET retries on 500 and succeeds on the second attempt.
#[tokio::test]
async fn get_retries_on_500_and_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/thing"))
        .respond_with(ResponseTemplate::new(500).set_body_string("err"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/thing"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .config(retrying_config(2, Duration::from_millis(10)))
        .build("e1")
        .unwrap();

    let resp = client
        .execute(client.get(&format!("{}/thing", server.uri())).unwrap().build())
        .await
        .unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.text().unwrap(), "ok");
}

// E2: POST without an Idempotency-Key is never retried, even with retries enabled.
#[tokio::test]
async fn post_without_idempotency_key_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/charge"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .config(retrying_config(3, Duration::from_millis(10)))
        .build("e2")
        .unwrap();

    let resp = client
        .execute(
            client
                .post(&format!("{}/charge", server.uri()))
                .unwrap()
                .text_body("amount=1")
                .unwrap()
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status, 500);
}

// E3: POST with an Idempotency-Key retries on 503 and succeeds.
#[tokio::test]
async fn post_with_idempotency_key_retries_on_503() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/charge"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/charge"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::builder()
        .config(retrying_config(2, Duration::from_millis(10)))
        .build("e3")
        .unwrap();

    let resp = client
        .execute(
            client
                .post(&format!("{}/charge", server.uri()))
                .unwrap()
                .idempotency_key("op-12345")
                .unwrap()
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status, 201);
}

// E4: once retries are exhausted, the last attempt's status is returned unchanged.
#[tokio::test]
async fn final_status_is_the_last_attempts_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = Client::builder()
        .config(retrying_config(3, Duration::from_millis(5)))
        .build("e4")
        .unwrap();

    let resp = client
        .execute(client.get(&format!("{}/flaky", server.uri())).unwrap().build())
        .await
        .unwrap();

    assert_eq!(resp.status, 502);
}

// E5: the breaker opens after `failure_threshold` failures, short-circuits
// with the cached response, and closes again after `open_timeout`.
#[tokio::test]
async fn breaker_opens_and_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(200).set_body_string("up"))
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .overall_timeout(Duration::from_secs(5))
        .per_attempt_timeout(Duration::from_secs(2))
        .breaker(BreakerSettings {
            enabled: true,
            failure_threshold: 2,
            success_threshold: 1,
            open_timeout: Duration::from_millis(100),
            ..BreakerSettings::default()
        })
        .build()
        .unwrap();
    let client = Client::builder().config(config).build("e5").unwrap();
    let url = format!("{}/down", server.uri());

    for _ in 0..2 {
        let resp = client.execute(client.get(&url).unwrap().build()).await.unwrap();
        assert_eq!(resp.status, 500);
    }

    let err = client.execute(client.get(&url).unwrap().build()).await.unwrap_err();
    assert!(err.is_breaker_open());
    if let resilient_http::ClientError::BreakerOpen { cached } = err {
        let cached = cached.expect("breaker caches the last failure response");
        assert_eq!(cached.status, 500);
        assert_eq!(cached.text().unwrap(), "down");
    } else {
        unreachable!();
    }

    tokio::time::sleep(Duration::from_millis(150)).await;

    let resp = client.execute(client.get(&url).unwrap().build()).await.unwrap();
    assert_eq!(resp.status, 200);
}

// §8.2: a breaker-open short-circuit is not a real attempt — it must not
// increment `requests_total` or `duration_seconds`.
#[tokio::test]
async fn breaker_open_does_not_record_request_metrics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    let metrics = Arc::new(CountingMetrics::default());
    let config = ClientConfig::builder()
        .overall_timeout(Duration::from_secs(5))
        .per_attempt_timeout(Duration::from_secs(2))
        .breaker(BreakerSettings {
            enabled: true,
            failure_threshold: 1,
            success_threshold: 1,
            open_timeout: Duration::from_secs(60),
            ..BreakerSettings::default()
        })
        .metrics_provider(Arc::clone(&metrics) as Arc<dyn MetricsProvider>)
        .build()
        .unwrap();
    let client = Client::builder().config(config).build("breaker-metrics").unwrap();
    let url = format!("{}/down", server.uri());

    let resp = client.execute(client.get(&url).unwrap().build()).await.unwrap();
    assert_eq!(resp.status, 500);
    assert_eq!(metrics.requests.load(Ordering::SeqCst), 1);
    assert_eq!(metrics.durations.load(Ordering::SeqCst), 1);

    let err = client.execute(client.get(&url).unwrap().build()).await.unwrap_err();
    assert!(err.is_breaker_open());
    assert_eq!(
        metrics.requests.load(Ordering::SeqCst),
        1,
        "breaker-open short-circuit must not record a request metric"
    );
    assert_eq!(
        metrics.durations.load(Ordering::SeqCst),
        1,
        "breaker-open short-circuit must not record a duration metric"
    );
}

// E6: the rate limiter smooths a burst rather than rejecting it.
#[tokio::test]
async fn rate_limiter_delays_third_request_in_a_burst() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .overall_timeout(Duration::from_secs(5))
        .per_attempt_timeout(Duration::from_secs(2))
        .limiter(LimiterSettings {
            enabled: true,
            requests_per_second: 2.0,
            burst: 2.0,
        })
        .build()
        .unwrap();
    let client = Client::builder().config(config).build("e6").unwrap();
    let url = format!("{}/ping", server.uri());

    let start = Instant::now();
    client.execute(client.get(&url).unwrap().build()).await.unwrap();
    client.execute(client.get(&url).unwrap().build()).await.unwrap();
    let burst_elapsed = start.elapsed();
    assert!(burst_elapsed < Duration::from_millis(400), "first two should be prompt");

    let third_start = Instant::now();
    client.execute(client.get(&url).unwrap().build()).await.unwrap();
    assert!(third_start.elapsed() >= Duration::from_millis(400));
}

// E7: a `Retry-After: 1` header is honored as a one-second delay.
#[tokio::test]
async fn retry_after_is_honored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(
            ResponseTemplate::new(429).insert_header("Retry-After", "1"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .overall_timeout(Duration::from_secs(5))
        .per_attempt_timeout(Duration::from_secs(2))
        .retry(RetrySettings {
            enabled: true,
            max_attempts: 2,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(5),
            jitter: 0.0,
            respect_retry_after: true,
            ..RetrySettings::default()
        })
        .build()
        .unwrap();
    let client = Client::builder().config(config).build("e7").unwrap();

    let start = Instant::now();
    let resp = client
        .execute(client.get(&format!("{}/limited", server.uri())).unwrap().build())
        .await
        .unwrap();
    assert_eq!(resp.status, 200);
    assert!(start.elapsed() >= Duration::from_secs(1));
}

// E8: the body is still readable well after the per-attempt timeout window,
// since the response was already fully buffered before it elapsed.
#[tokio::test]
async fn body_readable_after_per_attempt_timeout_elapses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quick"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .overall_timeout(Duration::from_secs(5))
        .per_attempt_timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let client = Client::builder().config(config).build("e8").unwrap();

    let resp = client
        .execute(client.get(&format!("{}/quick", server.uri())).unwrap().build())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(resp.text().unwrap(), "hello");
}
