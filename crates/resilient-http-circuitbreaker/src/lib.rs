//! Circuit breaker pattern for Tower services.
//!
//! A circuit breaker prevents cascading failures by monitoring service calls
//! and temporarily blocking requests once a downstream dependency is clearly
//! unhealthy. Unlike a sliding-window failure-rate breaker, this one tracks
//! only two counters: consecutive failures and consecutive successes, which
//! makes its behavior easy to reason about at small scale.
//!
//! ## States
//! - **Closed**: normal operation; every call reaches the inner service
//! - **Open**: calls are short-circuited with the cached last-failure
//!   response, without consuming a token or invoking downstream middleware
//! - **Half-Open**: a limited number of probe calls test recovery
//!
//! ## Basic Example
//!
//! ```rust
//! use resilient_http_circuitbreaker::{CircuitBreakerLayer, CircuitBreaker, CircuitBreakerConfig};
//! use tower::service_fn;
//! use tower::Layer;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let config: CircuitBreakerConfig<String, ()> = CircuitBreakerConfig::builder()
//!     .failure_threshold(5)
//!     .success_threshold(3)
//!     .open_timeout(Duration::from_secs(60))
//!     .build();
//! let layer = CircuitBreakerLayer::new(config);
//!
//! let svc = service_fn(|req: String| async move {
//!     Ok::<String, ()>(req)
//! });
//! let mut service: CircuitBreaker<_, String, ()> = layer.layer(svc);
//! # }
//! ```
//!
//! ## Custom Failure Classification
//!
//! ```rust
//! use resilient_http_circuitbreaker::CircuitBreakerConfig;
//! use resilient_http_circuitbreaker::classifier::FnClassifier;
//!
//! let config: CircuitBreakerConfig<u16, std::io::Error> = CircuitBreakerConfig::builder()
//!     .failure_classifier(FnClassifier::new(|result: &Result<u16, std::io::Error>| {
//!         match result {
//!             Ok(status) => *status >= 500,
//!             Err(_) => true,
//!         }
//!     }))
//!     .build();
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use resilient_http_circuitbreaker::{CircuitBreakerLayer, CircuitBreakerConfig, CircuitBreakerError};
//! use tower::{Service, Layer, service_fn};
//!
//! # async fn example() {
//! let config: CircuitBreakerConfig<String, ()> = CircuitBreakerConfig::builder().build();
//! let mut service = CircuitBreakerLayer::new(config).layer(service_fn(|req: String| async move {
//!     Ok::<_, ()>(req)
//! }));
//!
//! match service.call("request".to_string()).await {
//!     Ok(response) => println!("Success: {}", response),
//!     Err(CircuitBreakerError::OpenCircuit { cached_response: _ }) => {
//!         eprintln!("Circuit breaker is open");
//!     }
//!     Err(CircuitBreakerError::Inner(e)) => {
//!         eprintln!("Service error: {:?}", e);
//!     }
//! }
//! # }
//! ```
//!
//! ## Feature Flags
//! - `metrics`: enables metrics collection using the `metrics` crate
//! - `tracing`: enables logging and tracing using the `tracing` crate

use crate::circuit::{Admission, Circuit};
use futures::future::BoxFuture;
#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};
use std::sync::atomic::AtomicU8;
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::sync::Once;
use std::task::{Context, Poll};
use tokio::sync::Mutex;
use tower::Service;

pub use circuit::CircuitState;
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;
pub use layer::CircuitBreakerLayer;

pub mod classifier;
mod circuit;
mod config;
mod error;
mod events;
mod layer;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

#[cfg(feature = "metrics")]
fn init_metrics_descriptions() {
    METRICS_INIT.call_once(|| {
        describe_counter!(
            "circuitbreaker_calls_total",
            "Total number of calls through the circuit breaker"
        );
        describe_counter!(
            "circuitbreaker_transitions_total",
            "Total number of circuit breaker state transitions"
        );
        describe_gauge!(
            "circuitbreaker_state",
            "Current state of the circuit breaker (0=closed, 1=open, 2=half-open)"
        );
    });
}

/// A Tower [`Service`] that applies circuit breaker logic to an inner
/// service, short-circuiting with a cached response while open.
pub struct CircuitBreaker<S, Res, Err> {
    inner: S,
    circuit: Arc<Mutex<Circuit<Res>>>,
    state_atomic: Arc<AtomicU8>,
    config: Arc<CircuitBreakerConfig<Res, Err>>,
}

impl<S, Res, Err> CircuitBreaker<S, Res, Err>
where
    Res: Clone,
{
    /// Creates a new `CircuitBreaker` wrapping the given service and configuration.
    pub(crate) fn new(inner: S, config: Arc<CircuitBreakerConfig<Res, Err>>) -> Self {
        #[cfg(feature = "metrics")]
        init_metrics_descriptions();

        let state_atomic = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        Self {
            inner,
            circuit: Arc::new(Mutex::new(Circuit::new_with_atomic(Arc::clone(
                &state_atomic,
            )))),
            state_atomic,
            config,
        }
    }

    /// Forces the circuit into the open state.
    pub async fn force_open(&self) {
        let mut circuit = self.circuit.lock().await;
        circuit.force_open(&self.config);
    }

    /// Forces the circuit into the closed state.
    pub async fn force_closed(&self) {
        let mut circuit = self.circuit.lock().await;
        circuit.force_closed(&self.config);
    }

    /// Resets the circuit to the closed state and clears counters and the
    /// cached failure response.
    pub async fn reset(&self) {
        let mut circuit = self.circuit.lock().await;
        circuit.reset(&self.config);
    }

    /// Returns the current state of the circuit.
    pub async fn state(&self) -> CircuitState {
        let circuit = self.circuit.lock().await;
        circuit.state()
    }

    /// Returns the current state of the circuit without requiring async context.
    ///
    /// Safe to call from sync code (e.g. metrics collection, health checks).
    /// Reads from an `AtomicU8` kept synchronized with the actual state.
    pub fn state_sync(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(std::sync::atomic::Ordering::Acquire))
    }
}

impl<S, Res, Err> Clone for CircuitBreaker<S, Res, Err>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            circuit: Arc::clone(&self.circuit),
            state_atomic: Arc::clone(&self.state_atomic),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Req, Res, Err> Service<Req> for CircuitBreaker<S, Res, Err>
where
    S: Service<Req, Response = Res, Error = Err> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Res: Clone + Send + 'static,
    Err: Send + 'static,
    Req: Send + 'static,
{
    type Response = Res;
    type Error = CircuitBreakerError<Res, Err>;
    type Future = BoxFuture<'static, Result<Res, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(CircuitBreakerError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let config = Arc::clone(&self.config);
        let circuit = Arc::clone(&self.circuit);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let admission = {
                let mut circuit = circuit.lock().await;
                circuit.admit(&config)
            };

            let cached = match admission {
                Admission::Permitted => None,
                Admission::Rejected { cached } => Some(cached),
            };

            if let Some(cached_response) = cached {
                return Err(CircuitBreakerError::OpenCircuit { cached_response });
            }

            let result = inner.call(req).await;

            let mut circuit = circuit.lock().await;
            if config.failure_classifier.classify(&result) {
                circuit.record_failure(&config, result.as_ref().ok().cloned());
            } else {
                circuit.record_success(&config);
            }
            drop(circuit);

            result.map_err(CircuitBreakerError::Inner)
        })
    }
}
