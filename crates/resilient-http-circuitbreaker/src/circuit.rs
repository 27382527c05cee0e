use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

/// State of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    /// Calls are allowed through to the inner service.
    Closed = 0,
    /// Calls are short-circuited with the cached last-failure response.
    Open = 1,
    /// A limited number of probe calls are allowed to test recovery.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

/// Result of a pre-call check against the breaker.
pub(crate) enum Admission<R> {
    /// The call may proceed.
    Permitted,
    /// The call is rejected; `cached` holds the last captured failure
    /// response, if one was ever recorded.
    Rejected { cached: Option<R> },
}

/// Consecutive-failure/success circuit breaker.
///
/// Unlike a sliding-window failure-rate breaker, this tracks only two
/// counters — consecutive failures and consecutive successes — which reset
/// on every state transition and on any success while closed.
pub(crate) struct Circuit<R> {
    state: CircuitState,
    state_atomic: std::sync::Arc<AtomicU8>,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure_at: Option<Instant>,
    cached_last_failure_response: Option<R>,
}

impl<R: Clone> Circuit<R> {
    pub(crate) fn new_with_atomic(state_atomic: std::sync::Arc<AtomicU8>) -> Self {
        Self {
            state: CircuitState::Closed,
            state_atomic,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_failure_at: None,
            cached_last_failure_response: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::new_with_atomic(std::sync::Arc::new(AtomicU8::new(CircuitState::Closed as u8)))
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Checks whether a call may proceed, transitioning Open -> HalfOpen if
    /// `open_timeout` has elapsed. Does not record anything on its own.
    pub fn admit<Err>(&mut self, config: &CircuitBreakerConfig<R, Err>) -> Admission<R> {
        match self.state {
            CircuitState::Closed => {
                self.emit_permitted(config);
                Admission::Permitted
            }
            CircuitState::HalfOpen => {
                self.emit_permitted(config);
                Admission::Permitted
            }
            CircuitState::Open => {
                let elapsed_since_failure = self
                    .last_failure_at
                    .map(|t| t.elapsed())
                    .unwrap_or_default();

                if elapsed_since_failure > config.open_timeout {
                    self.transition_to(CircuitState::HalfOpen, config);
                    self.emit_permitted(config);
                    Admission::Permitted
                } else {
                    config.event_listeners.emit(&CircuitBreakerEvent::CallRejected {
                        layer_name: config.name.clone(),
                        timestamp: Instant::now(),
                    });
                    Admission::Rejected {
                        cached: self.cached_last_failure_response.clone(),
                    }
                }
            }
        }
    }

    fn emit_permitted<Err>(&self, config: &CircuitBreakerConfig<R, Err>) {
        config.event_listeners.emit(&CircuitBreakerEvent::CallPermitted {
            layer_name: config.name.clone(),
            timestamp: Instant::now(),
            state: self.state,
        });
    }

    pub fn record_success<Err>(&mut self, config: &CircuitBreakerConfig<R, Err>) {
        config.event_listeners.emit(&CircuitBreakerEvent::SuccessRecorded {
            layer_name: config.name.clone(),
            timestamp: Instant::now(),
            state: self.state,
        });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "success").increment(1);

        match self.state {
            CircuitState::HalfOpen => {
                self.consecutive_successes += 1;
                if self.consecutive_successes >= config.success_threshold {
                    self.transition_to(CircuitState::Closed, config);
                }
            }
            CircuitState::Closed => {
                self.consecutive_failures = 0;
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure<Err>(&mut self, config: &CircuitBreakerConfig<R, Err>, response: Option<R>) {
        config.event_listeners.emit(&CircuitBreakerEvent::FailureRecorded {
            layer_name: config.name.clone(),
            timestamp: Instant::now(),
            state: self.state,
        });

        #[cfg(feature = "metrics")]
        counter!("circuitbreaker_calls_total", "circuitbreaker" => config.name.clone(), "outcome" => "failure").increment(1);

        self.last_failure_at = Some(Instant::now());
        if response.is_some() {
            self.cached_last_failure_response = response;
        }

        match self.state {
            CircuitState::HalfOpen => {
                self.transition_to(CircuitState::Open, config);
            }
            CircuitState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= config.failure_threshold {
                    self.transition_to(CircuitState::Open, config);
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn force_open<Err>(&mut self, config: &CircuitBreakerConfig<R, Err>) {
        self.transition_to(CircuitState::Open, config);
    }

    pub fn force_closed<Err>(&mut self, config: &CircuitBreakerConfig<R, Err>) {
        self.transition_to(CircuitState::Closed, config);
    }

    pub fn reset<Err>(&mut self, config: &CircuitBreakerConfig<R, Err>) {
        self.cached_last_failure_response = None;
        self.transition_to(CircuitState::Closed, config);
    }

    fn transition_to<Err>(&mut self, state: CircuitState, config: &CircuitBreakerConfig<R, Err>) {
        if self.state == state {
            return;
        }

        let from_state = self.state;

        config.event_listeners.emit(&CircuitBreakerEvent::StateTransition {
            layer_name: config.name.clone(),
            timestamp: Instant::now(),
            from_state,
            to_state: state,
        });

        #[cfg(feature = "tracing")]
        tracing::info!(breaker = %config.name, from = ?from_state, to = ?state, "circuit breaker state transition");

        #[cfg(feature = "metrics")]
        {
            let state_label = match state {
                CircuitState::Closed => "closed",
                CircuitState::Open => "open",
                CircuitState::HalfOpen => "half_open",
            };
            counter!(
                "circuitbreaker_transitions_total",
                "circuitbreaker" => config.name.clone(),
                "to" => state_label
            )
            .increment(1);
            gauge!("circuitbreaker_state", "circuitbreaker" => config.name.clone()).set(state as u8 as f64);
        }

        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.consecutive_failures = 0;
        self.consecutive_successes = 0;
    }
}
