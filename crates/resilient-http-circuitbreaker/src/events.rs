use crate::circuit::CircuitState;
use resilient_http_core::ClientEvent;
use std::time::Instant;

/// Events emitted by a circuit breaker as it admits, permits, and records
/// outcomes for calls.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// The breaker moved from one state to another.
    StateTransition {
        layer_name: String,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    /// A call was allowed to reach the inner service.
    CallPermitted {
        layer_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A call was short-circuited because the breaker is open.
    CallRejected {
        layer_name: String,
        timestamp: Instant,
    },
    /// A permitted call completed successfully.
    SuccessRecorded {
        layer_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A permitted call was classified as a failure.
    FailureRecorded {
        layer_name: String,
        timestamp: Instant,
        state: CircuitState,
    },
}

impl ClientEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::CallPermitted { .. } => "call_permitted",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
            CircuitBreakerEvent::SuccessRecorded { .. } => "success_recorded",
            CircuitBreakerEvent::FailureRecorded { .. } => "failure_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::SuccessRecorded { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn layer_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { layer_name, .. }
            | CircuitBreakerEvent::CallPermitted { layer_name, .. }
            | CircuitBreakerEvent::CallRejected { layer_name, .. }
            | CircuitBreakerEvent::SuccessRecorded { layer_name, .. }
            | CircuitBreakerEvent::FailureRecorded { layer_name, .. } => layer_name,
        }
    }
}
