use thiserror::Error;

/// Errors returned by the `CircuitBreaker` service.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<Res, Err> {
    /// The circuit is open; the call was short-circuited instead of
    /// reaching the inner service. Carries a clone of the response captured
    /// at the most recent failure, if one has ever been recorded.
    #[error("circuit is open; call not permitted")]
    OpenCircuit { cached_response: Option<Res> },

    /// An error returned by the inner service.
    #[error("inner service error: {0}")]
    Inner(Err),
}

impl<Res, Err> CircuitBreakerError<Res, Err> {
    /// Returns true if the error indicates the circuit is open.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CircuitBreakerError::OpenCircuit { .. })
    }

    /// Returns the cached response captured at the last failure, if the
    /// circuit was open and a failure response had previously been recorded.
    pub fn cached_response(&self) -> Option<Option<Res>>
    where
        Res: Clone,
    {
        match self {
            CircuitBreakerError::OpenCircuit { cached_response } => {
                Some(cached_response.clone())
            }
            CircuitBreakerError::Inner(_) => None,
        }
    }

    /// Returns the inner error if present.
    pub fn into_inner(self) -> Option<Err> {
        match self {
            CircuitBreakerError::Inner(e) => Some(e),
            _ => None,
        }
    }
}
