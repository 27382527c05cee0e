use std::fmt;

/// Error returned by the time limiter middleware.
#[derive(Debug, Clone)]
pub enum TimeLimiterError<E> {
    /// The inner service did not complete within the configured timeout.
    Timeout,
    /// The inner service returned an error before the timeout elapsed.
    Inner(E),
}

impl<E> TimeLimiterError<E> {
    /// Returns `true` if this error represents a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TimeLimiterError::Timeout)
    }

    /// Unwraps the inner error, if this is not a timeout.
    pub fn into_inner(self) -> Option<E> {
        match self {
            TimeLimiterError::Inner(e) => Some(e),
            TimeLimiterError::Timeout => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for TimeLimiterError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeLimiterError::Timeout => write!(f, "call timed out"),
            TimeLimiterError::Inner(e) => write!(f, "{e}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for TimeLimiterError<E> {}
