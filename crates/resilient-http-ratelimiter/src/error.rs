use thiserror::Error;

/// Error surfaced by the rate-limited service.
///
/// The limiter itself never rejects a call — it only delays one, per the
/// token-bucket contract — so the only variant here passes the inner
/// service's error through unchanged.
#[derive(Debug, Error)]
pub enum RateLimiterError<E> {
    /// An error returned by the inner service.
    #[error("inner service error: {0}")]
    Inner(E),
}

impl<E> RateLimiterError<E> {
    /// Returns the inner error.
    pub fn into_inner(self) -> E {
        match self {
            RateLimiterError::Inner(e) => e,
        }
    }
}

impl<E> From<E> for RateLimiterError<E> {
    fn from(err: E) -> Self {
        RateLimiterError::Inner(err)
    }
}
