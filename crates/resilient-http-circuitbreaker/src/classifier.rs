//! Failure classification for circuit breaker decisions.
//!
//! An HTTP response is not a transport failure by itself — a `200` and a
//! `503` are both `Ok(Response)` as far as the transport is concerned. This
//! module provides the [`FailureClassifier`] trait the breaker consults to
//! turn a call's outcome (response status, or a transport error) into the
//! pass/fail signal its failure-rate window actually counts.

use std::sync::Arc;

/// Classifies whether a call's outcome should count against the circuit
/// breaker's failure rate.
///
/// `Res` is the response type a permitted call produces on success (for the
/// HTTP client, [`crate`]'s breaker layer is instantiated with the client's
/// response type); `Err` is the transport-level error type for a call that
/// never produced a response at all.
pub trait FailureClassifier<Res, Err>: Send + Sync {
    /// Returns `true` if the outcome should count toward the failure rate.
    fn classify(&self, result: &Result<Res, Err>) -> bool;
}

/// The classifier used when a client doesn't configure its own: every
/// transport error counts as a failure, every response (including error
/// statuses) does not.
///
/// Most HTTP clients want status-aware classification instead — see
/// [`FnClassifier`] — since a `5xx` response is usually exactly the signal
/// the breaker exists to react to.
///
/// # Example
///
/// ```rust
/// use resilient_http_circuitbreaker::classifier::{FailureClassifier, DefaultClassifier};
///
/// struct Response { status: u16 }
/// struct TransportError;
///
/// let classifier = DefaultClassifier;
/// assert!(!classifier.classify(&Ok::<_, TransportError>(Response { status: 503 })));
/// assert!(classifier.classify(&Err::<Response, _>(TransportError)));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl<Res, Err> FailureClassifier<Res, Err> for DefaultClassifier {
    fn classify(&self, result: &Result<Res, Err>) -> bool {
        result.is_err()
    }
}

/// A failure classifier backed by a closure, for clients that need to look
/// inside the response (e.g. at its status code) rather than only at
/// `Ok`/`Err`.
///
/// # Example
///
/// ```rust
/// use resilient_http_circuitbreaker::classifier::{FailureClassifier, FnClassifier};
///
/// struct Response { status: u16 }
/// struct TransportError;
///
/// // Count 5xx responses and transport errors as failures, but let 4xx
/// // responses pass through without tripping the breaker.
/// let classifier = FnClassifier::new(|result: &Result<Response, TransportError>| match result {
///     Ok(resp) => resp.status >= 500,
///     Err(_) => true,
/// });
///
/// assert!(!classifier.classify(&Ok(Response { status: 200 })));
/// assert!(!classifier.classify(&Ok(Response { status: 404 })));
/// assert!(classifier.classify(&Ok(Response { status: 503 })));
/// assert!(classifier.classify(&Err(TransportError)));
/// ```
#[derive(Clone)]
pub struct FnClassifier<F> {
    f: Arc<F>,
}

impl<F> FnClassifier<F> {
    /// Creates a new `FnClassifier` from the given closure.
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F, Res, Err> FailureClassifier<Res, Err> for FnClassifier<F>
where
    F: Fn(&Result<Res, Err>) -> bool + Send + Sync,
{
    fn classify(&self, result: &Result<Res, Err>) -> bool {
        (self.f)(result)
    }
}

impl<F> std::fmt::Debug for FnClassifier<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnClassifier")
            .field("f", &"<closure>")
            .finish()
    }
}
