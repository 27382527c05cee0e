use crate::error::ClosedBodyError;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The body supplied with an outgoing request.
///
/// Retries require a replayable body: [`RequestBody::Bytes`] is rewound by
/// simply re-sending the same buffer, while [`RequestBody::NonRewindable`]
/// models a caller-supplied reader with no seek capability. The client
/// rejects the latter at first attempt if the request is retryable.
#[derive(Clone)]
pub enum RequestBody {
    Empty,
    Bytes(Bytes),
    NonRewindable,
}

impl RequestBody {
    pub fn is_rewindable(&self) -> bool {
        !matches!(self, RequestBody::NonRewindable)
    }

    pub(crate) fn as_bytes(&self) -> Bytes {
        match self {
            RequestBody::Empty => Bytes::new(),
            RequestBody::Bytes(b) => b.clone(),
            RequestBody::NonRewindable => Bytes::new(),
        }
    }

    pub(crate) fn len(&self) -> Option<usize> {
        match self {
            RequestBody::Empty => Some(0),
            RequestBody::Bytes(b) => Some(b.len()),
            RequestBody::NonRewindable => None,
        }
    }
}

/// A context-aware wrapper around a fully materialized response body.
///
/// The body is read into memory once by the transport executor; `close`
/// cancels the owning attempt's context exactly once via a single-shot
/// guard. Per the response envelope invariant, the attempt context is kept
/// alive between header receipt and body close, so a caller that reads the
/// body long after the per-attempt timeout elapsed still succeeds, as the
/// bytes are already resident.
///
/// Clones never share the close guard or the on-close callback — each
/// clone (as produced when the circuit breaker caches a failure response)
/// behaves as an independent reader.
pub struct ResponseBody {
    bytes: Bytes,
    closed: Arc<AtomicBool>,
    on_close: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl ResponseBody {
    pub(crate) fn new(bytes: Bytes) -> Self {
        Self {
            bytes,
            closed: Arc::new(AtomicBool::new(false)),
            on_close: None,
        }
    }

    pub(crate) fn with_on_close(bytes: Bytes, on_close: Arc<dyn Fn() + Send + Sync>) -> Self {
        Self {
            bytes,
            closed: Arc::new(AtomicBool::new(false)),
            on_close: Some(on_close),
        }
    }

    /// Returns the buffered bytes, or a closed-body error if `close` already ran.
    pub fn bytes(&self) -> Result<Bytes, ClosedBodyError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClosedBodyError);
        }
        Ok(self.bytes.clone())
    }

    /// Reads the body as UTF-8 text, or a closed-body error if already closed.
    pub fn text(&self) -> Result<String, ClosedBodyError> {
        let bytes = self.bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    #[cfg(feature = "json")]
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, crate::DecodeError> {
        let bytes = self.bytes().map_err(crate::DecodeError::Closed)?;
        serde_json::from_slice(&bytes).map_err(crate::DecodeError::Json)
    }

    /// Idempotently closes the body, firing the attempt cancellation exactly
    /// once. Safe to call more than once; later calls are no-ops.
    pub fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            if let Some(cb) = &self.on_close {
                cb();
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Clone for ResponseBody {
    fn clone(&self) -> Self {
        // A clone is a fresh reader over the same immutable buffer with its
        // own close guard — closing one clone never affects another.
        Self {
            bytes: self.bytes.clone(),
            closed: Arc::new(AtomicBool::new(false)),
            on_close: None,
        }
    }
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseBody")
            .field("len", &self.bytes.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
