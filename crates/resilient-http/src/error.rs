use http::{HeaderMap, Method, StatusCode};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The three outcome buckets the transport executor classifies every
/// attempt into. Mirrors the `retries_total` metric's `reason` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A response was received but its status fell outside the acceptable set.
    Status,
    /// The per-attempt or overall deadline elapsed before a response arrived.
    Timeout,
    /// A connection-level failure: refused, reset, DNS, or similar.
    Net,
}

impl ErrorKind {
    pub(crate) fn as_label(&self) -> &'static str {
        match self {
            ErrorKind::Status => "status",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Net => "net",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

/// An error raised by the transport while dispatching one attempt.
///
/// Unlike HTTP status codes, which are returned as ordinary responses, this
/// represents a failure to complete the round trip at all.
#[derive(Debug, Error)]
#[error("{kind} error: {source}")]
pub struct TransportError {
    kind: ErrorKind,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl TransportError {
    pub(crate) fn timeout(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            source: Box::new(source),
        }
    }

    pub(crate) fn net(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            kind: ErrorKind::Net,
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    pub fn is_net(&self) -> bool {
        self.kind == ErrorKind::Net
    }
}

/// Raised by convenience wrappers (e.g. [`crate::HttpResponse::into_result`])
/// when a response carries a status code of 400 or above. The core pipeline
/// never synthesizes this itself — it returns such responses unchanged.
#[derive(Debug, Error)]
#[error("{method} {url} returned {status}")]
pub struct HTTPError {
    pub status: StatusCode,
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
}

/// Raised by convenience wrappers when every retry attempt is exhausted
/// without ever producing a response (a pure transport failure).
#[derive(Debug, Error)]
#[error("exhausted {max} attempts, last error: {last_error}")]
pub struct MaxAttemptsExceeded {
    pub max: usize,
    #[source]
    pub last_error: TransportError,
    pub last_status: Option<StatusCode>,
}

/// The kind of deadline a [`TimeoutError`] blew past.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// The overall call deadline elapsed across all attempts.
    Overall,
    /// A single attempt exceeded the per-attempt timeout.
    PerTry,
    /// The caller-supplied context/deadline was cancelled.
    Context,
}

/// Produced when the transport classifies a timeout on the terminal attempt.
#[derive(Debug, Error)]
#[error("{method} {url} timed out ({kind:?}, attempt {attempt}/{max}, elapsed {elapsed:?})")]
pub struct TimeoutError {
    pub method: Method,
    pub url: String,
    pub host: String,
    pub overall: Duration,
    pub per_try: Duration,
    pub elapsed: Duration,
    pub attempt: usize,
    pub max: usize,
    pub kind: TimeoutKind,
    pub suggestions: Vec<String>,
    #[source]
    pub(crate) source: TransportError,
}

/// Raised at client construction when a configured numeric bound is invalid.
#[derive(Debug, Clone, Error)]
#[error("invalid configuration for `{field}` ({value}): {message}")]
pub struct ConfigurationError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

/// Raised when a response body is read after [`crate::ResponseBody::close`]
/// has already run.
#[derive(Debug, Clone, Copy, Error)]
#[error("read on closed body")]
pub struct ClosedBodyError;

/// Raised by the `json` body helpers.
#[cfg(feature = "json")]
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{0}")]
    Closed(#[from] ClosedBodyError),
    #[error("failed to decode JSON body: {0}")]
    Json(#[source] serde_json::Error),
}

/// The sentinel returned by every error path of [`crate::Client::execute`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport failed to complete the round trip.
    #[error("{0}")]
    Transport(#[from] TransportError),
    /// The terminal attempt blew past a deadline.
    #[error("{0}")]
    Timeout(#[from] TimeoutError),
    /// The circuit is open; carries the cached last-failure response, if any.
    #[error("circuit is open; call not permitted")]
    BreakerOpen { cached: Option<crate::HttpResponse> },
    /// Every attempt was exhausted without ever producing a response.
    #[error("{0}")]
    MaxAttemptsExceeded(#[from] MaxAttemptsExceeded),
    /// The request body is not rewindable but the request is retryable.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),
    /// The caller's deadline was cancelled before a response arrived.
    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    pub fn is_breaker_open(&self) -> bool {
        matches!(self, ClientError::BreakerOpen { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}
