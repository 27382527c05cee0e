use crate::body::ResponseBody;
use crate::error::HTTPError;
use http::{HeaderMap, Method, StatusCode};

/// A completed response, returned unchanged by the core pipeline regardless
/// of status code — HTTP errors are not synthesized here.
#[derive(Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
    pub(crate) method: Method,
    pub(crate) url: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Convenience wrapper: turns a status ≥ 400 into an [`HTTPError`],
    /// leaving the response available on the error for inspection.
    pub fn error_for_status(self) -> Result<Self, HTTPError> {
        if self.status.as_u16() >= 400 {
            Err(HTTPError {
                status: self.status,
                method: self.method.clone(),
                url: self.url.clone(),
                headers: self.headers.clone(),
            })
        } else {
            Ok(self)
        }
    }

    pub fn text(&self) -> Result<String, crate::ClosedBodyError> {
        self.body.text()
    }

    pub fn bytes(&self) -> Result<bytes::Bytes, crate::ClosedBodyError> {
        self.body.bytes()
    }

    #[cfg(feature = "json")]
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, crate::DecodeError> {
        self.body.json()
    }

    pub fn close(&self) {
        self.body.close();
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("body", &self.body)
            .finish()
    }
}
