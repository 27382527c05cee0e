use crate::body::RequestBody;
use crate::error::ConfigurationError;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::time::Duration;
use url::Url;

/// Header used by callers to mark a POST/PATCH as safe to retry.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// A fully assembled outgoing request, rebuilt fresh on every attempt from
/// its (rewindable) body source.
#[derive(Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
    /// Overrides the client's default per-attempt timeout for this call.
    pub per_attempt_timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            per_attempt_timeout: None,
        }
    }

    pub fn host(&self) -> String {
        self.url.host_str().unwrap_or("").to_string()
    }

    /// The default retry-method set: GET, HEAD, OPTIONS, PUT, DELETE are
    /// always retryable; POST/PATCH require an `Idempotency-Key`.
    pub fn is_retryable_by_default(&self) -> bool {
        match self.method {
            Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE => true,
            Method::POST | Method::PATCH => self.has_idempotency_key(),
            _ => false,
        }
    }

    pub fn has_idempotency_key(&self) -> bool {
        self.headers
            .get(IDEMPOTENCY_KEY_HEADER)
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }
}

/// A builder for request options, applied in order after request creation
/// and before the pipeline runs, per the external-interface contract.
pub struct RequestOptions {
    request: HttpRequest,
}

impl RequestOptions {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            request: HttpRequest::new(method, url),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self, ConfigurationError> {
        let name = HeaderName::try_from(name).map_err(|e| ConfigurationError {
            field: "header name",
            value: name.to_string(),
            message: e.to_string(),
        })?;
        let value = HeaderValue::try_from(value).map_err(|e| ConfigurationError {
            field: "header value",
            value: value.to_string(),
            message: e.to_string(),
        })?;
        self.request.headers.insert(name, value);
        Ok(self)
    }

    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Result<Self, ConfigurationError> {
        for (name, value) in headers {
            self = self.header(&name, &value)?;
        }
        Ok(self)
    }

    pub fn content_type(self, content_type: &str) -> Result<Self, ConfigurationError> {
        self.header("Content-Type", content_type)
    }

    pub fn bearer_token(self, token: &str) -> Result<Self, ConfigurationError> {
        self.header("Authorization", &format!("Bearer {token}"))
    }

    pub fn idempotency_key(self, key: &str) -> Result<Self, ConfigurationError> {
        self.header(IDEMPOTENCY_KEY_HEADER, key)
    }

    pub fn user_agent(self, ua: &str) -> Result<Self, ConfigurationError> {
        self.header("User-Agent", ua)
    }

    #[cfg(feature = "json")]
    pub fn json<T: serde::Serialize>(self, value: &T) -> Result<Self, ConfigurationError> {
        let bytes = serde_json::to_vec(value).map_err(|e| ConfigurationError {
            field: "body",
            value: "<json>".into(),
            message: e.to_string(),
        })?;
        self.raw_body(bytes.into(), "application/json")
    }

    pub fn form_body(self, fields: impl IntoIterator<Item = (String, String)>) -> Result<Self, ConfigurationError> {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.raw_body(encoded.into_bytes().into(), "application/x-www-form-urlencoded")
    }

    pub fn xml_body(self, xml: impl Into<String>) -> Result<Self, ConfigurationError> {
        self.raw_body(xml.into().into_bytes().into(), "application/xml")
    }

    pub fn text_body(self, text: impl Into<String>) -> Result<Self, ConfigurationError> {
        self.raw_body(text.into().into_bytes().into(), "text/plain; charset=utf-8")
    }

    pub fn raw_body(mut self, bytes: bytes::Bytes, content_type: &str) -> Result<Self, ConfigurationError> {
        self.request.body = RequestBody::Bytes(bytes);
        self.content_type(content_type)
    }

    /// Marks the body as a non-rewindable stream; the client rejects this
    /// if the request is classified retryable, per the replayable-body
    /// invariant.
    pub fn non_rewindable_body(mut self) -> Self {
        self.request.body = RequestBody::NonRewindable;
        self
    }

    pub fn per_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.request.per_attempt_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> HttpRequest {
        self.request
    }
}
