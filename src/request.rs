//! Inbound request snapshot consumed by the gate.
//!
//! The gate is framework-agnostic: route handlers copy the fields the
//! verification stages need into a [`GateRequest`] instead of handing over a
//! framework request type. Header names are normalized to lowercase on
//! insert, so lookups are case-insensitive.

use std::collections::HashMap;

/// `User-Agent` header consumed by the user-agent stage.
pub const HEADER_USER_AGENT: &str = "user-agent";

/// `Origin` header consumed by the origin stage.
pub const HEADER_ORIGIN: &str = "origin";

/// `Referer` header consumed by the origin stage as a fallback.
pub const HEADER_REFERER: &str = "referer";

/// `X-API-Key` header consumed by the API key stage.
pub const HEADER_API_KEY: &str = "x-api-key";

/// `Authorization` header carrying the bearer credential token.
pub const HEADER_AUTHORIZATION: &str = "authorization";

/// `X-Request-Signature` header carrying the hex HMAC signature.
pub const HEADER_SIGNATURE: &str = "x-request-signature";

/// `X-Request-Timestamp` header carrying epoch seconds.
pub const HEADER_TIMESTAMP: &str = "x-request-timestamp";

/// `X-Request-Nonce` header carrying the per-request nonce.
pub const HEADER_NONCE: &str = "x-request-nonce";

/// Snapshot of an inbound request, as seen by the verification stages.
#[derive(Debug, Clone)]
pub struct GateRequest {
    method: String,
    path: String,
    body: String,
    headers: HashMap<String, String>,
}

impl GateRequest {
    /// Create a request snapshot for the given method and path.
    ///
    /// The path should include the query string, exactly as signed by the
    /// client.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            body: String::new(),
            headers: HashMap::new(),
        }
    }

    /// Attach the raw request body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Attach a header. Names are stored lowercase.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_lowercase(), value.into());
        self
    }

    /// HTTP method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request path including query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw request body (possibly empty).
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Look up a header value, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    /// Extract the bearer credential from the `Authorization` header.
    ///
    /// Accepts `Bearer <token>` or a bare token string. Returns `None` when
    /// the header is absent or empty.
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.header(HEADER_AUTHORIZATION)?.trim();
        let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }
}
