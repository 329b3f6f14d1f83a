//! Sentrygate error types.
//!
//! Two classes share one enum: client-caused denials (4xx, never fatal) and
//! service misconfiguration (`ConfigError`, 500). The orchestrator uses
//! [`SecurityError::is_config_error`] to keep the two distinguishable in
//! logs; a missing server secret must never look like a client mistake.

use thiserror::Error;

/// Errors produced by the verification stages.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Required server-side configuration is absent or invalid (fatal).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A required request header is missing.
    #[error("Missing required header: {header}")]
    MissingHeader {
        /// Name of the absent header.
        header: &'static str,
    },

    /// A request header is present but cannot be parsed.
    #[error("Malformed header: {header}")]
    MalformedHeader {
        /// Name of the unparseable header.
        header: &'static str,
    },

    /// Client identifier does not match any allow-list pattern.
    #[error("Client not allowed")]
    UserAgentForbidden,

    /// Origin/Referer does not match the configured allow-list.
    #[error("Origin not allowed")]
    OriginForbidden,

    /// API key is missing or does not match the expected key.
    #[error("Invalid API key")]
    ApiKeyInvalid,

    /// No bearer token was supplied.
    #[error("Missing credential token")]
    TokenMissing,

    /// Token is structurally invalid (segments, encoding, or header).
    #[error("Malformed credential token")]
    TokenMalformed,

    /// Token signature does not verify.
    #[error("Invalid token signature")]
    TokenInvalidSignature,

    /// Token is past its expiry time.
    #[error("Credential token expired")]
    TokenExpired,

    /// Token is authentic but carries an unexpected application identity.
    #[error("Invalid application credentials")]
    InvalidCredentials,

    /// Request timestamp falls outside the replay window.
    #[error("Request timestamp out of range ({skew_seconds}s skew)")]
    TimestampOutOfRange {
        /// Absolute distance between the request timestamp and now.
        skew_seconds: i64,
    },

    /// Recomputed request signature does not match the provided one.
    #[error("Request signature mismatch")]
    SignatureMismatch,
}

impl SecurityError {
    /// HTTP status a route handler should return for this failure.
    pub fn http_status(&self) -> u16 {
        match self {
            SecurityError::ConfigError(_) => 500,
            SecurityError::MissingHeader { .. } | SecurityError::MalformedHeader { .. } => 400,
            SecurityError::UserAgentForbidden | SecurityError::OriginForbidden => 403,
            SecurityError::ApiKeyInvalid
            | SecurityError::TokenMissing
            | SecurityError::TokenMalformed
            | SecurityError::TokenInvalidSignature
            | SecurityError::TokenExpired
            | SecurityError::InvalidCredentials
            | SecurityError::TimestampOutOfRange { .. }
            | SecurityError::SignatureMismatch => 401,
        }
    }

    /// Stable kind label for logging and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SecurityError::ConfigError(_) => "config_error",
            SecurityError::MissingHeader { .. } => "missing_header",
            SecurityError::MalformedHeader { .. } => "malformed_header",
            SecurityError::UserAgentForbidden => "user_agent_forbidden",
            SecurityError::OriginForbidden => "origin_forbidden",
            SecurityError::ApiKeyInvalid => "api_key_invalid",
            SecurityError::TokenMissing => "token_missing",
            SecurityError::TokenMalformed => "token_malformed",
            SecurityError::TokenInvalidSignature => "token_invalid_signature",
            SecurityError::TokenExpired => "token_expired",
            SecurityError::InvalidCredentials => "invalid_credentials",
            SecurityError::TimestampOutOfRange { .. } => "timestamp_out_of_range",
            SecurityError::SignatureMismatch => "signature_mismatch",
        }
    }

    /// Whether this is the fatal misconfiguration class rather than a
    /// client-caused denial.
    pub fn is_config_error(&self) -> bool {
        matches!(self, SecurityError::ConfigError(_))
    }
}
