//! Stage evaluators.
//!
//! Each check is a plain function from the request (plus whatever
//! configuration or service it needs) to a tagged result. Client-caused
//! denials come back as `Err` values, never panics; the pipeline decides
//! what a failure means for the request as a whole.

use regex::Regex;
use tracing::warn;

use crate::clock::Clock;
use crate::config::GateConfig;
use crate::crypto::signature::RequestSignatureService;
use crate::crypto::token::CredentialTokenService;
use crate::errors::SecurityError;
use crate::request::{
    GateRequest, HEADER_API_KEY, HEADER_NONCE, HEADER_ORIGIN, HEADER_REFERER, HEADER_SIGNATURE,
    HEADER_TIMESTAMP, HEADER_USER_AGENT,
};

/// Check the client identifier against the allow-list patterns.
///
/// The header must match at least one pattern. A pattern that fails to
/// compile is logged and skipped; it never aborts the whole check.
pub fn check_user_agent(
    request: &GateRequest,
    allowed_patterns: &[String],
) -> Result<(), SecurityError> {
    let user_agent = request
        .header(HEADER_USER_AGENT)
        .ok_or(SecurityError::MissingHeader {
            header: HEADER_USER_AGENT,
        })?;

    for pattern in allowed_patterns {
        match Regex::new(pattern) {
            Ok(re) => {
                if re.is_match(user_agent) {
                    return Ok(());
                }
            }
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "skipping invalid user-agent pattern");
            }
        }
    }

    Err(SecurityError::UserAgentForbidden)
}

/// Check the request origin against the allow-list.
///
/// Allows on an `Origin` match, falls back to the `Referer` header's
/// origin, and allows outright when neither header is present (native and
/// server-side clients send neither).
pub fn check_origin(request: &GateRequest, allowed_origins: &[String]) -> Result<(), SecurityError> {
    let origin = request.header(HEADER_ORIGIN);
    let referer = request.header(HEADER_REFERER);

    if let Some(origin) = origin {
        if origin_allowed(allowed_origins, origin) {
            return Ok(());
        }
    }

    if let Some(referer) = referer {
        if let Some(referer_origin) = referer_origin(referer) {
            if origin_allowed(allowed_origins, referer_origin) {
                return Ok(());
            }
        }
    }

    if origin.is_none() && referer.is_none() {
        return Ok(());
    }

    Err(SecurityError::OriginForbidden)
}

fn origin_allowed(allowed_origins: &[String], origin: &str) -> bool {
    let origin = origin.trim_end_matches('/');
    allowed_origins
        .iter()
        .any(|allowed| allowed.trim_end_matches('/').eq_ignore_ascii_case(origin))
}

/// Extract `scheme://authority` from a Referer URL.
fn referer_origin(referer: &str) -> Option<&str> {
    let scheme_end = referer.find("://")?;
    let authority_start = scheme_end + 3;
    let authority_end = referer[authority_start..]
        .find('/')
        .map(|i| authority_start + i)
        .unwrap_or(referer.len());
    Some(&referer[..authority_end])
}

/// Check the supplied API key against the configured expected key.
///
/// # Errors
/// * `ConfigError` - no expected key is configured (server fault, 500)
/// * `ApiKeyInvalid` - key missing or not an exact match (client fault, 401)
pub fn check_api_key(request: &GateRequest, config: &GateConfig) -> Result<(), SecurityError> {
    let expected = config
        .api_key
        .as_deref()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            SecurityError::ConfigError("expected API key is not configured".to_string())
        })?;

    match request.header(HEADER_API_KEY) {
        Some(provided) if provided == expected => Ok(()),
        _ => Err(SecurityError::ApiKeyInvalid),
    }
}

/// Check the bearer credential token.
pub fn check_token(
    request: &GateRequest,
    tokens: &CredentialTokenService,
    clock: &dyn Clock,
) -> Result<(), SecurityError> {
    let token = request.bearer_token().ok_or(SecurityError::TokenMissing)?;
    tokens.verify(token, clock)?;
    Ok(())
}

/// Check the request signature headers.
///
/// Missing or unparseable headers are client errors (400); verification
/// failures map to 401.
pub fn check_signature(
    request: &GateRequest,
    signatures: &RequestSignatureService,
    clock: &dyn Clock,
) -> Result<(), SecurityError> {
    let signature = request
        .header(HEADER_SIGNATURE)
        .ok_or(SecurityError::MissingHeader {
            header: HEADER_SIGNATURE,
        })?;
    let timestamp_raw = request
        .header(HEADER_TIMESTAMP)
        .ok_or(SecurityError::MissingHeader {
            header: HEADER_TIMESTAMP,
        })?;
    let nonce = request
        .header(HEADER_NONCE)
        .ok_or(SecurityError::MissingHeader {
            header: HEADER_NONCE,
        })?;

    let timestamp: i64 = timestamp_raw
        .trim()
        .parse()
        .map_err(|_| SecurityError::MalformedHeader {
            header: HEADER_TIMESTAMP,
        })?;

    signatures.verify(
        request.method(),
        request.path(),
        request.body(),
        timestamp,
        nonce,
        signature,
        clock,
    )
}
