//! Credential token issuance and verification.
//!
//! Tokens are compact signed bearer credentials in the JWT form
//! `base64url(header).base64url(claims).base64url(signature)` with an HS256
//! (HMAC-SHA256) signature. Verification runs in a fixed order:
//! 1. Structural and signature validation (fail-closed, nothing else runs)
//! 2. Expiry check against the injected clock
//! 3. Identity check against the configured application id/secret
//!
//! The claims deliberately carry the application secret, and step 3 re-checks
//! it after the signature has been validated: a token minted for a different
//! deployment is rejected even when it was signed with the same key.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::GateConfig;
use crate::crypto::hmac::{constant_time_eq, hmac_sha256};
use crate::errors::SecurityError;

const TOKEN_ALGORITHM: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Signed payload of a credential token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// Application identity this token was issued for.
    #[serde(rename = "appId")]
    pub app_id: String,

    /// Application secret, embedded and re-checked on verification.
    #[serde(rename = "appSecret")]
    pub app_secret: String,

    /// Optional device fingerprint bound to the client installation.
    #[serde(rename = "deviceFingerprint", default)]
    pub device_fingerprint: String,

    /// Issuance time, epoch seconds.
    #[serde(rename = "iat")]
    pub issued_at: i64,

    /// Expiry time, epoch seconds. Always greater than `issued_at`.
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

/// Issues and verifies credential tokens.
///
/// The signing secret is resolved from configuration on first use and
/// memoized; concurrent first calls observe a single initialization.
pub struct CredentialTokenService {
    config: Arc<GateConfig>,
    signing_key: OnceCell<Vec<u8>>,
}

impl CredentialTokenService {
    /// Create a token service over the given configuration.
    pub fn new(config: Arc<GateConfig>) -> Self {
        Self {
            config,
            signing_key: OnceCell::new(),
        }
    }

    /// Resolve and memoize the signing secret.
    fn signing_key(&self) -> Result<&[u8], SecurityError> {
        self.signing_key
            .get_or_try_init(|| match self.config.token_secret.as_deref() {
                Some(secret) if !secret.is_empty() => Ok(secret.as_bytes().to_vec()),
                _ => Err(SecurityError::ConfigError(
                    "token signing secret is not configured".to_string(),
                )),
            })
            .map(Vec::as_slice)
    }

    /// Issue a signed credential token.
    ///
    /// Claims are stamped with `issued_at = now` and
    /// `expires_at = now + ttl_hours * 3600`.
    ///
    /// # Errors
    /// * `ConfigError` - signing secret absent, or `ttl_hours < 1`
    pub fn issue(
        &self,
        app_id: &str,
        app_secret: &str,
        device_fingerprint: Option<&str>,
        ttl_hours: i64,
        clock: &dyn Clock,
    ) -> Result<String, SecurityError> {
        if ttl_hours < 1 {
            return Err(SecurityError::ConfigError(format!(
                "token ttl_hours must be at least 1, got {}",
                ttl_hours
            )));
        }
        let key = self.signing_key()?;

        let now = clock.epoch_seconds();
        let claims = TokenClaims {
            app_id: app_id.to_string(),
            app_secret: app_secret.to_string(),
            device_fingerprint: device_fingerprint.unwrap_or_default().to_string(),
            issued_at: now,
            expires_at: now + ttl_hours * 3600,
        };

        let header = TokenHeader {
            alg: TOKEN_ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };

        let header_b64 = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&header)
                .map_err(|e| SecurityError::ConfigError(format!("header encoding: {}", e)))?,
        );
        let claims_b64 = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&claims)
                .map_err(|e| SecurityError::ConfigError(format!("claims encoding: {}", e)))?,
        );

        let signing_input = format!("{}.{}", header_b64, claims_b64);
        let signature_b64 = URL_SAFE_NO_PAD.encode(hmac_sha256(key, signing_input.as_bytes()));

        Ok(format!("{}.{}", signing_input, signature_b64))
    }

    /// Verify a credential token and return its claims.
    ///
    /// # Errors
    /// * `ConfigError` - signing secret absent (fatal, not client-caused)
    /// * `TokenMalformed` - wrong segment count, bad base64/JSON, wrong alg
    /// * `TokenInvalidSignature` - signature does not verify
    /// * `TokenExpired` - `now` is past `expires_at`
    /// * `InvalidCredentials` - authentic token for the wrong application
    pub fn verify(&self, token: &str, clock: &dyn Clock) -> Result<TokenClaims, SecurityError> {
        let key = self.signing_key()?;

        // 1a. Structural validation
        let mut segments = token.split('.');
        let (header_b64, claims_b64, signature_b64) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(h), Some(c), Some(s), None) => (h, c, s),
                _ => return Err(SecurityError::TokenMalformed),
            };

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| SecurityError::TokenMalformed)?;
        let header: TokenHeader =
            serde_json::from_slice(&header_bytes).map_err(|_| SecurityError::TokenMalformed)?;
        if header.alg != TOKEN_ALGORITHM {
            return Err(SecurityError::TokenMalformed);
        }

        // 1b. Signature validation over the raw segments
        let provided_signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| SecurityError::TokenMalformed)?;
        let signing_input = format!("{}.{}", header_b64, claims_b64);
        let expected_signature = hmac_sha256(key, signing_input.as_bytes());
        if !constant_time_eq(&expected_signature, &provided_signature) {
            return Err(SecurityError::TokenInvalidSignature);
        }

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| SecurityError::TokenMalformed)?;
        let claims: TokenClaims =
            serde_json::from_slice(&claims_bytes).map_err(|_| SecurityError::TokenMalformed)?;

        // 2. Expiry
        if clock.epoch_seconds() > claims.expires_at {
            return Err(SecurityError::TokenExpired);
        }

        // 3. Identity re-check against the configured application
        if claims.app_id != self.config.app_id || claims.app_secret != self.config.app_secret {
            return Err(SecurityError::InvalidCredentials);
        }

        Ok(claims)
    }
}
