//! Request signature computation and verification.
//!
//! The canonical string joins the signed fields with `\n`, in this order:
//! ```text
//! METHOD      (upper-cased)
//! path        (including query string)
//! body        (raw, possibly empty)
//! timestamp   (epoch seconds, as decimal string)
//! nonce
//! secret
//! ```
//! The signature is hex-encoded HMAC-SHA256 over the canonical string, keyed
//! with the same shared secret.
//!
//! Verification checks the replay window before recomputing anything: a
//! timestamp more than [`REPLAY_WINDOW_SECONDS`] away from now fails with
//! `TimestampOutOfRange` regardless of the signature. Consumed nonces are
//! not tracked, so a captured (signature, timestamp, nonce) tuple stays
//! replayable for the remainder of the window.

use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::GateConfig;
use crate::crypto::hmac::{constant_time_eq, hmac_sha256_hex};
use crate::errors::SecurityError;

/// Maximum distance between a request timestamp and the current time.
pub const REPLAY_WINDOW_SECONDS: i64 = 300;

/// Computes and verifies HMAC request signatures.
///
/// The shared secret is resolved from configuration on first use and
/// memoized; concurrent first calls observe a single initialization.
pub struct RequestSignatureService {
    config: Arc<GateConfig>,
    shared_secret: OnceCell<String>,
}

impl RequestSignatureService {
    /// Create a signature service over the given configuration.
    pub fn new(config: Arc<GateConfig>) -> Self {
        Self {
            config,
            shared_secret: OnceCell::new(),
        }
    }

    /// Resolve and memoize the shared secret.
    fn shared_secret(&self) -> Result<&str, SecurityError> {
        self.shared_secret
            .get_or_try_init(|| match self.config.signature_secret.as_deref() {
                Some(secret) if !secret.is_empty() => Ok(secret.to_string()),
                _ => Err(SecurityError::ConfigError(
                    "request signature secret is not configured".to_string(),
                )),
            })
            .map(String::as_str)
    }

    /// Compute the signature for a request.
    ///
    /// Deterministic for fixed inputs; both sides compute the same value.
    ///
    /// # Errors
    /// * `ConfigError` - shared secret absent
    pub fn sign(
        &self,
        method: &str,
        path: &str,
        body: &str,
        timestamp: i64,
        nonce: &str,
    ) -> Result<String, SecurityError> {
        let secret = self.shared_secret()?;
        let canonical = [
            method.to_uppercase().as_str(),
            path,
            body,
            timestamp.to_string().as_str(),
            nonce,
            secret,
        ]
        .join("\n");

        Ok(hmac_sha256_hex(secret.as_bytes(), canonical.as_bytes()))
    }

    /// Verify a provided request signature.
    ///
    /// The replay window is checked first; an out-of-window timestamp makes
    /// the signature moot and is never recomputed against.
    ///
    /// # Errors
    /// * `ConfigError` - shared secret absent
    /// * `TimestampOutOfRange` - `|now - timestamp| > 300`
    /// * `SignatureMismatch` - recomputed signature differs (constant-time)
    pub fn verify(
        &self,
        method: &str,
        path: &str,
        body: &str,
        timestamp: i64,
        nonce: &str,
        provided_signature: &str,
        clock: &dyn Clock,
    ) -> Result<(), SecurityError> {
        // 1. Replay/clock-skew window
        let skew_seconds = (clock.epoch_seconds() - timestamp).abs();
        if skew_seconds > REPLAY_WINDOW_SECONDS {
            return Err(SecurityError::TimestampOutOfRange { skew_seconds });
        }

        // 2. Recompute with the same inputs
        let expected = self.sign(method, path, body, timestamp, nonce)?;

        // 3. Constant-time comparison
        if !constant_time_eq(expected.as_bytes(), provided_signature.as_bytes()) {
            return Err(SecurityError::SignatureMismatch);
        }

        Ok(())
    }
}
