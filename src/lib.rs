//! # Sentrygate
//!
//! **Layered request authentication and integrity gate for background APIs.**
//!
//! Sentrygate guards an API behind an ordered, fail-fast pipeline of
//! independently-toggleable checks: client allow-lists, an API key, a signed
//! bearer credential, and an HMAC request signature with a replay window.
//! Route handlers make a single synchronous call and get back a uniform
//! allow/deny decision with an HTTP status.
//!
//! ## Features
//!
//! - **Signed credential tokens** — compact HS256 (HMAC-SHA256) bearer
//!   credentials embedding the application identity, with expiry
//! - **Request signatures** — HMAC-SHA256 over a canonical string of
//!   method, path, body, timestamp, and nonce
//! - **Replay window** — signed requests older (or newer) than 300 seconds
//!   are rejected before any signature work
//! - **Fail-fast pipeline** — the first failing enabled stage decides;
//!   misconfiguration surfaces as 500, never as a client-looking denial
//! - **Timing-safe comparison** — signatures are compared constant-time
//!
//! ## Quickstart
//!
//! ```no_run
//! use sentrygate::{GateConfig, GateRequest, SecurityGate};
//!
//! fn main() -> Result<(), sentrygate::SecurityError> {
//!     let config = GateConfig {
//!         check_api_key: true,
//!         api_key: Some("expected-key".to_string()),
//!         ..GateConfig::default()
//!     };
//!     let gate = SecurityGate::new(config)?;
//!
//!     let request = GateRequest::new("POST", "/api/apps")
//!         .with_body("{}")
//!         .with_header("X-API-Key", "expected-key");
//!
//!     let decision = gate.check(&request);
//!     if !decision.allowed {
//!         // Respond with decision.http_status and decision.response_body().
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Threat Model
//!
//! Sentrygate protects against:
//! - **Tampered requests** — any change to method, path, body, timestamp,
//!   or nonce invalidates the signature
//! - **Stale replays** — signed requests are rejected outside the
//!   300-second window
//! - **Forged credentials** — tokens are rejected on any signature,
//!   expiry, or identity mismatch
//!
//! Sentrygate does **not** track consumed nonces: a captured request stays
//! replayable for the remainder of its 300-second window. It also cannot
//! protect against a leaked shared secret; both sides of the HMAC schemes
//! hold the same key.
//!
//! ## Configuration
//!
//! See [`GateConfig`] for the full surface: the master switch, per-stage
//! flags, allow-lists, expected identity, secrets, and token TTL. Build it
//! directly or load it once from `SENTRYGATE_*` environment variables with
//! [`GateConfig::from_env`].

#![deny(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Request snapshot
pub mod request;

// Crypto layer
pub mod crypto;

// Gate layer (main public API)
pub mod gate;

// Re-exports for public API
pub use clock::{Clock, SystemClock};
pub use config::GateConfig;
pub use crypto::hmac::generate_nonce;
pub use crypto::signature::{RequestSignatureService, REPLAY_WINDOW_SECONDS};
pub use crypto::token::{CredentialTokenService, TokenClaims};
pub use errors::SecurityError;
pub use gate::pipeline::SecurityGate;
pub use gate::{GateStage, SecurityDecision};
pub use request::GateRequest;

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
