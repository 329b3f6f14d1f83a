//! The security gate pipeline - the main public API.
//!
//! `SecurityGate` composes the verification stages into a fixed-order,
//! fail-fast pipeline:
//! 1. Master switch (gate disabled ⇒ allow unconditionally)
//! 2. User-Agent allow-list (optional)
//! 3. Origin/Referer allow-list (always evaluated)
//! 4. API key (optional)
//! 5. Credential token (optional)
//! 6. Request signature (optional)
//!
//! The first failing enabled stage determines the decision; later stages do
//! not run. Client denials and server misconfiguration are logged on
//! separate levels so a missing secret never reads like a client mistake.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::GateConfig;
use crate::crypto::signature::RequestSignatureService;
use crate::crypto::token::CredentialTokenService;
use crate::errors::SecurityError;
use crate::gate::stages;
use crate::gate::{GateStage, SecurityDecision};
use crate::request::GateRequest;

/// Security gate for inbound requests.
///
/// Create one instance per process and share it across request handlers;
/// evaluation is stateless per request and safe under concurrency.
pub struct SecurityGate {
    config: Arc<GateConfig>,
    clock: Arc<dyn Clock>,
    tokens: CredentialTokenService,
    signatures: RequestSignatureService,
}

impl SecurityGate {
    /// Create a gate with the given configuration.
    ///
    /// Uses the system clock for time operations.
    ///
    /// # Errors
    /// Returns an error if configuration validation fails.
    pub fn new(config: GateConfig) -> Result<Self, SecurityError> {
        config.validate()?;
        Ok(Self::with_clock(Arc::new(config), Arc::new(SystemClock)))
    }

    /// Create a gate with a custom clock (for testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn new_with_clock(
        config: GateConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SecurityError> {
        config.validate()?;
        Ok(Self::with_clock(Arc::new(config), clock))
    }

    fn with_clock(config: Arc<GateConfig>, clock: Arc<dyn Clock>) -> Self {
        let tokens = CredentialTokenService::new(Arc::clone(&config));
        let signatures = RequestSignatureService::new(Arc::clone(&config));
        Self {
            config,
            clock,
            tokens,
            signatures,
        }
    }

    /// Run every enabled stage, in order, against a request.
    ///
    /// Returns a [`SecurityDecision`] the route handler maps directly to an
    /// HTTP response. This never panics; misconfiguration surfaces as a
    /// 500-class denial.
    pub fn check(&self, request: &GateRequest) -> SecurityDecision {
        // Master switch: nothing runs when the gate is off.
        if !self.config.enabled {
            debug!("security gate disabled, allowing request");
            return SecurityDecision::allow();
        }

        for stage in GateStage::ORDER {
            if !self.stage_enabled(stage) {
                continue;
            }
            if let Err(error) = self.evaluate(stage, request) {
                if error.is_config_error() {
                    error!(
                        stage = stage.as_str(),
                        error = %error,
                        "security stage misconfigured"
                    );
                } else {
                    warn!(
                        stage = stage.as_str(),
                        kind = error.kind(),
                        "request denied"
                    );
                }
                return SecurityDecision::deny(stage, &error);
            }
        }

        SecurityDecision::allow()
    }

    fn stage_enabled(&self, stage: GateStage) -> bool {
        match stage {
            GateStage::UserAgent => self.config.check_user_agent,
            // Origin checking has no flag; absent headers make it a no-op.
            GateStage::Origin => true,
            GateStage::ApiKey => self.config.check_api_key,
            GateStage::Token => self.config.check_token,
            GateStage::Signature => self.config.check_signature,
        }
    }

    fn evaluate(&self, stage: GateStage, request: &GateRequest) -> Result<(), SecurityError> {
        match stage {
            GateStage::UserAgent => {
                stages::check_user_agent(request, &self.config.allowed_user_agents)
            }
            GateStage::Origin => stages::check_origin(request, &self.config.allowed_origins),
            GateStage::ApiKey => stages::check_api_key(request, &self.config),
            GateStage::Token => stages::check_token(request, &self.tokens, self.clock.as_ref()),
            GateStage::Signature => {
                stages::check_signature(request, &self.signatures, self.clock.as_ref())
            }
        }
    }

    /// Issue a credential token for a client session, using the configured
    /// TTL.
    ///
    /// # Errors
    /// * `ConfigError` - token signing secret absent
    pub fn issue_token(
        &self,
        app_id: &str,
        app_secret: &str,
        device_fingerprint: Option<&str>,
    ) -> Result<String, SecurityError> {
        self.tokens.issue(
            app_id,
            app_secret,
            device_fingerprint,
            self.config.token_ttl_hours,
            self.clock.as_ref(),
        )
    }

    /// The credential token service.
    pub fn tokens(&self) -> &CredentialTokenService {
        &self.tokens
    }

    /// The request signature service.
    pub fn signatures(&self) -> &RequestSignatureService {
        &self.signatures
    }

    /// The active configuration.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::crypto::hmac::generate_nonce;
    use crate::request::{
        HEADER_API_KEY, HEADER_AUTHORIZATION, HEADER_NONCE, HEADER_ORIGIN, HEADER_SIGNATURE,
        HEADER_TIMESTAMP, HEADER_USER_AGENT,
    };

    const T0: i64 = 1_700_000_000;

    fn full_config() -> GateConfig {
        GateConfig {
            enabled: true,
            check_user_agent: true,
            check_api_key: true,
            check_token: true,
            check_signature: true,
            allowed_user_agents: vec!["MyApp/.*".to_string()],
            allowed_origins: vec!["https://admin.example".to_string()],
            api_key: Some("k-123".to_string()),
            app_id: "app1".to_string(),
            app_secret: "s1".to_string(),
            token_secret: Some("token-secret".to_string()),
            signature_secret: Some("signature-secret".to_string()),
            token_ttl_hours: 24,
        }
    }

    fn gate(config: GateConfig) -> SecurityGate {
        SecurityGate::new_with_clock(config, Arc::new(MockClock::at_epoch(T0))).unwrap()
    }

    /// A request that passes every stage of `full_config`.
    fn passing_request(gate: &SecurityGate) -> GateRequest {
        let token = gate.issue_token("app1", "s1", Some("fp-01")).unwrap();
        let nonce = generate_nonce();
        let signature = gate
            .signatures()
            .sign("POST", "/api/apps", "{}", T0, &nonce)
            .unwrap();

        GateRequest::new("POST", "/api/apps")
            .with_body("{}")
            .with_header(HEADER_USER_AGENT, "MyApp/1.0")
            .with_header(HEADER_ORIGIN, "https://admin.example")
            .with_header(HEADER_API_KEY, "k-123")
            .with_header(HEADER_AUTHORIZATION, format!("Bearer {}", token))
            .with_header(HEADER_SIGNATURE, signature)
            .with_header(HEADER_TIMESTAMP, T0.to_string())
            .with_header(HEADER_NONCE, nonce)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = GateConfig {
            token_ttl_hours: 0,
            ..GateConfig::default()
        };
        assert!(SecurityGate::new(config).is_err());
    }

    #[test]
    fn test_master_switch_off_allows_everything() {
        let config = GateConfig {
            enabled: false,
            ..full_config()
        };
        let gate = gate(config);

        // No headers at all; every stage would fail if it ran.
        let decision = gate.check(&GateRequest::new("POST", "/api/apps"));
        assert!(decision.allowed);
        assert!(decision.failed_stage.is_none());
    }

    #[test]
    fn test_all_stages_pass() {
        let gate = gate(full_config());
        let request = passing_request(&gate);

        let decision = gate.check(&request);
        assert!(decision.allowed, "denied: {:?}", decision);
    }

    #[test]
    fn test_default_config_allows_bare_request() {
        // Optional stages off; origin stage no-ops without browser headers.
        let gate = gate(GateConfig::default());
        let decision = gate.check(&GateRequest::new("GET", "/api/apps"));
        assert!(decision.allowed);
    }

    #[test]
    fn test_api_key_only_correct_key_allowed() {
        let config = GateConfig {
            check_api_key: true,
            api_key: Some("k-123".to_string()),
            ..GateConfig::default()
        };
        let gate = gate(config);

        let good = GateRequest::new("GET", "/").with_header(HEADER_API_KEY, "k-123");
        assert!(gate.check(&good).allowed);
    }

    #[test]
    fn test_api_key_only_wrong_or_missing_denied_401() {
        let config = GateConfig {
            check_api_key: true,
            api_key: Some("k-123".to_string()),
            ..GateConfig::default()
        };
        let gate = gate(config);

        let wrong = GateRequest::new("GET", "/").with_header(HEADER_API_KEY, "nope");
        let decision = gate.check(&wrong);
        assert!(!decision.allowed);
        assert_eq!(decision.failed_stage, Some(GateStage::ApiKey));
        assert_eq!(decision.http_status, 401);

        let missing = GateRequest::new("GET", "/");
        let decision = gate.check(&missing);
        assert!(!decision.allowed);
        assert_eq!(decision.http_status, 401);
    }

    #[test]
    fn test_unconfigured_api_key_is_500_not_401() {
        let config = GateConfig {
            check_api_key: true,
            api_key: None,
            ..GateConfig::default()
        };
        let gate = gate(config);

        let decision = gate.check(&GateRequest::new("GET", "/").with_header(HEADER_API_KEY, "k"));
        assert!(!decision.allowed);
        assert_eq!(decision.failed_stage, Some(GateStage::ApiKey));
        assert_eq!(decision.http_status, 500);
    }

    #[test]
    fn test_origin_failure_wins_over_api_key_failure() {
        // Stage ordering: origin is evaluated before the API key.
        let config = GateConfig {
            check_api_key: true,
            api_key: Some("k-123".to_string()),
            allowed_origins: vec!["https://admin.example".to_string()],
            ..GateConfig::default()
        };
        let gate = gate(config);

        let request = GateRequest::new("POST", "/api/apps")
            .with_header(HEADER_ORIGIN, "https://evil.example")
            .with_header(HEADER_API_KEY, "wrong");

        let decision = gate.check(&request);
        assert!(!decision.allowed);
        assert_eq!(decision.failed_stage, Some(GateStage::Origin));
        assert_eq!(decision.http_status, 403);
    }

    #[test]
    fn test_user_agent_failure_wins_over_everything() {
        let gate = gate(full_config());
        let request = passing_request(&gate).with_header(HEADER_USER_AGENT, "curl/8.0");

        let decision = gate.check(&request);
        assert!(!decision.allowed);
        assert_eq!(decision.failed_stage, Some(GateStage::UserAgent));
        assert_eq!(decision.http_status, 403);
    }

    #[test]
    fn test_missing_user_agent_is_400() {
        let config = GateConfig {
            check_user_agent: true,
            allowed_user_agents: vec!["MyApp/.*".to_string()],
            ..GateConfig::default()
        };
        let gate = gate(config);

        let decision = gate.check(&GateRequest::new("GET", "/"));
        assert!(!decision.allowed);
        assert_eq!(decision.failed_stage, Some(GateStage::UserAgent));
        assert_eq!(decision.http_status, 400);
    }

    #[test]
    fn test_expired_token_denied_401() {
        let config = full_config();
        let issuing_gate = gate(config.clone());
        let token = issuing_gate.issue_token("app1", "s1", None).unwrap();

        // Same config, clock 25 hours later
        let later = SecurityGate::new_with_clock(
            config,
            Arc::new(MockClock::at_epoch(T0 + 25 * 3600)),
        )
        .unwrap();

        let request = GateRequest::new("GET", "/api/apps")
            .with_header(HEADER_USER_AGENT, "MyApp/1.0")
            .with_header(HEADER_API_KEY, "k-123")
            .with_header(HEADER_AUTHORIZATION, format!("Bearer {}", token));

        let decision = later.check(&request);
        assert!(!decision.allowed);
        assert_eq!(decision.failed_stage, Some(GateStage::Token));
        assert_eq!(decision.http_status, 401);
    }

    #[test]
    fn test_signature_stage_runs_after_token_stage() {
        let gate = gate(full_config());
        // Valid except for the signature headers, which are absent.
        let token = gate.issue_token("app1", "s1", None).unwrap();
        let request = GateRequest::new("POST", "/api/apps")
            .with_body("{}")
            .with_header(HEADER_USER_AGENT, "MyApp/1.0")
            .with_header(HEADER_API_KEY, "k-123")
            .with_header(HEADER_AUTHORIZATION, format!("Bearer {}", token));

        let decision = gate.check(&request);
        assert!(!decision.allowed);
        assert_eq!(decision.failed_stage, Some(GateStage::Signature));
        assert_eq!(decision.http_status, 400);
    }

    #[test]
    fn test_disabled_stage_is_skipped() {
        let config = GateConfig {
            check_user_agent: false,
            ..full_config()
        };
        let gate = gate(config);

        // No User-Agent header; the stage is off, so the rest still runs.
        let token = gate.issue_token("app1", "s1", None).unwrap();
        let nonce = generate_nonce();
        let signature = gate
            .signatures()
            .sign("POST", "/api/apps", "{}", T0, &nonce)
            .unwrap();
        let request = GateRequest::new("POST", "/api/apps")
            .with_body("{}")
            .with_header(HEADER_API_KEY, "k-123")
            .with_header(HEADER_AUTHORIZATION, token)
            .with_header(HEADER_SIGNATURE, signature)
            .with_header(HEADER_TIMESTAMP, T0.to_string())
            .with_header(HEADER_NONCE, nonce);

        assert!(gate.check(&request).allowed);
    }

    #[test]
    fn test_decision_response_body_contract() {
        let config = GateConfig {
            check_api_key: true,
            api_key: Some("k-123".to_string()),
            ..GateConfig::default()
        };
        let gate = gate(config);

        let decision = gate.check(&GateRequest::new("GET", "/"));
        let body = decision.response_body();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "SECURITY_ERROR");
    }

    #[test]
    fn test_config_accessor() {
        let gate = gate(full_config());
        assert_eq!(gate.config().app_id, "app1");
    }
}
