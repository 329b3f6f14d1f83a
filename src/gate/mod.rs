//! The security gate: stage evaluators, decision types, and the pipeline.

pub mod pipeline;
pub mod stages;

use serde_json::json;

use crate::errors::SecurityError;

/// Verification stages, in their fixed evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStage {
    /// User-Agent allow-list check.
    UserAgent,
    /// Origin/Referer allow-list check (always evaluated).
    Origin,
    /// API key check.
    ApiKey,
    /// Credential token check.
    Token,
    /// Request signature check.
    Signature,
}

impl GateStage {
    /// The fixed order stages are evaluated in.
    pub const ORDER: [GateStage; 5] = [
        GateStage::UserAgent,
        GateStage::Origin,
        GateStage::ApiKey,
        GateStage::Token,
        GateStage::Signature,
    ];

    /// Stable label for logging and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            GateStage::UserAgent => "user_agent",
            GateStage::Origin => "origin",
            GateStage::ApiKey => "api_key",
            GateStage::Token => "token",
            GateStage::Signature => "signature",
        }
    }
}

/// Outcome of running the gate against one request.
///
/// Produced fresh per request; never stored. On denial the route handler is
/// expected to respond with [`SecurityDecision::http_status`] and the body
/// from [`SecurityDecision::response_body`].
#[derive(Debug, Clone)]
pub struct SecurityDecision {
    /// Whether the request may proceed.
    pub allowed: bool,

    /// The stage that denied the request, if any.
    pub failed_stage: Option<GateStage>,

    /// Human-readable denial message (generic by design).
    pub message: String,

    /// HTTP status the handler should return.
    pub http_status: u16,
}

impl SecurityDecision {
    /// An approving decision.
    pub fn allow() -> Self {
        Self {
            allowed: true,
            failed_stage: None,
            message: String::new(),
            http_status: 200,
        }
    }

    /// A denial produced by the given stage.
    pub fn deny(stage: GateStage, error: &SecurityError) -> Self {
        Self {
            allowed: false,
            failed_stage: Some(stage),
            message: error.to_string(),
            http_status: error.http_status(),
        }
    }

    /// JSON body for a denial response.
    ///
    /// Matches the contract route handlers expose to clients:
    /// `{"success": false, "error": <message>, "code": "SECURITY_ERROR"}`.
    pub fn response_body(&self) -> serde_json::Value {
        json!({
            "success": false,
            "error": self.message,
            "code": "SECURITY_ERROR",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_decision() {
        let decision = SecurityDecision::allow();
        assert!(decision.allowed);
        assert!(decision.failed_stage.is_none());
        assert_eq!(decision.http_status, 200);
    }

    #[test]
    fn test_deny_decision_carries_stage_and_status() {
        let decision = SecurityDecision::deny(GateStage::Origin, &SecurityError::OriginForbidden);
        assert!(!decision.allowed);
        assert_eq!(decision.failed_stage, Some(GateStage::Origin));
        assert_eq!(decision.http_status, 403);
        assert!(!decision.message.is_empty());
    }

    #[test]
    fn test_response_body_shape() {
        let decision = SecurityDecision::deny(GateStage::ApiKey, &SecurityError::ApiKeyInvalid);
        let body = decision.response_body();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "SECURITY_ERROR");
        assert_eq!(body["error"], "Invalid API key");
    }

    #[test]
    fn test_stage_order_is_fixed() {
        assert_eq!(
            GateStage::ORDER,
            [
                GateStage::UserAgent,
                GateStage::Origin,
                GateStage::ApiKey,
                GateStage::Token,
                GateStage::Signature,
            ]
        );
    }

    #[test]
    fn test_stage_labels() {
        assert_eq!(GateStage::UserAgent.as_str(), "user_agent");
        assert_eq!(GateStage::Signature.as_str(), "signature");
    }
}
