//! Gate configuration.
//!
//! All flags, allow-lists, and secrets are loaded once — either built
//! directly by the host process or read from `SENTRYGATE_*` environment
//! variables — and treated as immutable afterwards. The services receive the
//! config by reference; nothing re-reads the environment per call.

use serde::{Deserialize, Serialize};

use crate::errors::SecurityError;

/// Configuration for the security gate.
///
/// The master `enabled` flag switches the whole gate; each optional stage has
/// its own flag. Origin checking is always evaluated and has no flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Master switch. When false every request is allowed unconditionally.
    pub enabled: bool,

    /// Enable the User-Agent allow-list stage.
    pub check_user_agent: bool,

    /// Enable the API key stage.
    pub check_api_key: bool,

    /// Enable the credential token stage.
    pub check_token: bool,

    /// Enable the request signature stage.
    pub check_signature: bool,

    /// Regex patterns the User-Agent header must match (any one suffices).
    pub allowed_user_agents: Vec<String>,

    /// Origins accepted by the Origin/Referer stage.
    pub allowed_origins: Vec<String>,

    /// Expected API key. Required (server-side) when `check_api_key` is on.
    pub api_key: Option<String>,

    /// Application identity a verified token must carry.
    pub app_id: String,

    /// Application secret a verified token must carry.
    pub app_secret: String,

    /// Symmetric key for signing credential tokens.
    pub token_secret: Option<String>,

    /// Shared secret for request signatures.
    pub signature_secret: Option<String>,

    /// Time-to-live for issued credential tokens, in hours.
    pub token_ttl_hours: i64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_user_agent: false,
            check_api_key: false,
            check_token: false,
            check_signature: false,
            allowed_user_agents: Vec::new(),
            allowed_origins: Vec::new(),
            api_key: None,
            app_id: String::new(),
            app_secret: String::new(),
            token_secret: None,
            signature_secret: None,
            token_ttl_hours: 24,
        }
    }
}

impl GateConfig {
    /// Validate configuration for obvious errors.
    ///
    /// Absent stage secrets are deliberately not rejected here: a disabled
    /// stage needs none, and an enabled stage surfaces the absence as a
    /// fatal `ConfigError` the first time it runs.
    pub fn validate(&self) -> Result<(), SecurityError> {
        if self.token_ttl_hours < 1 {
            return Err(SecurityError::ConfigError(format!(
                "token_ttl_hours must be at least 1, got {}",
                self.token_ttl_hours
            )));
        }
        Ok(())
    }

    /// Load configuration from `SENTRYGATE_*` environment variables.
    ///
    /// Allow-lists accept comma- or pipe-separated entries. Unset variables
    /// keep their defaults.
    pub fn from_env() -> Result<Self, SecurityError> {
        let mut config = GateConfig::default();

        if let Ok(v) = std::env::var("SENTRYGATE_ENABLED") {
            config.enabled = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("SENTRYGATE_CHECK_USER_AGENT") {
            config.check_user_agent = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("SENTRYGATE_CHECK_API_KEY") {
            config.check_api_key = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("SENTRYGATE_CHECK_TOKEN") {
            config.check_token = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("SENTRYGATE_CHECK_SIGNATURE") {
            config.check_signature = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("SENTRYGATE_ALLOWED_USER_AGENTS") {
            config.allowed_user_agents = split_list(&v);
        }
        if let Ok(v) = std::env::var("SENTRYGATE_ALLOWED_ORIGINS") {
            config.allowed_origins = split_list(&v);
        }
        if let Ok(v) = std::env::var("SENTRYGATE_API_KEY") {
            config.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("SENTRYGATE_APP_ID") {
            config.app_id = v;
        }
        if let Ok(v) = std::env::var("SENTRYGATE_APP_SECRET") {
            config.app_secret = v;
        }
        if let Ok(v) = std::env::var("SENTRYGATE_TOKEN_SECRET") {
            config.token_secret = Some(v);
        }
        if let Ok(v) = std::env::var("SENTRYGATE_SIGNATURE_SECRET") {
            config.signature_secret = Some(v);
        }
        if let Ok(v) = std::env::var("SENTRYGATE_TOKEN_TTL_HOURS") {
            config.token_ttl_hours = v.parse().map_err(|_| {
                SecurityError::ConfigError(format!(
                    "SENTRYGATE_TOKEN_TTL_HOURS is not a number: {}",
                    v
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Split a comma- or pipe-separated allow-list, dropping empty entries.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == '|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
