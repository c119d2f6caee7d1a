//! Configuration data model.
//!
//! This module holds struct definitions plus default values and validation.
//! Loader and source-resolution logic stays in `config::loader` so parsing and
//! precedence behavior remain centralized.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

use super::defaults::{
    DEFAULT_EXPIRING_NOTIFICATION_SECS, DEFAULT_RESPONSE_TYPE, DEFAULT_SCOPE, DEFAULT_SLIP_SECS,
    DEFAULT_TIMEOUT_EXPIRING_SECS,
};

/// Provider endpoints supplied inline instead of through discovery.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub end_session_endpoint: String,
    pub token_endpoint: Option<String>,
    pub userinfo_endpoint: Option<String>,
    pub jwks_uri: Option<String>,
}

impl ProviderMetadata {
    pub fn is_empty(&self) -> bool {
        self.issuer.is_empty()
            && self.authorization_endpoint.is_empty()
            && self.end_session_endpoint.is_empty()
    }
}

/// Settings handed to the external OIDC client at init time.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub authority: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub post_logout_redirect_uri: String,
    /// Where the hidden frame lands after a silent renewal; falls back to
    /// `redirect_uri` when empty.
    pub silent_redirect_uri: String,
    pub response_type: String,
    pub scope: String,
    pub metadata: ProviderMetadata,
    /// JWKs the client verifies id tokens with; passed through untouched.
    pub signing_keys: Vec<Value>,
    pub access_token_expiring_notification_time: u64,
    pub filter_protocol_claims: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            authority: String::new(),
            client_id: String::new(),
            redirect_uri: String::new(),
            post_logout_redirect_uri: String::new(),
            silent_redirect_uri: String::new(),
            response_type: DEFAULT_RESPONSE_TYPE.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            metadata: ProviderMetadata::default(),
            signing_keys: Vec::new(),
            access_token_expiring_notification_time: DEFAULT_EXPIRING_NOTIFICATION_SECS,
            filter_protocol_claims: true,
        }
    }
}

impl Settings {
    /// Redirect target for silent renewal after fallback.
    pub fn effective_silent_redirect_uri(&self) -> &str {
        if self.silent_redirect_uri.trim().is_empty() {
            &self.redirect_uri
        } else {
            &self.silent_redirect_uri
        }
    }

    /// Reject settings the external client could not work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_url("authority", &self.authority)?;
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::Invalid("`client_id` must be set".to_string()));
        }
        require_url("redirect_uri", &self.redirect_uri)?;
        optional_url("post_logout_redirect_uri", &self.post_logout_redirect_uri)?;
        optional_url("silent_redirect_uri", &self.silent_redirect_uri)?;
        if self.response_type.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "`response_type` must not be empty".to_string(),
            ));
        }
        if !self.scope.split_whitespace().any(|scope| scope == "openid") {
            return Err(ConfigError::Invalid(format!(
                "`scope` must include `openid`, got `{}`",
                self.scope
            )));
        }
        optional_url("metadata.issuer", &self.metadata.issuer)?;
        optional_url(
            "metadata.authorization_endpoint",
            &self.metadata.authorization_endpoint,
        )?;
        optional_url(
            "metadata.end_session_endpoint",
            &self.metadata.end_session_endpoint,
        )?;
        Ok(())
    }
}

/// Renewal timing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenewalConfig {
    /// Seconds before expiry at which the proactive timer fires.
    pub timeout_expiring: u64,
    /// Default slip tolerance for `get_token`.
    pub slip: u64,
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            timeout_expiring: DEFAULT_TIMEOUT_EXPIRING_SECS,
            slip: DEFAULT_SLIP_SECS,
        }
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub client: Settings,
    pub renewal: RenewalConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.client.validate()
    }
}

/// Raw TOML file shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct FileConfig {
    pub(super) client: Settings,
    pub(super) renewal: RenewalConfig,
}

/// Non-fatal findings collected while loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiagnostics {
    pub warnings: Vec<String>,
}

/// Where the configuration text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Config loaded from explicit `--config` path.
    Explicit(std::path::PathBuf),
    /// Config loaded from `./oidc-session.toml`.
    Local,
    /// Config loaded from the global config root.
    Global(std::path::PathBuf),
    /// No file found; built-in defaults were used.
    BuiltInDefaults,
}

/// Configuration payload plus load-time diagnostics.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: ConfigSource,
    pub diagnostics: ConfigDiagnostics,
}

fn require_url(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("`{field}` must be set")));
    }
    optional_url(field, value)
}

fn optional_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "`{field}` must be an http(s) URL, got `{value}`"
        )))
    }
}
