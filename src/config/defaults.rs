//! Default configuration constants.
//!
//! Keeping defaults in one module lets the loader, the settings model and the
//! CLI share the same literals.

/// Config file name looked up in the working directory and config root.
pub(super) const CONFIG_FILE_NAME: &str = "oidc-session.toml";
/// Directory under the config root holding the global config file.
pub(super) const CONFIG_DIR_NAME: &str = "oidc-session";
/// Response type requested when none is configured.
pub(super) const DEFAULT_RESPONSE_TYPE: &str = "id_token";
/// Scope requested when none is configured.
pub(super) const DEFAULT_SCOPE: &str = "openid profile";
/// Client-side "access token expiring" notification lead, in seconds.
pub(super) const DEFAULT_EXPIRING_NOTIFICATION_SECS: u64 = 60;
/// Proactive renewal lead time, in seconds.
pub const DEFAULT_TIMEOUT_EXPIRING_SECS: u64 = 60;
/// Slip tolerance used by `get_token` when callers pass none, in seconds.
pub const DEFAULT_SLIP_SECS: u64 = 180;
