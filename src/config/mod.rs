//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Environment variables (`OIDC_SESSION_AUTHORITY`, `OIDC_SESSION_CLIENT_ID`,
//!    `OIDC_SESSION_TIMEOUT_EXPIRING`, `OIDC_SESSION_SLIP`).
//! 2. TOML file specified via --config CLI flag
//! 3. ./oidc-session.toml in the current directory
//! 4. $XDG_CONFIG_HOME/oidc-session/oidc-session.toml (or
//!    ~/.config/oidc-session/oidc-session.toml)
//! 5. Built-in defaults
//!
//! The file layout mirrors [`Config`]:
//!
//! ```toml
//! [client]
//! authority = "https://login.example.com/"
//! client_id = "web"
//! redirect_uri = "https://app.example.com/callback"
//!
//! [client.metadata]
//! issuer = "https://login.example.com/"
//!
//! [renewal]
//! timeout_expiring = 60
//! slip = 180
//! ```

mod defaults;
mod env;
mod loader;
mod sources;
mod types;

pub use defaults::{DEFAULT_SLIP_SECS, DEFAULT_TIMEOUT_EXPIRING_SECS};
pub use loader::{load_config, load_config_with_diagnostics};
pub use sources::config_root_dir;
pub use types::{
    Config, ConfigDiagnostics, ConfigSource, LoadedConfig, ProviderMetadata, RenewalConfig,
    Settings,
};
use types::FileConfig;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
