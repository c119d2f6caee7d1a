//! Unified error types for the session manager.

use std::fmt;

// ---------------------------------------------------------------------------
// ClientError
// ---------------------------------------------------------------------------

/// Failures reported by the external OIDC client.
///
/// Cloneable so one failed renewal can be handed to every caller that was
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The identity provider could not be reached.
    Unreachable(String),
    /// The provider answered but refused the request.
    Rejected(String),
    /// The provider answered with something the client could not use.
    InvalidResponse(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(msg) => write!(f, "provider unreachable: {msg}"),
            Self::Rejected(msg) => write!(f, "request rejected: {msg}"),
            Self::InvalidResponse(msg) => write!(f, "invalid response: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Errors when building a [`crate::session::Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The profile carries no `exp` claim.
    MissingExpiry,
    /// The `exp` claim is not an integer number of seconds.
    InvalidExpiry(String),
    /// The id token could not be split or decoded.
    MalformedToken(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingExpiry => write!(f, "profile is missing the `exp` claim"),
            Self::InvalidExpiry(raw) => write!(f, "`exp` claim is not an integer: {raw}"),
            Self::MalformedToken(msg) => write!(f, "malformed id token: {msg}"),
        }
    }
}

impl std::error::Error for SessionError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or validating settings.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

// ---------------------------------------------------------------------------
// AuthError (top-level)
// ---------------------------------------------------------------------------

/// Top-level error type returned by [`crate::facade::AuthFacade`].
#[derive(Debug)]
pub enum AuthError {
    /// A token was requested but no session is persisted.
    Unauthorized,
    /// A caller-invoked silent renewal failed.
    SilentRenew(ClientError),
    /// Completing a redirect or silent sign-in callback failed.
    CallbackCompletion(ClientError),
    /// Any other failure reported by the external client.
    Client(ClientError),
    Config(ConfigError),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::SilentRenew(e) => write!(f, "silent renew: {e}"),
            Self::CallbackCompletion(e) => write!(f, "callback completion: {e}"),
            Self::Client(e) => write!(f, "client: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<ClientError> for AuthError {
    fn from(e: ClientError) -> Self {
        Self::Client(e)
    }
}

impl From<ConfigError> for AuthError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
