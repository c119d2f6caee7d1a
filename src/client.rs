//! Boundary to the external OIDC client library.
//!
//! The protocol work (building authorization requests, validating id tokens,
//! persisting users) happens on the other side of [`UserManager`]. This crate
//! only sequences its operations and reacts to its events.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ClientError;
use crate::session::SessionRef;

/// Events the client raises on its own, outside any call made by this crate.
pub trait UserManagerEvents: Send + Sync {
    /// A user was loaded or replaced inside the client.
    fn on_user_loaded(&self, session: SessionRef);

    /// A background silent renewal failed.
    fn on_silent_renew_error(&self, error: &ClientError);
}

/// Operations consumed from the external OIDC client.
#[async_trait]
pub trait UserManager: Send + Sync {
    /// Register the event sink. Called once, during init.
    fn register_events(&self, events: Arc<dyn UserManagerEvents>);

    /// Start an interactive sign-in by redirecting to the provider.
    async fn signin_redirect(&self) -> Result<(), ClientError>;

    /// Consume the redirect response carried by the current navigation.
    async fn signin_redirect_callback(&self) -> Result<(), ClientError>;

    /// Obtain a fresh session without user interaction.
    async fn signin_silent(&self) -> Result<SessionRef, ClientError>;

    /// Consume the silent-renewal response inside the embedded frame.
    async fn signin_silent_callback(&self) -> Result<(), ClientError>;

    /// Redirect to the provider's end-session endpoint.
    async fn signout_redirect(&self) -> Result<(), ClientError>;

    /// Drop leftover request state from abandoned sign-in attempts.
    async fn clear_stale_state(&self) -> Result<(), ClientError>;

    /// The persisted session, if the client has one.
    async fn get_user(&self) -> Result<Option<SessionRef>, ClientError>;
}
