//! Classifies the application's entry navigation.
//!
//! A load is one of three things: the top-level return from an interactive
//! sign-in, the hidden-frame return from a silent renewal, or an ordinary
//! load. The first two carry the provider's response in the URI fragment.

use std::sync::Arc;

use crate::client::UserManager;
use crate::error::AuthError;
use crate::frame::FrameContext;
use crate::navigation::Navigation;
use crate::session::SessionRef;
use crate::store::SessionStore;

/// Result of a successful entry resolution.
#[derive(Debug, Clone)]
pub struct EntryOutcome {
    /// `true` when this load completed a sign-in round trip.
    pub is_callback: bool,
    pub session: SessionRef,
}

/// Kind of navigation detected on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    RedirectCallback,
    SilentCallback,
    Ordinary,
}

pub struct CallbackResolver {
    client: Arc<dyn UserManager>,
    frame: Arc<dyn FrameContext>,
    navigation: Arc<dyn Navigation>,
}

impl CallbackResolver {
    pub fn new(
        client: Arc<dyn UserManager>,
        frame: Arc<dyn FrameContext>,
        navigation: Arc<dyn Navigation>,
    ) -> Self {
        Self {
            client,
            frame,
            navigation,
        }
    }

    /// Classify the current navigation without acting on it.
    pub fn classify(&self) -> EntryKind {
        match self.navigation.fragment() {
            None => EntryKind::Ordinary,
            Some(_) if self.frame.is_embedded() => EntryKind::SilentCallback,
            Some(_) => EntryKind::RedirectCallback,
        }
    }

    /// Complete whatever the current navigation carries.
    ///
    /// Callback completion failures propagate as
    /// [`AuthError::CallbackCompletion`] and are not retried.
    pub async fn resolve(&self, store: &SessionStore) -> Result<Option<EntryOutcome>, AuthError> {
        let kind = self.classify();
        if let Some(session) = self.complete_callback(kind).await? {
            return Ok(Some(EntryOutcome {
                is_callback: true,
                session,
            }));
        }

        // Ordinary load, or a callback that left nothing persisted.
        match self.client.get_user().await? {
            Some(session) => {
                store.set(Some(session.clone()));
                Ok(Some(EntryOutcome {
                    is_callback: false,
                    session,
                }))
            }
            None => Ok(None),
        }
    }

    async fn complete_callback(&self, kind: EntryKind) -> Result<Option<SessionRef>, AuthError> {
        match kind {
            EntryKind::Ordinary => return Ok(None),
            EntryKind::SilentCallback => {
                self.client
                    .signin_silent_callback()
                    .await
                    .map_err(AuthError::CallbackCompletion)?;
                tracing::info!("silent renewal callback completed in embedded frame");
                self.navigation.clear_location();
            }
            EntryKind::RedirectCallback => {
                self.client
                    .signin_redirect_callback()
                    .await
                    .map_err(AuthError::CallbackCompletion)?;
                tracing::info!("sign-in redirect callback completed");
            }
        }
        Ok(self.client.get_user().await?)
    }
}
