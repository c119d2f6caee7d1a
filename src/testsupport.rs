//! Shared test fixtures for store/resolver/facade test modules.
//!
//! The fake user manager mirrors how the external OIDC client behaves from
//! this crate's point of view: successful sign-ins persist the user and raise
//! `on_user_loaded`, and every call is recorded for assertions.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::client::{UserManager, UserManagerEvents};
use crate::error::ClientError;
use crate::session::{Claims, Session, SessionRef};

/// Build a session whose `exp` claim is `exp`.
pub fn session_expiring_at(exp: i64) -> Session {
    session_with_token("id-token", exp)
}

/// Build a session with a specific id token and expiry.
pub fn session_with_token(id_token: &str, exp: i64) -> Session {
    let mut profile = Claims::new();
    profile.insert("sub".to_string(), json!("user-1"));
    profile.insert("exp".to_string(), json!(exp));
    Session::new(id_token, profile).expect("fixture session")
}

/// Shared-handle variant of [`session_with_token`].
pub fn session_ref(id_token: &str, exp: i64) -> SessionRef {
    session_with_token(id_token, exp).into_ref()
}

/// Scriptable stand-in for the external OIDC client.
#[derive(Default)]
pub struct FakeUserManager {
    user: Mutex<Option<SessionRef>>,
    callback_user: Mutex<Option<SessionRef>>,
    silent_results: Mutex<VecDeque<Result<SessionRef, ClientError>>>,
    callback_error: Mutex<Option<ClientError>>,
    silent_delay: Mutex<Option<Duration>>,
    events: Mutex<Option<Arc<dyn UserManagerEvents>>>,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeUserManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persisted user returned by `get_user`.
    pub fn with_user(self, session: SessionRef) -> Self {
        *self.user.lock().expect("lock") = Some(session);
        self
    }

    /// User persisted once a redirect or silent callback completes.
    pub fn with_callback_user(self, session: SessionRef) -> Self {
        *self.callback_user.lock().expect("lock") = Some(session);
        self
    }

    pub fn with_callback_error(self, error: ClientError) -> Self {
        *self.callback_error.lock().expect("lock") = Some(error);
        self
    }

    /// Queue the outcome of the next `signin_silent` call.
    pub fn push_silent_result(&self, result: Result<SessionRef, ClientError>) {
        self.silent_results.lock().expect("lock").push_back(result);
    }

    pub fn set_silent_delay(&self, delay: Duration) {
        *self.silent_delay.lock().expect("lock") = Some(delay);
    }

    pub fn set_user(&self, session: Option<SessionRef>) {
        *self.user.lock().expect("lock") = session;
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .expect("lock")
            .iter()
            .filter(|call| **call == name)
            .count()
    }

    pub fn has_events(&self) -> bool {
        self.events.lock().expect("lock").is_some()
    }

    /// Raise `on_user_loaded` as the real client would.
    pub fn emit_user_loaded(&self, session: SessionRef) {
        let events = self.events.lock().expect("lock").clone();
        if let Some(events) = events {
            events.on_user_loaded(session);
        }
    }

    /// Raise `on_silent_renew_error` as the real client would.
    pub fn emit_silent_renew_error(&self, error: ClientError) {
        let events = self.events.lock().expect("lock").clone();
        if let Some(events) = events {
            events.on_silent_renew_error(&error);
        }
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().expect("lock").push(name);
    }

    fn complete_callback(&self) -> Result<(), ClientError> {
        if let Some(err) = self.callback_error.lock().expect("lock").clone() {
            return Err(err);
        }
        let loaded = self.callback_user.lock().expect("lock").clone();
        if let Some(session) = loaded {
            self.set_user(Some(session.clone()));
            self.emit_user_loaded(session);
        }
        Ok(())
    }
}

#[async_trait]
impl UserManager for FakeUserManager {
    fn register_events(&self, events: Arc<dyn UserManagerEvents>) {
        *self.events.lock().expect("lock") = Some(events);
    }

    async fn signin_redirect(&self) -> Result<(), ClientError> {
        self.record("signin_redirect");
        Ok(())
    }

    async fn signin_redirect_callback(&self) -> Result<(), ClientError> {
        self.record("signin_redirect_callback");
        self.complete_callback()
    }

    async fn signin_silent(&self) -> Result<SessionRef, ClientError> {
        self.record("signin_silent");
        let delay = *self.silent_delay.lock().expect("lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let result = self
            .silent_results
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Unreachable("no silent result queued".into())));
        if let Ok(session) = &result {
            self.set_user(Some(session.clone()));
            self.emit_user_loaded(session.clone());
        }
        result
    }

    async fn signin_silent_callback(&self) -> Result<(), ClientError> {
        self.record("signin_silent_callback");
        self.complete_callback()
    }

    async fn signout_redirect(&self) -> Result<(), ClientError> {
        self.record("signout_redirect");
        Ok(())
    }

    async fn clear_stale_state(&self) -> Result<(), ClientError> {
        self.record("clear_stale_state");
        Ok(())
    }

    async fn get_user(&self) -> Result<Option<SessionRef>, ClientError> {
        self.record("get_user");
        Ok(self.user.lock().expect("lock").clone())
    }
}
