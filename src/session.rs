//! Immutable session values handed out by the OIDC client.
//!
//! A session is never edited in place. A renewed or reloaded session is a new
//! [`SessionRef`], and the store compares sessions by pointer identity.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::SessionError;

/// Claim carrying the absolute expiry in unix seconds.
pub const EXPIRY_CLAIM: &str = "exp";

/// Claim name → claim value mapping decoded from the id token.
pub type Claims = Map<String, Value>;

/// Shared handle to one immutable session.
pub type SessionRef = Arc<Session>;

/// One authenticated principal's credentials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    id_token: String,
    profile: Claims,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_state: Option<String>,
    #[serde(skip)]
    expires_at: i64,
}

impl Session {
    /// Build a session from an id token and its claims.
    ///
    /// The profile must carry an integer `exp` claim.
    pub fn new(id_token: impl Into<String>, profile: Claims) -> Result<Self, SessionError> {
        let expires_at = parse_expiry(&profile)?;
        Ok(Self {
            id_token: id_token.into(),
            profile,
            access_token: None,
            token_type: None,
            scope: None,
            session_state: None,
            expires_at,
        })
    }

    /// Build a session by decoding the payload segment of a compact JWT.
    ///
    /// The signature is not checked here; that belongs to the OIDC client
    /// which handed the token over.
    pub fn from_id_token(id_token: &str) -> Result<Self, SessionError> {
        let profile = decode_claims(id_token)?;
        Self::new(id_token, profile)
    }

    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = Some(token_type.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_session_state(mut self, session_state: impl Into<String>) -> Self {
        self.session_state = Some(session_state.into());
        self
    }

    /// Wrap into the shared handle the store works with.
    pub fn into_ref(self) -> SessionRef {
        Arc::new(self)
    }

    pub fn id_token(&self) -> &str {
        &self.id_token
    }

    pub fn profile(&self) -> &Claims {
        &self.profile
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.profile.get(name)
    }

    /// Subject identifier, when the provider sent one.
    pub fn subject(&self) -> Option<&str> {
        self.claim("sub").and_then(Value::as_str)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn token_type(&self) -> Option<&str> {
        self.token_type.as_deref()
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn session_state(&self) -> Option<&str> {
        self.session_state.as_deref()
    }

    /// Absolute expiry in unix seconds, taken from the `exp` claim.
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }
}

fn parse_expiry(profile: &Claims) -> Result<i64, SessionError> {
    let raw = profile
        .get(EXPIRY_CLAIM)
        .ok_or(SessionError::MissingExpiry)?;
    match raw {
        Value::Number(num) => num
            .as_i64()
            .or_else(|| num.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .ok_or_else(|| SessionError::InvalidExpiry(raw.to_string())),
        _ => Err(SessionError::InvalidExpiry(raw.to_string())),
    }
}

fn decode_claims(id_token: &str) -> Result<Claims, SessionError> {
    let mut segments = id_token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(SessionError::MalformedToken(
            "expected three dot-separated segments".to_string(),
        ));
    };
    // Some issuers pad their base64url segments even though RFC 7515 forbids it.
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|err| SessionError::MalformedToken(format!("payload is not base64url: {err}")))?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(_) => Err(SessionError::MalformedToken(
            "payload is not a JSON object".to_string(),
        )),
        Err(err) => Err(SessionError::MalformedToken(format!(
            "payload is not JSON: {err}"
        ))),
    }
}
