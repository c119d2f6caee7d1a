//! Public entry point tying the client, the store and the timer together.
//!
//! [`AuthFacade`] is what an application holds. It owns the one
//! [`SessionStore`], forwards client events into it, and runs silent renewal
//! both when the proactive timer fires and when a caller asks for a token that
//! is about to expire.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::client::{UserManager, UserManagerEvents};
use crate::clock::{Clock, ExpiryStatus, SystemClock};
use crate::config::{Config, Settings, DEFAULT_SLIP_SECS, DEFAULT_TIMEOUT_EXPIRING_SECS};
use crate::error::{AuthError, ClientError};
use crate::frame::{FrameContext, StaticFrame};
use crate::navigation::{MemoryNavigation, Navigation};
use crate::resolver::{CallbackResolver, EntryKind, EntryOutcome};
use crate::scheduler::{ExpiryScheduler, RenewalTask, SchedulerPhase, Timer, TokioTimer};
use crate::session::SessionRef;
use crate::store::{SessionChanges, SessionStore, SubscriptionId};

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects the collaborators an [`AuthFacade`] runs against.
pub struct AuthFacadeBuilder {
    settings: Settings,
    timeout_expiring: u64,
    slip: u64,
    clock: Arc<dyn Clock>,
    timer: Arc<dyn Timer>,
    frame: Arc<dyn FrameContext>,
    navigation: Arc<dyn Navigation>,
}

impl AuthFacadeBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            timeout_expiring: DEFAULT_TIMEOUT_EXPIRING_SECS,
            slip: DEFAULT_SLIP_SECS,
            clock: Arc::new(SystemClock),
            timer: Arc::new(TokioTimer),
            frame: Arc::new(StaticFrame::top_level()),
            navigation: Arc::new(MemoryNavigation::default()),
        }
    }

    /// Start from loaded configuration, renewal timings included.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.client.clone())
            .timeout_expiring(config.renewal.timeout_expiring)
            .slip(config.renewal.slip)
    }

    /// Seconds before expiry at which the proactive renewal fires.
    pub fn timeout_expiring(mut self, secs: u64) -> Self {
        self.timeout_expiring = secs;
        self
    }

    /// Slip tolerance used by [`AuthFacade::token`].
    pub fn slip(mut self, secs: u64) -> Self {
        self.slip = secs;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = timer;
        self
    }

    pub fn frame(mut self, frame: Arc<dyn FrameContext>) -> Self {
        self.frame = frame;
        self
    }

    pub fn navigation(mut self, navigation: Arc<dyn Navigation>) -> Self {
        self.navigation = navigation;
        self
    }

    /// Validate settings, construct the client and wire its events.
    pub fn connect<F>(self, connect: F) -> Result<AuthFacade, AuthError>
    where
        F: FnOnce(&Settings) -> Result<Arc<dyn UserManager>, ClientError>,
    {
        self.settings.validate()?;
        if self.slip < self.timeout_expiring {
            tracing::warn!(
                slip = self.slip,
                timeout_expiring = self.timeout_expiring,
                "slip is below the renewal lead time"
            );
        }

        let client = connect(&self.settings)?;
        let scheduler = ExpiryScheduler::new(
            self.timer,
            self.clock,
            secs_to_i64(self.timeout_expiring),
        );
        let store = SessionStore::new(scheduler, self.frame.clone());
        let resolver = CallbackResolver::new(client.clone(), self.frame, self.navigation.clone());

        let inner = Arc::new(Inner {
            client,
            store,
            resolver,
            navigation: self.navigation,
            settings: self.settings,
            slip: secs_to_i64(self.slip),
            renewal: RenewalGate::default(),
        });

        let events = Arc::new(StoreEvents {
            inner: Arc::downgrade(&inner),
        });
        inner.client.register_events(events);

        let weak = Arc::downgrade(&inner);
        inner.store.set_renewal_hook(Arc::new(move || -> RenewalTask {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    inner.renew_on_timer().await;
                }
            })
        }));

        tracing::info!(
            authority = %inner.settings.authority,
            client_id = %inner.settings.client_id,
            timeout_expiring = inner.store.timeout_expiring(),
            embedded = inner.store.frame().is_embedded(),
            "session manager initialized"
        );
        Ok(AuthFacade { inner })
    }
}

fn secs_to_i64(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

/// Session lifecycle manager handed to the application.
///
/// Cheap to clone; clones share one store and one client.
#[derive(Clone)]
pub struct AuthFacade {
    inner: Arc<Inner>,
}

struct Inner {
    client: Arc<dyn UserManager>,
    store: SessionStore,
    resolver: CallbackResolver,
    navigation: Arc<dyn Navigation>,
    settings: Settings,
    slip: i64,
    renewal: RenewalGate,
}

/// Serializes silent renewals and lets waiting callers reuse the result.
#[derive(Default)]
struct RenewalGate {
    running: tokio::sync::Mutex<()>,
    completed: AtomicU64,
    last: Mutex<Option<Result<SessionRef, ClientError>>>,
}

impl AuthFacade {
    /// Build a facade with default collaborators.
    pub fn init<F>(settings: Settings, timeout_expiring: u64, connect: F) -> Result<Self, AuthError>
    where
        F: FnOnce(&Settings) -> Result<Arc<dyn UserManager>, ClientError>,
    {
        AuthFacadeBuilder::new(settings)
            .timeout_expiring(timeout_expiring)
            .connect(connect)
    }

    pub fn builder(settings: Settings) -> AuthFacadeBuilder {
        AuthFacadeBuilder::new(settings)
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Resolve the navigation the application was loaded with.
    ///
    /// `Ok(None)` means no session is available and the caller should offer
    /// sign-in.
    pub async fn entry_point(&self) -> Result<Option<EntryOutcome>, AuthError> {
        let kind = self.inner.resolver.classify();
        tracing::debug!(?kind, "resolving entry navigation");
        self.inner.resolver.resolve(&self.inner.store).await
    }

    pub fn entry_kind(&self) -> EntryKind {
        self.inner.resolver.classify()
    }

    /// Drop the consumed sign-in response from the address.
    pub fn clear_callback_fragment(&self) {
        self.inner.navigation.clear_fragment();
    }

    /// The id token, renewed first when it expires within `slip` seconds.
    pub async fn get_token(&self, slip: u64) -> Result<String, AuthError> {
        let Some(session) = self.inner.client.get_user().await? else {
            return Err(AuthError::Unauthorized);
        };
        let status = ExpiryStatus::of(
            &session,
            self.inner.store.now_secs(),
            self.inner.store.timeout_expiring(),
        );
        if status.within_slip(secs_to_i64(slip)) {
            tracing::debug!(expires_in = status.expires_in, slip, "token within slip, renewing");
            let renewed = self.refresh_silent().await?;
            return Ok(renewed.id_token().to_string());
        }
        Ok(session.id_token().to_string())
    }

    /// [`Self::get_token`] with the configured slip.
    pub async fn token(&self) -> Result<String, AuthError> {
        self.get_token(self.inner.slip.max(0) as u64).await
    }

    /// Start an interactive sign-in.
    pub async fn signin(&self) -> Result<(), AuthError> {
        self.inner.client.signin_redirect().await?;
        Ok(())
    }

    /// Sign out at the provider and locally.
    pub async fn signout(&self) -> Result<(), AuthError> {
        self.inner.client.signout_redirect().await?;
        if let Err(error) = self.inner.client.clear_stale_state().await {
            tracing::warn!(%error, "failed to clear stale sign-in state");
        }
        self.inner.store.set(None);
        Ok(())
    }

    /// Obtain a fresh session without user interaction.
    ///
    /// Calls made while a renewal is running wait for it and share its
    /// result instead of starting another.
    pub async fn refresh_silent(&self) -> Result<SessionRef, AuthError> {
        self.inner
            .refresh_silent()
            .await
            .map_err(AuthError::SilentRenew)
    }

    pub fn user(&self) -> Option<SessionRef> {
        self.inner.store.get()
    }

    /// Replace the session. `None` signs out locally.
    pub fn set_user(&self, session: Option<SessionRef>) -> bool {
        self.inner.store.set(session)
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Option<&SessionRef>) + Send + Sync + 'static,
    {
        self.inner.store.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.store.unsubscribe(id)
    }

    pub fn changes(&self) -> SessionChanges {
        self.inner.store.changes()
    }

    pub fn is_embedded(&self) -> bool {
        self.inner.store.frame().is_embedded()
    }

    pub fn expiry_status(&self) -> Option<ExpiryStatus> {
        self.inner.store.expiry_status()
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.inner.store.phase()
    }
}

impl Inner {
    async fn refresh_silent(&self) -> Result<SessionRef, ClientError> {
        let seen = self.renewal.completed.load(Ordering::SeqCst);
        let _running = self.renewal.running.lock().await;
        if self.renewal.completed.load(Ordering::SeqCst) != seen {
            let shared = self
                .renewal
                .last
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(result) = shared {
                tracing::debug!("joined a silent renewal that finished while waiting");
                return result;
            }
        }

        let result = self.client.signin_silent().await;
        match &result {
            Ok(session) => {
                self.store.set(Some(session.clone()));
            }
            Err(error) => tracing::debug!(%error, "silent renewal failed"),
        }
        *self
            .renewal
            .last
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(result.clone());
        self.renewal.completed.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn renew_on_timer(&self) {
        tracing::info!("renewal threshold reached, renewing silently");
        match self.refresh_silent().await {
            Ok(session) => tracing::info!(
                expires_at = session.expires_at(),
                "scheduled silent renewal succeeded"
            ),
            Err(error) => {
                tracing::warn!(%error, "scheduled silent renewal failed, clearing session");
                self.store.set(None);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Client events
// ---------------------------------------------------------------------------

struct StoreEvents {
    inner: Weak<Inner>,
}

impl UserManagerEvents for StoreEvents {
    fn on_user_loaded(&self, session: SessionRef) {
        if let Some(inner) = self.inner.upgrade() {
            inner.store.set(Some(session));
        }
    }

    fn on_silent_renew_error(&self, error: &ClientError) {
        if let Some(inner) = self.inner.upgrade() {
            tracing::info!(%error, "silent renewal error reported by client, clearing session");
            inner.store.set(None);
        }
    }
}
