//! The current session and everyone who wants to hear about it.
//!
//! [`SessionStore::set`] is the only write path for the session state. Each
//! genuine change cancels the pending renewal, arms a new one for the incoming
//! session, and then notifies subscribers in subscription order before
//! returning.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::clock::ExpiryStatus;
use crate::frame::FrameContext;
use crate::scheduler::{ExpiryScheduler, RenewalTask, SchedulerPhase, SessionState};
use crate::session::SessionRef;

/// Synchronous change callback.
pub type SessionCallback = Arc<dyn Fn(Option<&SessionRef>) + Send + Sync>;

/// Stream of session changes for async consumers.
pub type SessionChanges = mpsc::UnboundedReceiver<Option<SessionRef>>;

/// Produces the work run when the renewal timer fires.
pub type RenewalHook = Arc<dyn Fn() -> RenewalTask + Send + Sync>;

/// Handle used to drop a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
enum Subscriber {
    Callback(SessionCallback),
    Channel(mpsc::UnboundedSender<Option<SessionRef>>),
}

pub struct SessionStore {
    state: Mutex<SessionState>,
    scheduler: ExpiryScheduler,
    frame: Arc<dyn FrameContext>,
    renewal: Mutex<Option<RenewalHook>>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_subscription: AtomicU64,
}

impl SessionStore {
    pub fn new(scheduler: ExpiryScheduler, frame: Arc<dyn FrameContext>) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            scheduler,
            frame,
            renewal: Mutex::new(None),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Install the work to run when a session reaches its renewal threshold.
    ///
    /// Without a hook, sessions are stored but no timer is armed.
    pub fn set_renewal_hook(&self, hook: RenewalHook) {
        *self.renewal.lock().unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    pub fn get(&self) -> Option<SessionRef> {
        self.lock_state().current.clone()
    }

    /// Replace the current session.
    ///
    /// Returns `false` without side effects when `next` is the very same
    /// reference as the current value.
    pub fn set(&self, next: Option<SessionRef>) -> bool {
        {
            let mut state = self.lock_state();
            if same_session(state.current.as_ref(), next.as_ref()) {
                return false;
            }

            self.scheduler.cancel(&mut state);

            match &next {
                Some(session) => {
                    let status = ExpiryStatus::of(
                        session,
                        self.scheduler.clock().now_secs(),
                        self.scheduler.timeout_expiring(),
                    );
                    let hook = self
                        .renewal
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .clone();
                    match hook {
                        Some(hook) => {
                            let delay = self.scheduler.arm(&mut state, session, hook());
                            tracing::info!(
                                expires_in = status.expires_in,
                                expiring_in = status.expiring_in,
                                renew_in_secs = delay.as_secs(),
                                embedded = self.frame.is_embedded(),
                                "session set, renewal timer armed"
                            );
                        }
                        None => tracing::debug!(
                            expires_in = status.expires_in,
                            embedded = self.frame.is_embedded(),
                            "session set without a renewal hook"
                        ),
                    }
                }
                None => tracing::info!(embedded = self.frame.is_embedded(), "session cleared"),
            }

            state.current = next.clone();
        }

        self.notify(next.as_ref());
        true
    }

    /// Register a callback run synchronously on every future change.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Option<&SessionRef>) + Send + Sync + 'static,
    {
        self.add_subscriber(Subscriber::Callback(Arc::new(callback)))
    }

    /// Open a channel that receives every future change.
    pub fn changes(&self) -> SessionChanges {
        let (tx, rx) = mpsc::unbounded_channel();
        self.add_subscriber(Subscriber::Channel(tx));
        rx
    }

    /// Returns `true` when the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock_subscribers();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.scheduler.phase(&self.lock_state())
    }

    /// Countdown for the current session, if any.
    pub fn expiry_status(&self) -> Option<ExpiryStatus> {
        let current = self.get()?;
        Some(ExpiryStatus::of(
            &current,
            self.scheduler.clock().now_secs(),
            self.scheduler.timeout_expiring(),
        ))
    }

    pub fn timeout_expiring(&self) -> i64 {
        self.scheduler.timeout_expiring()
    }

    pub fn now_secs(&self) -> i64 {
        self.scheduler.clock().now_secs()
    }

    pub fn frame(&self) -> &Arc<dyn FrameContext> {
        &self.frame
    }

    fn add_subscriber(&self, subscriber: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.lock_subscribers().push((id, subscriber));
        id
    }

    fn notify(&self, value: Option<&SessionRef>) {
        // Snapshot so callbacks may subscribe or read the store without deadlocking.
        let snapshot = self.lock_subscribers().clone();
        let mut closed = Vec::new();
        for (id, subscriber) in snapshot {
            match subscriber {
                Subscriber::Callback(callback) => callback(value),
                Subscriber::Channel(tx) => {
                    if tx.send(value.cloned()).is_err() {
                        closed.push(id);
                    }
                }
            }
        }
        if !closed.is_empty() {
            self.lock_subscribers()
                .retain(|(id, _)| !closed.contains(id));
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Subscriber)>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn same_session(current: Option<&SessionRef>, next: Option<&SessionRef>) -> bool {
    match (current, next) {
        (None, None) => true,
        (Some(current), Some(next)) => Arc::ptr_eq(current, next),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::frame::StaticFrame;
    use crate::scheduler::{ManualTimer, TokioTimer};
    use crate::testsupport::session_ref;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    const NOW: i64 = 1_700_000_000;

    fn store_with_timer(lead: i64) -> (SessionStore, Arc<ManualTimer>, Arc<AtomicUsize>) {
        let timer = Arc::new(ManualTimer::new());
        let scheduler = ExpiryScheduler::new(timer.clone(), Arc::new(ManualClock::new(NOW)), lead);
        let store = SessionStore::new(scheduler, Arc::new(StaticFrame::top_level()));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        store.set_renewal_hook(Arc::new(move || -> RenewalTask {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        }));
        (store, timer, fired)
    }

    fn recorder(store: &SessionStore) -> Arc<Mutex<Vec<Option<String>>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        store.subscribe(move |session| {
            sink.lock()
                .expect("lock")
                .push(session.map(|s| s.id_token().to_string()));
        });
        seen
    }

    #[test]
    fn same_reference_twice_notifies_once() {
        let (store, timer, _) = store_with_timer(60);
        let seen = recorder(&store);
        let session = session_ref("a", NOW + 3_600);

        assert!(store.set(Some(session.clone())));
        assert!(!store.set(Some(session)));

        assert_eq!(seen.lock().expect("lock").len(), 1);
        assert_eq!(timer.scheduled_count(), 1);
    }

    #[test]
    fn equal_claims_in_a_new_reference_count_as_a_change() {
        let (store, timer, _) = store_with_timer(60);
        let seen = recorder(&store);

        store.set(Some(session_ref("a", NOW + 3_600)));
        store.set(Some(session_ref("a", NOW + 3_600)));

        assert_eq!(seen.lock().expect("lock").len(), 2);
        assert_eq!(timer.scheduled_count(), 2);
        assert_eq!(timer.active_delays().len(), 1);
    }

    #[test]
    fn set_arms_timer_at_lead_time_before_expiry() {
        let (store, timer, _) = store_with_timer(60);

        store.set(Some(session_ref("a", NOW + 3_600)));

        assert_eq!(timer.active_delays(), vec![Duration::from_secs(3_540)]);
        assert_eq!(
            store.phase(),
            SchedulerPhase::Armed {
                fires_in_secs: 3_540
            }
        );
    }

    #[test]
    fn replacing_a_session_leaves_one_timer_for_the_new_one() {
        let (store, timer, _) = store_with_timer(60);

        store.set(Some(session_ref("a", NOW + 600)));
        store.set(Some(session_ref("b", NOW + 1_200)));

        assert_eq!(timer.active_delays(), vec![Duration::from_secs(1_140)]);
        assert_eq!(store.get().map(|s| s.id_token().to_string()), Some("b".into()));
    }

    #[test]
    fn clearing_cancels_timer_and_notifies_none() {
        let (store, timer, _) = store_with_timer(60);
        let seen = recorder(&store);

        store.set(Some(session_ref("a", NOW + 600)));
        store.set(None);

        assert!(timer.active_delays().is_empty());
        assert_eq!(store.phase(), SchedulerPhase::Idle);
        assert_eq!(
            *seen.lock().expect("lock"),
            vec![Some("a".to_string()), None]
        );
    }

    #[test]
    fn clearing_an_empty_store_is_a_no_op() {
        let (store, _, _) = store_with_timer(60);
        let seen = recorder(&store);

        assert!(!store.set(None));
        assert!(seen.lock().expect("lock").is_empty());
    }

    #[test]
    fn subscribers_see_changes_in_subscription_order() {
        let (store, _, _) = store_with_timer(60);
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            store.subscribe(move |_| order.lock().expect("lock").push(tag));
        }

        store.set(Some(session_ref("a", NOW + 600)));

        assert_eq!(*order.lock().expect("lock"), vec!["first", "second", "third"]);
    }

    #[test]
    fn late_subscribers_get_no_replay() {
        let (store, _, _) = store_with_timer(60);
        store.set(Some(session_ref("a", NOW + 600)));

        let seen = recorder(&store);
        assert!(seen.lock().expect("lock").is_empty());

        store.set(None);
        assert_eq!(*seen.lock().expect("lock"), vec![None]);
    }

    #[test]
    fn callbacks_can_read_the_store_during_notification() {
        let (store, _, _) = store_with_timer(60);
        let store = Arc::new(store);
        let observed = Arc::new(Mutex::new(None));
        let reader = Arc::downgrade(&store);
        let sink = observed.clone();
        store.subscribe(move |_| {
            if let Some(store) = reader.upgrade() {
                *sink.lock().expect("lock") = store.get().map(|s| s.id_token().to_string());
            }
        });

        store.set(Some(session_ref("fresh", NOW + 600)));

        assert_eq!(*observed.lock().expect("lock"), Some("fresh".to_string()));
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let (store, _, _) = store_with_timer(60);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let id = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.set(Some(session_ref("a", NOW + 600)));
        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.set(None);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn channel_subscribers_receive_changes_and_closed_ones_are_pruned() {
        let (store, _, _) = store_with_timer(60);
        let mut changes = store.changes();
        let dropped = store.changes();
        drop(dropped);

        store.set(Some(session_ref("a", NOW + 600)));
        store.set(None);

        let first = changes.recv().await.expect("first change");
        assert_eq!(first.map(|s| s.id_token().to_string()), Some("a".into()));
        assert!(changes.recv().await.expect("second change").is_none());
        assert_eq!(store.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn firing_timer_runs_renewal_hook() {
        let (store, timer, fired) = store_with_timer(60);
        store.set(Some(session_ref("a", NOW + 600)));

        assert!(timer.fire().await);

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(store.phase(), SchedulerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn firing_renewal_outlives_the_rearm_it_triggers() {
        let scheduler = ExpiryScheduler::new(
            Arc::new(TokioTimer),
            Arc::new(ManualClock::new(NOW)),
            60,
        );
        let store = Arc::new(SessionStore::new(scheduler, Arc::new(StaticFrame::top_level())));
        let completed = Arc::new(AtomicUsize::new(0));
        let weak = Arc::downgrade(&store);
        let counter = completed.clone();
        store.set_renewal_hook(Arc::new(move || -> RenewalTask {
            let weak = weak.clone();
            let counter = counter.clone();
            Box::pin(async move {
                if let Some(store) = weak.upgrade() {
                    store.set(Some(session_ref("renewed", NOW + 3_600)));
                }
                // Work after the re-arm must not be aborted with the old timer.
                tokio::time::sleep(Duration::from_millis(20)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            })
        }));

        store.set(Some(session_ref("a", NOW + 61)));
        assert_eq!(store.phase(), SchedulerPhase::Armed { fires_in_secs: 1 });

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.get().map(|s| s.id_token().to_string()),
            Some("renewed".to_string())
        );
        assert_eq!(store.phase(), SchedulerPhase::Armed { fires_in_secs: 3_540 });
    }

    #[test]
    fn without_hook_no_timer_is_armed() {
        let timer = Arc::new(ManualTimer::new());
        let scheduler = ExpiryScheduler::new(timer.clone(), Arc::new(ManualClock::new(NOW)), 60);
        let store = SessionStore::new(scheduler, Arc::new(StaticFrame::embedded()));

        assert!(store.set(Some(session_ref("a", NOW + 600))));

        assert_eq!(timer.scheduled_count(), 0);
        assert_eq!(store.phase(), SchedulerPhase::Idle);
    }

    #[test]
    fn expiry_status_reports_current_countdown() {
        let (store, _, _) = store_with_timer(60);
        assert!(store.expiry_status().is_none());

        store.set(Some(session_ref("a", NOW + 100)));

        assert_eq!(
            store.expiry_status(),
            Some(ExpiryStatus {
                expires_in: 100,
                expiring_in: 40
            })
        );
    }
}
