//! Single-slot renewal timer.
//!
//! The scheduler never holds more than one pending timer: every `arm` cancels
//! whatever was armed before, so a stale timer can not start a second renewal.
//! Timers come from an injected [`Timer`] so the state machine can be driven
//! without waiting on a real clock.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::clock::{expiring_in, Clock};
use crate::session::{Session, SessionRef};

/// Work run when a renewal timer elapses.
pub type RenewalTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Cancels one scheduled task.
pub trait TimerHandle: Send {
    fn cancel(&mut self);
}

/// Schedules a task to run once after a delay.
pub trait Timer: Send + Sync {
    fn schedule(&self, delay: Duration, task: RenewalTask) -> Box<dyn TimerHandle>;
}

// ---------------------------------------------------------------------------
// Tokio timer
// ---------------------------------------------------------------------------

/// Timer backed by a spawned tokio task.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn schedule(&self, delay: Duration, task: RenewalTask) -> Box<dyn TimerHandle> {
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(
                delay_secs = delay.as_secs(),
                "no tokio runtime available, renewal timer not armed"
            );
            return Box::new(DetachedHandle);
        };
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        Box::new(TokioTimerHandle { handle })
    }
}

struct TokioTimerHandle {
    handle: JoinHandle<()>,
}

impl TimerHandle for TokioTimerHandle {
    fn cancel(&mut self) {
        self.handle.abort();
    }
}

struct DetachedHandle;

impl TimerHandle for DetachedHandle {
    fn cancel(&mut self) {}
}

// ---------------------------------------------------------------------------
// Manual timer
// ---------------------------------------------------------------------------

/// Timer that only fires when asked to.
///
/// Records every scheduled delay so hosts and tests can inspect what the
/// scheduler decided without sleeping.
#[derive(Default)]
pub struct ManualTimer {
    entries: Arc<Mutex<Vec<ManualEntry>>>,
}

struct ManualEntry {
    delay: Duration,
    task: Option<RenewalTask>,
    cancelled: Arc<AtomicBool>,
}

impl ManualEntry {
    fn is_active(&self) -> bool {
        self.task.is_some() && !self.cancelled.load(Ordering::SeqCst)
    }
}

struct ManualTimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle for ManualTimerHandle {
    fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays of timers that are neither cancelled nor fired, oldest first.
    pub fn active_delays(&self) -> Vec<Duration> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| entry.is_active())
            .map(|entry| entry.delay)
            .collect()
    }

    /// Total number of timers ever scheduled.
    pub fn scheduled_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Run the most recently scheduled active timer to completion.
    ///
    /// Returns `false` when nothing was pending.
    pub async fn fire(&self) -> bool {
        let task = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries
                .iter_mut()
                .rev()
                .find(|entry| entry.is_active())
                .and_then(|entry| entry.task.take())
        };
        match task {
            Some(task) => {
                task.await;
                true
            }
            None => false,
        }
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration, task: RenewalTask) -> Box<dyn TimerHandle> {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ManualEntry {
                delay,
                task: Some(task),
                cancelled: cancelled.clone(),
            });
        Box::new(ManualTimerHandle { cancelled })
    }
}

// ---------------------------------------------------------------------------
// Session state + scheduler
// ---------------------------------------------------------------------------

const PHASE_ARMED: u8 = 0;
const PHASE_FIRING: u8 = 1;
const PHASE_DONE: u8 = 2;

/// The one scheduled renewal, if any.
pub(crate) struct PendingRenewal {
    handle: Box<dyn TimerHandle>,
    delay: Duration,
    phase: Arc<AtomicU8>,
}

/// Current session plus its pending renewal.
///
/// Owned by the session store; the scheduler receives it by `&mut` so the
/// pending slot can only change through the store's `set`.
#[derive(Default)]
pub struct SessionState {
    pub(crate) current: Option<SessionRef>,
    pub(crate) pending: Option<PendingRenewal>,
}

/// Observable scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    Idle,
    /// Timer pending; fires after `fires_in_secs` from when it was armed.
    Armed { fires_in_secs: u64 },
    Firing,
}

/// Arms and cancels the renewal timer for the current session.
pub struct ExpiryScheduler {
    timer: Arc<dyn Timer>,
    clock: Arc<dyn Clock>,
    timeout_expiring: i64,
}

impl ExpiryScheduler {
    pub fn new(timer: Arc<dyn Timer>, clock: Arc<dyn Clock>, timeout_expiring: i64) -> Self {
        Self {
            timer,
            clock,
            timeout_expiring,
        }
    }

    /// Proactive renewal lead time in seconds.
    pub fn timeout_expiring(&self) -> i64 {
        self.timeout_expiring
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Replace any pending timer with one that runs `on_fire` at the
    /// renewal threshold of `session`. Returns the armed delay.
    pub(crate) fn arm(
        &self,
        state: &mut SessionState,
        session: &Session,
        on_fire: RenewalTask,
    ) -> Duration {
        self.cancel(state);

        let expiring = expiring_in(session, self.clock.now_secs(), self.timeout_expiring);
        let delay = Duration::from_millis((expiring.max(0) as u64).saturating_mul(1000));

        let phase = Arc::new(AtomicU8::new(PHASE_ARMED));
        let task_phase = phase.clone();
        let task: RenewalTask = Box::pin(async move {
            task_phase.store(PHASE_FIRING, Ordering::SeqCst);
            on_fire.await;
            task_phase.store(PHASE_DONE, Ordering::SeqCst);
        });

        let handle = self.timer.schedule(delay, task);
        state.pending = Some(PendingRenewal {
            handle,
            delay,
            phase,
        });
        delay
    }

    /// Cancel the pending timer, if any.
    ///
    /// A timer that already started firing is only detached; the renewal it
    /// is running is left to finish.
    pub(crate) fn cancel(&self, state: &mut SessionState) {
        if let Some(mut pending) = state.pending.take() {
            if pending.phase.load(Ordering::SeqCst) == PHASE_ARMED {
                pending.handle.cancel();
            }
        }
    }

    pub fn phase(&self, state: &SessionState) -> SchedulerPhase {
        match &state.pending {
            None => SchedulerPhase::Idle,
            Some(pending) => match pending.phase.load(Ordering::SeqCst) {
                PHASE_ARMED => SchedulerPhase::Armed {
                    fires_in_secs: pending.delay.as_secs(),
                },
                PHASE_FIRING => SchedulerPhase::Firing,
                _ => SchedulerPhase::Idle,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::testsupport::session_expiring_at;
    use std::sync::atomic::AtomicUsize;

    fn scheduler(timer: Arc<ManualTimer>, now: i64, lead: i64) -> ExpiryScheduler {
        ExpiryScheduler::new(timer, Arc::new(ManualClock::new(now)), lead)
    }

    fn counting_task(counter: &Arc<AtomicUsize>) -> RenewalTask {
        let counter = counter.clone();
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn arm_schedules_at_threshold_before_expiry() {
        let timer = Arc::new(ManualTimer::new());
        let scheduler = scheduler(timer.clone(), 1_000, 60);
        let mut state = SessionState::default();
        let counter = Arc::new(AtomicUsize::new(0));

        let delay = scheduler.arm(
            &mut state,
            &session_expiring_at(1_000 + 3_600),
            counting_task(&counter),
        );

        assert_eq!(delay, Duration::from_secs(3_540));
        assert_eq!(timer.active_delays(), vec![Duration::from_secs(3_540)]);
        assert_eq!(
            scheduler.phase(&state),
            SchedulerPhase::Armed {
                fires_in_secs: 3_540
            }
        );
    }

    #[test]
    fn overdue_renewal_is_scheduled_immediately() {
        let timer = Arc::new(ManualTimer::new());
        let scheduler = scheduler(timer.clone(), 1_000, 60);
        let mut state = SessionState::default();
        let counter = Arc::new(AtomicUsize::new(0));

        let delay = scheduler.arm(
            &mut state,
            &session_expiring_at(1_030),
            counting_task(&counter),
        );

        assert_eq!(delay, Duration::ZERO);
    }

    #[test]
    fn rearming_cancels_the_previous_timer() {
        let timer = Arc::new(ManualTimer::new());
        let scheduler = scheduler(timer.clone(), 0, 60);
        let mut state = SessionState::default();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler.arm(&mut state, &session_expiring_at(600), counting_task(&counter));
        scheduler.arm(&mut state, &session_expiring_at(1_200), counting_task(&counter));

        assert_eq!(timer.scheduled_count(), 2);
        assert_eq!(timer.active_delays(), vec![Duration::from_secs(1_140)]);
    }

    #[test]
    fn cancel_is_idempotent() {
        let timer = Arc::new(ManualTimer::new());
        let scheduler = scheduler(timer.clone(), 0, 60);
        let mut state = SessionState::default();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler.arm(&mut state, &session_expiring_at(600), counting_task(&counter));
        scheduler.cancel(&mut state);
        scheduler.cancel(&mut state);

        assert!(timer.active_delays().is_empty());
        assert_eq!(scheduler.phase(&state), SchedulerPhase::Idle);
    }

    #[tokio::test]
    async fn firing_runs_task_and_returns_to_idle() {
        let timer = Arc::new(ManualTimer::new());
        let scheduler = scheduler(timer.clone(), 0, 60);
        let mut state = SessionState::default();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler.arm(&mut state, &session_expiring_at(600), counting_task(&counter));
        assert!(timer.fire().await);

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.phase(&state), SchedulerPhase::Idle);
        assert!(!timer.fire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_fires_after_delay_and_honours_cancel() {
        let scheduler = ExpiryScheduler::new(
            Arc::new(TokioTimer),
            Arc::new(ManualClock::new(0)),
            60,
        );
        let mut state = SessionState::default();
        let fired = Arc::new(AtomicUsize::new(0));
        let cancelled = Arc::new(AtomicUsize::new(0));

        scheduler.arm(&mut state, &session_expiring_at(70), counting_task(&cancelled));
        scheduler.cancel(&mut state);
        scheduler.arm(&mut state, &session_expiring_at(65), counting_task(&fired));

        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(cancelled.load(Ordering::SeqCst), 0);
    }
}
