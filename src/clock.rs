//! Wall-clock readings and expiry arithmetic for sessions.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::session::Session;

/// Source of the current time in unix seconds.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> i64;
}

/// Reads the host's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        unix_now_secs()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_secs: i64) -> Self {
        Self {
            now: AtomicI64::new(now_secs),
        }
    }

    pub fn set(&self, now_secs: i64) {
        self.now.store(now_secs, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Seconds until the session's `exp`; negative once expired.
pub fn expires_in(session: &Session, now: i64) -> i64 {
    session.expires_at().saturating_sub(now)
}

/// Seconds until the renewal threshold ahead of expiry.
///
/// Negative means renewal is already overdue.
pub fn expiring_in(session: &Session, now: i64, threshold: i64) -> i64 {
    expires_in(session, now).saturating_sub(threshold)
}

/// Countdown snapshot for one session at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryStatus {
    pub expires_in: i64,
    pub expiring_in: i64,
}

impl ExpiryStatus {
    pub fn of(session: &Session, now: i64, threshold: i64) -> Self {
        Self {
            expires_in: expires_in(session, now),
            expiring_in: expiring_in(session, now, threshold),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_in <= 0
    }

    /// Whether a token request with `slip` seconds of tolerance renews first.
    pub fn within_slip(&self, slip: i64) -> bool {
        self.expires_in <= slip
    }
}

/// Current wall-clock time in unix seconds.
pub fn unix_now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
