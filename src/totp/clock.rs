//! Wall-clock seam for the TOTP engine.
//!
//! All time arithmetic is pure and takes an explicit unix timestamp;
//! the only place the system clock is read is `SystemClock`, so tests
//! and hosts can substitute their own time source.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Map wall-clock time to the TOTP time-step counter and the seconds
/// left in the current step.
///
/// Exactly on a step boundary the remainder is zero and the window is
/// brand new, so `remaining` reports the full `period_seconds` rather
/// than a flickering zero. `period_seconds` must be non-zero.
pub fn counter_and_remaining(now_unix_seconds: u64, period_seconds: u32) -> (u64, u32) {
    let period = period_seconds as u64;
    let counter = now_unix_seconds / period;
    let remaining = (period - (now_unix_seconds % period)) as u32;
    (counter, remaining)
}

/// A source of unix timestamps.
pub trait Clock: Send + Sync {
    /// Seconds since the unix epoch.
    fn now_unix(&self) -> u64;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// A clock that only moves when told to. Used by tests and by hosts
/// that drive time themselves.
#[derive(Debug, Default)]
pub struct ManualClock {
    seconds: AtomicU64,
}

impl ManualClock {
    pub fn new(start_unix_seconds: u64) -> Arc<Self> {
        Arc::new(Self {
            seconds: AtomicU64::new(start_unix_seconds),
        })
    }

    /// Jump to an absolute timestamp.
    pub fn set(&self, unix_seconds: u64) {
        self.seconds.store(unix_seconds, Ordering::SeqCst);
    }

    /// Move forward by `seconds`.
    pub fn advance(&self, seconds: u64) {
        self.seconds.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> u64 {
        self.seconds.load(Ordering::SeqCst)
    }
}
