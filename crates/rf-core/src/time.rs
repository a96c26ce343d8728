//! Time and money primitives

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Display amount. Balances are approximations for the UI, not a ledger.
pub type Money = f64;

/// Milliseconds on the clock's epoch (Unix-aligned for the provided clocks)
pub type Timestamp = u64;

/// Clamp a money value into the valid display range (finite, >= 0)
#[inline]
pub fn clamp_money(value: Money) -> Money {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

/// Clamp the result of balance arithmetic: overflow saturates at
/// `f64::MAX`, NaN and negatives become zero.
#[inline]
pub fn saturating_money(value: Money) -> Money {
    if value == f64::INFINITY {
        f64::MAX
    } else {
        clamp_money(value)
    }
}

/// Source of "now" for the state engine.
///
/// Implementations must be monotonic: two calls never go backwards.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> Timestamp;
}

/// Wall-clock time, made monotonic by never reporting less than the
/// previous reading.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Timestamp {
        let wall = unix_ms();
        let prev = self.last.fetch_max(wall, Ordering::AcqRel);
        prev.max(wall)
    }
}

/// Manually driven clock for tests and deterministic replays
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::AcqRel);
    }

    /// Jump to an absolute time. Earlier values are ignored.
    pub fn set(&self, ms: Timestamp) {
        self.now.fetch_max(ms, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Timestamp {
        self.now.load(Ordering::Acquire)
    }
}

/// Current Unix time in milliseconds
pub fn unix_ms() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
