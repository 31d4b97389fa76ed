//! Wall-clock seam.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::model::UnixMillis;

/// Source of the current time. The engine never reads the system clock
/// directly, so tests can drive a game through days in microseconds.
pub trait TimeSource: Send + Sync {
    fn now_ms(&self) -> UnixMillis;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct WallClock;

impl TimeSource for WallClock {
    fn now_ms(&self) -> UnixMillis {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_millis() as UnixMillis,
            // pre-epoch system clock
            Err(_) => 0,
        }
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn at(ms: UnixMillis) -> Self {
        Self {
            now: AtomicI64::new(ms),
        }
    }

    pub fn set(&self, ms: UnixMillis) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.now.fetch_add(secs * 1000, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&self) -> UnixMillis {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_in_seconds() {
        let clock = ManualClock::at(5_000);
        clock.advance_secs(61);
        assert_eq!(clock.now_ms(), 66_000);
        clock.set(0);
        assert_eq!(clock.now_ms(), 0);
    }

    #[test]
    fn wall_clock_is_past_2020() {
        assert!(WallClock.now_ms() > 1_577_836_800_000);
    }
}
