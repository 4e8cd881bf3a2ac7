use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use lumen_shared::Millis;

/// Wall-clock provider for note timing. The render loop queries it every
/// frame, so implementations must be cheap and lock-free.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> Millis;
}

/// Milliseconds elapsed since construction.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        self.start.elapsed().as_millis() as Millis
    }
}

/// Manually advanced clock, for deterministic tests and event replays.
pub struct ManualClock {
    now: AtomicU32,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: AtomicU32::new(0),
        }
    }

    pub fn set(&self, now: Millis) {
        self.now.store(now, Ordering::Relaxed);
    }

    pub fn advance(&self, delta: Millis) {
        self.now.fetch_add(delta, Ordering::Relaxed);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.load(Ordering::Relaxed)
    }
}
