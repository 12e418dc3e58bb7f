//! Injectable clock source.
//!
//! The reasoner never calls `SystemTime::now()` directly from reasoning
//! logic — every timestamp goes through a `Clock` handle so that tests can
//! freeze and advance time deterministically (belief ages, question
//! deadlines, circuit-breaker cooldowns all depend on wall-clock deltas).

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of monotonic-enough wall-clock milliseconds.
pub trait Clock: std::fmt::Debug + Send + Sync {
    /// Current time in milliseconds since an arbitrary but fixed epoch.
    fn now_ms(&self) -> u64;
}

/// Default clock, backed by `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Test double: a clock that only advances when told to.
#[derive(Debug)]
pub struct FrozenClock {
    millis: AtomicU64,
}

impl FrozenClock {
    pub fn at(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    pub fn advance(&self, delta_ms: u64) {
        self.millis.fetch_add(delta_ms, Ordering::Relaxed);
    }

    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::Relaxed);
    }
}

impl Clock for FrozenClock {
    fn now_ms(&self) -> u64 {
        self.millis.load(Ordering::Relaxed)
    }
}
