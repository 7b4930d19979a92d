//! Time source abstraction
//!
//! Timing claims (`iat`, `nbf`, `exp`) and window checks read Unix seconds
//! from a [`Clock`] owned by the manager rather than from the system
//! directly, so tests can pin or advance time deterministically.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// A source of the current Unix time in whole seconds.
pub trait Clock: Send + Sync {
    /// Current Unix time in seconds.
    fn unix_now(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// A clock pinned to an explicit instant, adjustable at any point.
///
/// Intended for tests that assert on exact timing claims or evaluate the
/// same token at different instants.
#[derive(Debug)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    /// Create a clock pinned at the given Unix time.
    #[must_use]
    pub fn at(unix_seconds: i64) -> Self {
        Self {
            now: AtomicI64::new(unix_seconds),
        }
    }

    /// Move the clock to a new instant.
    pub fn set(&self, unix_seconds: i64) {
        self.now.store(unix_seconds, Ordering::SeqCst);
    }

    /// Advance the clock by the given number of seconds.
    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn unix_now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
