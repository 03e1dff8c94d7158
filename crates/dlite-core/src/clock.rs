//! Time sources for backoff and retry.
//!
//! The retry loop never calls `Instant::now` or `thread::sleep` directly; it
//! goes through [`Clock`] and [`Sleeper`] so tests can drive it without real
//! delays.

use crate::control::{CancelReason, CancelScope};
use std::time::{Duration, Instant};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock (`Instant::now`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Suspends the calling thread between retry attempts.
///
/// Implementations must return early with the scope's reason when the scope
/// is cancelled or its deadline passes during the sleep.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration, scope: &CancelScope) -> Result<(), CancelReason>;
}

/// Sleeps on the scope itself, so `CancelScope::cancel` wakes it immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScopeSleeper;

impl Sleeper for ScopeSleeper {
    fn sleep(&self, duration: Duration, scope: &CancelScope) -> Result<(), CancelReason> {
        scope.sleep(duration)
    }
}
