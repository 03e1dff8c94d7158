//! Cancellation scopes for manager calls.
//!
//! Every endpoint call takes a `CancelScope`. Cancelling the scope (or
//! reaching its deadline) aborts an in-flight transfer and wakes a retry loop
//! that is sleeping between attempts. Clones share the same cancel flag.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Why a scope ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// `CancelScope::cancel` was called.
    Cancelled,
    /// The scope's deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Cancelled => write!(f, "call cancelled"),
            CancelReason::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

#[derive(Default)]
struct Flag {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

impl Flag {
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared cancel flag plus an optional deadline.
#[derive(Clone, Default)]
pub struct CancelScope {
    flag: Arc<Flag>,
    deadline: Option<Instant>,
}

impl fmt::Debug for CancelScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelScope")
            .field("cancelled", &*self.flag.lock())
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl CancelScope {
    /// Scope without a deadline; ends only through `cancel`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(deadline),
            None => Self::new(),
        }
    }

    /// Cancel the scope and wake every thread sleeping on it.
    pub fn cancel(&self) {
        *self.flag.lock() = true;
        self.flag.wake.notify_all();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `Some(reason)` once the scope has ended. Explicit cancellation is
    /// reported in preference to an expired deadline.
    pub fn reason(&self) -> Option<CancelReason> {
        if *self.flag.lock() {
            return Some(CancelReason::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.reason().is_some()
    }

    /// Time left until the deadline, if there is one.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Block for `duration`, returning early with the reason if the scope ends
    /// first.
    pub fn sleep(&self, duration: Duration) -> Result<(), CancelReason> {
        let until = Instant::now().checked_add(duration);
        let mut cancelled = self.flag.lock();
        loop {
            if *cancelled {
                return Err(CancelReason::Cancelled);
            }
            let now = Instant::now();
            if matches!(self.deadline, Some(deadline) if now >= deadline) {
                return Err(CancelReason::DeadlineExceeded);
            }
            if matches!(until, Some(until) if now >= until) {
                return Ok(());
            }
            let wake_at = match (until, self.deadline) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
            cancelled = match wake_at {
                Some(wake_at) => {
                    self.flag
                        .wake
                        .wait_timeout(cancelled, wake_at - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .flag
                    .wake
                    .wait(cancelled)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }
}
