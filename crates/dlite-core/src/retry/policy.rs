use crate::clock::Clock;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shape of the exponential backoff curve. The elapsed-time ceiling is passed
/// separately because each endpoint picks its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffSettings {
    /// First wait before randomization.
    pub initial_interval: Duration,
    /// Growth factor applied after every wait.
    pub multiplier: f64,
    /// Upper bound on the un-randomized interval.
    pub max_interval: Duration,
    /// Each wait is drawn from `interval * (1 ± randomization_factor)`.
    /// 0 disables jitter.
    pub randomization_factor: f64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            multiplier: 1.5,
            max_interval: Duration::from_secs(60),
            randomization_factor: 0.5,
        }
    }
}

/// Exponential backoff bounded by a total elapsed-time ceiling.
///
/// One instance per logical operation: elapsed time is measured from
/// construction (or the last `reset`). `max_elapsed == 0` means unbounded.
pub struct ExponentialBackoff {
    settings: BackoffSettings,
    max_elapsed: Duration,
    clock: Arc<dyn Clock>,
    started: Instant,
    current: Duration,
}

impl ExponentialBackoff {
    pub fn new(settings: BackoffSettings, max_elapsed: Duration, clock: Arc<dyn Clock>) -> Self {
        let started = clock.now();
        Self {
            settings,
            max_elapsed,
            clock,
            started,
            current: settings.initial_interval,
        }
    }

    /// Never exhausts; only cancellation ends the retry loop.
    pub fn unbounded(settings: BackoffSettings, clock: Arc<dyn Clock>) -> Self {
        Self::new(settings, Duration::ZERO, clock)
    }

    pub fn reset(&mut self) {
        self.started = self.clock.now();
        self.current = self.settings.initial_interval;
    }

    pub fn max_elapsed(&self) -> Duration {
        self.max_elapsed
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.started)
    }

    /// Budget left before the ceiling; `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        if self.max_elapsed.is_zero() {
            return None;
        }
        Some(self.max_elapsed.saturating_sub(self.elapsed()))
    }

    /// Next wait, or `None` once waiting that long would cross the ceiling.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        self.next_backoff_with(fastrand::f64())
    }

    fn next_backoff_with(&mut self, random: f64) -> Option<Duration> {
        let elapsed = self.elapsed();
        let next = randomize(self.current, self.settings.randomization_factor, random);
        self.grow();
        if !self.max_elapsed.is_zero() && elapsed.saturating_add(next) > self.max_elapsed {
            return None;
        }
        Some(next)
    }

    fn grow(&mut self) {
        let max = self.settings.max_interval;
        if self.current.as_secs_f64() >= max.as_secs_f64() / self.settings.multiplier {
            self.current = max;
        } else {
            self.current = self.current.mul_f64(self.settings.multiplier);
        }
    }
}

/// Pick a value uniformly from `[interval - delta, interval + delta]` where
/// `delta = factor * interval`. `random` is in `[0, 1)`.
fn randomize(interval: Duration, factor: f64, random: f64) -> Duration {
    if factor <= 0.0 {
        return interval;
    }
    let secs = interval.as_secs_f64();
    let delta = factor * secs;
    let min = (secs - delta).max(0.0);
    let max = secs + delta;
    Duration::from_secs_f64(min + random * (max - min))
}
