//! Exponential backoff (spec §4.5 "`next()` returns `start * factor^k`...
//! reset on any success").
//!
//! Wraps the `backoff` crate's `ExponentialBackoff` (already part of the
//! teacher's dependency stack for provider-aware retries) configured with no
//! jitter and no elapsed-time cap, so `next()` is the deterministic formula
//! the spec requires rather than the crate's default jittered curve.

use std::sync::Mutex;
use std::time::Duration;

use backoff::backoff::Backoff as _;
use backoff::ExponentialBackoff as CrateBackoff;

pub struct ExponentialBackoff {
    inner: Mutex<CrateBackoff>,
}

impl ExponentialBackoff {
    pub fn new(start: Duration, factor: f64) -> Self {
        let inner = CrateBackoff {
            current_interval: start,
            initial_interval: start,
            multiplier: factor,
            randomization_factor: 0.0,
            max_interval: Duration::from_secs(u64::MAX / 2),
            max_elapsed_time: None,
            ..Default::default()
        };
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// `start * factor^k`, where `k` is the number of previous retries in
    /// the current window.
    pub fn next(&self) -> Duration {
        let mut guard = self.inner.lock().unwrap();
        guard.next_backoff().unwrap_or(guard.max_interval)
    }

    /// Reset on any success or transition to `closed` (spec §4.5).
    pub fn reset(&self) {
        self.inner.lock().unwrap().reset();
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_exponentially_from_start() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100), 2.0);
        assert_eq!(backoff.next(), Duration::from_millis(100));
        assert_eq!(backoff.next(), Duration::from_millis(200));
        assert_eq!(backoff.next(), Duration::from_millis(400));
    }

    #[test]
    fn reset_restarts_the_window() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100), 2.0);
        backoff.next();
        backoff.next();
        backoff.reset();
        assert_eq!(backoff.next(), Duration::from_millis(100));
    }
}
