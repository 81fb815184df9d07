//! Circuit breaker policy (spec §4.5): closed -> open -> half-open, with
//! exponential backoff between retries while closed.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{BeforeRequestDecision, ExponentialBackoff, FailurePolicy, RequestOutcome};

#[derive(Debug, Clone, Copy)]
enum CircuitState {
    Closed { contiguous_failures: u32 },
    Open { opened_at: Instant },
    HalfOpen,
}

pub struct CircuitBreakerPolicy {
    max_contiguous_retries: u32,
    #[allow(dead_code)]
    request_timeout: Duration,
    open_time: Duration,
    backoff: ExponentialBackoff,
    state: Mutex<CircuitState>,
}

impl CircuitBreakerPolicy {
    pub fn new(
        max_contiguous_retries: u32,
        request_timeout: Duration,
        open_time: Duration,
        backoff_start: Duration,
        backoff_factor: f64,
    ) -> Self {
        Self {
            max_contiguous_retries,
            request_timeout,
            open_time,
            backoff: ExponentialBackoff::new(backoff_start, backoff_factor),
            state: Mutex::new(CircuitState::Closed {
                contiguous_failures: 0,
            }),
        }
    }
}

impl Default for CircuitBreakerPolicy {
    fn default() -> Self {
        Self::new(
            5,
            Duration::from_secs(30),
            Duration::from_secs(30),
            Duration::from_secs(1),
            2.0,
        )
    }
}

#[async_trait]
impl FailurePolicy for CircuitBreakerPolicy {
    async fn before_request(&self) -> BeforeRequestDecision {
        let mut guard = self.state.lock().unwrap();
        match *guard {
            CircuitState::Closed { contiguous_failures: 0 } => BeforeRequestDecision::Continue,
            CircuitState::Closed { .. } => BeforeRequestDecision::Backoff(self.backoff.next()),
            CircuitState::Open { opened_at } => {
                if opened_at.elapsed() >= self.open_time {
                    *guard = CircuitState::HalfOpen;
                    BeforeRequestDecision::Continue
                } else {
                    BeforeRequestDecision::Abort
                }
            }
            CircuitState::HalfOpen => BeforeRequestDecision::Continue,
        }
    }

    async fn after_request(&self, outcome: RequestOutcome) {
        let mut guard = self.state.lock().unwrap();
        match (*guard, outcome) {
            (CircuitState::Closed { contiguous_failures }, RequestOutcome::Failure) => {
                let failures = contiguous_failures + 1;
                if failures > self.max_contiguous_retries {
                    *guard = CircuitState::Open {
                        opened_at: Instant::now(),
                    };
                } else {
                    *guard = CircuitState::Closed {
                        contiguous_failures: failures,
                    };
                }
            }
            (CircuitState::Closed { .. }, RequestOutcome::Success) => {
                *guard = CircuitState::Closed {
                    contiguous_failures: 0,
                };
                self.backoff.reset();
            }
            (CircuitState::HalfOpen, RequestOutcome::Success) => {
                *guard = CircuitState::Closed {
                    contiguous_failures: 0,
                };
                self.backoff.reset();
            }
            (CircuitState::HalfOpen, RequestOutcome::Failure) => {
                *guard = CircuitState::Open {
                    opened_at: Instant::now(),
                };
            }
            (CircuitState::Open { .. }, _) => {
                // A request should never complete while the breaker is open
                // (before_request already returned Abort); ignore.
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_exceeding_max_contiguous_retries() {
        let policy = CircuitBreakerPolicy::new(
            1,
            Duration::from_secs(1),
            Duration::from_secs(30),
            Duration::from_millis(10),
            2.0,
        );
        policy.after_request(RequestOutcome::Failure).await;
        policy.after_request(RequestOutcome::Failure).await;
        assert_eq!(policy.before_request().await, BeforeRequestDecision::Abort);
    }

    #[tokio::test]
    async fn half_open_probe_success_closes_circuit() {
        let policy = CircuitBreakerPolicy::new(
            0,
            Duration::from_secs(1),
            Duration::from_millis(1),
            Duration::from_millis(10),
            2.0,
        );
        policy.after_request(RequestOutcome::Failure).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(policy.before_request().await, BeforeRequestDecision::Continue);
        policy.after_request(RequestOutcome::Success).await;
        assert_eq!(policy.before_request().await, BeforeRequestDecision::Continue);
    }

    #[tokio::test]
    async fn half_open_probe_failure_reopens_circuit() {
        let policy = CircuitBreakerPolicy::new(
            0,
            Duration::from_secs(1),
            Duration::from_millis(1),
            Duration::from_millis(10),
            2.0,
        );
        policy.after_request(RequestOutcome::Failure).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(policy.before_request().await, BeforeRequestDecision::Continue);
        policy.after_request(RequestOutcome::Failure).await;
        assert_eq!(policy.before_request().await, BeforeRequestDecision::Abort);
    }

    // Testable property 5: at most N+1 attempts (initial + N retries) per
    // window before the breaker opens, each retry gated by a growing
    // backoff rather than an immediate `Continue`.
    #[tokio::test]
    async fn closed_state_backs_off_between_retries_until_it_opens() {
        let policy = CircuitBreakerPolicy::new(
            2,
            Duration::from_secs(1),
            Duration::from_secs(30),
            Duration::from_millis(10),
            2.0,
        );
        // Initial attempt: no prior failures, proceed immediately.
        assert_eq!(policy.before_request().await, BeforeRequestDecision::Continue);
        policy.after_request(RequestOutcome::Failure).await;

        // Retry 1 of 2: still closed, backed off rather than aborted.
        assert_eq!(
            policy.before_request().await,
            BeforeRequestDecision::Backoff(Duration::from_millis(10))
        );
        policy.after_request(RequestOutcome::Failure).await;

        // Retry 2 of 2: still closed, backoff has grown.
        assert_eq!(
            policy.before_request().await,
            BeforeRequestDecision::Backoff(Duration::from_millis(20))
        );
        policy.after_request(RequestOutcome::Failure).await;

        // A third contiguous failure exceeds maxContiguousRetries=2; open.
        assert_eq!(policy.before_request().await, BeforeRequestDecision::Abort);
    }
}
