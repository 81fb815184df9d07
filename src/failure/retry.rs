//! Simple retry policy (spec §4.5): retries up to `maxContiguousRetries`
//! with a constant (zero) backoff, resetting the counter on success.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{BeforeRequestDecision, FailurePolicy, RequestOutcome};

pub struct SimpleRetryPolicy {
    max_contiguous_retries: u32,
    #[allow(dead_code)]
    request_timeout: Duration,
    contiguous_failures: AtomicU32,
}

impl SimpleRetryPolicy {
    pub fn new(max_contiguous_retries: u32, request_timeout: Duration) -> Self {
        Self {
            max_contiguous_retries,
            request_timeout,
            contiguous_failures: AtomicU32::new(0),
        }
    }
}

impl Default for SimpleRetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(30))
    }
}

#[async_trait]
impl FailurePolicy for SimpleRetryPolicy {
    async fn before_request(&self) -> BeforeRequestDecision {
        let failures = self.contiguous_failures.load(Ordering::SeqCst);
        if failures == 0 {
            BeforeRequestDecision::Continue
        } else if failures <= self.max_contiguous_retries {
            BeforeRequestDecision::Backoff(Duration::ZERO)
        } else {
            BeforeRequestDecision::Abort
        }
    }

    async fn after_request(&self, outcome: RequestOutcome) {
        match outcome {
            RequestOutcome::Success => self.contiguous_failures.store(0, Ordering::SeqCst),
            RequestOutcome::Failure => {
                self.contiguous_failures.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}
