//! Abort policy (spec §4.5 "Passes once; any failure reports the first
//! error and aborts").

use std::sync::Mutex;

use async_trait::async_trait;

use super::{BeforeRequestDecision, FailurePolicy, RequestOutcome};

#[derive(Default)]
pub struct AbortPolicy {
    aborted: Mutex<bool>,
}

impl AbortPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FailurePolicy for AbortPolicy {
    async fn before_request(&self) -> BeforeRequestDecision {
        if *self.aborted.lock().unwrap() {
            BeforeRequestDecision::Abort
        } else {
            BeforeRequestDecision::Continue
        }
    }

    async fn after_request(&self, outcome: RequestOutcome) {
        if outcome == RequestOutcome::Failure {
            *self.aborted.lock().unwrap() = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn aborts_after_first_failure() {
        let policy = AbortPolicy::new();
        assert_eq!(policy.before_request().await, BeforeRequestDecision::Continue);
        policy.after_request(RequestOutcome::Failure).await;
        assert_eq!(policy.before_request().await, BeforeRequestDecision::Abort);
    }

    #[tokio::test]
    async fn success_never_aborts() {
        let policy = AbortPolicy::new();
        policy.after_request(RequestOutcome::Success).await;
        assert_eq!(policy.before_request().await, BeforeRequestDecision::Continue);
    }
}
