//! Failure/retry control (spec §4.5, component C5): abort, simple retry,
//! circuit breaker, exponential backoff, and a priority router above them.
//! Each policy is a builder-configured, `Mutex`-guarded state machine
//! exposing the `beforeRequest`/`afterRequest` lifecycle a policy-per-triple
//! (profile, use-case, provider) needs.

mod abort;
mod backoff;
mod circuit;
mod retry;
mod router;

pub use abort::AbortPolicy;
pub use backoff::ExponentialBackoff;
pub use circuit::CircuitBreakerPolicy;
pub use retry::SimpleRetryPolicy;
pub use router::{FailurePolicyRouter, RouterOutcome};

use std::time::Duration;

use async_trait::async_trait;

/// What a failure policy tells the caller before sending a request (spec
/// §4.5 "beforeRequest(time) -> { continue } | { backoff(ms) } | { abort }").
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BeforeRequestDecision {
    Continue,
    Backoff(Duration),
    Abort,
}

/// Whether the just-completed request succeeded, for `afterRequest`
/// bookkeeping (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Success,
    Failure,
}

/// One (profile, use-case, provider) policy instance (spec §4.5, §3
/// "Failure-policy state").
#[async_trait]
pub trait FailurePolicy: Send + Sync {
    async fn before_request(&self) -> BeforeRequestDecision;
    async fn after_request(&self, outcome: RequestOutcome);
}
