//! Failure-policy router (spec §4.5 "Router"): wraps N policies ordered by
//! priority, advances on abort when failover is permitted, and is the
//! source of truth for `toggleFailover`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::{BeforeRequestDecision, FailurePolicy, RequestOutcome};

/// What the router decided for the current `perform` attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterOutcome {
    /// Proceed against the current provider, optionally after a backoff.
    Continue { provider: String, backoff: Option<std::time::Duration> },
    /// Current policy aborted and failover advanced to the next provider;
    /// callers must re-bind against it (re-entering C9).
    Failover { provider: String },
    /// All providers in priority order have been exhausted.
    Exhausted,
}

struct Entry {
    provider: String,
    policy: Arc<dyn FailurePolicy>,
}

pub struct FailurePolicyRouter {
    entries: Vec<Entry>,
    current: AtomicUsize,
    failover_enabled: AtomicBool,
}

impl FailurePolicyRouter {
    /// `entries` must be ordered by priority (spec §4.5, §3 "priority:
    /// [provider]"). `failover_enabled` mirrors the profile's
    /// `providerFailover` default; a caller pinning a specific provider
    /// should disable it via [`toggle_failover`](Self::toggle_failover).
    pub fn new(entries: Vec<(String, Arc<dyn FailurePolicy>)>, failover_enabled: bool) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(provider, policy)| Entry { provider, policy })
                .collect(),
            current: AtomicUsize::new(0),
            failover_enabled: AtomicBool::new(failover_enabled),
        }
    }

    pub fn toggle_failover(&self, enabled: bool) {
        self.failover_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn current_provider(&self) -> Option<&str> {
        self.entries
            .get(self.current.load(Ordering::SeqCst))
            .map(|e| e.provider.as_str())
    }

    /// Consult the current provider's policy and advance on abort when
    /// failover is permitted.
    pub async fn before_request(&self) -> RouterOutcome {
        let index = self.current.load(Ordering::SeqCst);
        let Some(entry) = self.entries.get(index) else {
            return RouterOutcome::Exhausted;
        };

        match entry.policy.before_request().await {
            BeforeRequestDecision::Continue => RouterOutcome::Continue {
                provider: entry.provider.clone(),
                backoff: None,
            },
            BeforeRequestDecision::Backoff(duration) => RouterOutcome::Continue {
                provider: entry.provider.clone(),
                backoff: Some(duration),
            },
            BeforeRequestDecision::Abort => {
                if !self.failover_enabled.load(Ordering::SeqCst) {
                    return RouterOutcome::Exhausted;
                }
                let next = index + 1;
                if next >= self.entries.len() {
                    return RouterOutcome::Exhausted;
                }
                self.current.store(next, Ordering::SeqCst);
                RouterOutcome::Failover {
                    provider: self.entries[next].provider.clone(),
                }
            }
        }
    }

    pub async fn after_request(&self, outcome: RequestOutcome) {
        let index = self.current.load(Ordering::SeqCst);
        if let Some(entry) = self.entries.get(index) {
            entry.policy.after_request(outcome).await;
        }
    }
}
