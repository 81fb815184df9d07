//! Wiring from configuration to runtime (spec §4.7 + §4.9): turns a
//! [`NormalizedSuperDocument`] into the per-profile [`FailurePolicyRouter`]s
//! and [`Driver`]s the public [`Client`](crate::client::Client) needs.
//!
//! The map AST/provider-config loader (the `Binder`) stays injected — it is
//! the same out-of-scope external collaborator as the DSL parser (spec §1)
//! — but everything this crate *does* own (priority order, per-provider
//! retry policy, the bound-provider cache, the event bus) is assembled here
//! instead of only in test helpers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use crate::client::Client;
use crate::config::{
    NormalizedProfile, NormalizedRetryPolicy, NormalizedSuperDocument, RetryPolicyKind,
};
use crate::events::EventBus;
use crate::failure::{AbortPolicy, CircuitBreakerPolicy, FailurePolicy, FailurePolicyRouter, SimpleRetryPolicy};
use crate::http::Fetch;
use crate::interpreter::ExpressionEvaluator;

use super::cache::BindCache;
use super::{Binder, Driver};

/// `requestTimeout` default when a retry policy's raw JSON omits one (spec
/// §4.5 "requestTimeout (default value injected)").
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Bound-provider cache TTL (spec §3 "expiresAt is a monotonic second");
/// the spec leaves the exact window unspecified, so this mirrors the
/// teacher's connection-idle-timeout order of magnitude.
const DEFAULT_BIND_CACHE_TTL: Duration = Duration::from_secs(300);

fn json_u64(value: &serde_json::Value, key: &str) -> Option<u64> {
    value.get(key).and_then(|v| v.as_u64())
}

fn json_f64(value: &serde_json::Value, key: &str) -> Option<f64> {
    value.get(key).and_then(|v| v.as_f64())
}

/// Build one concrete [`FailurePolicy`] from a normalized retry-policy
/// configuration (spec §4.5's three kinds and their documented defaults).
pub fn build_policy(policy: &NormalizedRetryPolicy) -> Arc<dyn FailurePolicy> {
    match policy.kind {
        RetryPolicyKind::None => Arc::new(AbortPolicy::new()),
        RetryPolicyKind::Simple => {
            let max = json_u64(&policy.raw, "maxContiguousRetries").unwrap_or(5) as u32;
            let timeout = json_u64(&policy.raw, "requestTimeout")
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
            Arc::new(SimpleRetryPolicy::new(max, timeout))
        }
        RetryPolicyKind::CircuitBreaker => {
            let max = json_u64(&policy.raw, "maxContiguousRetries").unwrap_or(5) as u32;
            let timeout = json_u64(&policy.raw, "requestTimeout")
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
            let open_time = json_u64(&policy.raw, "openTime")
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_secs(30));
            let backoff = policy.raw.get("backoff");
            let start = backoff
                .and_then(|b| json_u64(b, "start"))
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_secs(1));
            let factor = backoff.and_then(|b| json_f64(b, "factor")).unwrap_or(2.0);
            Arc::new(CircuitBreakerPolicy::new(max, timeout, open_time, start, factor))
        }
    }
}

/// Pick each priority-listed provider's retry policy (spec §3 "retry
/// policies default to `none`"): the first use-case default under that
/// provider that names a non-`none` kind, or `none` if it never overrides
/// one. A profile's router is shared across its use-cases (one router per
/// profile, matching [`Driver`]), so this is the coarsest granularity that
/// still respects an explicit provider-level retry choice.
fn provider_retry_kinds(profile: &NormalizedProfile) -> BTreeMap<String, NormalizedRetryPolicy> {
    profile
        .providers
        .iter()
        .filter_map(|(provider, entry)| {
            entry
                .defaults
                .values()
                .find(|d| d.retry_policy.kind != RetryPolicyKind::None)
                .map(|d| (provider.clone(), d.retry_policy.clone()))
        })
        .collect()
}

/// Whether any use-case default opts into failover for this profile (spec
/// §3 "`providerFailover=false` with non-empty `priority` yields a startup
/// warning" implies the flag is per use-case; the router is per profile, so
/// failover is enabled if any use-case asks for it).
fn profile_failover_enabled(profile: &NormalizedProfile) -> bool {
    profile.defaults.values().any(|d| d.provider_failover)
}

/// Build a profile's priority-ordered [`FailurePolicyRouter`] (spec §4.5
/// "Router") from its normalized `priority` list and each provider's
/// resolved retry policy.
pub fn build_router(profile: &NormalizedProfile) -> FailurePolicyRouter {
    let retry_kinds = provider_retry_kinds(profile);
    let entries = profile
        .priority
        .iter()
        .map(|provider| {
            let policy = retry_kinds.get(provider).cloned().unwrap_or_default();
            (provider.clone(), build_policy(&policy))
        })
        .collect();
    FailurePolicyRouter::new(entries, profile_failover_enabled(profile))
}

/// Build the full [`Client`]: one [`Driver`] per profile, each with its own
/// router, bound-provider cache, and event bus, sharing the injected
/// [`Binder`], [`Fetch`] adapter, and host-expression evaluator (spec §4.9,
/// §6 "Public entry point").
pub fn build_client(
    normalized: &NormalizedSuperDocument,
    binder: Arc<dyn Binder>,
    fetch: Arc<dyn Fetch>,
    evaluator: Arc<dyn ExpressionEvaluator>,
) -> Client {
    let drivers: HashMap<String, Arc<Driver>> = normalized
        .profiles
        .iter()
        .map(|(profile_id, profile)| {
            let profile_cache_key = match (&profile.version, &profile.file) {
                (Some(version), _) => format!("{profile_id}@{version}"),
                (None, Some(file)) => format!("{profile_id}@{file}"),
                (None, None) => profile_id.clone(),
            };
            let driver = Driver {
                profile_id: profile_id.clone(),
                profile_cache_key,
                router: build_router(profile),
                bind_cache: BindCache::new(DEFAULT_BIND_CACHE_TTL),
                binder: binder.clone(),
                events: EventBus::new(),
                evaluator: evaluator.clone(),
                fetch: fetch.clone(),
            };
            (profile_id.clone(), Arc::new(driver))
        })
        .collect();
    Client::new(drivers)
}
