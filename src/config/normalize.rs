//! Normalization (spec §4.7): a pure function over the parsed super-document
//! plus the environment, producing the normalized document of spec §3
//! ("Super-document (normalized)") with no shorthand forms left exposed.

use std::collections::BTreeMap;

use crate::value::EnvSource;

use super::raw::{
    RawProfileEntry, RawProfileProviderUseCaseDefaults, RawProviderEntry, RawRetryPolicy,
    RawSuperDocument,
};
use super::resolve::resolve_provider_object;

#[derive(Debug, Clone, PartialEq)]
pub enum RetryPolicyKind {
    None,
    Simple,
    CircuitBreaker,
}

#[derive(Debug, Clone)]
pub struct NormalizedRetryPolicy {
    pub kind: RetryPolicyKind,
    pub raw: serde_json::Value,
}

impl Default for NormalizedRetryPolicy {
    fn default() -> Self {
        Self {
            kind: RetryPolicyKind::None,
            raw: serde_json::json!({"kind": "none"}),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedUseCaseDefaults {
    pub input: serde_json::Value,
    pub provider_failover: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedProfileProviderUseCaseDefaults {
    pub input: serde_json::Value,
    pub retry_policy: NormalizedRetryPolicy,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedProfileProvider {
    pub file: Option<String>,
    pub map_variant: Option<String>,
    pub map_revision: Option<String>,
    pub defaults: BTreeMap<String, NormalizedProfileProviderUseCaseDefaults>,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedProfile {
    pub version: Option<String>,
    pub file: Option<String>,
    pub priority: Vec<String>,
    pub defaults: BTreeMap<String, NormalizedUseCaseDefaults>,
    pub providers: BTreeMap<String, NormalizedProfileProvider>,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedProvider {
    pub file: Option<String>,
    pub security: Vec<serde_json::Value>,
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedSuperDocument {
    pub profiles: BTreeMap<String, NormalizedProfile>,
    pub providers: BTreeMap<String, NormalizedProvider>,
}

#[derive(Debug, Clone)]
pub struct NormalizeWarning(pub String);

/// Normalize a parsed super-document against `env` (spec §4.7). Returns the
/// normalized document plus any startup warnings (e.g.
/// `providerFailover=false` with a non-empty `priority`).
pub fn normalize(raw: &RawSuperDocument, env: &dyn EnvSource) -> (NormalizedSuperDocument, Vec<NormalizeWarning>) {
    let mut warnings = Vec::new();

    let providers: BTreeMap<String, NormalizedProvider> = raw
        .providers
        .iter()
        .map(|(name, entry)| {
            let normalized = match entry {
                RawProviderEntry::Shorthand(file) => NormalizedProvider {
                    file: Some(file.clone()),
                    security: Vec::new(),
                    parameters: BTreeMap::new(),
                },
                RawProviderEntry::Full(object) => {
                    let resolved = resolve_provider_object(object, env);
                    NormalizedProvider {
                        file: resolved.file,
                        security: resolved.security,
                        parameters: resolved.parameters,
                    }
                }
            };
            (name.clone(), normalized)
        })
        .collect();

    let top_level_provider_order: Vec<String> = raw.providers.keys().cloned().collect();

    let profiles = raw
        .profiles
        .iter()
        .map(|(id, entry)| {
            let normalized = normalize_profile(entry, &top_level_provider_order, &mut warnings, id);
            (id.clone(), normalized)
        })
        .collect();

    (
        NormalizedSuperDocument { profiles, providers },
        warnings,
    )
}

fn normalize_profile(
    entry: &RawProfileEntry,
    top_level_provider_order: &[String],
    warnings: &mut Vec<NormalizeWarning>,
    profile_id: &str,
) -> NormalizedProfile {
    match entry {
        RawProfileEntry::Shorthand(version_or_file) => {
            let (version, file) = if version_or_file.starts_with("file:") {
                (None, Some(version_or_file.clone()))
            } else {
                (Some(version_or_file.clone()), None)
            };
            NormalizedProfile {
                version,
                file,
                priority: top_level_provider_order.to_vec(),
                defaults: BTreeMap::new(),
                providers: BTreeMap::new(),
            }
        }
        RawProfileEntry::Full(object) => {
            let priority = if object.priority.is_empty() {
                if object.providers.is_empty() {
                    top_level_provider_order.to_vec()
                } else {
                    object.providers.keys().cloned().collect()
                }
            } else {
                object.priority.clone()
            };

            for provider in &priority {
                if !object.providers.contains_key(provider) && !top_level_provider_order.contains(provider) {
                    warnings.push(NormalizeWarning(format!(
                        "profile {profile_id}: priority references unknown provider {provider}"
                    )));
                }
            }

            let defaults = object
                .defaults
                .iter()
                .map(|(usecase, d)| {
                    let provider_failover = d.provider_failover.unwrap_or(false);
                    if !provider_failover && !priority.is_empty() {
                        warnings.push(NormalizeWarning(format!(
                            "profile {profile_id}: providerFailover=false with non-empty priority for use-case {usecase}"
                        )));
                    }
                    (
                        usecase.clone(),
                        NormalizedUseCaseDefaults {
                            input: d.input.clone(),
                            provider_failover,
                        },
                    )
                })
                .collect();

            let providers = object
                .providers
                .iter()
                .map(|(name, provider)| {
                    let defaults = provider
                        .defaults
                        .iter()
                        .map(|(usecase, d)| (usecase.clone(), normalize_profile_provider_defaults(d)))
                        .collect();
                    (
                        name.clone(),
                        NormalizedProfileProvider {
                            file: provider.file.clone(),
                            map_variant: provider.map_variant.clone(),
                            map_revision: provider.map_revision.clone(),
                            defaults,
                        },
                    )
                })
                .collect();

            NormalizedProfile {
                version: object.version.clone(),
                file: object.file.clone(),
                priority,
                defaults,
                providers,
            }
        }
    }
}

fn normalize_profile_provider_defaults(
    raw: &RawProfileProviderUseCaseDefaults,
) -> NormalizedProfileProviderUseCaseDefaults {
    NormalizedProfileProviderUseCaseDefaults {
        input: raw.input.clone(),
        retry_policy: raw
            .retry_policy
            .as_ref()
            .map(normalize_retry_policy)
            .unwrap_or_default(),
    }
}

fn normalize_retry_policy(raw: &RawRetryPolicy) -> NormalizedRetryPolicy {
    match raw {
        RawRetryPolicy::Shorthand(kind) => {
            let (kind, raw_value) = match kind.as_str() {
                "simple" => (
                    RetryPolicyKind::Simple,
                    serde_json::json!({"kind": "simple", "maxContiguousRetries": 5}),
                ),
                "circuit-breaker" => (
                    RetryPolicyKind::CircuitBreaker,
                    serde_json::json!({
                        "kind": "circuit-breaker",
                        "maxContiguousRetries": 5,
                        "openTime": 30_000,
                        "backoff": {"kind": "exponential", "start": 1_000, "factor": 2.0}
                    }),
                ),
                _ => (RetryPolicyKind::None, serde_json::json!({"kind": "none"})),
            };
            NormalizedRetryPolicy { kind, raw: raw_value }
        }
        RawRetryPolicy::Full(value) => {
            let kind = match value.get("kind").and_then(|v| v.as_str()) {
                Some("simple") => RetryPolicyKind::Simple,
                Some("circuit-breaker") => RetryPolicyKind::CircuitBreaker,
                _ => RetryPolicyKind::None,
            };
            NormalizedRetryPolicy {
                kind,
                raw: value.clone(),
            }
        }
    }
}

/// `deep-merge` profile `defaults.input` under a use-case, then
/// provider-specific overrides (spec §4.7 "Defaults merge from profile to
/// profile-provider by deep-merge").
pub fn merged_input_defaults(
    profile: &NormalizedProfile,
    provider_name: &str,
    usecase: &str,
) -> crate::value::Variable {
    let profile_default = profile
        .defaults
        .get(usecase)
        .map(|d| d.input.clone())
        .unwrap_or(serde_json::Value::Null);

    let provider_default = profile
        .providers
        .get(provider_name)
        .and_then(|p| p.defaults.get(usecase))
        .map(|d| d.input.clone())
        .unwrap_or(serde_json::Value::Null);

    crate::value::deep_merge(profile_default.into(), provider_default.into())
}
