//! Env resolution of `security[*]` and `parameters[*]` values (spec §4.7
//! "Env resolution is applied to `security[*]` and `parameters[*]` values").
//! Eager, at normalization time only (spec §4.1, §6).

use std::collections::BTreeMap;

use crate::value::{resolve_env_string, EnvSource};

use super::raw::RawProviderObject;

/// Resolve every string leaf under `security` and every value in
/// `parameters` against `env`.
pub fn resolve_provider_object(provider: &RawProviderObject, env: &dyn EnvSource) -> RawProviderObject {
    RawProviderObject {
        file: provider.file.clone(),
        security: provider
            .security
            .iter()
            .map(|value| resolve_json_strings(value, env))
            .collect(),
        parameters: provider
            .parameters
            .iter()
            .map(|(k, v)| (k.clone(), resolve_env_string(v, env)))
            .collect::<BTreeMap<_, _>>(),
    }
}

fn resolve_json_strings(value: &serde_json::Value, env: &dyn EnvSource) -> serde_json::Value {
    match value {
        serde_json::Value::String(s) => serde_json::Value::String(resolve_env_string(s, env)),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(|v| resolve_json_strings(v, env)).collect())
        }
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_json_strings(v, env)))
                .collect(),
        ),
        other => other.clone(),
    }
}
