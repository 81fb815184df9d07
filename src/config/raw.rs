//! Raw super-document shapes as parsed from JSON, before normalization
//! (spec §4.7 "Profile entry: version-string or file-URI string or object
//! ...", "Provider entry: file-URI string or object ...").

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSuperDocument {
    #[serde(default)]
    pub profiles: BTreeMap<String, RawProfileEntry>,
    #[serde(default)]
    pub providers: BTreeMap<String, RawProviderEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawProfileEntry {
    /// Shorthand: a version string ("x.y.z") or a `file:` URI string.
    Shorthand(String),
    Full(RawProfileObject),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProfileObject {
    pub version: Option<String>,
    pub file: Option<String>,
    #[serde(default)]
    pub priority: Vec<String>,
    #[serde(default)]
    pub defaults: BTreeMap<String, RawUseCaseDefaults>,
    #[serde(default)]
    pub providers: BTreeMap<String, RawProfileProviderEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawUseCaseDefaults {
    #[serde(default)]
    pub input: serde_json::Value,
    #[serde(default)]
    pub provider_failover: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProfileProviderEntry {
    pub file: Option<String>,
    pub map_variant: Option<String>,
    pub map_revision: Option<String>,
    #[serde(default)]
    pub defaults: BTreeMap<String, RawProfileProviderUseCaseDefaults>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProfileProviderUseCaseDefaults {
    #[serde(default)]
    pub input: serde_json::Value,
    #[serde(default)]
    pub retry_policy: Option<RawRetryPolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRetryPolicy {
    /// Shorthand: `"none" | "simple" | "circuit-breaker"`.
    Shorthand(String),
    Full(serde_json::Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawProviderEntry {
    /// Shorthand: a `file:` URI string.
    Shorthand(String),
    Full(RawProviderObject),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProviderObject {
    pub file: Option<String>,
    #[serde(default)]
    pub security: Vec<serde_json::Value>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}
