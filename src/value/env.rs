//! Env-string resolution (spec §4.1, §6): a `Primitive` string of the exact
//! form `$NAME` is replaced by the environment value at normalization time;
//! anything else passes through unchanged. This is eager — never performed
//! again at invocation time.

/// Sentinel returned for an absent environment variable (glossary: "Sentinel
/// unset value"). Deliberately not the empty string: an empty security or
/// parameter value can be a legitimate (if unusual) configured value, and
/// would silently look resolved; this value is distinguishable from any
/// string `$NAME` could have expanded to.
pub const UNSET_SENTINEL: &str = "$$unresolved$$";

pub trait EnvSource: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

pub struct StdEnv;

impl EnvSource for StdEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Resolve a single string value against the environment if it is exactly
/// `$NAME`. Non-matching strings (including ones that merely contain a `$`)
/// pass through untouched.
pub fn resolve_env_string(value: &str, env: &dyn EnvSource) -> String {
    match value.strip_prefix('$') {
        Some(name) if !name.is_empty() && name.chars().all(is_env_name_char) => {
            env.get(name).unwrap_or_else(|| UNSET_SENTINEL.to_string())
        }
        _ => value.to_string(),
    }
}

fn is_env_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapEnv(HashMap<&'static str, &'static str>);
    impl EnvSource for MapEnv {
        fn get(&self, name: &str) -> Option<String> {
            self.0.get(name).map(|s| s.to_string())
        }
    }

    #[test]
    fn substitutes_exact_dollar_name_form() {
        let env = MapEnv(HashMap::from([("API_KEY", "secret")]));
        assert_eq!(resolve_env_string("$API_KEY", &env), "secret");
    }

    #[test]
    fn passes_through_non_matching_strings() {
        let env = MapEnv(HashMap::new());
        assert_eq!(resolve_env_string("plain-value", &env), "plain-value");
        assert_eq!(resolve_env_string("pre$fix", &env), "pre$fix");
    }

    #[test]
    fn absent_variable_resolves_to_sentinel() {
        let env = MapEnv(HashMap::new());
        assert_eq!(resolve_env_string("$MISSING", &env), UNSET_SENTINEL);
    }
}
