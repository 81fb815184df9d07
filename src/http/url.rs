//! URL templating (spec §4.3 "URL templating", testable property 3).

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::{MapRuntimeError, PerformError, Result};
use crate::value::Variable;

fn placeholder_re() -> &'static Regex {
    // Non-greedy match between braces (spec: "matched non-greedily").
    static RE: once_cell::sync::OnceCell<Regex> = once_cell::sync::OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\{(.+?)\}").unwrap())
}

/// Resolve `{name}` placeholders in `template` against `parameters`. Each
/// placeholder is trimmed and dot-split before lookup (spec §4.3). Missing
/// or non-stringifiable values accumulate and are reported together with the
/// set of available keys.
pub fn resolve_placeholders(
    template: &str,
    parameters: &BTreeMap<String, Variable>,
) -> Result<String> {
    let mut missing = Vec::new();
    let mut failed_parts: Vec<(usize, usize, String)> = Vec::new();

    for m in placeholder_re().captures_iter(template) {
        let whole = m.get(0).unwrap();
        let raw = m.get(1).unwrap().as_str();
        let path: Vec<&str> = raw.trim().split('.').collect();
        match resolve_path(parameters, &path) {
            Some(value) => match value.to_http_string() {
                Ok(s) => failed_parts.push((whole.start(), whole.end(), s)),
                Err(_) => missing.push(raw.trim().to_string()),
            },
            None => missing.push(raw.trim().to_string()),
        }
    }

    if !missing.is_empty() {
        let available: Vec<&str> = parameters.keys().map(|s| s.as_str()).collect();
        return Err(MapRuntimeError::Perform(PerformError::interpreter(
            format!(
                "missing or non-stringifiable URL parameters: {} (available: {})",
                missing.join(", "),
                available.join(", ")
            ),
            Default::default(),
        )));
    }

    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for (start, end, replacement) in failed_parts {
        out.push_str(&template[last..start]);
        out.push_str(&urlencoding::encode(&replacement));
        last = end;
    }
    out.push_str(&template[last..]);
    Ok(out)
}

fn resolve_path<'a>(parameters: &'a BTreeMap<String, Variable>, path: &[&str]) -> Option<&'a Variable> {
    let (head, rest) = path.split_first()?;
    let mut current = parameters.get(*head)?;
    for segment in rest {
        current = current.as_object()?.get(*segment)?;
    }
    Some(current)
}

/// Collapse repeated trailing slashes on a base URL to exactly one (spec
/// §4.3 "trailing slashes on base URL are collapsed to one").
pub fn collapse_trailing_slash(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    format!("{trimmed}/")
}

/// Join a base URL with an input URL path per spec §4.3: input must start
/// with `/` (or be empty, returning the base unchanged).
pub fn create_url(base: &str, input: &str) -> Result<String> {
    if input.is_empty() {
        return Ok(collapse_trailing_slash(base)
            .trim_end_matches('/')
            .to_string());
    }
    if !input.starts_with('/') {
        return Err(MapRuntimeError::Perform(PerformError::interpreter(
            format!("input URL must start with '/': {input}"),
            Default::default(),
        )));
    }
    let base = collapse_trailing_slash(base);
    Ok(format!("{}{}", base.trim_end_matches('/'), input))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: impl IntoIterator<Item = (&'static str, Variable)>) -> BTreeMap<String, Variable> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn resolves_simple_placeholder() {
        let p = params([("x", Variable::string("42"))]);
        let url = resolve_placeholders("/a/{x}/b", &p).unwrap();
        assert_eq!(url, "/a/42/b");
    }

    #[test]
    fn trims_and_dot_splits_placeholder_name() {
        let mut inner = BTreeMap::new();
        inner.insert("page".to_string(), Variable::string("2"));
        let p = params([("input", Variable::Object(inner))]);
        let url = resolve_placeholders("/p/{ input.page }", &p).unwrap();
        assert_eq!(url, "/p/2");
    }

    #[test]
    fn reports_missing_placeholder_with_available_keys() {
        let p = params([("y", Variable::string("1"))]);
        let err = resolve_placeholders("/a/{x}", &p);
        assert!(err.is_err());
    }

    #[test]
    fn create_url_collapses_trailing_slashes() {
        assert_eq!(create_url("https://api.example.com///", "/a").unwrap(), "https://api.example.com/a");
    }

    #[test]
    fn create_url_empty_input_returns_base() {
        assert_eq!(create_url("https://api.example.com/", "").unwrap(), "https://api.example.com");
    }

    #[test]
    fn create_url_rejects_input_without_leading_slash() {
        assert!(create_url("https://api.example.com", "a").is_err());
    }
}
