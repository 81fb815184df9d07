//! Case-insensitive header multimap and the set-if-absent rules of spec §4.3.
//! A multimap of `string|string[]` rather than a single-valued map so
//! repeated headers survive round-tripping.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMultimap {
    entries: BTreeMap<String, Vec<String>>,
}

impl HeaderMultimap {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .entry(Self::key(name))
            .or_default()
            .push(value.into());
    }

    /// Replace any existing values for `name`.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.entries.insert(Self::key(name), vec![value.into()]);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&Self::key(name))
    }

    /// Set `name` to `value` only if it is currently absent (spec §4.3
    /// "set iff absent").
    pub fn set_if_absent(&mut self, name: &str, value: impl Into<String>) {
        if !self.contains(name) {
            self.set(name, value);
        }
    }

    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&Self::key(name))
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&Self::key(name))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.remove(&Self::key(name));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Vec<String>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Apply the default header rules for a prepared request (spec §4.3):
/// `user-agent` and `accept` are set iff absent, `accept` defaulting to
/// `*/*`. `content-type` is handled separately by body dispatch since it
/// depends on the chosen content type.
pub fn apply_default_headers(headers: &mut HeaderMultimap, user_agent: &str) {
    headers.set_if_absent("user-agent", user_agent);
    headers.set_if_absent("accept", "*/*");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_are_case_insensitive() {
        let mut h = HeaderMultimap::new();
        h.set("Content-Type", "application/json");
        assert_eq!(h.get_first("content-type"), Some("application/json"));
    }

    #[test]
    fn set_if_absent_does_not_override_caller_value() {
        let mut h = HeaderMultimap::new();
        h.set("accept", "text/plain");
        h.set_if_absent("accept", "*/*");
        assert_eq!(h.get_first("accept"), Some("text/plain"));
    }

    #[test]
    fn insert_preserves_multiple_values() {
        let mut h = HeaderMultimap::new();
        h.insert("x-a", "1");
        h.insert("x-a", "2");
        assert_eq!(h.get_all("x-a"), &["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn default_headers_set_user_agent_and_accept() {
        let mut h = HeaderMultimap::new();
        apply_default_headers(&mut h, "mapruntime/0.1");
        assert_eq!(h.get_first("user-agent"), Some("mapruntime/0.1"));
        assert_eq!(h.get_first("accept"), Some("*/*"));
    }
}
