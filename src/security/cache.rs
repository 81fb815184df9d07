//! Digest credential cache, keyed by `hash(id + username + password)` and
//! mapping to the fully-rendered `Authorization` header string (spec §3
//! "Digest credential cache entry"). A process-wide concurrent map, grounded
//! on the same `dashmap` usage as the driver's bound-provider cache
//! (component C9).

use dashmap::DashMap;
use sha2::{Digest as _, Sha256};

#[derive(Default)]
pub struct DigestCache {
    entries: DashMap<String, String>,
}

impl DigestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(id: &str, username: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(id.as_bytes());
        hasher.update(b"\0");
        hasher.update(username.as_bytes());
        hasher.update(b"\0");
        hasher.update(password.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|e| e.clone())
    }

    pub fn store(&self, key: String, authorization_header: String) {
        self.entries.insert(key, authorization_header);
    }

    /// Invalidated on any new 401 from the same target (spec §3).
    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_for_same_inputs() {
        let a = DigestCache::key("id1", "alice", "pw");
        let b = DigestCache::key("id1", "alice", "pw");
        assert_eq!(a, b);
    }

    #[test]
    fn key_differs_for_different_inputs() {
        let a = DigestCache::key("id1", "alice", "pw");
        let b = DigestCache::key("id1", "bob", "pw");
        assert_ne!(a, b);
    }

    #[test]
    fn store_then_get_then_invalidate() {
        let cache = DigestCache::new();
        let key = DigestCache::key("id1", "alice", "pw");
        cache.store(key.clone(), "Digest ...".into());
        assert_eq!(cache.get(&key).as_deref(), Some("Digest ..."));
        cache.invalidate(&key);
        assert_eq!(cache.get(&key), None);
    }
}
