//! Bound-profile-provider cache (spec §4.9 step 3, §5 "Shared resources"):
//! get-or-compute single flight per key, stale entries served immediately
//! while a background re-bind runs. A process-wide `Arc<DashMap<...>>`,
//! populated lazily and refreshed in place.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;
use crate::interpreter::MapDocument;
use crate::interpreter::ServiceConfig;
use crate::value::Variable;

/// A bound profile+provider pair, ready for the interpreter (spec §3
/// "BoundProfileProvider"): the parsed map document, its resolved services
/// (base URL + security handler), and the merged input defaults.
pub struct BoundProfileProvider {
    pub document: Arc<MapDocument>,
    pub services: Arc<HashMap<String, ServiceConfig>>,
    pub parameters: Variable,
}

/// The seam that actually produces a [`BoundProfileProvider`] — parsing the
/// map file, resolving the provider's base URL/security, and merging
/// defaults is out of this crate's scope (spec §1, same boundary as the map
/// parser feeding [`crate::interpreter::ast`]).
#[async_trait]
pub trait Binder: Send + Sync {
    async fn bind(&self, profile_cache_key: &str, provider_cache_key: &str) -> Result<BoundProfileProvider>;
}

struct Slot {
    once: tokio::sync::OnceCell<(Arc<BoundProfileProvider>, Instant)>,
}

impl Slot {
    fn empty() -> Arc<Self> {
        Arc::new(Self {
            once: tokio::sync::OnceCell::new(),
        })
    }
}

/// Process-wide cache of bound profile+provider pairs (spec §5 "Bound-
/// provider cache ... [is a] process-wide singleton"; "cache inserts are
/// get-or-compute (single flight per key)").
pub struct BindCache {
    entries: Arc<DashMap<String, Arc<Slot>>>,
    ttl: Duration,
}

impl BindCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    fn cache_key(profile_cache_key: &str, provider_cache_key: &str) -> String {
        format!("{profile_cache_key}::{provider_cache_key}")
    }

    /// Return the cached entry, binding it (once, shared across concurrent
    /// callers) on a miss. A past-TTL entry is returned as-is while a
    /// detached task re-binds it in the background (spec §4.9 step 3).
    pub async fn get_or_bind(
        &self,
        profile_cache_key: &str,
        provider_cache_key: &str,
        binder: Arc<dyn Binder>,
    ) -> Result<Arc<BoundProfileProvider>> {
        let key = Self::cache_key(profile_cache_key, provider_cache_key);
        let slot = self
            .entries
            .entry(key.clone())
            .or_insert_with(Slot::empty)
            .clone();

        let profile_owned = profile_cache_key.to_string();
        let provider_owned = provider_cache_key.to_string();
        let binder_for_init = binder.clone();
        let (bound, bound_at) = slot
            .once
            .get_or_try_init(|| async move {
                let bound = binder_for_init.bind(&profile_owned, &provider_owned).await?;
                Ok::<_, crate::error::MapRuntimeError>((Arc::new(bound), Instant::now()))
            })
            .await?
            .clone();

        if bound_at.elapsed() >= self.ttl {
            self.spawn_background_rebind(key, profile_cache_key.to_string(), provider_cache_key.to_string(), binder);
        }

        Ok(bound)
    }

    fn spawn_background_rebind(&self, key: String, profile_cache_key: String, provider_cache_key: String, binder: Arc<dyn Binder>) {
        let entries = self.entries.clone();
        tokio::spawn(async move {
            match binder.bind(&profile_cache_key, &provider_cache_key).await {
                Ok(fresh) => {
                    let slot = Slot::empty();
                    let _ = slot.once.set((Arc::new(fresh), Instant::now()));
                    entries.insert(key, slot);
                }
                Err(error) => {
                    tracing::warn!(target: "mapruntime::driver", %error, "background re-bind failed, keeping stale entry");
                }
            }
        });
    }
}
