//! Catalog Resolver — maps (title, artist) to a catalog track, at most one search per key.
//!
//! The cache belongs to the resolver instance. Share one `Arc<CatalogResolver>` to share
//! the cache; build another to isolate it. The cache lock is never held across a backend
//! call. Searches are serialized per key only, so concurrent callers for the same song
//! wait for one search while unrelated songs proceed in parallel.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::catalog::{CatalogBackend, CatalogError};
use crate::recommend::models::{CandidateKey, ResolvedTrack};

/// Result of looking a key up in the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Resolved(ResolvedTrack),
    Unresolved,
    Unknown,
}

/// Positive and negative resolution memory. A key lives in at most one of the two.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    resolved: HashMap<CandidateKey, ResolvedTrack>,
    unresolved: HashSet<CandidateKey>,
}

impl ResolutionCache {
    pub fn lookup(&self, key: &CandidateKey) -> CacheLookup {
        if self.unresolved.contains(key) {
            return CacheLookup::Unresolved;
        }
        match self.resolved.get(key) {
            Some(track) => CacheLookup::Resolved(track.clone()),
            None => CacheLookup::Unknown,
        }
    }

    /// Entries are never overwritten; the first outcome for a key wins.
    fn record_resolved(&mut self, key: CandidateKey, track: ResolvedTrack) {
        if !self.unresolved.contains(&key) {
            self.resolved.entry(key).or_insert(track);
        }
    }

    fn record_unresolved(&mut self, key: CandidateKey) {
        if !self.resolved.contains_key(&key) {
            self.unresolved.insert(key);
        }
    }

    pub fn resolved_len(&self) -> usize {
        self.resolved.len()
    }

    pub fn unresolved_len(&self) -> usize {
        self.unresolved.len()
    }
}

pub struct CatalogResolver {
    backend: Arc<dyn CatalogBackend>,
    cache: Mutex<ResolutionCache>,
    /// One lock per key with a search in flight.
    in_flight: Mutex<HashMap<CandidateKey, Arc<Mutex<()>>>>,
}

impl CatalogResolver {
    pub fn new(backend: Arc<dyn CatalogBackend>) -> Self {
        Self {
            backend,
            cache: Mutex::new(ResolutionCache::default()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    async fn cached(&self, key: &CandidateKey) -> CacheLookup {
        self.cache.lock().await.lookup(key)
    }

    /// Resolves a song to a catalog track.
    ///
    /// `Ok(None)` is a normal miss and is remembered; transport errors are returned
    /// as-is and leave the cache untouched.
    pub async fn resolve(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Option<ResolvedTrack>, CatalogError> {
        let key = CandidateKey::new(title, artist);
        if let Some(hit) = cache_hit(&key, self.cached(&key).await) {
            return Ok(hit);
        }

        let key_lock = self
            .in_flight
            .lock()
            .await
            .entry(key.clone())
            .or_default()
            .clone();
        let outcome = {
            let _searching = key_lock.lock().await;
            // Another caller may have finished this key while we waited.
            match cache_hit(&key, self.cached(&key).await) {
                Some(hit) => Ok(hit),
                None => self.search(&key, title, artist).await,
            }
        };

        let mut in_flight = self.in_flight.lock().await;
        if in_flight
            .get(&key)
            .is_some_and(|current| Arc::ptr_eq(current, &key_lock))
        {
            in_flight.remove(&key);
        }
        outcome
    }

    async fn search(
        &self,
        key: &CandidateKey,
        title: &str,
        artist: &str,
    ) -> Result<Option<ResolvedTrack>, CatalogError> {
        let matches = self.backend.search_track(title.trim(), artist.trim()).await?;
        let mut cache = self.cache.lock().await;
        match matches.into_iter().next() {
            Some(first) => {
                let track = ResolvedTrack::from(first);
                info!("Resolved {key} -> {}", track.id);
                cache.record_resolved(key.clone(), track.clone());
                Ok(Some(track))
            }
            None => {
                info!("No catalog match for {key}");
                cache.record_unresolved(key.clone());
                Ok(None)
            }
        }
    }

    /// Current (resolved, unresolved) entry counts.
    pub async fn cache_sizes(&self) -> (usize, usize) {
        let cache = self.cache.lock().await;
        (cache.resolved_len(), cache.unresolved_len())
    }
}

/// `Some` when the cache already answers for `key`.
fn cache_hit(key: &CandidateKey, lookup: CacheLookup) -> Option<Option<ResolvedTrack>> {
    match lookup {
        CacheLookup::Unresolved => {
            debug!("Known unresolvable: {key}");
            Some(None)
        }
        CacheLookup::Resolved(track) => {
            debug!("Cache hit: {key} -> {}", track.id);
            Some(Some(track))
        }
        CacheLookup::Unknown => None,
    }
}
