use crate::error::Result;
use crate::types::schema::SchemaNode;
use papaya::HashMap as PapayaMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Cache key: a profile, optionally paired with the containing definition
/// (e.g. a questionnaire) it was built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub profile: String,
    pub container: Option<String>,
}

impl CacheKey {
    pub fn profile(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            container: None,
        }
    }

    pub fn pair(profile: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            container: Some(container.into()),
        }
    }
}

/// Built schema trees, shared read-only once published.
///
/// Entries are published whole or not at all. Top-level builds of the same
/// key are collapsed behind a per-key guard; nested expansions only read
/// and publish, so builds of mutually recursive types on different threads
/// cannot wait on each other.
#[derive(Default)]
pub struct SchemaCache {
    entries: PapayaMap<CacheKey, Arc<SchemaNode>>,
    guards: PapayaMap<CacheKey, Arc<Mutex<()>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    published: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub published: u64,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<SchemaNode>> {
        let found = self.entries.pin().get(key).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Publishes a finished tree. When another builder got there first its
    /// tree is kept and returned.
    pub fn publish(&self, key: CacheKey, tree: Arc<SchemaNode>) -> Arc<SchemaNode> {
        let entries = self.entries.pin();
        let stored = Arc::clone(entries.get_or_insert(key, Arc::clone(&tree)));
        if Arc::ptr_eq(&stored, &tree) {
            self.published.fetch_add(1, Ordering::Relaxed);
        }
        stored
    }

    /// Returns the cached tree or builds it once under the key's guard.
    /// A build that yields `None` caches nothing.
    pub fn get_or_build<F>(&self, key: CacheKey, build: F) -> Result<Option<Arc<SchemaNode>>>
    where
        F: FnOnce() -> Result<Option<SchemaNode>>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(Some(hit));
        }

        let guard = Arc::clone(
            self.guards
                .pin()
                .get_or_insert_with(key.clone(), || Arc::new(Mutex::new(()))),
        );
        let _building = guard.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(hit) = self.entries.pin().get(&key).cloned() {
            tracing::trace!("{} was built while waiting", key.profile);
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(hit));
        }

        Ok(build()?.map(|tree| self.publish(key, Arc::new(tree))))
    }

    /// Drops every entry. Trees already handed out stay valid.
    pub fn flush(&self) {
        tracing::debug!("Flushing {} cached schema trees", self.len());
        self.entries.pin().clear();
        self.guards.pin().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.pin().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaCache").field("stats", &self.stats()).finish()
    }
}
