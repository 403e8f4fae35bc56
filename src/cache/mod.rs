pub mod memory;
pub mod sqlite;

use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::errors::LabscanError;
use crate::models::HostAssessment;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Identifies a finished report: the host plus the flags that shaped it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub host: String,
    pub mode: String,
}

impl CacheKey {
    pub fn new(host: &str, mode: &str) -> Self {
        Self {
            host: host.trim().trim_end_matches('.').to_ascii_lowercase(),
            mode: mode.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub assessment: HostAssessment,
    pub retrieved_at: DateTime<Utc>,
}

/// Raw key-value backend. Freshness and terminal-only policy live in
/// [`ResultCache`], not here.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, LabscanError>;
    fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), LabscanError>;
    fn remove(&self, host: Option<&str>) -> Result<usize, LabscanError>;
    fn list(&self) -> Result<Vec<(CacheKey, DateTime<Utc>)>, LabscanError>;
}

/// Local cache of finished assessments.
///
/// Backend failures never escape: they are logged and the caller sees a
/// miss (lookup) or nothing (store).
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn lookup(&self, key: &CacheKey, max_age: Duration) -> Option<HostAssessment> {
        self.lookup_at(key, max_age, Utc::now())
    }

    /// Lookup against an explicit clock.
    pub fn lookup_at(&self, key: &CacheKey, max_age: Duration, now: DateTime<Utc>) -> Option<HostAssessment> {
        let entry = match self.store.get(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(host = %key.host, mode = %key.mode, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(host = %key.host, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let age = now.signed_duration_since(entry.retrieved_at);
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        if age > max_age {
            debug!(host = %key.host, age_secs = age.num_seconds(), "Cached report is stale");
            return None;
        }
        if !entry.assessment.is_terminal() {
            warn!(host = %key.host, "Ignoring non-terminal cached report");
            return None;
        }
        Some(entry.assessment)
    }

    pub fn store(&self, key: &CacheKey, assessment: &HostAssessment) {
        self.store_at(key, assessment, Utc::now());
    }

    pub fn store_at(&self, key: &CacheKey, assessment: &HostAssessment, now: DateTime<Utc>) {
        if !assessment.is_terminal() {
            warn!(host = %key.host, status = %assessment.status, "Refusing to cache unfinished assessment");
            return;
        }
        let entry = CacheEntry {
            assessment: assessment.clone(),
            retrieved_at: now,
        };
        match self.store.put(key, &entry) {
            Ok(()) => debug!(host = %key.host, mode = %key.mode, "Cached assessment"),
            Err(e) => warn!(host = %key.host, error = %e, "Cache write failed"),
        }
    }

    /// Drop every entry, or only those of one host.
    pub fn clear(&self, host: Option<&str>) -> Result<usize, LabscanError> {
        let host = host.map(|h| CacheKey::new(h, "").host);
        self.store.remove(host.as_deref())
    }

    pub fn entries(&self) -> Result<Vec<(CacheKey, DateTime<Utc>)>, LabscanError> {
        self.store.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HostStatus;

    struct BrokenStore;

    impl CacheStore for BrokenStore {
        fn get(&self, _key: &CacheKey) -> Result<Option<CacheEntry>, LabscanError> {
            Err(LabscanError::Cache("disk on fire".into()))
        }
        fn put(&self, _key: &CacheKey, _entry: &CacheEntry) -> Result<(), LabscanError> {
            Err(LabscanError::Cache("disk on fire".into()))
        }
        fn remove(&self, _host: Option<&str>) -> Result<usize, LabscanError> {
            Ok(0)
        }
        fn list(&self) -> Result<Vec<(CacheKey, DateTime<Utc>)>, LabscanError> {
            Ok(Vec::new())
        }
    }

    fn ready(host: &str) -> HostAssessment {
        let mut a = HostAssessment::new(host);
        a.status = HostStatus::Ready;
        a.completed_at = Some(Utc::now());
        a
    }

    #[test]
    fn test_store_then_lookup_roundtrip() {
        let cache = ResultCache::in_memory();
        let key = CacheKey::new("example.com", "default");
        let report = ready("example.com");
        cache.store(&key, &report);

        let hit = cache.lookup(&key, Duration::from_secs(3600)).unwrap();
        assert_eq!(hit, report);
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let cache = ResultCache::in_memory();
        let key = CacheKey::new("example.com", "default");
        cache.store(&key, &ready("example.com"));

        let first = cache.lookup(&key, Duration::from_secs(60));
        let second = cache.lookup(&key, Duration::from_secs(60));
        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[test]
    fn test_zero_max_age_misses_after_any_elapsed_time() {
        let cache = ResultCache::in_memory();
        let key = CacheKey::new("example.com", "default");
        let stored_at = Utc::now();
        cache.store_at(&key, &ready("example.com"), stored_at);

        let later = stored_at + chrono::Duration::milliseconds(1);
        assert!(cache.lookup_at(&key, Duration::ZERO, later).is_none());
        assert!(cache.lookup_at(&key, Duration::from_secs(1), later).is_some());
    }

    #[test]
    fn test_stale_entry_is_a_miss() {
        let cache = ResultCache::in_memory();
        let key = CacheKey::new("example.com", "default");
        let stored_at = Utc::now() - chrono::Duration::hours(6);
        cache.store_at(&key, &ready("example.com"), stored_at);

        assert!(cache.lookup(&key, Duration::from_secs(5 * 3600)).is_none());
    }

    #[test]
    fn test_unfinished_assessment_is_not_stored() {
        let cache = ResultCache::in_memory();
        let key = CacheKey::new("example.com", "default");
        cache.store(&key, &HostAssessment::new("example.com"));

        assert!(cache.lookup(&key, Duration::from_secs(3600)).is_none());
        assert!(cache.entries().unwrap().is_empty());
    }

    #[test]
    fn test_keys_are_independent() {
        let cache = ResultCache::in_memory();
        let a = CacheKey::new("a.example", "default");
        let b = CacheKey::new("b.example", "default");
        let a_strict = CacheKey::new("a.example", "ignore-mismatch");
        cache.store(&a, &ready("a.example"));
        cache.store(&b, &ready("b.example"));

        assert_eq!(cache.lookup(&a, Duration::from_secs(60)).unwrap().host, "a.example");
        assert_eq!(cache.lookup(&b, Duration::from_secs(60)).unwrap().host, "b.example");
        assert!(cache.lookup(&a_strict, Duration::from_secs(60)).is_none());
    }

    #[test]
    fn test_key_normalizes_host() {
        assert_eq!(CacheKey::new(" Example.COM. ", "default").host, "example.com");
    }

    #[test]
    fn test_backend_errors_are_swallowed() {
        let cache = ResultCache::new(Arc::new(BrokenStore));
        let key = CacheKey::new("example.com", "default");
        cache.store(&key, &ready("example.com"));
        assert!(cache.lookup(&key, Duration::from_secs(60)).is_none());
    }

    #[test]
    fn test_clear_by_host() {
        let cache = ResultCache::in_memory();
        cache.store(&CacheKey::new("a.example", "default"), &ready("a.example"));
        cache.store(&CacheKey::new("a.example", "public"), &ready("a.example"));
        cache.store(&CacheKey::new("b.example", "default"), &ready("b.example"));

        assert_eq!(cache.clear(Some("A.example")).unwrap(), 2);
        assert_eq!(cache.entries().unwrap().len(), 1);
    }
}
