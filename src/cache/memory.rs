use chrono::{DateTime, Utc};
use dashmap::DashMap;
use crate::errors::LabscanError;
use super::{CacheEntry, CacheKey, CacheStore};

/// Process-local store; each key is locked independently by its shard.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<CacheKey, CacheEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, LabscanError> {
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), LabscanError> {
        self.entries.insert(key.clone(), entry.clone());
        Ok(())
    }

    fn remove(&self, host: Option<&str>) -> Result<usize, LabscanError> {
        let before = self.entries.len();
        match host {
            Some(host) => self.entries.retain(|k, _| k.host != host),
            None => self.entries.clear(),
        }
        Ok(before.saturating_sub(self.entries.len()))
    }

    fn list(&self) -> Result<Vec<(CacheKey, DateTime<Utc>)>, LabscanError> {
        let mut out: Vec<_> = self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().retrieved_at))
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(out)
    }
}
