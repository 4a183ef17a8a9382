use std::sync::Arc;
use dashmap::DashMap;
use crate::models::coordinate::PathKey;
use crate::models::path::PathResult;

/// Memoised road paths keyed by ordered coordinate pair.
///
/// Entries live for the whole process: road geometry between two fixed points
/// does not change within a session, so there is no eviction or TTL. Storage is
/// a sharded map, so segments may be resolved concurrently.
#[derive(Default)]
pub struct PathCache {
    entries: DashMap<PathKey, Arc<PathResult>>,
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PathKey) -> Option<Arc<PathResult>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn put(&self, key: PathKey, result: Arc<PathResult>) {
        self.entries.insert(key, result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
