use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Per-feed "last delivered" timestamps.
///
/// Each key is read and written only by the diff task for that feed, so there
/// is never contention on a single key. The lock only protects the map itself
/// from concurrent access by tasks working on different keys.
#[derive(Debug, Default)]
pub struct WatermarkStore {
    marks: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl WatermarkStore {
    /// Seeds every source with `now`, so entries published before startup are
    /// never announced.
    pub fn new<I, S>(sources: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let marks = sources.into_iter().map(|s| (s.into(), now)).collect();
        Self {
            marks: RwLock::new(marks),
        }
    }

    pub async fn get(&self, source: &str) -> Option<DateTime<Utc>> {
        self.marks.read().await.get(source).copied()
    }

    pub async fn set(&self, source: &str, at: DateTime<Utc>) {
        self.marks.write().await.insert(source.to_string(), at);
    }

    /// Copy of the current map, for logging and tests.
    pub async fn snapshot(&self) -> HashMap<String, DateTime<Utc>> {
        self.marks.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.marks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.marks.read().await.is_empty()
    }
}
