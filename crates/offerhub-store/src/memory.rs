use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::kv::KeyValueStore;
use crate::StoreError;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now <= self.expires_at
    }
}

/// In-memory [`KeyValueStore`]. Expired entries stop being visible
/// immediately; their memory is reclaimed by [`KeyValueStore::sweep`], which
/// the server runs on a schedule.
///
/// All writes go through the inner write lock, which is what makes `incr`
/// and `update` atomic: no two mutations of the same key can interleave.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Number of entries currently held, expired ones included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.inner.read().await;
        let now = Instant::now();
        Ok(map
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let mut map = self.inner.write().await;
        map.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
        let mut map = self.inner.write().await;
        let now = Instant::now();
        let current = map
            .get(key)
            .filter(|entry| entry.is_live(now))
            .and_then(|entry| entry.value.parse::<i64>().ok())
            .unwrap_or(0);
        let next = current.saturating_add(1);
        map.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(next)
    }

    async fn update(
        &self,
        key: &str,
        ttl: Duration,
        apply: Box<dyn FnOnce(Option<String>) -> String + Send>,
    ) -> Result<(), StoreError> {
        let mut map = self.inner.write().await;
        let now = Instant::now();
        let current = map
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone());
        let next = apply(current);
        map.insert(
            key.to_string(),
            Entry {
                value: next,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        let map = self.inner.read().await;
        let now = Instant::now();
        Ok(map
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && entry.is_live(now))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect())
    }

    async fn sweep(&self) -> Result<usize, StoreError> {
        let mut map = self.inner.write().await;
        let now = Instant::now();
        let before = map.len();
        map.retain(|_, entry| entry.is_live(now));
        Ok(before - map.len())
    }
}
