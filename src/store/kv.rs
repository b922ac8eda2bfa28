//! Key-value store seam with per-key TTL

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::StoreError;

/// Key-value store with per-key expiry
///
/// Keys disappear once their TTL elapses. `take` removes and returns in a
/// single operation so callers can enforce strict single-use semantics
/// without a check-then-delete gap.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Write a value with the given TTL, overwriting any prior value
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;

    /// Read a live (non-expired) value
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Delete a key; deleting an absent key is not an error
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically delete a key and return its live value, if any
    async fn take(&self, key: &str) -> Result<Option<String>, StoreError>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory key-value store with lazy expiry
///
/// Expired entries are dropped on access and swept opportunistically on
/// writes; there is no background reaper.
#[derive(Default)]
pub struct InMemoryKvStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKvStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !entry.is_expired(now));
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone()))
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        Ok(entries
            .remove(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value))
    }
}
