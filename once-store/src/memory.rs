//! In-memory store for testing and ephemeral usage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::types::StoreValue;
use crate::KeyValueStore;

/// In-memory key-value store.
///
/// Values live in an `Arc<RwLock<HashMap>>` and are lost when the last
/// clone is dropped. Thread-safe and cheaply cloneable; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<RwLock<HashMap<String, StoreValue>>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`.
    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, StoreValue)>,
        K: Into<String>,
    {
        let values = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            values: Arc::new(RwLock::new(values)),
        }
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<StoreValue>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: StoreValue) -> Result<()> {
        self.values.write().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.values.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[tokio::test]
    async fn set_and_get() {
        let store = MemoryStore::new();
        store.set("a", StoreValue::Int(1)).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(StoreValue::Int(1)));
    }

    #[tokio::test]
    async fn overwrite_replaces_type() {
        let store = MemoryStore::new();
        store.set("a", StoreValue::Int(1)).await.unwrap();
        store.set("a", StoreValue::from("x")).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(StoreValue::from("x")));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn remove_nonexistent_is_ok() {
        let store = MemoryStore::new();
        assert!(store.remove("nope").await.is_ok());
    }

    #[tokio::test]
    async fn keys_lists_everything() {
        let store = MemoryStore::with_entries([
            ("a", StoreValue::Int(1)),
            ("b", StoreValue::from("two")),
        ]);
        let mut keys = store.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_owned(), "b".to_owned()]);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set_int("k", 9).await.unwrap();
        assert_eq!(other.get_int("k").await.unwrap(), Some(9));
    }

    #[tokio::test]
    async fn empty_by_default() {
        let store = MemoryStore::default();
        assert!(store.is_empty().await);
    }

    #[test]
    fn memory_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MemoryStore>();
    }
}
