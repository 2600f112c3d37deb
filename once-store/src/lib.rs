//! # once-store
//!
//! Persistent key-value preferences storage for the `once` gate.
//!
//! Values are either integers or strings ([`StoreValue`]), addressed by
//! opaque string keys. Two backends ship with the crate:
//!
//! - [`MemoryStore`]: process-local map, for tests and ephemeral use
//! - [`FileStore`]: a single JSON object file, rewritten atomically on
//!   every mutation
//!
//! Neither backend coordinates across processes. Two processes sharing a
//! [`FileStore`] path will overwrite each other's writes.

pub mod error;
pub mod file;
pub mod memory;
pub mod types;

use async_trait::async_trait;

pub use error::{Result, StoreError};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use types::StoreValue;

/// Async key-value store backend.
///
/// Implementors provide the untyped primitives [`get`](Self::get),
/// [`set`](Self::set), [`remove`](Self::remove) and [`keys`](Self::keys).
/// The typed accessors are derived from them and never coerce: reading an
/// integer key with [`get_string`](Self::get_string) is a
/// [`StoreError::TypeMismatch`].
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value under `key`.
    async fn get(&self, key: &str) -> Result<Option<StoreValue>>;

    /// Write `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: StoreValue) -> Result<()>;

    /// Delete `key`.
    ///
    /// Returns `Ok(())` even if the key did not exist.
    async fn remove(&self, key: &str) -> Result<()>;

    /// List every key currently stored.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Check if a value exists under `key`.
    async fn contains_key(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Read an integer value.
    async fn get_int(&self, key: &str) -> Result<Option<i64>> {
        self.get(key).await?.map(|v| v.into_int(key)).transpose()
    }

    /// Read a string value.
    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.get(key).await?.map(|v| v.into_string(key)).transpose()
    }

    /// Write an integer value.
    async fn set_int(&self, key: &str, value: i64) -> Result<()> {
        self.set(key, StoreValue::Int(value)).await
    }

    /// Write a string value.
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set(key, StoreValue::Str(value.to_owned())).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[tokio::test]
    async fn typed_getters_use_default_impls() {
        let store = MemoryStore::new();
        store.set_int("n", 7).await.unwrap();
        store.set_string("s", "1.0.0").await.unwrap();

        assert_eq!(store.get_int("n").await.unwrap(), Some(7));
        assert_eq!(store.get_string("s").await.unwrap().as_deref(), Some("1.0.0"));
        assert_eq!(store.get_int("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn typed_getter_mismatch_is_error() {
        let store = MemoryStore::new();
        store.set_string("s", "once").await.unwrap();
        let err = store.get_int("s").await.unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch { .. }));
    }

    #[tokio::test]
    async fn contains_key_reflects_writes() {
        let store = MemoryStore::new();
        assert!(!store.contains_key("k").await.unwrap());
        store.set_int("k", 1).await.unwrap();
        assert!(store.contains_key("k").await.unwrap());
        store.remove("k").await.unwrap();
        assert!(!store.contains_key("k").await.unwrap());
    }

    #[test]
    fn trait_is_object_safe() {
        fn takes_dyn(_: &dyn KeyValueStore) {}
        takes_dyn(&MemoryStore::new());
    }
}
