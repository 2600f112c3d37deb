//! JSON-file-backed store.
//!
//! All values live in one JSON object file, e.g.
//! `{"ONCE_PACKAGE_intro": "once", "ON_NEW_VERSION_": "1.2.0"}`.
//! The file is read once on open and rewritten atomically (temp file +
//! fsync + rename) after every mutation.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::types::StoreValue;
use crate::KeyValueStore;

type ValueMap = BTreeMap<String, StoreValue>;

/// Filesystem-backed key-value store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: RwLock<ValueMap>,
}

impl FileStore {
    /// Open the store at `path`, creating parent directories as needed.
    ///
    /// A missing file is an empty store; the file is created on first write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be read or the
    /// parent directory cannot be created, and [`StoreError::Corrupt`] if the
    /// file is not a JSON object of integers and strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let values = match std::fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => ValueMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StoreError::Corrupt(format!("cannot parse {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ValueMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), entries = values.len(), "opened file store");
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically persist `values` to disk.
    fn write_atomic(&self, values: &ValueMap) -> Result<()> {
        let json = serde_json::to_string_pretty(values)
            .map_err(|e| StoreError::Corrupt(format!("cannot serialize store: {e}")))?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store".to_owned());
        let tmp_path = self.path.with_file_name(format!(".{file_name}.tmp"));
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp_path, &self.path)?;
        tracing::trace!(
            path = %self.path.display(),
            entries = values.len(),
            "file store persisted"
        );
        Ok(())
    }

    /// Apply `mutate` to a copy of the map, persist it, then commit it.
    ///
    /// The in-memory state only changes once the file write succeeded.
    async fn mutate(&self, mutate: impl FnOnce(&mut ValueMap)) -> Result<()> {
        let mut guard = self.values.write().await;
        let mut next = guard.clone();
        mutate(&mut next);
        self.write_atomic(&next)?;
        *guard = next;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<StoreValue>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: StoreValue) -> Result<()> {
        self.mutate(|values| {
            values.insert(key.to_owned(), value);
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if !self.values.read().await.contains_key(key) {
            return Ok(());
        }
        self.mutate(|values| {
            values.remove(key);
        })
        .await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.values.read().await.keys().cloned().collect())
    }
}
