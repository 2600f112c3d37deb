//! Error types for the once-store crate.

/// Errors that can occur while reading or writing persisted preferences.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The value under a key has a different type than the one requested.
    #[error("type mismatch for key '{key}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Key that was read.
        key: String,
        /// Type the caller asked for.
        expected: &'static str,
        /// Type actually stored.
        found: &'static str,
    },

    /// The backing file exists but cannot be parsed.
    #[error("corrupt store: {0}")]
    Corrupt(String),

    /// The backing storage cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Filesystem failure while loading or persisting the store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for once-store results.
pub type Result<T> = std::result::Result<T, StoreError>;
