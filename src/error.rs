//! Error types for the once gate.

use once_store::StoreError;

/// Top-level error type for gate evaluation.
///
/// No variant is ever turned into "run the primary action anyway": a failed
/// evaluation surfaces here and no action is invoked.
#[derive(Debug, thiserror::Error)]
pub enum OnceError {
    /// A stored value cannot be read as the shape its policy expects.
    #[error("corrupt state for '{key}': {reason}")]
    CorruptState {
        /// Storage key holding the bad value.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The persistent store failed or is unavailable.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The app version / build number provider failed.
    #[error("app info error: {0}")]
    AppInfo(String),

    /// A policy value is outside its domain.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OnceError {
    pub(crate) fn corrupt(key: &str, reason: impl Into<String>) -> Self {
        Self::CorruptState {
            key: key.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, OnceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_corrupt_state() {
        let err = OnceError::corrupt("ONCE_PACKAGE_a", "not an integer: \"abc\"");
        assert_eq!(
            err.to_string(),
            "corrupt state for 'ONCE_PACKAGE_a': not an integer: \"abc\""
        );
    }

    #[test]
    fn store_error_converts() {
        let err: OnceError = StoreError::Unavailable("locked".into()).into();
        assert!(matches!(err, OnceError::Store(_)));
        assert_eq!(err.to_string(), "store error: store unavailable: locked");
    }

    #[test]
    fn display_invalid_policy() {
        let err = OnceError::InvalidPolicy("month 12 out of range".into());
        assert_eq!(err.to_string(), "invalid policy: month 12 out of range");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OnceError>();
    }
}
