//! Value type held by every store backend.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A single persisted preference value.
///
/// Serializes untagged, so a store file reads like a plain preferences map:
/// `{"ONCE_PACKAGE_intro": "once", "ONCE_PACKAGE_tip": 1706000000000}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreValue {
    /// Integer value (timestamps, weekday and month codes).
    Int(i64),
    /// String value (sentinels, version and build numbers).
    Str(String),
}

impl StoreValue {
    /// Short name of the stored type, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Str(_) => "string",
        }
    }

    /// Returns the integer, or a [`StoreError::TypeMismatch`] naming `key`.
    pub fn into_int(self, key: &str) -> Result<i64, StoreError> {
        match self {
            Self::Int(v) => Ok(v),
            other => Err(StoreError::TypeMismatch {
                key: key.to_owned(),
                expected: "int",
                found: other.type_name(),
            }),
        }
    }

    /// Returns the string, or a [`StoreError::TypeMismatch`] naming `key`.
    pub fn into_string(self, key: &str) -> Result<String, StoreError> {
        match self {
            Self::Str(v) => Ok(v),
            other => Err(StoreError::TypeMismatch {
                key: key.to_owned(),
                expected: "string",
                found: other.type_name(),
            }),
        }
    }
}

impl std::fmt::Display for StoreValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

impl From<i64> for StoreValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<String> for StoreValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for StoreValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}
