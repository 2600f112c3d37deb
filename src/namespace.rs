//! Storage key namespacing and legacy key migration.
//!
//! Every entry is persisted under a prefixed key. The prefixes below are the
//! on-disk contract and must never change:
//!
//! | Family | Prefix |
//! |--------|--------|
//! | time / count policies | `ONCE_PACKAGE_` |
//! | version tracking | `ON_NEW_VERSION_` |
//! | build tracking | `ON_NEW_BUILD_` |
//!
//! Older installs stored time/count entries under the bare caller key.
//! [`resolve`] moves such an entry under its prefixed key the first time the
//! key is evaluated. Version and build entries were always prefixed and are
//! never migrated.

use once_store::{KeyValueStore, StoreValue};
use tracing::info;

use crate::entry::RUN_ONCE_SENTINEL;
use crate::error::{OnceError, Result};
use crate::policy::Family;

/// Prefix for time and count policy entries.
pub const ONCE_PREFIX: &str = "ONCE_PACKAGE_";

/// Prefix for version tracking entries.
pub const VERSION_PREFIX: &str = "ON_NEW_VERSION_";

/// Prefix for build tracking entries.
pub const BUILD_PREFIX: &str = "ON_NEW_BUILD_";

impl Family {
    /// The storage prefix of this family.
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Once => ONCE_PREFIX,
            Self::Version => VERSION_PREFIX,
            Self::Build => BUILD_PREFIX,
        }
    }
}

/// The namespaced storage key for `raw_key` in `family`.
#[must_use]
pub fn storage_key(family: Family, raw_key: &str) -> String {
    format!("{}{raw_key}", family.prefix())
}

/// Convert a legacy unprefixed value into its namespaced key and value.
///
/// The run-once sentinel stays a string. Any other value is an integer: an
/// integer is kept as is, a string must parse as one.
///
/// # Errors
///
/// Returns [`OnceError::CorruptState`] if a non-sentinel string does not
/// parse as an integer.
pub fn migrate_legacy(raw_key: &str, legacy: StoreValue) -> Result<(String, StoreValue)> {
    let value = match legacy {
        StoreValue::Str(s) if s == RUN_ONCE_SENTINEL => StoreValue::Str(s),
        StoreValue::Str(s) => s.parse::<i64>().map(StoreValue::Int).map_err(|e| {
            OnceError::corrupt(raw_key, format!("legacy value {s:?} is not an integer: {e}"))
        })?,
        StoreValue::Int(n) => StoreValue::Int(n),
    };
    Ok((storage_key(Family::Once, raw_key), value))
}

/// Resolve the storage key for `raw_key`, migrating a legacy entry if needed.
///
/// For [`Family::Once`]:
/// - a prefixed entry already exists: returned as is, any bare entry is
///   left untouched and ignored
/// - only a bare entry exists: it is moved under the prefixed key
/// - neither exists: the prefixed key is returned and nothing is written
///
/// Other families only get their prefix. Calling this twice is a no-op the
/// second time.
///
/// # Errors
///
/// Propagates store failures, and [`OnceError::CorruptState`] for a legacy
/// value that cannot be migrated. A failed migration leaves the bare entry
/// in place.
pub async fn resolve(store: &dyn KeyValueStore, family: Family, raw_key: &str) -> Result<String> {
    let key = storage_key(family, raw_key);
    if family != Family::Once || store.contains_key(&key).await? {
        return Ok(key);
    }

    let Some(legacy) = store.get(raw_key).await? else {
        return Ok(key);
    };

    let (key, value) = migrate_legacy(raw_key, legacy)?;
    // Write before remove: a failure in between leaves both copies.
    store.set(&key, value).await?;
    store.remove(raw_key).await?;
    info!(raw_key, storage_key = %key, "migrated legacy entry");
    Ok(key)
}
