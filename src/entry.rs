//! Typed persisted state for one storage key.
//!
//! The store only knows integers and strings. [`Entry::decode`] checks a raw
//! [`StoreValue`] against the shape its policy expects, so the evaluator
//! never has to guess what a stored value means.

use once_store::StoreValue;

use crate::error::{OnceError, Result};
use crate::policy::Policy;

/// Marker stored under a [`Policy::RunOnce`] key once it has fired.
pub const RUN_ONCE_SENTINEL: &str = "once";

/// Decoded state of one storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Run-once marker.
    Sentinel,
    /// Epoch milliseconds (`Monthly` schedule time, `Interval` last firing).
    Timestamp(i64),
    /// Last weekday seen, 1 = Monday … 7 = Sunday.
    WeekdayCode(u8),
    /// Last month marker, 1 = January … 12 = December.
    MonthCode(u8),
    /// Last app version seen, raw string.
    VersionString(String),
    /// Last build number seen, raw string.
    BuildString(String),
}

impl Entry {
    /// Decode `value` stored under `key` as the shape `policy` owns.
    ///
    /// # Errors
    ///
    /// Returns [`OnceError::CorruptState`] if the value has the wrong type or
    /// is out of range for the policy. Any value decodes under
    /// [`Policy::RunOnce`].
    pub fn decode(policy: &Policy, key: &str, value: StoreValue) -> Result<Self> {
        match (policy, value) {
            // Presence alone marks a run-once key as fired.
            (Policy::RunOnce, _) => Ok(Self::Sentinel),
            (Policy::Monthly | Policy::Interval { .. }, StoreValue::Int(t)) => {
                Ok(Self::Timestamp(t))
            }
            (Policy::DailyOnWeekdayChange, StoreValue::Int(d)) => u8::try_from(d)
                .ok()
                .filter(|d| (1..=7).contains(d))
                .map(Self::WeekdayCode)
                .ok_or_else(|| OnceError::corrupt(key, format!("weekday code out of range: {d}"))),
            (Policy::OnSpecificMonth { .. }, StoreValue::Int(m)) => u8::try_from(m)
                .ok()
                .filter(|m| (1..=12).contains(m))
                .map(Self::MonthCode)
                .ok_or_else(|| OnceError::corrupt(key, format!("month code out of range: {m}"))),
            (Policy::OnVersionChange, StoreValue::Str(v)) => Ok(Self::VersionString(v)),
            (Policy::OnBuildChange, StoreValue::Str(b)) => Ok(Self::BuildString(b)),
            (policy, value) => Err(OnceError::corrupt(
                key,
                format!("{} value {value:?} does not fit policy '{policy}'", value.type_name()),
            )),
        }
    }

    /// Encode into the raw value written to the store.
    #[must_use]
    pub fn encode(&self) -> StoreValue {
        match self {
            Self::Sentinel => StoreValue::Str(RUN_ONCE_SENTINEL.to_owned()),
            Self::Timestamp(t) => StoreValue::Int(*t),
            Self::WeekdayCode(d) => StoreValue::Int(i64::from(*d)),
            Self::MonthCode(m) => StoreValue::Int(i64::from(*m)),
            Self::VersionString(v) | Self::BuildString(v) => StoreValue::Str(v.clone()),
        }
    }
}
