//! Gating policies.
//!
//! A [`Policy`] is supplied by the caller on every call and is never
//! persisted. It decides which namespace the key lives in, what shape the
//! stored value has, and when the primary action is due again.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::calendar::{MILLIS_PER_DAY, MILLIS_PER_HOUR};
use crate::error::{OnceError, Result};

/// When the primary action may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Policy {
    /// Fire exactly once, ever.
    RunOnce,
    /// Fire, then again each time a full calendar month has elapsed since
    /// the scheduled time. The month length is taken from the month the
    /// evaluation happens in.
    Monthly,
    /// Fire whenever the weekday differs from the last stored weekday.
    ///
    /// Two calls exactly a week apart see the same weekday and do not
    /// re-fire.
    DailyOnWeekdayChange,
    /// Fire when the stored marker differs from `month` (`1 ≤ month < 12`),
    /// then store `month`. A fresh key always fires.
    ///
    /// The marker is `month` itself, so keys must be unique per call site.
    OnSpecificMonth {
        /// Target month, 1 = January.
        month: u8,
    },
    /// Fire when strictly more than `millis` milliseconds have passed since
    /// the last firing.
    Interval {
        /// Minimum gap in milliseconds.
        millis: i64,
    },
    /// Fire when the app version is numerically greater than the last one
    /// seen. The first observation only records the version.
    OnVersionChange,
    /// Fire when the build number is numerically greater than the last one
    /// seen. The first observation only records the build number.
    OnBuildChange,
}

/// Storage namespace a policy's entries live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Time and count policies, prefix `ONCE_PACKAGE_`.
    Once,
    /// Version tracking, prefix `ON_NEW_VERSION_`.
    Version,
    /// Build tracking, prefix `ON_NEW_BUILD_`.
    Build,
}

impl Policy {
    /// An interval policy from a [`Duration`].
    ///
    /// Durations beyond `i64::MAX` milliseconds saturate.
    #[must_use]
    pub fn interval(duration: Duration) -> Self {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        Self::Interval { millis }
    }

    /// Every hour.
    #[must_use]
    pub fn hourly() -> Self {
        Self::Interval {
            millis: MILLIS_PER_HOUR,
        }
    }

    /// Every twelve hours.
    #[must_use]
    pub fn every_12_hours() -> Self {
        Self::Interval {
            millis: 12 * MILLIS_PER_HOUR,
        }
    }

    /// Every twenty-four hours, measured from the last firing.
    #[must_use]
    pub fn every_24_hours() -> Self {
        Self::Interval {
            millis: MILLIS_PER_DAY,
        }
    }

    /// Every seven days.
    #[must_use]
    pub fn weekly() -> Self {
        Self::Interval {
            millis: 7 * MILLIS_PER_DAY,
        }
    }

    /// Every 365 days.
    #[must_use]
    pub fn yearly() -> Self {
        Self::Interval {
            millis: 365 * MILLIS_PER_DAY,
        }
    }

    /// The storage namespace this policy owns.
    #[must_use]
    pub fn family(&self) -> Family {
        match self {
            Self::OnVersionChange => Family::Version,
            Self::OnBuildChange => Family::Build,
            _ => Family::Once,
        }
    }

    /// Check the policy's parameters.
    ///
    /// # Errors
    ///
    /// Returns [`OnceError::InvalidPolicy`] for a month outside `1 ≤ n < 12`
    /// or a negative interval.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::OnSpecificMonth { month } if !(1..12).contains(&month) => Err(
                OnceError::InvalidPolicy(format!("month must satisfy 1 <= n < 12, got {month}")),
            ),
            Self::Interval { millis } if millis < 0 => Err(OnceError::InvalidPolicy(format!(
                "interval must not be negative, got {millis} ms"
            ))),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RunOnce => write!(f, "once"),
            Self::Monthly => write!(f, "monthly"),
            Self::DailyOnWeekdayChange => write!(f, "on weekday change"),
            Self::OnSpecificMonth { month } => write!(f, "in month {month}"),
            Self::Interval { millis } => {
                if *millis >= MILLIS_PER_HOUR && millis % MILLIS_PER_HOUR == 0 {
                    write!(f, "every {} hours", millis / MILLIS_PER_HOUR)
                } else {
                    write!(f, "every {millis} ms")
                }
            }
            Self::OnVersionChange => write!(f, "on new version"),
            Self::OnBuildChange => write!(f, "on new build"),
        }
    }
}
