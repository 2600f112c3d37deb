//! Policy evaluation.
//!
//! [`evaluate`] is pure: it takes the decoded prior entry and the current
//! facts and returns whether the primary action is due plus the entry to
//! write, if any. [`evaluate_and_commit`] wraps it with the store read and
//! write.
//!
//! The read, decision and write are not atomic across callers. Two
//! concurrent evaluations of one key can both see "due" and both fire.

use chrono::{DateTime, FixedOffset};
use once_store::KeyValueStore;
use tracing::{debug, warn};

use crate::calendar::{epoch_millis, month_length_millis, weekday_code};
use crate::entry::Entry;
use crate::error::{OnceError, Result};
use crate::policy::Policy;

/// Environment facts an evaluation depends on.
#[derive(Debug, Clone)]
pub struct Facts {
    /// Current wall-clock time.
    pub now: DateTime<FixedOffset>,
    /// Current app version, required by [`Policy::OnVersionChange`].
    pub version: Option<String>,
    /// Current build number, required by [`Policy::OnBuildChange`].
    pub build: Option<String>,
}

impl Facts {
    /// Facts with only a time.
    pub fn at(now: DateTime<FixedOffset>) -> Self {
        Self {
            now,
            version: None,
            build: None,
        }
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Whether the primary action should run.
    pub due: bool,
    /// Entry to persist; `None` leaves the store untouched.
    pub write: Option<Entry>,
}

impl Evaluation {
    fn fire(entry: Entry) -> Self {
        Self {
            due: true,
            write: Some(entry),
        }
    }

    fn skip() -> Self {
        Self {
            due: false,
            write: None,
        }
    }
}

/// Decide whether `policy` is due for `key` given its `prior` entry.
///
/// # Errors
///
/// Returns [`OnceError::CorruptState`] when a stored version/build has no
/// numeric value, [`OnceError::AppInfo`] when the current one is missing or
/// has none, and [`OnceError::InvalidPolicy`] for out-of-domain parameters.
pub fn evaluate(
    key: &str,
    policy: &Policy,
    prior: Option<Entry>,
    facts: &Facts,
) -> Result<Evaluation> {
    policy.validate()?;
    let now = epoch_millis(&facts.now);

    let evaluation = match (policy, prior) {
        (Policy::RunOnce, None) => Evaluation::fire(Entry::Sentinel),
        (Policy::RunOnce, Some(_)) => Evaluation::skip(),

        (Policy::Monthly, None) => {
            let next = now.saturating_add(month_length_millis(&facts.now));
            Evaluation::fire(Entry::Timestamp(next))
        }
        (Policy::Monthly, Some(Entry::Timestamp(scheduled))) => {
            if scheduled <= now {
                // Roll from the scheduled time, not from now, so late calls
                // don't push the schedule back.
                let next = scheduled.saturating_add(month_length_millis(&facts.now));
                Evaluation::fire(Entry::Timestamp(next))
            } else {
                Evaluation::skip()
            }
        }

        (Policy::DailyOnWeekdayChange, prior) => {
            let today = weekday_code(&facts.now);
            match prior {
                Some(Entry::WeekdayCode(last)) if last == today => Evaluation::skip(),
                None | Some(Entry::WeekdayCode(_)) => Evaluation::fire(Entry::WeekdayCode(today)),
                Some(other) => return Err(shape_mismatch(key, policy, &other)),
            }
        }

        (Policy::OnSpecificMonth { month }, prior) => match prior {
            Some(Entry::MonthCode(last)) if last == *month => Evaluation::skip(),
            None | Some(Entry::MonthCode(_)) => Evaluation::fire(Entry::MonthCode(*month)),
            Some(other) => return Err(shape_mismatch(key, policy, &other)),
        },

        (Policy::Interval { .. }, None) => Evaluation::fire(Entry::Timestamp(now)),
        (Policy::Interval { millis }, Some(Entry::Timestamp(last))) => {
            if now.saturating_sub(last) > *millis {
                Evaluation::fire(Entry::Timestamp(now))
            } else {
                Evaluation::skip()
            }
        }

        (Policy::OnVersionChange, prior) => {
            let current = required(facts.version.as_deref(), "version")?;
            match prior {
                None => Evaluation {
                    due: false,
                    write: Some(Entry::VersionString(current.to_owned())),
                },
                Some(Entry::VersionString(stored)) => {
                    if is_newer(key, current, &stored)? {
                        Evaluation::fire(Entry::VersionString(current.to_owned()))
                    } else {
                        Evaluation::skip()
                    }
                }
                Some(other) => return Err(shape_mismatch(key, policy, &other)),
            }
        }

        (Policy::OnBuildChange, prior) => {
            let current = required(facts.build.as_deref(), "build number")?;
            match prior {
                None => Evaluation {
                    due: false,
                    write: Some(Entry::BuildString(current.to_owned())),
                },
                Some(Entry::BuildString(stored)) => {
                    if is_newer(key, current, &stored)? {
                        Evaluation::fire(Entry::BuildString(current.to_owned()))
                    } else {
                        Evaluation::skip()
                    }
                }
                Some(other) => return Err(shape_mismatch(key, policy, &other)),
            }
        }

        (policy, Some(other)) => return Err(shape_mismatch(key, policy, &other)),
    };

    Ok(evaluation)
}

/// Read the prior entry for `key`, evaluate, and persist the result.
///
/// Returns whether the primary action is due. Nothing is written when the
/// evaluation fails.
///
/// # Errors
///
/// Propagates store failures and every error of [`evaluate`] and
/// [`Entry::decode`].
pub async fn evaluate_and_commit(
    store: &dyn KeyValueStore,
    key: &str,
    policy: &Policy,
    facts: &Facts,
) -> Result<bool> {
    let prior = store
        .get(key)
        .await?
        .map(|value| Entry::decode(policy, key, value))
        .transpose()
        .inspect_err(|e| warn!(key, %policy, "cannot decode stored entry: {e}"))?;

    let evaluation = evaluate(key, policy, prior, facts)
        .inspect_err(|e| warn!(key, %policy, "evaluation failed: {e}"))?;

    if let Some(entry) = &evaluation.write {
        store.set(key, entry.encode()).await?;
    }

    debug!(key, %policy, due = evaluation.due, wrote = evaluation.write.is_some(), "evaluated");
    Ok(evaluation.due)
}

/// Remove every non-digit character.
#[must_use]
pub fn numeric_strip(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Whether `current` is numerically greater than `stored` after
/// [`numeric_strip`]. `"1.10.0"` strips to `1100`, which is greater than
/// `"1.9.9"` (`199`), but `"2.0"` (`20`) is not greater than `"1.9.9"`.
fn is_newer(key: &str, current: &str, stored: &str) -> Result<bool> {
    let current_n = parse_stripped(current)
        .ok_or_else(|| OnceError::AppInfo(format!("{current:?} has no numeric value")))?;
    let stored_n = parse_stripped(stored)
        .ok_or_else(|| OnceError::corrupt(key, format!("stored {stored:?} has no numeric value")))?;
    Ok(current_n > stored_n)
}

fn parse_stripped(raw: &str) -> Option<u128> {
    numeric_strip(raw).parse().ok()
}

fn required<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str> {
    value.ok_or_else(|| OnceError::AppInfo(format!("current {what} not provided")))
}

fn shape_mismatch(key: &str, policy: &Policy, entry: &Entry) -> OnceError {
    OnceError::corrupt(key, format!("entry {entry:?} does not fit policy '{policy}'"))
}
