//! Collaborators injected into the gate.
//!
//! The gate never reads process-wide state directly. Time comes from a
//! [`Clock`], the running app's version and build number from an
//! [`AppInfoProvider`], and debug mode from a [`DebugFlag`]. Tests swap in
//! [`FixedClock`], [`StaticAppInfo`] and [`StaticDebugFlag`].

use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, Offset, Utc};

use crate::error::{OnceError, Result};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    /// The current instant, in the host's local offset.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in the system's local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Settable clock for deterministic tests.
///
/// Holds epoch milliseconds and a fixed UTC offset. Shared references can
/// move it with [`set_millis`](Self::set_millis) and
/// [`advance_millis`](Self::advance_millis).
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
    offset: FixedOffset,
}

impl FixedClock {
    /// A clock frozen at `millis` since the epoch, in UTC.
    pub fn from_millis(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
            offset: Utc.fix(),
        }
    }

    /// A clock frozen at `at`, keeping its offset.
    pub fn at(at: DateTime<FixedOffset>) -> Self {
        Self {
            millis: AtomicI64::new(at.timestamp_millis()),
            offset: *at.offset(),
        }
    }

    /// Move the clock to `millis` since the epoch.
    pub fn set_millis(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Move the clock forward (or back, when negative) by `delta` milliseconds.
    pub fn advance_millis(&self, delta: i64) {
        self.millis.fetch_add(delta, Ordering::SeqCst);
    }

    /// Current reading in epoch milliseconds.
    pub fn millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        DateTime::<Utc>::from_timestamp_millis(self.millis())
            .unwrap_or_default()
            .with_timezone(&self.offset)
    }
}

// ---------------------------------------------------------------------------
// App metadata
// ---------------------------------------------------------------------------

/// Supplies the running application's version and build number.
///
/// Both calls may suspend (e.g. reading a bundle manifest). A failure is a
/// missing-dependency error and aborts the evaluation.
#[async_trait]
pub trait AppInfoProvider: Send + Sync {
    /// Semantic version string, e.g. `"1.2.0"`.
    async fn version(&self) -> Result<String>;

    /// Build number string, e.g. `"42"`.
    async fn build_number(&self) -> Result<String>;
}

/// Fixed version and build strings, replaceable at runtime.
#[derive(Debug)]
pub struct StaticAppInfo {
    version: RwLock<String>,
    build_number: RwLock<String>,
}

impl StaticAppInfo {
    /// Create a provider reporting `version` and `build_number`.
    pub fn new(version: impl Into<String>, build_number: impl Into<String>) -> Self {
        Self {
            version: RwLock::new(version.into()),
            build_number: RwLock::new(build_number.into()),
        }
    }

    /// Replace the reported version.
    pub fn set_version(&self, version: impl Into<String>) {
        if let Ok(mut guard) = self.version.write() {
            *guard = version.into();
        }
    }

    /// Replace the reported build number.
    pub fn set_build_number(&self, build_number: impl Into<String>) {
        if let Ok(mut guard) = self.build_number.write() {
            *guard = build_number.into();
        }
    }
}

#[async_trait]
impl AppInfoProvider for StaticAppInfo {
    async fn version(&self) -> Result<String> {
        self.version
            .read()
            .map(|v| v.clone())
            .map_err(|_| OnceError::AppInfo("version lock poisoned".to_owned()))
    }

    async fn build_number(&self) -> Result<String> {
        self.build_number
            .read()
            .map(|v| v.clone())
            .map_err(|_| OnceError::AppInfo("build number lock poisoned".to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Debug mode
// ---------------------------------------------------------------------------

/// Reports whether debug overrides may take effect.
pub trait DebugFlag: Send + Sync {
    /// `true` in development builds.
    fn is_debug(&self) -> bool;
}

/// Debug mode follows `debug_assertions` of the build.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildDebugFlag;

impl DebugFlag for BuildDebugFlag {
    fn is_debug(&self) -> bool {
        cfg!(debug_assertions)
    }
}

/// Debug mode pinned on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticDebugFlag(pub bool);

impl DebugFlag for StaticDebugFlag {
    fn is_debug(&self) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::{Datelike, TimeZone};

    #[test]
    fn fixed_clock_reports_set_time() {
        let clock = FixedClock::from_millis(1_000);
        assert_eq!(clock.now().timestamp_millis(), 1_000);
        clock.set_millis(5_000);
        assert_eq!(clock.now().timestamp_millis(), 5_000);
        clock.advance_millis(-1_000);
        assert_eq!(clock.millis(), 4_000);
    }

    #[test]
    fn fixed_clock_keeps_offset() {
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        let at = offset.with_ymd_and_hms(2024, 3, 1, 0, 30, 0).unwrap();
        let clock = FixedClock::at(at);
        let now = clock.now();
        assert_eq!(now.offset().local_minus_utc(), 9 * 3600);
        assert_eq!(now.month(), 3);
        assert_eq!(now.day(), 1);
    }

    #[test]
    fn system_clock_is_close_to_utc_now() {
        let now = SystemClock.now().timestamp_millis();
        let utc = Utc::now().timestamp_millis();
        assert!((now - utc).abs() < 5_000);
    }

    #[tokio::test]
    async fn static_app_info_reports_and_updates() {
        let info = StaticAppInfo::new("1.2.0", "7");
        assert_eq!(info.version().await.unwrap(), "1.2.0");
        assert_eq!(info.build_number().await.unwrap(), "7");
        info.set_version("1.3.0");
        info.set_build_number("8");
        assert_eq!(info.version().await.unwrap(), "1.3.0");
        assert_eq!(info.build_number().await.unwrap(), "8");
    }

    #[test]
    fn debug_flags() {
        assert!(StaticDebugFlag(true).is_debug());
        assert!(!StaticDebugFlag(false).is_debug());
        assert_eq!(BuildDebugFlag.is_debug(), cfg!(debug_assertions));
    }

    #[test]
    fn collaborators_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SystemClock>();
        assert_send_sync::<FixedClock>();
        assert_send_sync::<StaticAppInfo>();
        assert_send_sync::<StaticDebugFlag>();
    }
}
