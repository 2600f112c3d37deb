//! The public gate.
//!
//! [`Once`] ties the collaborators together. Each call runs:
//!
//! 1. debug overrides (no state read or written when one applies)
//! 2. key resolution, migrating a legacy unprefixed entry if present
//! 3. policy evaluation and commit of the new entry
//! 4. dispatch of exactly one action
//!
//! Calls on the same key are not serialized. Two concurrent calls can both
//! see "due" and both run the primary action; callers needing exclusivity
//! must coordinate outside the gate.

use std::sync::Arc;

use once_store::{FileStore, KeyValueStore};
use tracing::{debug, info};

use crate::config::OnceConfig;
use crate::context::{AppInfoProvider, BuildDebugFlag, Clock, DebugFlag, SystemClock};
use crate::dispatcher::{DebugOverrides, Decision, dispatch};
use crate::error::Result;
use crate::evaluator::{Facts, evaluate_and_commit};
use crate::namespace::{self, ONCE_PREFIX};
use crate::policy::{Family, Policy};

/// Run-at-most-on-a-schedule gate.
///
/// Cheap to clone; clones share the same store and collaborators.
#[derive(Clone)]
pub struct Once {
    store: Arc<dyn KeyValueStore>,
    app_info: Arc<dyn AppInfoProvider>,
    clock: Arc<dyn Clock>,
    debug: Arc<dyn DebugFlag>,
}

impl std::fmt::Debug for Once {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Once")
            .field("debug", &self.debug.is_debug())
            .finish_non_exhaustive()
    }
}

impl Once {
    /// Create a gate over `store`, using the system clock and the build's
    /// debug mode.
    pub fn new(store: Arc<dyn KeyValueStore>, app_info: Arc<dyn AppInfoProvider>) -> Self {
        Self {
            store,
            app_info,
            clock: Arc::new(SystemClock),
            debug: Arc::new(BuildDebugFlag),
        }
    }

    /// Open a gate backed by the config's JSON state file.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be opened or parsed.
    pub fn open(config: &OnceConfig, app_info: Arc<dyn AppInfoProvider>) -> Result<Self> {
        let path = config.state_file_path();
        let store = FileStore::open(&path)?;
        info!(path = %path.display(), debug_mode = %config.debug_mode, "opened once gate");
        Ok(Self::new(Arc::new(store), app_info).with_debug_flag(config.debug_mode.flag()))
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the debug flag.
    #[must_use]
    pub fn with_debug_flag(mut self, debug: Arc<dyn DebugFlag>) -> Self {
        self.debug = debug;
        self
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Evaluate `policy` for `key`, commit the new state, and return which
    /// action should run, without running it.
    ///
    /// # Errors
    ///
    /// Corrupt stored state, store failures and app info failures abort the
    /// evaluation; no decision is returned.
    pub async fn check(
        &self,
        key: &str,
        policy: Policy,
        overrides: DebugOverrides,
    ) -> Result<Decision> {
        if let Some(forced) = overrides.resolve(self.debug.as_ref()) {
            return Ok(forced);
        }

        policy.validate()?;
        let family = policy.family();
        let storage_key = namespace::resolve(self.store.as_ref(), family, key).await?;
        let facts = self.facts(family).await?;
        let due = evaluate_and_commit(self.store.as_ref(), &storage_key, &policy, &facts).await?;
        Ok(Decision::from_due(due))
    }

    /// Run `callback` if `policy` is due for `key`, otherwise `fallback`.
    ///
    /// Returns the chosen action's result, or `None` when not due and no
    /// fallback was given. Neither action runs if evaluation fails.
    ///
    /// # Errors
    ///
    /// See [`check`](Self::check).
    pub async fn run<T, C, F>(
        &self,
        key: &str,
        policy: Policy,
        callback: C,
        fallback: Option<F>,
        overrides: DebugOverrides,
    ) -> Result<Option<T>>
    where
        C: FnOnce() -> T,
        F: FnOnce() -> T,
    {
        let decision = self.check(key, policy, overrides).await?;
        Ok(dispatch(decision, callback, fallback))
    }

    /// Run `callback` when the app version is newer than the last one seen
    /// under `key` (default key: empty). The first call only records the
    /// version and runs `fallback`.
    ///
    /// # Errors
    ///
    /// See [`check`](Self::check).
    pub async fn run_on_new_version<T, C, F>(
        &self,
        key: Option<&str>,
        callback: C,
        fallback: Option<F>,
        overrides: DebugOverrides,
    ) -> Result<Option<T>>
    where
        C: FnOnce() -> T,
        F: FnOnce() -> T,
    {
        self.run(key.unwrap_or_default(), Policy::OnVersionChange, callback, fallback, overrides)
            .await
    }

    /// Run `callback` when the build number is newer than the last one seen
    /// under `key` (default key: empty). The first call only records the
    /// build number and runs `fallback`.
    ///
    /// # Errors
    ///
    /// See [`check`](Self::check).
    pub async fn run_on_new_build<T, C, F>(
        &self,
        key: Option<&str>,
        callback: C,
        fallback: Option<F>,
        overrides: DebugOverrides,
    ) -> Result<Option<T>>
    where
        C: FnOnce() -> T,
        F: FnOnce() -> T,
    {
        self.run(key.unwrap_or_default(), Policy::OnBuildChange, callback, fallback, overrides)
            .await
    }

    /// Forget the time/count entry for `key`.
    ///
    /// Only the prefixed entry is removed; a legacy bare entry is untouched.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn clear(&self, key: &str) -> Result<()> {
        self.remove(Family::Once, key).await
    }

    /// Forget the version entry for `key` (default key: empty).
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn clear_version(&self, key: Option<&str>) -> Result<()> {
        self.remove(Family::Version, key.unwrap_or_default()).await
    }

    /// Forget the build entry for `key` (default key: empty).
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn clear_build(&self, key: Option<&str>) -> Result<()> {
        self.remove(Family::Build, key.unwrap_or_default()).await
    }

    /// Forget every time/count entry.
    ///
    /// Removes every key containing `ONCE_PACKAGE_`. Version and build
    /// entries are kept. Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Propagates store failures. Entries removed before a failure stay
    /// removed.
    pub async fn clear_all(&self) -> Result<usize> {
        let keys = self.store.keys().await?;
        let mut removed = 0usize;
        for key in keys.iter().filter(|k| k.contains(ONCE_PREFIX)) {
            self.store.remove(key).await?;
            removed += 1;
        }
        info!(removed, "cleared all once entries");
        Ok(removed)
    }

    async fn remove(&self, family: Family, key: &str) -> Result<()> {
        let storage_key = namespace::storage_key(family, key);
        self.store.remove(&storage_key).await?;
        debug!(storage_key, "cleared entry");
        Ok(())
    }

    /// Gather the facts `family` needs. Only version and build policies call
    /// the app info provider.
    async fn facts(&self, family: Family) -> Result<Facts> {
        let mut facts = Facts::at(self.clock.now());
        match family {
            Family::Once => {}
            Family::Version => facts.version = Some(self.app_info.version().await?),
            Family::Build => facts.build = Some(self.app_info.build_number().await?),
        }
        Ok(facts)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::context::{FixedClock, StaticAppInfo, StaticDebugFlag};
    use crate::dispatcher::no_fallback;
    use crate::error::OnceError;
    use once_store::{MemoryStore, StoreValue};

    struct Harness {
        gate: Once,
        store: MemoryStore,
        clock: Arc<FixedClock>,
        app: Arc<StaticAppInfo>,
    }

    fn harness(debug: bool) -> Harness {
        let store = MemoryStore::new();
        let clock = Arc::new(FixedClock::from_millis(1_704_067_200_000));
        let app = Arc::new(StaticAppInfo::new("1.2.0", "10"));
        let gate = Once::new(Arc::new(store.clone()), app.clone())
            .with_clock(clock.clone())
            .with_debug_flag(Arc::new(StaticDebugFlag(debug)));
        Harness {
            gate,
            store,
            clock,
            app,
        }
    }

    #[tokio::test]
    async fn run_once_fires_then_falls_back() {
        let h = harness(false);
        let first = h
            .gate
            .run(
                "intro",
                Policy::RunOnce,
                || "primary",
                Some(|| "fallback"),
                DebugOverrides::none(),
            )
            .await
            .unwrap();
        assert_eq!(first, Some("primary"));

        for _ in 0..3 {
            let next = h
                .gate
                .run(
                    "intro",
                    Policy::RunOnce,
                    || "primary",
                    Some(|| "fallback"),
                    DebugOverrides::none(),
                )
                .await
                .unwrap();
            assert_eq!(next, Some("fallback"));
        }
    }

    #[tokio::test]
    async fn not_due_without_fallback_is_none() {
        let h = harness(false);
        h.gate
            .run("k", Policy::RunOnce, || 1, no_fallback(), DebugOverrides::none())
            .await
            .unwrap();
        let second = h
            .gate
            .run("k", Policy::RunOnce, || 1, no_fallback(), DebugOverrides::none())
            .await
            .unwrap();
        assert_eq!(second, None);
    }

    #[tokio::test]
    async fn check_returns_decision_and_commits() {
        let h = harness(false);
        let policy = Policy::Interval { millis: 1000 };
        assert_eq!(
            h.gate.check("k", policy, DebugOverrides::none()).await.unwrap(),
            Decision::Primary
        );
        assert!(h.store.contains_key("ONCE_PACKAGE_k").await.unwrap());
        h.clock.advance_millis(1000);
        assert_eq!(
            h.gate.check("k", policy, DebugOverrides::none()).await.unwrap(),
            Decision::Fallback
        );
        h.clock.advance_millis(1);
        assert_eq!(
            h.gate.check("k", policy, DebugOverrides::none()).await.unwrap(),
            Decision::Primary
        );
    }

    #[tokio::test]
    async fn debug_override_touches_no_state() {
        let h = harness(true);
        h.store
            .set_string("ONCE_PACKAGE_k", crate::entry::RUN_ONCE_SENTINEL)
            .await
            .unwrap();
        let out = h
            .gate
            .run(
                "k",
                Policy::RunOnce,
                || "primary",
                Some(|| "fallback"),
                DebugOverrides::force_callback(),
            )
            .await
            .unwrap();
        assert_eq!(out, Some("primary"));

        let out = h
            .gate
            .run(
                "fresh",
                Policy::RunOnce,
                || "primary",
                Some(|| "fallback"),
                DebugOverrides::force_fallback(),
            )
            .await
            .unwrap();
        assert_eq!(out, Some("fallback"));
        assert_eq!(h.store.len().await, 1);
    }

    #[tokio::test]
    async fn debug_override_ignored_in_release_mode() {
        let h = harness(false);
        let out = h
            .gate
            .run(
                "k",
                Policy::RunOnce,
                || "primary",
                Some(|| "fallback"),
                DebugOverrides::force_fallback(),
            )
            .await
            .unwrap();
        assert_eq!(out, Some("primary"));
        assert!(h.store.contains_key("ONCE_PACKAGE_k").await.unwrap());
    }

    #[tokio::test]
    async fn version_family_uses_own_prefix() {
        let h = harness(false);
        let first = h
            .gate
            .run_on_new_version(None, || "new", Some(|| "same"), DebugOverrides::none())
            .await
            .unwrap();
        assert_eq!(first, Some("same"));
        assert_eq!(
            h.store.get_string("ON_NEW_VERSION_").await.unwrap().as_deref(),
            Some("1.2.0")
        );

        h.app.set_version("1.3.0");
        let second = h
            .gate
            .run_on_new_version(None, || "new", Some(|| "same"), DebugOverrides::none())
            .await
            .unwrap();
        assert_eq!(second, Some("new"));
    }

    #[tokio::test]
    async fn build_family_uses_own_prefix() {
        let h = harness(false);
        h.gate
            .run_on_new_build(Some("whats_new"), || (), no_fallback(), DebugOverrides::none())
            .await
            .unwrap();
        assert_eq!(
            h.store.get_string("ON_NEW_BUILD_whats_new").await.unwrap().as_deref(),
            Some("10")
        );
    }

    #[tokio::test]
    async fn clear_removes_only_prefixed_entry() {
        let h = harness(false);
        h.store.set_int("tip", 1).await.unwrap();
        h.store.set_int("ONCE_PACKAGE_tip", 2).await.unwrap();
        h.gate.clear("tip").await.unwrap();
        assert!(!h.store.contains_key("ONCE_PACKAGE_tip").await.unwrap());
        assert!(h.store.contains_key("tip").await.unwrap());
    }

    #[tokio::test]
    async fn clear_all_keeps_version_and_build() {
        let h = harness(false);
        h.store.set_int("ONCE_PACKAGE_a", 1).await.unwrap();
        h.store.set_string("ONCE_PACKAGE_b", "once").await.unwrap();
        h.store.set_string("ON_NEW_VERSION_", "1.0.0").await.unwrap();
        h.store.set_string("ON_NEW_BUILD_", "3").await.unwrap();
        h.store.set_int("unrelated", 5).await.unwrap();

        assert_eq!(h.gate.clear_all().await.unwrap(), 2);
        let mut keys = h.store.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["ON_NEW_BUILD_", "ON_NEW_VERSION_", "unrelated"]);
    }

    #[tokio::test]
    async fn clear_version_and_build() {
        let h = harness(false);
        h.store.set_string("ON_NEW_VERSION_x", "1.0.0").await.unwrap();
        h.store.set_string("ON_NEW_BUILD_", "3").await.unwrap();
        h.gate.clear_version(Some("x")).await.unwrap();
        h.gate.clear_build(None).await.unwrap();
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn corrupt_state_runs_no_action() {
        let h = harness(false);
        h.store
            .set("ONCE_PACKAGE_m", StoreValue::from("not-a-time"))
            .await
            .unwrap();
        let mut ran = false;
        let result = h
            .gate
            .run("m", Policy::Monthly, || ran = true, no_fallback(), DebugOverrides::none())
            .await;
        assert!(matches!(result, Err(OnceError::CorruptState { .. })));
        assert!(!ran);
    }

    #[tokio::test]
    async fn open_uses_config_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = OnceConfig {
            debug_mode: crate::config::DebugMode::Off,
            state_file: Some(dir.path().join("state.json")),
        };
        let gate = Once::open(&config, Arc::new(StaticAppInfo::new("1.0.0", "1"))).unwrap();
        gate.run("k", Policy::RunOnce, || (), no_fallback(), DebugOverrides::force_callback())
            .await
            .unwrap();
        let raw = std::fs::read_to_string(dir.path().join("state.json")).unwrap();
        assert!(raw.contains("ONCE_PACKAGE_k"));
    }

    #[test]
    fn gate_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Once>();
    }
}
