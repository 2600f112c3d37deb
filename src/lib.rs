//! Once: run-at-most-on-a-schedule gate.
//!
//! Given a key and a [`Policy`], decides whether to run a primary action or a
//! fallback, and persists enough state to suppress the primary action until
//! the policy's next window.
//!
//! # Architecture
//!
//! - **Namespace** (`namespace`): prefixes caller keys and migrates legacy
//!   unprefixed entries in place
//! - **Evaluator** (`evaluator`): decides due / not due from the prior
//!   [`Entry`] and the current time, version or build
//! - **Dispatcher** (`dispatcher`): applies debug overrides and runs exactly
//!   one action
//!
//! The store, clock, app metadata and debug flag are injected, so nothing
//! reads process-wide state.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use once::{DebugOverrides, MemoryStore, Once, Policy, StaticAppInfo};
//!
//! # async fn example() -> once::Result<()> {
//! let gate = Once::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(StaticAppInfo::new("1.2.0", "42")),
//! );
//! let shown = gate
//!     .run(
//!         "welcome_tour",
//!         Policy::RunOnce,
//!         || "showing tour",
//!         Some(|| "already seen"),
//!         DebugOverrides::none(),
//!     )
//!     .await?;
//! assert_eq!(shown, Some("showing tour"));
//! # Ok(())
//! # }
//! ```

pub mod calendar;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod entry;
pub mod error;
pub mod evaluator;
pub mod gate;
pub mod namespace;
pub mod policy;

pub use config::{DebugMode, OnceConfig};
pub use context::{
    AppInfoProvider, BuildDebugFlag, Clock, DebugFlag, FixedClock, StaticAppInfo, StaticDebugFlag,
    SystemClock,
};
pub use dispatcher::{DebugOverrides, Decision, no_fallback};
pub use entry::{Entry, RUN_ONCE_SENTINEL};
pub use error::{OnceError, Result};
pub use gate::Once;
pub use once_store::{FileStore, KeyValueStore, MemoryStore, StoreError, StoreValue};
pub use policy::{Family, Policy};
