//! Action dispatch.
//!
//! Picks exactly one of primary action, fallback action, or nothing, and
//! runs it at most once.

use tracing::trace;

use crate::context::DebugFlag;

/// Which action a call resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Run the primary action.
    Primary,
    /// Run the fallback action, if one was given.
    Fallback,
}

impl Decision {
    /// `Primary` when `due`, `Fallback` otherwise.
    #[must_use]
    pub fn from_due(due: bool) -> Self {
        if due { Self::Primary } else { Self::Fallback }
    }
}

/// Development-only overrides that bypass persisted state.
///
/// Overrides only take effect while the injected [`DebugFlag`] reports
/// debug mode. `callback` wins over `fallback` when both are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugOverrides {
    /// Always run the primary action.
    pub callback: bool,
    /// Always run the fallback action.
    pub fallback: bool,
}

impl DebugOverrides {
    /// No overrides.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Force the primary action.
    #[must_use]
    pub fn force_callback() -> Self {
        Self {
            callback: true,
            fallback: false,
        }
    }

    /// Force the fallback action.
    #[must_use]
    pub fn force_fallback() -> Self {
        Self {
            callback: false,
            fallback: true,
        }
    }

    /// The forced decision, if any override applies under `debug`.
    #[must_use]
    pub fn resolve(&self, debug: &dyn DebugFlag) -> Option<Decision> {
        if !(self.callback || self.fallback) || !debug.is_debug() {
            return None;
        }
        let decision = if self.callback {
            Decision::Primary
        } else {
            Decision::Fallback
        };
        trace!(?decision, "debug override applied");
        Some(decision)
    }
}

/// Run the action chosen by `decision`.
///
/// Returns the primary's result, the fallback's result, or `None` when the
/// decision is [`Decision::Fallback`] and no fallback was given.
pub fn dispatch<T, C, F>(decision: Decision, callback: C, fallback: Option<F>) -> Option<T>
where
    C: FnOnce() -> T,
    F: FnOnce() -> T,
{
    match decision {
        Decision::Primary => Some(callback()),
        Decision::Fallback => fallback.map(|f| f()),
    }
}

/// Typed "no fallback" for [`dispatch`] and the gate's `run` methods.
///
/// ```
/// let result = once::dispatcher::dispatch(
///     once::Decision::Fallback,
///     || "primary",
///     once::no_fallback(),
/// );
/// assert_eq!(result, None);
/// ```
#[must_use]
pub fn no_fallback<T>() -> Option<fn() -> T> {
    None
}
