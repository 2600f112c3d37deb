//! Gate configuration.
//!
//! [`OnceConfig`] is loaded from TOML, e.g. `~/.config/once/config.toml`:
//!
//! ```toml
//! debug_mode = "auto"
//! state_file = "/var/lib/myapp/once-state.json"
//! ```
//!
//! Every field has a default, so an empty file is a valid config.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::{BuildDebugFlag, DebugFlag, StaticDebugFlag};
use crate::error::{OnceError, Result};

/// Whether debug overrides may take effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugMode {
    /// Follow the build: on with `debug_assertions`, off in release.
    #[default]
    Auto,
    /// Always on.
    On,
    /// Always off.
    Off,
}

impl DebugMode {
    /// The [`DebugFlag`] implementing this mode.
    #[must_use]
    pub fn flag(self) -> Arc<dyn DebugFlag> {
        match self {
            Self::Auto => Arc::new(BuildDebugFlag),
            Self::On => Arc::new(StaticDebugFlag(true)),
            Self::Off => Arc::new(StaticDebugFlag(false)),
        }
    }
}

impl std::fmt::Display for DebugMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::On => write!(f, "on"),
            Self::Off => write!(f, "off"),
        }
    }
}

/// Configuration for a gate opened with [`crate::Once::open`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnceConfig {
    /// Debug override behaviour.
    pub debug_mode: DebugMode,
    /// Path of the JSON state file. `None` uses [`default_state_file`].
    pub state_file: Option<PathBuf>,
}

impl OnceConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| OnceError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be
    /// serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| OnceError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The state file this config points at.
    #[must_use]
    pub fn state_file_path(&self) -> PathBuf {
        self.state_file.clone().unwrap_or_else(default_state_file)
    }
}

/// Default config file: `dirs::config_dir()/once/config.toml`.
///
/// Override the directory with `ONCE_CONFIG_DIR`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    if let Some(dir) = std::env::var_os("ONCE_CONFIG_DIR") {
        return PathBuf::from(dir).join("config.toml");
    }
    dirs::config_dir()
        .map(|d| d.join("once"))
        .unwrap_or_else(|| PathBuf::from("/tmp/once-config"))
        .join("config.toml")
}

/// Default state file: `dirs::data_dir()/once/once-state.json`.
///
/// Override the directory with `ONCE_DATA_DIR`.
#[must_use]
pub fn default_state_file() -> PathBuf {
    if let Some(dir) = std::env::var_os("ONCE_DATA_DIR") {
        return PathBuf::from(dir).join("once-state.json");
    }
    dirs::data_dir()
        .map(|d| d.join("once"))
        .unwrap_or_else(|| PathBuf::from("/tmp/once-data"))
        .join("once-state.json")
}
