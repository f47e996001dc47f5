//! Bridge settings
//!
//! Process-wide identifiers and platform capabilities, loaded from an optional
//! `config.toml`. Every field has a default so a missing or partial file is
//! fine.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::RestartPolicy;
use crate::notifications::StatusIndicatorChannel;

/// First platform API level offering the elevated background start path
pub const ELEVATED_START_API_LEVEL: u32 = 26;

const CONFIG_FILE: &str = "config.toml";

/// Platform capabilities resolved once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub elevated_background_start: bool,
}

impl Capabilities {
    pub fn from_api_level(api_level: u32) -> Self {
        Self {
            elevated_background_start: api_level >= ELEVATED_START_API_LEVEL,
        }
    }
}

/// Bridge settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Name of the method channel the command bridge listens on
    pub method_channel: String,

    /// Id of the background task, also used as the indicator slot id
    pub task_id: u32,

    /// API level reported by the hosting platform
    pub platform_api_level: u32,

    /// Forces the elevated start capability on or off
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supports_elevated_start: Option<bool>,

    /// Restart policy declared to the OS for a reclaimed task
    pub restart_policy: RestartPolicy,

    /// Registration for the status indicator channel
    pub indicator_channel: StatusIndicatorChannel,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            method_channel: "background_location".to_string(),
            task_id: 1001,
            platform_api_level: ELEVATED_START_API_LEVEL,
            supports_elevated_start: None,
            restart_policy: RestartPolicy::RedeliverLastIntent,
            indicator_channel: StatusIndicatorChannel::default(),
        }
    }
}

impl BridgeSettings {
    /// Default location of the settings file
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "bglocation")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring settings at {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load settings from an explicit file
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Write settings to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Resolve platform capabilities; an explicit override wins over the API level
    pub fn resolve_capabilities(&self) -> Capabilities {
        match self.supports_elevated_start {
            Some(elevated_background_start) => Capabilities {
                elevated_background_start,
            },
            None => Capabilities::from_api_level(self.platform_api_level),
        }
    }
}
