// User configuration, read from config.toml in the config directory

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/linkpilot/";
pub const DATABASE_FILE: &str = "linkpilot.db";
pub const CONFIG_FILE: &str = "config.toml";

/// Expand `~` in a user supplied directory.
pub fn expand_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// How long to wait for a page to render its data.
    pub readiness_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    /// Where exports go when no output path is given.
    pub export_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            readiness_timeout_secs: 20,
            poll_interval_ms: 500,
            http_timeout_secs: 30,
            user_agent: format!(
                "LinkPilot/{} (+https://github.com/linkpilot/linkpilot)",
                env!("CARGO_PKG_VERSION")
            ),
            export_dir: ".".to_string(),
        }
    }
}

impl Settings {
    /// Read settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn export_dir(&self) -> PathBuf {
        expand_dir(&self.export_dir)
    }
}
