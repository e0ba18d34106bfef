/*!
 * Configuration
 *
 * JSON settings for the grouper. Lookup order: explicit `--config` path,
 * then `<config dir>/window-grouper/config.json`, then built-in defaults.
 * Missing fields fall back to their defaults.
 */

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::detector::HostIdentity;
use crate::layout::LayoutMode;
use crate::mutator::RestorePolicy;
use crate::platform::{Rect, WindowHandle};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log file appended to next to console output; `None` disables it
    pub file: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("window_grouper.log")),
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrouperConfig {
    /// Host window caption, also used to recognise the host's own windows
    pub host_title: String,
    /// Title marker while a window is being restored
    pub restoring_prefix: String,
    /// Drag detector polling period
    pub tick_interval_ms: u64,
    pub settle_timeout_ms: u64,
    pub settle_poll_ms: u64,
    /// Where released windows reappear
    pub restore_rect: Rect,
    /// Initial host window placement
    pub host_rect: Rect,
    pub layout_mode: LayoutMode,
    pub always_on_top: bool,
    pub log: LogConfig,
}

impl Default for GrouperConfig {
    fn default() -> Self {
        Self {
            host_title: "Window Grouper".to_string(),
            restoring_prefix: "RESTORING...".to_string(),
            tick_interval_ms: 50,
            settle_timeout_ms: 200,
            settle_poll_ms: 20,
            restore_rect: Rect::new(100, 100, 800, 600),
            host_rect: Rect::new(100, 100, 1200, 800),
            layout_mode: LayoutMode::Tabs,
            always_on_top: true,
            log: LogConfig::default(),
        }
    }
}

impl GrouperConfig {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("window-grouper")
            .join("config.json")
    }

    /// Load from `path`, or from the default location if that file exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::load_from(&default)
                } else {
                    debug!("No config at {:?}, using defaults", default);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config = Self::from_json(&contents)
            .with_context(|| format!("Invalid config in {:?}", path))?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_str(json).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            bail!("tick_interval_ms must be greater than zero");
        }
        if self.settle_poll_ms == 0 {
            bail!("settle_poll_ms must be greater than zero");
        }
        if self.host_title.trim().is_empty() {
            bail!("host_title must not be empty");
        }
        if self.restoring_prefix.trim().is_empty() {
            bail!("restoring_prefix must not be empty");
        }
        if self.restore_rect.width == 0 || self.restore_rect.height == 0 {
            bail!("restore_rect must have a non-zero size");
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn restore_policy(&self) -> RestorePolicy {
        RestorePolicy {
            prefix: self.restoring_prefix.clone(),
            default_rect: self.restore_rect,
            settle_timeout: Duration::from_millis(self.settle_timeout_ms),
            settle_poll: Duration::from_millis(self.settle_poll_ms),
        }
    }

    /// Identity of the running host for self-exclusion
    pub fn host_identity(&self, window: WindowHandle) -> HostIdentity {
        HostIdentity {
            window,
            pid: std::process::id(),
            title: self.host_title.clone(),
            restoring_prefix: self.restoring_prefix.clone(),
        }
    }
}
