// Transcript Booster - Viewport-driven virtualization for long chat transcripts
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Booster configuration: defaults, JSON file loading, CLI overrides.

use crate::Cli;
use crate::dom::{Selector, SelectorError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR_NAME: &str = "transcript-booster";
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_VIEWPORT_MARGIN: f64 = 600.0;
pub const DEFAULT_COLLAPSE_MARGIN: f64 = 2500.0;
pub const DEFAULT_MIN_ITEM_HEIGHT: f64 = 50.0;
pub const DEFAULT_FOLD_HEIGHT_THRESHOLD: f64 = 400.0;
pub const DEFAULT_COLLAPSE_DELAY_MS: u64 = 2000;
pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("`{field}` must be a finite, non-negative number of pixels")]
    InvalidPixels { field: &'static str },
    #[error("`{field}` must be greater than zero")]
    ZeroInterval { field: &'static str },
    #[error("`{field}` is not a usable selector: {source}")]
    Selector {
        field: &'static str,
        #[source]
        source: SelectorError,
    },
    #[error("failed to read config {path}: {message}")]
    Read { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoosterConfig {
    /// Freeze/thaw buffer above and below the viewport.
    pub viewport_margin: f64,
    /// Auto-collapse buffer above and below the viewport.
    pub collapse_margin: f64,
    /// Blocks at or below this height are never frozen.
    pub min_item_height: f64,
    /// Sections at or below this height are never auto-collapsed.
    pub fold_height_threshold: f64,
    #[serde(rename = "collapseDelay")]
    pub collapse_delay_ms: u64,
    #[serde(rename = "scanInterval")]
    pub scan_interval_ms: u64,
    #[serde(rename = "initialDelay")]
    pub initial_delay_ms: u64,
    pub auto_collapse_enabled: bool,
    pub container_selector: String,
    pub block_selector: String,
    pub header_selector: String,
    pub capture_url_marker: String,
}

impl Default for BoosterConfig {
    fn default() -> Self {
        Self {
            viewport_margin: DEFAULT_VIEWPORT_MARGIN,
            collapse_margin: DEFAULT_COLLAPSE_MARGIN,
            min_item_height: DEFAULT_MIN_ITEM_HEIGHT,
            fold_height_threshold: DEFAULT_FOLD_HEIGHT_THRESHOLD,
            collapse_delay_ms: DEFAULT_COLLAPSE_DELAY_MS,
            scan_interval_ms: DEFAULT_SCAN_INTERVAL_MS,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            auto_collapse_enabled: true,
            container_selector: ".layout-main".to_owned(),
            block_selector: "ms-chat-turn, .chat-turn-container".to_owned(),
            header_selector: "ms-code-block mat-expansion-panel-header".to_owned(),
            capture_url_marker: "ResolveDriveResource".to_owned(),
        }
    }
}

/// Parsed selector set, built once from a validated config.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub container: Selector,
    pub blocks: Selector,
    pub headers: Selector,
}

impl BoosterConfig {
    #[must_use]
    pub fn collapse_delay(&self) -> Duration {
        Duration::from_millis(self.collapse_delay_ms)
    }

    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn validate(&self) -> Result<Selectors, ConfigError> {
        for (field, value) in [
            ("viewportMargin", self.viewport_margin),
            ("collapseMargin", self.collapse_margin),
            ("minItemHeight", self.min_item_height),
            ("foldHeightThreshold", self.fold_height_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidPixels { field });
            }
        }
        if self.scan_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval { field: "scanInterval" });
        }
        if self.auto_collapse_enabled && self.collapse_delay_ms == 0 {
            return Err(ConfigError::ZeroInterval { field: "collapseDelay" });
        }
        let parse = |field: &'static str, source: &str| {
            Selector::parse(source).map_err(|source| ConfigError::Selector { field, source })
        };
        Ok(Selectors {
            container: parse("containerSelector", &self.container_selector)?,
            blocks: parse("blockSelector", &self.block_selector)?,
            headers: parse("headerSelector", &self.header_selector)?,
        })
    }

    /// Load from `explicit`, else from the user config dir when the file
    /// exists, else defaults. CLI overrides are applied on top.
    pub fn load(explicit: Option<&Path>, cli: &Cli) -> Result<Self, ConfigError> {
        let path = explicit.map(Path::to_path_buf).or_else(|| {
            default_config_path().filter(|p| p.exists())
        });
        let mut config = match path {
            Some(path) => Self::read(&path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let read_error =
            |message: String| ConfigError::Read { path: path.to_path_buf(), message };
        let content = std::fs::read_to_string(path).map_err(|e| read_error(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| read_error(e.to_string()))
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(margin) = cli.viewport_margin {
            self.viewport_margin = margin;
        }
        if let Some(interval) = cli.scan_interval {
            self.scan_interval_ms = interval;
        }
        if cli.no_auto_collapse {
            self.auto_collapse_enabled = false;
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE))
}
