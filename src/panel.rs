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

//! Persisted position of the floating control panel.
//!
//! Read when the HUD is created, written when a drag ends. Persistence is
//! best-effort: a missing or corrupt file simply means "default position".

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const PANEL_DIR_NAME: &str = "transcript-booster";
const PANEL_FILE: &str = "panel.json";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelPosition {
    pub left: f64,
    pub top: f64,
}

impl PanelPosition {
    /// Reject positions that could not have come from a drag.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.left.is_finite() && self.top.is_finite() && self.left >= 0.0 && self.top >= 0.0
    }
}

#[must_use]
pub fn panel_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(PANEL_DIR_NAME).join(PANEL_FILE))
}

pub async fn load() -> Option<PanelPosition> {
    load_from(&panel_path()?).await
}

pub async fn save(position: PanelPosition) -> anyhow::Result<PathBuf> {
    let path = panel_path().ok_or_else(|| anyhow::anyhow!("no user config directory"))?;
    save_to(&path, position).await?;
    Ok(path)
}

pub async fn load_from(path: &Path) -> Option<PanelPosition> {
    let content = tokio::fs::read_to_string(path).await.ok()?;
    let position = serde_json::from_str::<PanelPosition>(&content).ok()?;
    position.is_valid().then_some(position)
}

pub async fn save_to(path: &Path, position: PanelPosition) -> anyhow::Result<()> {
    if !position.is_valid() {
        anyhow::bail!("panel position must be finite and non-negative");
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_vec(&position)?;
    tokio::fs::write(path, content).await?;
    tracing::debug!(left = position.left, top = position.top, "saved panel position");
    Ok(())
}
