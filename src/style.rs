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

//! Class names and the stylesheet that make up the render-suppression contract.

/// Marks a content block as render-suppressed (frozen).
pub const FROZEN_CLASS: &str = "boost-frozen";

/// Set on `<body>` while exporting; lifts every suppression below it.
pub const EXPORTING_CLASS: &str = "boost-exporting";

/// Class of the status element.
pub const HUD_CLASS: &str = "boost-hud";

/// Injected once into `<head>`.
pub const STYLESHEET: &str = "\
.boost-frozen {
    content-visibility: hidden !important;
    contain: size layout style !important;
}
.boost-exporting .boost-frozen {
    content-visibility: visible !important;
    contain: none !important;
}
.boost-hud {
    position: fixed; top: 10px; right: 10px; z-index: 9999;
    background: rgba(0,0,0,0.7); color: #aaa; font-family: monospace;
    padding: 4px 8px; border-radius: 4px; font-size: 11px;
    pointer-events: none; user-select: none;
}
.boost-hud.active { color: #4caf50; border: 1px solid #4caf50; }
";

/// Format a placeholder size the way the inline style carries it.
#[must_use]
pub fn intrinsic_size_value(width: f64, height: f64) -> String {
    format!("{width}px {height}px")
}
