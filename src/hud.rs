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

//! On-page status display.

use crate::capture::CaptureStatus;
use crate::dom::{Document, NodeId};
use crate::markup::{MarkupPolicy, write_content};
use crate::panel::PanelPosition;
use crate::style::{HUD_CLASS, STYLESHEET};
use std::fmt;

const ACTIVE_CLASS: &str = "active";
const STYLE_ID: &str = "boost-style";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HudStatus {
    /// Recomputed from the page, never larger than `total`.
    pub frozen: usize,
    pub total: usize,
    pub capture: CaptureStatus,
}

impl HudStatus {
    /// Highlighted only while something is frozen.
    #[must_use]
    pub fn active(&self) -> bool {
        self.frozen > 0
    }
}

impl fmt::Display for HudStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Booster: {} / {} ❄️ | {}", self.frozen, self.total, self.capture)
    }
}

#[derive(Debug)]
pub struct Hud {
    element: NodeId,
    position: Option<PanelPosition>,
}

impl Hud {
    /// Inject the stylesheet (once) and create the status element.
    pub fn install(doc: &mut Document, position: Option<PanelPosition>) -> Self {
        inject_stylesheet(doc);
        let element = create_element(doc, position);
        Self { element, position }
    }

    #[must_use]
    pub fn element(&self) -> NodeId {
        self.element
    }

    /// Write the status. Recreates the element if the page dropped it.
    pub fn render(&mut self, doc: &mut Document, policy: Option<&MarkupPolicy>, status: &HudStatus) {
        if !doc.is_connected(self.element) {
            tracing::debug!("status element was removed by the page; recreating");
            inject_stylesheet(doc);
            self.element = create_element(doc, self.position);
        }
        write_content(doc, self.element, policy, "boost-hud-text", &status.to_string());
        if status.active() {
            doc.add_class(self.element, ACTIVE_CLASS);
        } else {
            doc.remove_class(self.element, ACTIVE_CLASS);
        }
    }
}

fn inject_stylesheet(doc: &mut Document) {
    let head = doc.head();
    let present = doc.element_children(head).any(|id| doc.attribute(id, "id") == Some(STYLE_ID));
    if present {
        return;
    }
    let style = doc.create_element("style");
    doc.set_attribute(style, "id", STYLE_ID);
    doc.set_text(style, STYLESHEET);
    doc.append_child(head, style);
}

fn create_element(doc: &mut Document, position: Option<PanelPosition>) -> NodeId {
    let element = doc.create_element("div");
    doc.add_class(element, HUD_CLASS);
    if let Some(PanelPosition { left, top }) = position {
        doc.set_attribute(element, "style", &format!("left: {left}px; top: {top}px; right: auto"));
    }
    doc.append_child(doc.body(), element);
    element
}
