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

//! Viewport intersection reporting, modelled on the browser's observer.
//!
//! An observer has a root (the viewport, or a scroll container), a symmetric
//! vertical margin, and threshold zero. Reports are batched and
//! change-driven: `take_records` yields one entry per target whose state
//! changed since it was last reported. A freshly observed target always gets
//! an initial report.

use crate::dom::{Document, NodeId, Rect};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: NodeId,
    pub is_intersecting: bool,
    pub bounding_rect: Rect,
}

#[derive(Debug)]
struct Target {
    id: NodeId,
    last: Option<bool>,
}

#[derive(Debug)]
pub struct IntersectionObserver {
    root: Option<NodeId>,
    margin: f64,
    targets: Vec<Target>,
}

impl IntersectionObserver {
    #[must_use]
    pub fn new(root: Option<NodeId>, margin: f64) -> Self {
        Self { root, margin, targets: Vec::new() }
    }

    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Switch to a new root. Every target is reported afresh.
    pub fn set_root(&mut self, root: Option<NodeId>) {
        if self.root == root {
            return;
        }
        self.root = root;
        for target in &mut self.targets {
            target.last = None;
        }
    }

    /// Start observing `id`. Observing the same target twice is a no-op.
    pub fn observe(&mut self, id: NodeId) {
        if !self.targets.iter().any(|t| t.id == id) {
            self.targets.push(Target { id, last: None });
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// The region targets are tested against, in viewport coordinates,
    /// already expanded by the margin.
    #[must_use]
    pub fn root_bounds(&self, doc: &Document) -> (f64, f64) {
        let (top, bottom) = match self.root.filter(|r| doc.is_connected(*r)) {
            Some(root) => {
                let rect = doc.bounding_rect(root);
                (rect.top, rect.top + doc.client_height(root))
            }
            None => (0.0, doc.viewport().height),
        };
        (top - self.margin, bottom + self.margin)
    }

    /// Collect pending reports in observation order. Targets that no longer
    /// exist in the page are dropped without a report.
    pub fn take_records(&mut self, doc: &Document) -> Vec<IntersectionEntry> {
        self.targets.retain(|t| doc.contains(t.id));
        let (top, bottom) = self.root_bounds(doc);
        let mut entries = Vec::new();
        for target in &mut self.targets {
            let connected = doc.is_connected(target.id);
            let rect = doc.bounding_rect(target.id);
            let is_intersecting = connected && rect.bottom() >= top && rect.top <= bottom;
            if target.last != Some(is_intersecting) {
                target.last = Some(is_intersecting);
                entries.push(IntersectionEntry {
                    target: target.id,
                    is_intersecting,
                    bounding_rect: rect,
                });
            }
        }
        entries
    }
}
