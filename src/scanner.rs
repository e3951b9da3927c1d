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

//! Periodic re-discovery of the container, content blocks and section headers.
//!
//! The scanner is the only writer of the tracked sets. Every cycle finds the
//! same elements again, so registration checks presence first; a block is
//! handed to the classifier exactly once for as long as it lives. Ids of
//! removed elements stay in the sets. They never alias a new element, so the
//! staleness is harmless and is not cleaned.

use crate::collapse::AutoCollapseClassifier;
use crate::config::Selectors;
use crate::deep_query::deep_query;
use crate::discovery::{Confidence, discover_blocks};
use crate::dom::{Document, NodeId};
use crate::locator::{ContainerChange, ContainerSlot, find_container};
use crate::virtualize::VisibilityClassifier;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    pub container: ContainerChange,
    pub confidence: Confidence,
    pub new_blocks: usize,
    pub new_headers: usize,
}

#[derive(Debug, Default)]
pub struct DiscoveryScanner {
    container: ContainerSlot,
    tracked_blocks: HashSet<NodeId>,
    tracked_headers: HashSet<NodeId>,
}

impl DiscoveryScanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn container(&self, doc: &Document) -> Option<NodeId> {
        self.container.live(doc)
    }

    #[must_use]
    pub fn is_tracked(&self, block: NodeId) -> bool {
        self.tracked_blocks.contains(&block)
    }

    #[must_use]
    pub fn tracked_blocks(&self) -> usize {
        self.tracked_blocks.len()
    }

    #[must_use]
    pub fn tracked_headers(&self) -> usize {
        self.tracked_headers.len()
    }

    /// One scan cycle. Headers are only looked for when `collapse` is given.
    pub fn scan(
        &mut self,
        doc: &Document,
        selectors: &Selectors,
        visibility: &mut VisibilityClassifier,
        mut collapse: Option<&mut AutoCollapseClassifier>,
    ) -> ScanReport {
        let candidate = find_container(doc, &selectors.container).map(|found| found.id);
        let change = self.container.refresh(doc, candidate);
        match change {
            ContainerChange::Unchanged => {}
            ContainerChange::Acquired(id) | ContainerChange::Replaced { new: id, .. } => {
                tracing::info!(?change, "transcript container changed");
                visibility.set_root(Some(id));
                if let Some(collapse) = collapse.as_deref_mut() {
                    collapse.set_root(Some(id));
                }
            }
            ContainerChange::Lost(_) => {
                tracing::info!("transcript container detached; observing the viewport");
                visibility.set_root(None);
                if let Some(collapse) = collapse.as_deref_mut() {
                    collapse.set_root(None);
                }
            }
        }

        let container = self.container.live(doc);
        let discovery = discover_blocks(doc, container, selectors);
        let mut new_blocks = 0;
        for block in discovery.blocks {
            if self.tracked_blocks.insert(block) {
                visibility.register(block);
                new_blocks += 1;
            }
        }

        let mut new_headers = 0;
        if let Some(collapse) = collapse {
            let root = container.unwrap_or_else(|| doc.body());
            for header in deep_query(doc, Some(root), &selectors.headers) {
                if self.tracked_headers.insert(header) {
                    collapse.register(header);
                    new_headers += 1;
                }
            }
        }

        if new_blocks > 0 || new_headers > 0 {
            tracing::debug!(
                new_blocks,
                new_headers,
                confidence = ?discovery.confidence,
                tracked = self.tracked_blocks.len(),
                "registered newly discovered elements"
            );
        }
        if discovery.confidence == Confidence::None {
            tracing::trace!("no content blocks this cycle");
        }

        ScanReport { container: change, confidence: discovery.confidence, new_blocks, new_headers }
    }
}
