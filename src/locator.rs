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

//! Finding the element that scrolls the transcript.
//!
//! The host markup is not ours, so this is an ordered fallback chain:
//! the configured primary selector when it actually scrolls, then the first
//! `div`/`main` in document order that both declares scrolling overflow and
//! overflows its box. Nothing qualifying means "no container", and the
//! booster runs against the viewport instead.

use crate::deep_query::{deep_filter, deep_query};
use crate::dom::{Document, NodeId, Selector};

/// How a container was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerSource {
    PrimarySelector,
    OverflowScan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerMatch {
    pub id: NodeId,
    pub source: ContainerSource,
}

/// Run the fallback chain once.
#[must_use]
pub fn find_container(doc: &Document, primary: &Selector) -> Option<ContainerMatch> {
    let root = Some(doc.root());
    if let Some(id) =
        deep_query(doc, root, primary).into_iter().find(|id| doc.overflow_y(*id).scrolls())
    {
        return Some(ContainerMatch { id, source: ContainerSource::PrimarySelector });
    }

    deep_filter(doc, root, |id| matches!(doc.tag(id), Some("div" | "main")))
        .into_iter()
        .find(|id| {
            doc.overflow_y(*id).scrolls() && doc.scroll_height(*id) > doc.client_height(*id)
        })
        .map(|id| ContainerMatch { id, source: ContainerSource::OverflowScan })
}

/// Result of one [`ContainerSlot::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerChange {
    Unchanged,
    Acquired(NodeId),
    Replaced { old: NodeId, new: NodeId },
    Lost(NodeId),
}

/// The one "current" container.
#[derive(Debug, Default)]
pub struct ContainerSlot {
    current: Option<NodeId>,
}

impl ContainerSlot {
    #[must_use]
    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    /// Current container if it is still attached to the page.
    #[must_use]
    pub fn live(&self, doc: &Document) -> Option<NodeId> {
        self.current.filter(|c| doc.is_connected(*c))
    }

    /// Fold a fresh search result into the slot.
    ///
    /// A different non-null candidate replaces the current container. A null
    /// candidate never evicts a container that is still attached; it only
    /// clears one that the page has detached.
    pub fn refresh(&mut self, doc: &Document, candidate: Option<NodeId>) -> ContainerChange {
        match (self.current, candidate) {
            (None, Some(new)) => {
                self.current = Some(new);
                ContainerChange::Acquired(new)
            }
            (Some(old), Some(new)) if old != new => {
                self.current = Some(new);
                ContainerChange::Replaced { old, new }
            }
            (Some(old), None) if !doc.is_connected(old) => {
                self.current = None;
                ContainerChange::Lost(old)
            }
            _ => ContainerChange::Unchanged,
        }
    }
}
