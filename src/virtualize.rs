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

//! Freeze/thaw state machine for content blocks.
//!
//! Every registered block starts `Visible`. When the observer reports it
//! outside the viewport (plus margin) and it is taller than the freeze floor,
//! its current box is written back as explicit placeholder sizing and the
//! frozen class suppresses rendering of its contents. Re-entering the margin
//! clears the sizing and the class, so content that changed while frozen
//! lays out naturally again.

use crate::deep_query::deep_query;
use crate::dom::{Document, InlineStyle, NodeId, Rect, Selector};
use crate::intersection::{IntersectionEntry, IntersectionObserver};
use crate::style::{FROZEN_CLASS, intrinsic_size_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Visible,
    Frozen,
}

/// What one batch of intersection reports changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub frozen: usize,
    pub thawed: usize,
    /// Off-screen reports ignored because the block was too short.
    pub below_floor: usize,
}

#[derive(Debug)]
pub struct VisibilityClassifier {
    observer: IntersectionObserver,
    min_item_height: f64,
    /// Incremented on freeze, decremented on thaw. A cache only; see
    /// [`VisibilityClassifier::frozen_count`].
    frozen_counter: usize,
}

impl VisibilityClassifier {
    #[must_use]
    pub fn new(root: Option<NodeId>, margin: f64, min_item_height: f64) -> Self {
        Self { observer: IntersectionObserver::new(root, margin), min_item_height, frozen_counter: 0 }
    }

    /// Start observing a block. Callers guarantee each block is registered
    /// once; the observer also ignores repeats.
    pub fn register(&mut self, block: NodeId) {
        self.observer.observe(block);
    }

    #[must_use]
    pub fn observed(&self) -> usize {
        self.observer.len()
    }

    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.observer.root()
    }

    pub fn set_root(&mut self, root: Option<NodeId>) {
        self.observer.set_root(root);
    }

    /// Pull pending reports from the observer and apply them.
    pub fn process(&mut self, doc: &mut Document) -> BatchOutcome {
        let entries = self.observer.take_records(doc);
        self.apply(doc, &entries)
    }

    /// Apply a batch of reports in delivery order.
    pub fn apply(&mut self, doc: &mut Document, entries: &[IntersectionEntry]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for entry in entries {
            if entry.is_intersecting {
                if self.thaw(doc, entry.target) {
                    outcome.thawed += 1;
                }
            } else if entry.bounding_rect.height > self.min_item_height {
                if self.freeze(doc, entry.target, entry.bounding_rect) {
                    outcome.frozen += 1;
                }
            } else {
                outcome.below_floor += 1;
            }
        }
        if outcome != BatchOutcome::default() {
            tracing::debug!(
                frozen = outcome.frozen,
                thawed = outcome.thawed,
                below_floor = outcome.below_floor,
                "applied intersection batch"
            );
        }
        outcome
    }

    fn freeze(&mut self, doc: &mut Document, block: NodeId, rect: Rect) -> bool {
        if doc.has_class(block, FROZEN_CLASS) {
            return false;
        }
        doc.set_contain_intrinsic_size(block, Some((rect.width, rect.height)));
        doc.set_style_height(block, Some(rect.height));
        doc.add_class(block, FROZEN_CLASS);
        self.frozen_counter += 1;
        tracing::trace!(size = %intrinsic_size_value(rect.width, rect.height), "froze block");
        true
    }

    /// Placeholder sizing is cleared even when the page already stripped the
    /// frozen class; only a real class removal counts as a thaw.
    fn thaw(&mut self, doc: &mut Document, block: NodeId) -> bool {
        if doc.style(block).is_some_and(|style| *style != InlineStyle::default()) {
            doc.set_contain_intrinsic_size(block, None);
            doc.set_style_height(block, None);
        }
        if !doc.has_class(block, FROZEN_CLASS) {
            return false;
        }
        doc.remove_class(block, FROZEN_CLASS);
        self.frozen_counter = self.frozen_counter.saturating_sub(1);
        true
    }

    #[must_use]
    pub fn state(doc: &Document, block: NodeId) -> BlockState {
        if doc.has_class(block, FROZEN_CLASS) { BlockState::Frozen } else { BlockState::Visible }
    }

    /// Incremental counter. May drift if the page strips the class itself.
    #[must_use]
    pub fn cached_frozen(&self) -> usize {
        self.frozen_counter
    }

    /// Authoritative frozen count: a fresh deep query for the frozen class,
    /// clamped to the number of tracked blocks. Also resynchronises the
    /// cached counter.
    pub fn frozen_count(&mut self, doc: &Document, frozen: &Selector, tracked: usize) -> usize {
        let count = deep_query(doc, Some(doc.root()), frozen).len().min(tracked);
        if count != self.frozen_counter {
            tracing::debug!(cached = self.frozen_counter, actual = count, "frozen counter drift");
            self.frozen_counter = count;
        }
        count
    }
}
