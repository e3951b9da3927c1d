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

//! Deferred folding of tall, off-screen expandable sections.
//!
//! Headers are observed with a much wider margin than content blocks. Leaving
//! that margin arms a timer when the section is expanded and taller than the
//! fold threshold; coming back before it fires disarms it. When a timer fires
//! the conditions are checked again and the page's own toggle is clicked once.

use crate::dom::{Document, NodeId};
use crate::intersection::{IntersectionEntry, IntersectionObserver};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollapseOutcome {
    pub armed: usize,
    pub cancelled: usize,
    pub exempt: usize,
}

#[derive(Debug)]
pub struct AutoCollapseClassifier {
    observer: IntersectionObserver,
    fold_height_threshold: f64,
    delay: Duration,
    /// Header -> deadline. Present only while the header is off-screen,
    /// expanded, and tall enough.
    pending: HashMap<NodeId, Instant>,
}

/// Whether the page currently shows the header's section expanded.
#[must_use]
pub fn is_expanded(doc: &Document, header: NodeId) -> bool {
    doc.attribute(header, "aria-expanded") == Some("true")
}

/// Rendered height of the region the header controls.
#[must_use]
pub fn section_height(doc: &Document, header: NodeId) -> f64 {
    doc.controlled_region(header).map_or(0.0, |region| doc.client_height(region))
}

impl AutoCollapseClassifier {
    #[must_use]
    pub fn new(root: Option<NodeId>, margin: f64, fold_height_threshold: f64, delay: Duration) -> Self {
        Self {
            observer: IntersectionObserver::new(root, margin),
            fold_height_threshold,
            delay,
            pending: HashMap::new(),
        }
    }

    pub fn register(&mut self, header: NodeId) {
        self.observer.observe(header);
    }

    #[must_use]
    pub fn observed(&self) -> usize {
        self.observer.len()
    }

    pub fn set_root(&mut self, root: Option<NodeId>) {
        self.observer.set_root(root);
    }

    #[must_use]
    pub fn is_pending(&self, header: NodeId) -> bool {
        self.pending.contains_key(&header)
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Earliest armed deadline, for the event loop's timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    fn eligible(&self, doc: &Document, header: NodeId) -> bool {
        is_expanded(doc, header) && section_height(doc, header) > self.fold_height_threshold
    }

    pub fn process(&mut self, doc: &Document, now: Instant) -> CollapseOutcome {
        let entries = self.observer.take_records(doc);
        self.apply(doc, &entries, now)
    }

    pub fn apply(&mut self, doc: &Document, entries: &[IntersectionEntry], now: Instant) -> CollapseOutcome {
        let mut outcome = CollapseOutcome::default();
        for entry in entries {
            if entry.is_intersecting {
                if self.pending.remove(&entry.target).is_some() {
                    outcome.cancelled += 1;
                }
            } else if self.eligible(doc, entry.target) {
                // A repeated report (e.g. after re-rooting) keeps the original deadline.
                if let Entry::Vacant(slot) = self.pending.entry(entry.target) {
                    slot.insert(now + self.delay);
                    outcome.armed += 1;
                }
            } else {
                outcome.exempt += 1;
            }
        }
        outcome
    }

    /// Fire every timer due at `now`. Returns the headers that were collapsed.
    pub fn fire_due(&mut self, doc: &mut Document, now: Instant) -> Vec<NodeId> {
        let due: Vec<NodeId> =
            self.pending.iter().filter(|(_, at)| **at <= now).map(|(id, _)| *id).collect();
        let mut collapsed = Vec::new();
        for header in due {
            self.pending.remove(&header);
            if !doc.is_connected(header) || !self.eligible(doc, header) {
                tracing::trace!("collapse timer fired for a header that no longer qualifies");
                continue;
            }
            doc.click(header);
            collapsed.push(header);
        }
        if !collapsed.is_empty() {
            tracing::debug!(count = collapsed.len(), "auto-collapsed sections");
        }
        collapsed
    }
}
