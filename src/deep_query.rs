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

//! Queries that cross shadow-root boundaries.

use crate::dom::{Document, NodeId, Selector};

/// Every element under `root` matching `selector`, including elements only
/// reachable through shadow roots, at any nesting depth.
///
/// Order: `root`'s own shadow tree first, then the light-tree matches, then
/// the shadow trees of light-tree descendants in document order. A missing
/// `root` yields nothing.
#[must_use]
pub fn deep_query(doc: &Document, root: Option<NodeId>, selector: &Selector) -> Vec<NodeId> {
    deep_filter(doc, root, |n| selector.matches(doc, n))
}

/// Deep traversal with an arbitrary element predicate, same order as
/// [`deep_query`].
pub fn deep_filter(
    doc: &Document,
    root: Option<NodeId>,
    predicate: impl Fn(NodeId) -> bool,
) -> Vec<NodeId> {
    let mut out = Vec::new();
    if let Some(root) = root.filter(|r| doc.contains(*r)) {
        collect(doc, root, &predicate, &mut out);
    }
    out
}

fn collect(
    doc: &Document,
    root: NodeId,
    predicate: &impl Fn(NodeId) -> bool,
    out: &mut Vec<NodeId>,
) {
    if let Some(shadow) = doc.shadow_root(root) {
        collect(doc, shadow, predicate, out);
    }
    let descendants = doc.descendants(root);
    out.extend(descendants.iter().copied().filter(|n| doc.is_element(*n) && predicate(*n)));
    for node in descendants {
        if let Some(shadow) = doc.shadow_root(node) {
            collect(doc, shadow, predicate, out);
        }
    }
}

/// First deep match, if any.
#[must_use]
pub fn deep_query_first(doc: &Document, root: Option<NodeId>, selector: &Selector) -> Option<NodeId> {
    deep_query(doc, root, selector).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_root_returns_empty() {
        let doc = Document::new(800.0, 600.0);
        let selector = Selector::parse("div").unwrap();
        assert!(deep_query(&doc, None, &selector).is_empty());
    }

    #[test]
    fn finds_matches_in_root_own_shadow() {
        let mut doc = Document::new(800.0, 600.0);
        let host = doc.create_element("chat-app");
        doc.append_child(doc.body(), host);
        let shadow = doc.attach_shadow(host).unwrap();
        let turn = doc.create_element("ms-chat-turn");
        doc.append_child(shadow, turn);
        let selector = Selector::parse("ms-chat-turn").unwrap();
        assert_eq!(deep_query(&doc, Some(host), &selector), vec![turn]);
    }

    #[test]
    fn light_matches_precede_shadow_matches() {
        let mut doc = Document::new(800.0, 600.0);
        let host = doc.create_element("section");
        let light = doc.create_element("p");
        doc.append_child(doc.body(), host);
        doc.append_child(doc.body(), light);
        let shadow = doc.attach_shadow(host).unwrap();
        let hidden = doc.create_element("p");
        doc.append_child(shadow, hidden);
        let selector = Selector::parse("p").unwrap();
        assert_eq!(deep_query(&doc, Some(doc.body()), &selector), vec![light, hidden]);
    }
}
