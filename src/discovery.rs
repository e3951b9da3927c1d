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

//! Content-block discovery shared by the scanner and the exporter.
//!
//! Both callers must see the same blocks, so there is exactly one entry
//! point, [`discover_blocks`]. It tries the precise block selector first and
//! falls back to the "largest sibling group" heuristic, reporting which tier
//! produced the result.

use crate::config::Selectors;
use crate::deep_query::deep_query;
use crate::dom::{Document, NodeId};
use std::collections::HashSet;

/// Minimum number of block-like children for the heuristic to accept a group.
const MIN_GROUP_SIZE: usize = 3;

/// The heuristic walk does not enter nodes with this many children.
const MAX_DESCEND_CHILDREN: usize = 50;

/// How much to trust a discovery result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// The configured block selector matched.
    Precise,
    /// Children of the `div` with the most block-like children.
    Heuristic,
    /// Nothing found this time.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub blocks: Vec<NodeId>,
    pub confidence: Confidence,
    /// Parent of the heuristic group, when that tier was used.
    pub group_parent: Option<NodeId>,
}

/// Discover content blocks under `container`, or under `<body>` when there is
/// no container. Non-content tags and anything inside code are filtered out.
#[must_use]
pub fn discover_blocks(doc: &Document, container: Option<NodeId>, selectors: &Selectors) -> Discovery {
    let root = container.filter(|c| doc.is_connected(*c)).unwrap_or_else(|| doc.body());

    let precise = outermost(doc, deep_query(doc, Some(root), &selectors.blocks));
    if !precise.is_empty() {
        return Discovery { blocks: precise, confidence: Confidence::Precise, group_parent: None };
    }

    if let Some(parent) = largest_sibling_group(doc, root) {
        let blocks: Vec<NodeId> =
            doc.element_children(parent).filter(|id| is_block_candidate(doc, *id)).collect();
        if !blocks.is_empty() {
            return Discovery {
                blocks,
                confidence: Confidence::Heuristic,
                group_parent: Some(parent),
            };
        }
    }

    Discovery { blocks: Vec::new(), confidence: Confidence::None, group_parent: None }
}

/// Keep candidates with no composed-tree ancestor among the other matches,
/// so a turn wrapper and its inner container count as one block.
fn outermost(doc: &Document, matches: Vec<NodeId>) -> Vec<NodeId> {
    let candidates: Vec<NodeId> = matches.into_iter().filter(|id| is_block_candidate(doc, *id)).collect();
    let set: HashSet<NodeId> = candidates.iter().copied().collect();
    candidates
        .into_iter()
        .filter(|id| !doc.ancestors_composed(*id).any(|a| set.contains(&a)))
        .collect()
}

/// The `div` under `root` with the most block-like element children, skipping
/// anything code-related. Ties go to the first in traversal order. Nodes with
/// [`MAX_DESCEND_CHILDREN`] or more children are scored but not descended.
#[must_use]
pub fn largest_sibling_group(doc: &Document, root: NodeId) -> Option<NodeId> {
    let mut best: Option<(NodeId, usize)> = None;
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let children: Vec<NodeId> = doc.element_children(node).collect();
        if node != root
            && doc.tag(node) == Some("div")
            && !is_code_related(doc, node)
            && !is_within_code(doc, node)
        {
            let count = children.iter().filter(|c| is_block_like(doc, **c)).count();
            if count >= MIN_GROUP_SIZE && best.is_none_or(|(_, max)| count > max) {
                best = Some((node, count));
            }
        }
        if children.len() < MAX_DESCEND_CHILDREN {
            stack.extend(children.into_iter().rev());
        }
        stack.extend(doc.shadow_root(node));
    }
    best.map(|(id, _)| id)
}

/// Scanner/exporter filter: real content, not inside a code block.
#[must_use]
pub fn is_block_candidate(doc: &Document, id: NodeId) -> bool {
    !matches!(doc.tag(id), None | Some("script" | "style" | "link")) && !is_within_code(doc, id)
}

fn is_block_like(doc: &Document, id: NodeId) -> bool {
    !matches!(doc.tag(id), None | Some("script" | "style" | "span" | "link"))
}

/// Tag names that mark code content.
#[must_use]
pub fn is_code_tag(tag: &str) -> bool {
    tag == "pre" || tag.contains("code")
}

fn is_code_related(doc: &Document, id: NodeId) -> bool {
    doc.tag(id).is_some_and(is_code_tag)
        || doc.classes(id).iter().any(|c| c.contains("code"))
}

/// Whether any composed-tree ancestor is a code or pre element.
#[must_use]
pub fn is_within_code(doc: &Document, id: NodeId) -> bool {
    doc.ancestors_composed(id).any(|a| doc.tag(a).is_some_and(is_code_tag))
}
