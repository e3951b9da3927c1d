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

use super::{Document, NodeId};
use std::collections::HashMap;

/// Layout box in document coordinates, before any scrolling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct LayoutBox {
    pub top: f64,
    pub height: f64,
    pub width: f64,
    /// Height the content would take without box constraints.
    pub natural_height: f64,
}

#[derive(Debug, Default)]
pub(super) struct LayoutMap {
    boxes: HashMap<NodeId, LayoutBox>,
}

impl LayoutMap {
    pub fn get(&self, id: NodeId) -> Option<&LayoutBox> {
        self.boxes.get(&id)
    }
}

/// Block-flow layout of the whole document: each element stacks its own
/// intrinsic height, then its shadow tree, then its light children.
pub(super) fn compute(doc: &Document) -> LayoutMap {
    let mut map = LayoutMap::default();
    layout_node(doc, doc.root, 0.0, doc.viewport.width, false, &mut map);
    map
}

fn layout_node(
    doc: &Document,
    id: NodeId,
    top: f64,
    available_width: f64,
    inside_hidden: bool,
    map: &mut LayoutMap,
) -> f64 {
    let Some(node) = doc.node(id) else {
        return 0.0;
    };
    let hidden = inside_hidden || node.hidden;
    let width = node.width.unwrap_or(available_width);

    let mut cursor = top + if hidden { 0.0 } else { node.intrinsic_height };
    for child in node.shadow_root.iter().chain(node.children.iter()) {
        cursor += layout_node(doc, *child, cursor, width, hidden, map);
    }
    let natural_height = cursor - top;

    let height = if hidden {
        0.0
    } else {
        node.style.height.or(node.client_height).unwrap_or(natural_height)
    };
    map.boxes.insert(id, LayoutBox { top, height, width, natural_height });
    height
}
