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

//! JSON page descriptions used by the CLI and the tests.

use super::{Document, NodeId, Overflow};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportSpec {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub scroll_y: f64,
}

impl Default for ViewportSpec {
    fn default() -> Self {
        Self { width: 1280.0, height: 900.0, scroll_y: 0.0 }
    }
}

/// One element, its children and (optionally) its shadow tree.
///
/// `repeat` expands the element N times; `{n}` in `text` or attribute
/// values is replaced with the 1-based copy number.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementSpec {
    pub tag: String,
    pub id: Option<String>,
    pub class: Option<String>,
    pub attrs: BTreeMap<String, String>,
    pub text: Option<String>,
    pub height: Option<f64>,
    pub width: Option<f64>,
    pub client_height: Option<f64>,
    pub overflow_y: Overflow,
    pub scroll_top: f64,
    pub hidden: bool,
    pub children: Vec<ElementSpec>,
    pub shadow: Option<Vec<ElementSpec>>,
    pub repeat: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFixture {
    #[serde(default)]
    pub viewport: ViewportSpec,
    /// Children of `<body>`.
    #[serde(default)]
    pub body: Vec<ElementSpec>,
}

impl PageFixture {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn build(&self) -> Document {
        let mut doc = Document::new(self.viewport.width, self.viewport.height);
        let body = doc.body();
        for spec in &self.body {
            doc.build_spec(body, spec, 1);
        }
        doc.relayout();
        let scroll_tops = std::mem::take(&mut doc.pending_scroll);
        for (id, top) in scroll_tops {
            doc.set_scroll_top(id, top);
        }
        doc.scroll_window_to(self.viewport.scroll_y);
        doc
    }
}

impl Document {
    /// Append the elements described by `spec` under `parent`; returns the
    /// created top-level ids (several when `repeat` is set).
    pub fn append_spec(&mut self, parent: NodeId, spec: &ElementSpec) -> Vec<NodeId> {
        let created = self.build_spec(parent, spec, 1);
        self.relayout();
        let scroll_tops = std::mem::take(&mut self.pending_scroll);
        for (id, top) in scroll_tops {
            self.set_scroll_top(id, top);
        }
        created
    }

    fn build_spec(&mut self, parent: NodeId, spec: &ElementSpec, ordinal: usize) -> Vec<NodeId> {
        let copies = spec.repeat.unwrap_or(1);
        (0..copies)
            .map(|copy| {
                let n = if spec.repeat.is_some() { copy + 1 } else { ordinal };
                self.build_one(parent, spec, n)
            })
            .collect()
    }

    fn build_one(&mut self, parent: NodeId, spec: &ElementSpec, n: usize) -> NodeId {
        let expand = |value: &str| value.replace("{n}", &n.to_string());
        let id = self.create_element(if spec.tag.is_empty() { "div" } else { spec.tag.as_str() });
        if let Some(element_id) = &spec.id {
            self.set_attribute(id, "id", &expand(element_id));
        }
        for class in spec.class.iter().flat_map(|c| c.split_whitespace()) {
            self.add_class(id, class);
        }
        for (name, value) in &spec.attrs {
            self.set_attribute(id, name, &expand(value));
        }
        if let Some(text) = &spec.text {
            self.set_text(id, &expand(text));
        }
        if let Some(node) = self.node_mut(id) {
            node.intrinsic_height = spec.height.unwrap_or(0.0);
            node.width = spec.width;
            node.client_height = spec.client_height;
            node.overflow_y = spec.overflow_y;
            node.hidden = spec.hidden;
        }
        if spec.scroll_top > 0.0 {
            self.pending_scroll.push((id, spec.scroll_top));
        }
        self.link(parent, id);

        if let Some(shadow_children) = &spec.shadow
            && let Some(shadow) = self.attach_shadow_raw(id)
        {
            for child in shadow_children {
                self.build_spec(shadow, child, n);
            }
        }
        for child in &spec.children {
            self.build_spec(id, child, n);
        }
        id
    }
}
