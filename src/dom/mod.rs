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

//! In-memory model of the host page.
//!
//! The booster never owns the page it runs on. Everything it needs from the
//! page goes through [`Document`]: tree walks, computed geometry, class and
//! inline-style writes, and the host's own toggle behaviour. Elements are
//! addressed by [`NodeId`], a generational arena key, so the booster can
//! remember an element without keeping it alive; once the page removes an
//! element its id stops resolving and never aliases a newer element.

mod fixture;
mod layout;
mod selector;

pub use fixture::{ElementSpec, PageFixture, ViewportSpec};
pub use selector::{Selector, SelectorError};

use crate::markup::TrustedHtml;
use crate::style::{EXPORTING_CLASS, FROZEN_CLASS};
use layout::LayoutMap;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Identity of one node in a [`Document`]. Copyable and non-owning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Computed `overflow-y` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Auto,
    Scroll,
}

impl Overflow {
    #[must_use]
    pub fn scrolls(self) -> bool {
        matches!(self, Self::Auto | Self::Scroll)
    }
}

/// Vertical box in viewport coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f64,
    pub height: f64,
    pub width: f64,
}

impl Rect {
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Inline style properties the booster writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineStyle {
    pub height: Option<f64>,
    pub contain_intrinsic_size: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Element(String),
    ShadowRoot,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    shadow_root: Option<NodeId>,
    /// Set on shadow roots only.
    host: Option<NodeId>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: String,
    inner_html: Option<String>,
    intrinsic_height: f64,
    width: Option<f64>,
    client_height: Option<f64>,
    overflow_y: Overflow,
    scroll_top: f64,
    hidden: bool,
    style: InlineStyle,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            shadow_root: None,
            host: None,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            text: String::new(),
            inner_html: None,
            intrinsic_height: 0.0,
            width: None,
            client_height: None,
            overflow_y: Overflow::Visible,
            scroll_top: 0.0,
            hidden: false,
            style: InlineStyle::default(),
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Rejection raised when the page refuses a markup policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("policy `{0}` already exists")]
    Duplicate(String),
    #[error("policy `{0}` is not in the page's allow-list")]
    NotAllowed(String),
}

#[derive(Debug)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    viewport: Viewport,
    layout: LayoutMap,
    policies: Vec<String>,
    policy_allow_list: Option<Vec<String>>,
    /// Scroll offsets requested while building from a fixture, applied
    /// once layout is known.
    pending_scroll: Vec<(NodeId, f64)>,
}

impl Document {
    #[must_use]
    pub fn new(viewport_width: f64, viewport_height: f64) -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId { index: 0, generation: 0 },
            head: NodeId { index: 0, generation: 0 },
            body: NodeId { index: 0, generation: 0 },
            viewport: Viewport { width: viewport_width, height: viewport_height, scroll_y: 0.0 },
            layout: LayoutMap::default(),
            policies: Vec::new(),
            policy_allow_list: None,
            pending_scroll: Vec::new(),
        };
        doc.root = doc.alloc(Node::new(NodeKind::Element("html".to_owned())));
        doc.head = doc.create_element("head");
        doc.body = doc.create_element("body");
        doc.link(doc.root, doc.head);
        doc.link(doc.root, doc.body);
        doc.relayout();
        doc
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn head(&self) -> NodeId {
        self.head
    }

    #[must_use]
    pub fn body(&self) -> NodeId {
        self.body
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    // -----------------------------------------------------------------------
    // Arena
    // -----------------------------------------------------------------------

    fn alloc(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId { index, generation: slot.generation };
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot { generation: 0, node: Some(node) });
        NodeId { index, generation: 0 }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Whether `id` still names a live node (attached or not).
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -----------------------------------------------------------------------
    // Tree structure
    // -----------------------------------------------------------------------

    /// Create a detached element. Tag names are stored lower-case.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(Node::new(NodeKind::Element(tag.to_ascii_lowercase())))
    }

    /// Append `child` to `parent`, moving it out of its previous parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.link(parent, child);
        self.relayout();
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        if !self.contains(parent) || !self.contains(child) || parent == child {
            return;
        }
        self.unlink(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
    }

    fn unlink(&mut self, child: NodeId) {
        let Some(old_parent) = self.node(child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(node) = self.node_mut(old_parent) {
            node.children.retain(|c| *c != child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = None;
        }
    }

    /// Attach (or return the existing) shadow root of `host`.
    pub fn attach_shadow(&mut self, host: NodeId) -> Option<NodeId> {
        let shadow = self.attach_shadow_raw(host)?;
        self.relayout();
        Some(shadow)
    }

    fn attach_shadow_raw(&mut self, host: NodeId) -> Option<NodeId> {
        let node = self.node(host)?;
        if let Some(existing) = node.shadow_root {
            return Some(existing);
        }
        if !matches!(node.kind, NodeKind::Element(_)) {
            return None;
        }
        let mut shadow = Node::new(NodeKind::ShadowRoot);
        shadow.host = Some(host);
        let shadow_id = self.alloc(shadow);
        if let Some(node) = self.node_mut(host) {
            node.shadow_root = Some(shadow_id);
        }
        Some(shadow_id)
    }

    /// Remove `id` and its whole subtree (shadow trees included) from the page.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if !self.contains(id) || id == self.root {
            return false;
        }
        self.unlink(id);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(slot) = self.slots.get_mut(current.index as usize) else {
                continue;
            };
            if slot.generation != current.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
                stack.extend(node.shadow_root);
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(current.index);
        }
        self.relayout();
        true
    }

    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Element(tag) => Some(tag.as_str()),
            NodeKind::ShadowRoot => None,
        }
    }

    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag(id).is_some()
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    /// Parent element inside the same tree; `None` at a shadow boundary.
    #[must_use]
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.is_element(*p))
    }

    /// Parent in the composed tree: a shadow root's parent is its host.
    #[must_use]
    pub fn parent_composed(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id)?;
        node.parent.or(node.host)
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |n| n.children.as_slice())
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).iter().copied().filter(|c| self.is_element(*c))
    }

    #[must_use]
    pub fn shadow_root(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.shadow_root
    }

    /// Light-tree descendants of `id` in document order, excluding `id`.
    /// Does not enter shadow roots.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Composed-tree ancestors of `id`, nearest first, excluding `id`.
    pub fn ancestors_composed(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent_composed(id), move |current| {
            self.parent_composed(*current)
        })
    }

    /// Whether `id` is reachable from the document root.
    #[must_use]
    pub fn is_connected(&self, id: NodeId) -> bool {
        if id == self.root {
            return true;
        }
        self.contains(id) && self.ancestors_composed(id).any(|a| a == self.root)
    }

    // -----------------------------------------------------------------------
    // Classes, attributes, text
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.node(id).is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    #[must_use]
    pub fn classes(&self, id: NodeId) -> &[String] {
        self.node(id).map_or(&[], |n| n.classes.as_slice())
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.node_mut(id)
            && !node.classes.iter().any(|c| c == class)
        {
            node.classes.push(class.to_owned());
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.node_mut(id) {
            node.classes.retain(|c| c != class);
        }
    }

    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)?.attributes.get(name).map(String::as_str)
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(node) = self.node_mut(id) {
            node.attributes.insert(name.to_owned(), value.to_owned());
        }
    }

    #[must_use]
    pub fn text(&self, id: NodeId) -> &str {
        self.node(id).map_or("", |n| n.text.as_str())
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let Some(node) = self.node_mut(id) {
            text.clone_into(&mut node.text);
            node.inner_html = None;
        }
    }

    #[must_use]
    pub fn inner_html(&self, id: NodeId) -> Option<&str> {
        self.node(id)?.inner_html.as_deref()
    }

    /// Raw markup write. Only accepts markup that went through the
    /// sanitizing choke point.
    pub fn set_inner_html(&mut self, id: NodeId, html: &TrustedHtml) {
        if let Some(node) = self.node_mut(id) {
            node.inner_html = Some(html.as_str().to_owned());
        }
    }

    /// Rendered text of `id`: own text then shadow and light children,
    /// skipping hidden and render-suppressed subtrees.
    #[must_use]
    pub fn inner_text(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        self.collect_text(id, &mut parts);
        parts.join("\n")
    }

    fn collect_text(&self, id: NodeId, out: &mut Vec<String>) {
        let Some(node) = self.node(id) else {
            return;
        };
        if node.hidden || self.is_render_suppressed(id) {
            return;
        }
        let trimmed = node.text.trim();
        if !trimmed.is_empty() {
            out.push(trimmed.to_owned());
        }
        if let Some(shadow) = node.shadow_root {
            self.collect_text(shadow, out);
        }
        for child in &node.children {
            self.collect_text(*child, out);
        }
    }

    // -----------------------------------------------------------------------
    // Geometry and style
    // -----------------------------------------------------------------------

    fn update_geometry(&mut self, id: NodeId, f: impl FnOnce(&mut Node)) {
        if let Some(node) = self.node_mut(id) {
            f(node);
            self.relayout();
        }
    }

    pub fn set_intrinsic_height(&mut self, id: NodeId, height: f64) {
        self.update_geometry(id, |n| n.intrinsic_height = height);
    }

    pub fn set_client_height(&mut self, id: NodeId, height: Option<f64>) {
        self.update_geometry(id, |n| n.client_height = height);
    }

    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        self.update_geometry(id, |n| n.hidden = hidden);
    }

    #[must_use]
    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.hidden)
    }

    pub fn set_overflow_y(&mut self, id: NodeId, overflow: Overflow) {
        if let Some(node) = self.node_mut(id) {
            node.overflow_y = overflow;
        }
    }

    #[must_use]
    pub fn overflow_y(&self, id: NodeId) -> Overflow {
        self.node(id).map_or(Overflow::Visible, |n| n.overflow_y)
    }

    #[must_use]
    pub fn style(&self, id: NodeId) -> Option<&InlineStyle> {
        self.node(id).map(|n| &n.style)
    }

    pub fn set_style_height(&mut self, id: NodeId, height: Option<f64>) {
        self.update_geometry(id, |n| n.style.height = height);
    }

    pub fn set_contain_intrinsic_size(&mut self, id: NodeId, size: Option<(f64, f64)>) {
        if let Some(node) = self.node_mut(id) {
            node.style.contain_intrinsic_size = size;
        }
    }

    /// Height of the content inside `id`, ignoring its own box constraints.
    #[must_use]
    pub fn scroll_height(&self, id: NodeId) -> f64 {
        self.layout.get(id).map_or(0.0, |b| b.natural_height)
    }

    /// Visible height of `id`'s box.
    #[must_use]
    pub fn client_height(&self, id: NodeId) -> f64 {
        self.layout.get(id).map_or(0.0, |b| b.height)
    }

    #[must_use]
    pub fn scroll_top(&self, id: NodeId) -> f64 {
        self.node(id).map_or(0.0, |n| n.scroll_top)
    }

    /// Scroll `id` to `top`, clamped to its scrollable range.
    pub fn set_scroll_top(&mut self, id: NodeId, top: f64) {
        let max = (self.scroll_height(id) - self.client_height(id)).max(0.0);
        if let Some(node) = self.node_mut(id) {
            node.scroll_top = top.clamp(0.0, max);
        }
    }

    /// Scroll the window, clamped to the document height.
    pub fn scroll_window_to(&mut self, y: f64) {
        let max = (self.client_height(self.root) - self.viewport.height).max(0.0);
        self.viewport.scroll_y = y.clamp(0.0, max);
    }

    /// Viewport-relative bounding box. Detached nodes report an empty box.
    #[must_use]
    pub fn bounding_rect(&self, id: NodeId) -> Rect {
        if !self.is_connected(id) {
            return Rect::default();
        }
        let Some(layout_box) = self.layout.get(id) else {
            return Rect::default();
        };
        let scrolled: f64 = self.ancestors_composed(id).map(|a| self.scroll_top(a)).sum();
        Rect {
            top: layout_box.top - scrolled - self.viewport.scroll_y,
            height: layout_box.height,
            width: layout_box.width,
        }
    }

    /// Whether the frozen class currently suppresses rendering of `id`.
    /// The exporting class on any ancestor lifts the suppression.
    #[must_use]
    pub fn is_render_suppressed(&self, id: NodeId) -> bool {
        self.has_class(id, FROZEN_CLASS)
            && !self.ancestors_composed(id).any(|a| self.has_class(a, EXPORTING_CLASS))
    }

    fn relayout(&mut self) {
        self.layout = layout::compute(self);
    }

    // -----------------------------------------------------------------------
    // Host behaviour
    // -----------------------------------------------------------------------

    /// The page's own click handling for expandable sections: flips
    /// `aria-expanded` and shows/hides the region named by `aria-controls`.
    pub fn click(&mut self, id: NodeId) {
        let Some(expanded) = self.attribute(id, "aria-expanded").map(|v| v == "true") else {
            return;
        };
        let now_expanded = !expanded;
        self.set_attribute(id, "aria-expanded", if now_expanded { "true" } else { "false" });
        if let Some(region) = self.controlled_region(id) {
            self.set_hidden(region, !now_expanded);
        }
    }

    /// The element an expandable header controls: the `aria-controls`
    /// target in the header's tree, else its next element sibling.
    #[must_use]
    pub fn controlled_region(&self, header: NodeId) -> Option<NodeId> {
        if let Some(target) = self.attribute(header, "aria-controls") {
            let mut tree_root = header;
            while let Some(parent) = self.parent(tree_root) {
                tree_root = parent;
            }
            return self
                .descendants(tree_root)
                .into_iter()
                .find(|n| self.attribute(*n, "id") == Some(target));
        }
        let parent = self.parent(header)?;
        let siblings = self.children(parent);
        let position = siblings.iter().position(|c| *c == header)?;
        siblings[position + 1..].iter().copied().find(|c| self.is_element(*c))
    }

    // -----------------------------------------------------------------------
    // Markup policies
    // -----------------------------------------------------------------------

    /// Restrict policy creation to the given names (the page's CSP).
    pub fn set_policy_allow_list(&mut self, names: Option<Vec<String>>) {
        self.policy_allow_list = names;
    }

    pub fn create_policy(&mut self, name: &str) -> Result<(), PolicyError> {
        if self.policies.iter().any(|p| p == name) {
            return Err(PolicyError::Duplicate(name.to_owned()));
        }
        if let Some(allowed) = &self.policy_allow_list
            && !allowed.iter().any(|p| p == name)
        {
            return Err(PolicyError::NotAllowed(name.to_owned()));
        }
        self.policies.push(name.to_owned());
        Ok(())
    }
}
