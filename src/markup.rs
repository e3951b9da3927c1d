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

//! The single choke point for markup written into the page.
//!
//! Pages that enforce trusted markup reject raw string writes, so every
//! injection goes through [`TrustedHtml`], which can only be built by
//! escaping text. [`MarkupPolicy`] registers the named policy with the page;
//! when the page refuses, callers fall back to plain text writes.

use crate::dom::{Document, NodeId, PolicyError};

pub const POLICY_NAME: &str = "transcript-booster";

/// Markup that has passed through [`escape`]. Not constructible otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedHtml(String);

impl TrustedHtml {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Escape `text` for use as element content or a quoted attribute value.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct MarkupPolicy {
    name: &'static str,
}

impl MarkupPolicy {
    pub fn establish(doc: &mut Document) -> Result<Self, PolicyError> {
        doc.create_policy(POLICY_NAME)?;
        Ok(Self { name: POLICY_NAME })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.name
    }

    /// Wrap `text` in a single element, escaping everything user-controlled.
    #[must_use]
    pub fn element(&self, tag: &str, class: &str, text: &str) -> TrustedHtml {
        TrustedHtml(format!("<{tag} class=\"{}\">{}</{tag}>", escape(class), escape(text)))
    }
}

/// Write `text` into `target`, as markup when a policy is available and as
/// plain text otherwise.
pub fn write_content(
    doc: &mut Document,
    target: NodeId,
    policy: Option<&MarkupPolicy>,
    class: &str,
    text: &str,
) {
    match policy {
        Some(policy) => doc.set_inner_html(target, &policy.element("span", class, text)),
        None => doc.set_text(target, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(escape("<img src=x onerror='a&b'>"), "&lt;img src=x onerror=&#39;a&amp;b&#39;&gt;");
    }

    #[test]
    fn policy_element_escapes_text() {
        let mut doc = Document::new(800.0, 600.0);
        let policy = MarkupPolicy::establish(&mut doc).unwrap();
        let html = policy.element("span", "boost-hud", "1 < 2");
        assert_eq!(html.as_str(), "<span class=\"boost-hud\">1 &lt; 2</span>");
    }

    #[test]
    fn rejected_policy_degrades_to_text() {
        let mut doc = Document::new(800.0, 600.0);
        doc.set_policy_allow_list(Some(vec!["host-only".to_owned()]));
        assert!(MarkupPolicy::establish(&mut doc).is_err());
        let target = doc.create_element("div");
        write_content(&mut doc, target, None, "boost-hud", "<b>plain</b>");
        assert_eq!(doc.text(target), "<b>plain</b>");
        assert_eq!(doc.inner_html(target), None);
    }
}
