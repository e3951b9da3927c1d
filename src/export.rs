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

//! Transcript export from the live page.
//!
//! Uses [`discover_blocks`], the same discovery the scanner uses, so the
//! exporter and the virtualizer always agree on what a block is. Frozen
//! blocks do not render text, so the exporting class is set on `<body>` for
//! the duration of the read.

use crate::config::Selectors;
use crate::discovery::{Confidence, discover_blocks, is_code_tag};
use crate::dom::{Document, NodeId};
use crate::style::EXPORTING_CLASS;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    #[error("no transcript blocks found on the page")]
    NoBlocks,
    #[error("every discovered block was empty")]
    EmptyTranscript,
    #[error("failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
    Unknown,
}

impl TurnRole {
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let lower = label.to_ascii_lowercase();
        if lower.contains("user") {
            Self::User
        } else if lower.contains("model") || lower.contains("assistant") {
            Self::Model
        } else {
            Self::Unknown
        }
    }

    #[must_use]
    pub fn heading(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Model => "Model",
            Self::Unknown => "Turn",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    pub turns: Vec<Turn>,
}

impl Transcript {
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for (i, turn) in self.turns.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "## {}\n", turn.role.heading());
            out.push_str(turn.text.trim_end());
            out.push('\n');
        }
        out
    }
}

/// Export every discovered block. Fails rather than returning an empty
/// transcript.
pub fn export_transcript(
    doc: &mut Document,
    container: Option<NodeId>,
    selectors: &Selectors,
) -> Result<Transcript, ExportError> {
    let discovery = discover_blocks(doc, container, selectors);
    if discovery.blocks.is_empty() {
        tracing::warn!("export aborted: no blocks discovered");
        return Err(ExportError::NoBlocks);
    }
    if discovery.confidence == Confidence::Heuristic {
        tracing::info!(blocks = discovery.blocks.len(), "exporting heuristically discovered blocks");
    }

    let body = doc.body();
    doc.add_class(body, EXPORTING_CLASS);
    let turns: Vec<Turn> = discovery
        .blocks
        .iter()
        .filter_map(|block| {
            let text = block_text(doc, *block);
            (!text.trim().is_empty()).then(|| Turn { role: block_role(doc, *block), text })
        })
        .collect();
    doc.remove_class(body, EXPORTING_CLASS);

    if turns.is_empty() {
        return Err(ExportError::EmptyTranscript);
    }
    tracing::info!(turns = turns.len(), "exported transcript");
    Ok(Transcript { turns })
}

/// Export, then write the Markdown to `path`. Nothing is written unless
/// the export succeeded.
pub async fn export_to_file(
    doc: &mut Document,
    container: Option<NodeId>,
    selectors: &Selectors,
    path: &Path,
) -> Result<Transcript, ExportError> {
    let transcript = export_transcript(doc, container, selectors)?;
    write_transcript(&transcript, path).await?;
    Ok(transcript)
}

pub async fn write_transcript(transcript: &Transcript, path: &Path) -> Result<(), ExportError> {
    tokio::fs::write(path, transcript.to_markdown())
        .await
        .map_err(|err| ExportError::Write { path: path.to_path_buf(), message: err.to_string() })
}

/// Role from a `data-turn-role` attribute or a `user`/`model` class on the
/// block or anything inside it.
fn block_role(doc: &Document, block: NodeId) -> TurnRole {
    let mut nodes = vec![block];
    nodes.extend(composed_descendants(doc, block));
    for node in nodes {
        if let Some(label) = doc.attribute(node, "data-turn-role") {
            return TurnRole::from_label(label);
        }
        for class in doc.classes(node) {
            match class.as_str() {
                "user" => return TurnRole::User,
                "model" => return TurnRole::Model,
                _ => {}
            }
        }
    }
    TurnRole::Unknown
}

fn composed_descendants(doc: &Document, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        let mut next: Vec<NodeId> = doc.shadow_root(current).into_iter().collect();
        next.extend_from_slice(doc.children(current));
        for child in next.iter().rev() {
            stack.push(*child);
        }
        if current != id {
            out.push(current);
        }
    }
    out
}

/// Rendered text of a block, with code elements as fenced blocks.
fn block_text(doc: &Document, block: NodeId) -> String {
    let mut paragraphs = Vec::new();
    walk_text(doc, block, &mut paragraphs);
    paragraphs.join("\n\n")
}

fn walk_text(doc: &Document, node: NodeId, out: &mut Vec<String>) {
    if doc.is_hidden(node) || doc.is_render_suppressed(node) {
        return;
    }
    if doc.tag(node).is_some_and(is_code_tag) {
        let code = doc.inner_text(node);
        if !code.is_empty() {
            out.push(format!("```\n{code}\n```"));
        }
        return;
    }
    let own = doc.text(node).trim();
    if !own.is_empty() {
        out.push(own.to_owned());
    }
    if let Some(shadow) = doc.shadow_root(node) {
        walk_text(doc, shadow, out);
    }
    for child in doc.children(node) {
        walk_text(doc, *child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoosterConfig;
    use crate::style::FROZEN_CLASS;
    use pretty_assertions::assert_eq;

    fn selectors() -> Selectors {
        BoosterConfig::default().validate().unwrap()
    }

    fn turn(doc: &mut Document, role: &str, text: &str) -> NodeId {
        let block = doc.create_element("ms-chat-turn");
        let inner = doc.create_element("div");
        doc.add_class(inner, role);
        doc.set_text(inner, text);
        doc.append_child(doc.body(), block);
        doc.append_child(block, inner);
        block
    }

    #[test]
    fn zero_blocks_aborts() {
        let mut doc = Document::new(800.0, 600.0);
        assert_eq!(export_transcript(&mut doc, None, &selectors()), Err(ExportError::NoBlocks));
    }

    #[test]
    fn exports_frozen_blocks_and_clears_escape_hatch() {
        let mut doc = Document::new(800.0, 600.0);
        turn(&mut doc, "user", "What is Rust?");
        let answer = turn(&mut doc, "model", "A systems language.");
        doc.add_class(answer, FROZEN_CLASS);

        let transcript = export_transcript(&mut doc, None, &selectors()).unwrap();
        assert_eq!(
            transcript.to_markdown(),
            "## User\n\nWhat is Rust?\n\n## Model\n\nA systems language.\n"
        );
        assert!(!doc.has_class(doc.body(), EXPORTING_CLASS));
    }

    #[test]
    fn code_blocks_are_fenced() {
        let mut doc = Document::new(800.0, 600.0);
        let block = turn(&mut doc, "model", "Example:");
        let pre = doc.create_element("pre");
        doc.set_text(pre, "fn main() {}");
        doc.append_child(block, pre);
        let transcript = export_transcript(&mut doc, None, &selectors()).unwrap();
        assert_eq!(transcript.turns[0].text, "Example:\n\n```\nfn main() {}\n```");
    }

    #[tokio::test]
    async fn failed_export_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.md");
        let mut doc = Document::new(800.0, 600.0);
        let result = export_to_file(&mut doc, None, &selectors(), &path).await;
        assert_eq!(result, Err(ExportError::NoBlocks));
        assert!(!path.exists());

        turn(&mut doc, "user", "Hello");
        export_to_file(&mut doc, None, &selectors(), &path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "## User\n\nHello\n");
    }

    #[test]
    fn role_labels() {
        assert_eq!(TurnRole::from_label("model-response"), TurnRole::Model);
        assert_eq!(TurnRole::from_label("USER"), TurnRole::User);
        assert_eq!(TurnRole::from_label("system"), TurnRole::Unknown);
    }
}
