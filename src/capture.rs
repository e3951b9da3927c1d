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

//! Side-channel copy of transcript data taken from network responses.
//!
//! The interception layer hands every response body to [`CaptureSlot::offer`].
//! Only responses whose URL carries the marker are considered, and the slot
//! keeps whichever parseable JSON payload is largest. The booster itself only
//! reads the slot for status; the exporter can build a transcript from it.

use crate::export::{Transcript, Turn, TurnRole};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    Empty,
    Captured { bytes: usize },
}

impl std::fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("no capture"),
            Self::Captured { bytes } => write!(f, "captured {} KB", bytes.div_ceil(1024)),
        }
    }
}

#[derive(Debug, Clone)]
struct Captured {
    url: String,
    bytes: usize,
    payload: Value,
}

#[derive(Debug)]
pub struct CaptureSlot {
    marker: String,
    best: Option<Captured>,
}

impl CaptureSlot {
    #[must_use]
    pub fn new(marker: impl Into<String>) -> Self {
        Self { marker: marker.into(), best: None }
    }

    /// Offer a response. Returns `true` when it replaced the stored payload.
    pub fn offer(&mut self, url: &str, body: &str) -> bool {
        if !url.contains(self.marker.as_str()) {
            return false;
        }
        let bytes = body.len();
        if self.best.as_ref().is_some_and(|best| best.bytes >= bytes) {
            return false;
        }
        let payload = match serde_json::from_str::<Value>(body) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::debug!(url, "ignoring unparseable capture candidate: {err}");
                return false;
            }
        };
        tracing::info!(url, bytes, replaced = self.source_url(), "captured transcript payload");
        self.best = Some(Captured { url: url.to_owned(), bytes, payload });
        true
    }

    #[must_use]
    pub fn status(&self) -> CaptureStatus {
        self.best.as_ref().map_or(CaptureStatus::Empty, |c| CaptureStatus::Captured { bytes: c.bytes })
    }

    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        self.best.as_ref().map(|c| &c.payload)
    }

    #[must_use]
    pub fn source_url(&self) -> Option<&str> {
        self.best.as_ref().map(|c| c.url.as_str())
    }
}

/// Build a transcript from a captured payload by collecting every object
/// that carries a `role` and either `text` or `parts[].text`.
#[must_use]
pub fn transcript_from_capture(payload: &Value) -> Transcript {
    let mut turns = Vec::new();
    collect_turns(payload, &mut turns);
    Transcript { turns }
}

fn collect_turns(value: &Value, out: &mut Vec<Turn>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_turns(item, out);
            }
        }
        Value::Object(map) => {
            if let Some(role) = map.get("role").and_then(Value::as_str)
                && let Some(text) = object_text(map)
            {
                out.push(Turn { role: TurnRole::from_label(role), text });
                return;
            }
            for nested in map.values() {
                collect_turns(nested, out);
            }
        }
        _ => {}
    }
}

fn object_text(map: &serde_json::Map<String, Value>) -> Option<String> {
    if let Some(text) = map.get("text").and_then(Value::as_str) {
        return Some(text.to_owned());
    }
    let parts = map.get("parts")?.as_array()?;
    let joined: Vec<&str> =
        parts.iter().filter_map(|p| p.get("text").and_then(Value::as_str)).collect();
    (!joined.is_empty()).then(|| joined.join("\n"))
}
