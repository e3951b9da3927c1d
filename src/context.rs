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

//! The composition root: one `Booster` owns every piece of engine state.
//!
//! Nothing here returns an error to the caller once constructed. The booster
//! runs on a page it does not control, so a failure in one cycle is logged
//! and the next cycle tries again.

use crate::capture::CaptureSlot;
use crate::collapse::{AutoCollapseClassifier, CollapseOutcome};
use crate::config::{BoosterConfig, ConfigError, Selectors};
use crate::dom::{Document, NodeId, Selector};
use crate::export::{ExportError, Transcript, export_to_file, export_transcript};
use crate::hud::{Hud, HudStatus};
use crate::markup::MarkupPolicy;
use crate::panel::PanelPosition;
use crate::scanner::{DiscoveryScanner, ScanReport};
use crate::style::FROZEN_CLASS;
use crate::virtualize::{BatchOutcome, VisibilityClassifier};
use std::path::Path;
use std::time::Instant;

pub struct Booster {
    config: BoosterConfig,
    selectors: Selectors,
    frozen_selector: Selector,
    scanner: DiscoveryScanner,
    visibility: VisibilityClassifier,
    /// `None` when auto-collapse is disabled.
    collapse: Option<AutoCollapseClassifier>,
    capture: CaptureSlot,
    policy: Option<MarkupPolicy>,
    hud: Option<Hud>,
    session_id: String,
    span: tracing::Span,
}

impl Booster {
    pub fn new(config: BoosterConfig) -> Result<Self, ConfigError> {
        let selectors = config.validate()?;
        let frozen_selector = Selector::parse(&format!(".{FROZEN_CLASS}"))
            .map_err(|source| ConfigError::Selector { field: "frozenClass", source })?;
        let session_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("booster", session = %session_id);
        let visibility =
            VisibilityClassifier::new(None, config.viewport_margin, config.min_item_height);
        let collapse = config.auto_collapse_enabled.then(|| {
            AutoCollapseClassifier::new(
                None,
                config.collapse_margin,
                config.fold_height_threshold,
                config.collapse_delay(),
            )
        });
        let capture = CaptureSlot::new(config.capture_url_marker.clone());
        Ok(Self {
            config,
            selectors,
            frozen_selector,
            scanner: DiscoveryScanner::new(),
            visibility,
            collapse,
            capture,
            policy: None,
            hud: None,
            session_id,
            span,
        })
    }

    #[must_use]
    pub fn config(&self) -> &BoosterConfig {
        &self.config
    }

    #[must_use]
    pub fn selectors(&self) -> &Selectors {
        &self.selectors
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn capture(&self) -> &CaptureSlot {
        &self.capture
    }

    #[must_use]
    pub fn tracked_blocks(&self) -> usize {
        self.scanner.tracked_blocks()
    }

    #[must_use]
    pub fn container(&self, doc: &Document) -> Option<NodeId> {
        self.scanner.container(doc)
    }

    #[must_use]
    pub fn hud_element(&self) -> Option<NodeId> {
        self.hud.as_ref().map(Hud::element)
    }

    /// Establish the markup policy and create the status display.
    pub fn install(&mut self, doc: &mut Document, position: Option<PanelPosition>) {
        let _guard = self.span.enter();
        match MarkupPolicy::establish(doc) {
            Ok(policy) => {
                tracing::debug!(policy = policy.name(), "markup policy established");
                self.policy = Some(policy);
            }
            Err(err) => tracing::warn!("markup policy rejected, using plain text: {err}"),
        }
        self.hud = Some(Hud::install(doc, position));
        tracing::info!(
            viewport_margin = self.config.viewport_margin,
            auto_collapse = self.collapse.is_some(),
            "booster installed"
        );
    }

    pub fn scan(&mut self, doc: &Document) -> ScanReport {
        let _guard = self.span.enter();
        self.scanner.scan(doc, &self.selectors, &mut self.visibility, self.collapse.as_mut())
    }

    /// Deliver pending intersection records to both classifiers.
    pub fn process_intersections(
        &mut self,
        doc: &mut Document,
        now: Instant,
    ) -> (BatchOutcome, CollapseOutcome) {
        let _guard = self.span.enter();
        let batch = self.visibility.process(doc);
        let collapse = self.collapse.as_mut().map(|c| c.process(doc, now)).unwrap_or_default();
        (batch, collapse)
    }

    #[must_use]
    pub fn next_collapse_deadline(&self) -> Option<Instant> {
        self.collapse.as_ref().and_then(AutoCollapseClassifier::next_deadline)
    }

    pub fn fire_collapse_timers(&mut self, doc: &mut Document, now: Instant) -> Vec<NodeId> {
        let _guard = self.span.enter();
        self.collapse.as_mut().map(|c| c.fire_due(doc, now)).unwrap_or_default()
    }

    /// Offer a network response to the capture slot.
    pub fn offer_response(&mut self, url: &str, body: &str) -> bool {
        let _guard = self.span.enter();
        self.capture.offer(url, body)
    }

    /// Status with the frozen count recomputed from the page.
    pub fn status(&mut self, doc: &Document) -> HudStatus {
        let total = self.visibility.observed();
        let frozen = self.visibility.frozen_count(doc, &self.frozen_selector, total);
        HudStatus { frozen, total, capture: self.capture.status() }
    }

    /// Recompute the status and write it to the HUD, if installed.
    pub fn refresh_hud(&mut self, doc: &mut Document) -> HudStatus {
        let _guard = self.span.clone().entered();
        let status = self.status(doc);
        if let Some(hud) = self.hud.as_mut() {
            hud.render(doc, self.policy.as_ref(), &status);
        }
        status
    }

    /// Export with the same discovery the scanner uses.
    pub fn export(&self, doc: &mut Document) -> Result<Transcript, ExportError> {
        let _guard = self.span.enter();
        let container = self.scanner.container(doc);
        export_transcript(doc, container, &self.selectors)
    }

    /// Export and write Markdown to `path`; no file on failure.
    pub async fn export_to_file(&self, doc: &mut Document, path: &Path) -> Result<Transcript, ExportError> {
        let container = self.scanner.container(doc);
        export_to_file(doc, container, &self.selectors, path).await
    }
}

impl std::fmt::Debug for Booster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Booster")
            .field("session_id", &self.session_id)
            .field("tracked_blocks", &self.scanner.tracked_blocks())
            .field("auto_collapse", &self.collapse.is_some())
            .finish_non_exhaustive()
    }
}
