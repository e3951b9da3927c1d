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

//! Single-threaded event loop driving a [`Booster`] over a host document.
//!
//! Three sources feed the loop: the scan interval, host events from the
//! page, and the earliest pending collapse deadline. After each wake-up the
//! pending intersection records are delivered and the HUD is refreshed.

use crate::context::Booster;
use crate::deep_query::{deep_query, deep_query_first};
use crate::dom::{Document, ElementSpec, Selector};
use crate::hud::HudStatus;
use anyhow::Context as _;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

/// Something the page (or the network layer) did.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostEvent {
    /// Scroll the element matching `selector`, or the window when absent.
    Scroll {
        #[serde(default)]
        selector: Option<String>,
        top: f64,
    },
    /// Append new content under the first element matching `parent`.
    Append { parent: String, element: ElementSpec },
    /// Remove every element matching `selector`.
    Remove { selector: String },
    /// Click the first element matching `selector`.
    Toggle { selector: String },
    /// A network response seen by the interception layer.
    Response { url: String, body: String },
    Quit,
}

/// A host event with its offset from the start of the run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledEvent {
    #[serde(default)]
    pub after_ms: u64,
    #[serde(flatten)]
    pub event: HostEvent,
}

impl ScheduledEvent {
    pub fn list_from_json(json: &str) -> serde_json::Result<Vec<Self>> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub scans: u64,
    pub events: u64,
    pub collapsed: usize,
    pub status: HudStatus,
}

/// Run until `Quit` arrives or every sender is dropped. `on_cycle` sees the
/// status after every wake-up.
pub async fn run(
    booster: &mut Booster,
    doc: &mut Document,
    mut events: mpsc::UnboundedReceiver<HostEvent>,
    mut on_cycle: impl FnMut(&HudStatus),
) -> RunSummary {
    let started = Instant::now();
    let mut ticker =
        tokio::time::interval_at(started + booster.config().initial_delay(), booster.config().scan_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut scans = 0;
    let mut handled = 0;
    let mut collapsed = 0;
    loop {
        let deadline = booster.next_collapse_deadline();
        tokio::select! {
            _ = ticker.tick() => {
                let report = booster.scan(doc);
                scans += 1;
                tracing::trace!(scans, new_blocks = report.new_blocks, "scan cycle");
            }
            event = events.recv() => {
                let Some(event) = event else {
                    tracing::debug!("host event channel closed");
                    break;
                };
                if event == HostEvent::Quit {
                    break;
                }
                handled += 1;
                if let Err(err) = apply_event(booster, doc, event) {
                    tracing::warn!("host event failed: {err:#}");
                }
            }
            () = sleep_until_deadline(deadline) => {
                collapsed += booster.fire_collapse_timers(doc, Instant::now().into_std()).len();
            }
        }
        booster.process_intersections(doc, Instant::now().into_std());
        let status = booster.refresh_hud(doc);
        on_cycle(&status);
    }

    let status = booster.status(doc);
    tracing::info!(scans, events = handled, collapsed, frozen = status.frozen, "run finished");
    RunSummary { scans, events: handled, collapsed, status }
}

async fn sleep_until_deadline(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

fn parse(selector: &str) -> anyhow::Result<Selector> {
    Selector::parse(selector).with_context(|| format!("bad selector `{selector}`"))
}

fn apply_event(booster: &mut Booster, doc: &mut Document, event: HostEvent) -> anyhow::Result<()> {
    let root = Some(doc.root());
    match event {
        HostEvent::Scroll { selector: None, top } => doc.scroll_window_to(top),
        HostEvent::Scroll { selector: Some(selector), top } => {
            let target = deep_query_first(doc, root, &parse(&selector)?)
                .with_context(|| format!("nothing matches `{selector}`"))?;
            doc.set_scroll_top(target, top);
        }
        HostEvent::Append { parent, element } => {
            let target = deep_query_first(doc, root, &parse(&parent)?)
                .with_context(|| format!("nothing matches `{parent}`"))?;
            let added = doc.append_spec(target, &element);
            tracing::debug!(count = added.len(), "host appended content");
        }
        HostEvent::Remove { selector } => {
            for id in deep_query(doc, root, &parse(&selector)?) {
                doc.remove(id);
            }
        }
        HostEvent::Toggle { selector } => {
            let target = deep_query_first(doc, root, &parse(&selector)?)
                .with_context(|| format!("nothing matches `{selector}`"))?;
            doc.click(target);
        }
        HostEvent::Response { url, body } => {
            booster.offer_response(&url, &body);
        }
        HostEvent::Quit => {}
    }
    Ok(())
}

/// Feed scheduled events into `tx`, then keep the loop alive for one more
/// scan before closing the channel.
pub async fn replay(events: Vec<ScheduledEvent>, tx: mpsc::UnboundedSender<HostEvent>, linger: Duration) {
    let started = Instant::now();
    for scheduled in events {
        tokio::time::sleep_until(started + Duration::from_millis(scheduled.after_ms)).await;
        if tx.send(scheduled.event).is_err() {
            return;
        }
    }
    tokio::time::sleep(linger).await;
}
