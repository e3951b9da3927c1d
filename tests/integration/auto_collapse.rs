// =====
// TESTS: 5
// =====
//
// Auto-collapse of tall, off-screen expandable sections.

use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};
use transcript_booster::collapse::is_expanded;
use transcript_booster::config::BoosterConfig;
use transcript_booster::context::Booster;
use transcript_booster::dom::{Document, NodeId, PageFixture};

use crate::helpers::{booster, container, cycle, select};

/// Ten 800px turns, then a turn holding one expanded code section whose
/// body is `section_height` tall.
fn page_with_section(section_height: f64) -> (Document, NodeId) {
    let doc = PageFixture::from_json(&format!(
        r#"{{
            "viewport": {{"width": 1000, "height": 900}},
            "body": [{{
                "tag": "div", "class": "layout-main", "overflowY": "auto", "clientHeight": 900,
                "children": [
                    {{"tag": "ms-chat-turn", "height": 800, "repeat": 10}},
                    {{"tag": "ms-chat-turn", "children": [{{
                        "tag": "ms-code-block",
                        "children": [
                            {{"tag": "mat-expansion-panel-header", "height": 40,
                              "attrs": {{"aria-expanded": "true", "aria-controls": "code-body"}}}},
                            {{"tag": "div", "id": "code-body", "height": {section_height}, "text": "fn main() {{}}"}}
                        ]
                    }}]}}
                ]
            }}]
        }}"#
    ))
    .unwrap()
    .build();
    let header = select(&doc, "mat-expansion-panel-header")[0];
    (doc, header)
}

#[test]
fn tall_offscreen_section_collapses_after_delay() {
    let (mut doc, header) = page_with_section(900.0);
    let mut booster = booster();
    let t0 = Instant::now();
    cycle(&mut booster, &mut doc, t0);
    assert_eq!(booster.next_collapse_deadline(), Some(t0 + Duration::from_secs(2)));

    assert!(booster.fire_collapse_timers(&mut doc, t0 + Duration::from_millis(1_999)).is_empty());
    assert_eq!(booster.fire_collapse_timers(&mut doc, t0 + Duration::from_secs(2)), vec![header]);
    assert!(!is_expanded(&doc, header));
    assert!(doc.is_hidden(select(&doc, "#code-body")[0]));
}

#[test]
fn short_section_is_never_collapsed() {
    let (mut doc, header) = page_with_section(300.0);
    let mut booster = booster();
    let t0 = Instant::now();
    cycle(&mut booster, &mut doc, t0);
    assert_eq!(booster.next_collapse_deadline(), None);
    for step in 1..=5 {
        let now = t0 + Duration::from_secs(step * 2);
        cycle(&mut booster, &mut doc, now);
        assert!(booster.fire_collapse_timers(&mut doc, now).is_empty());
    }
    assert!(is_expanded(&doc, header));
}

#[test]
fn reentry_before_deadline_cancels_collapse() {
    let (mut doc, header) = page_with_section(900.0);
    let mut booster = booster();
    let t0 = Instant::now();
    cycle(&mut booster, &mut doc, t0);
    assert!(booster.next_collapse_deadline().is_some());

    doc.set_scroll_top(container(&doc), 7_000.0);
    let (_, outcome) = booster.process_intersections(&mut doc, t0 + Duration::from_secs(1));
    assert_eq!(outcome.cancelled, 1);
    assert_eq!(booster.next_collapse_deadline(), None);
    assert!(booster.fire_collapse_timers(&mut doc, t0 + Duration::from_secs(5)).is_empty());
    assert!(is_expanded(&doc, header));
}

#[test]
fn header_removed_before_deadline_is_ignored() {
    let (mut doc, header) = page_with_section(900.0);
    let mut booster = booster();
    let t0 = Instant::now();
    cycle(&mut booster, &mut doc, t0);
    doc.remove(header);
    assert!(booster.fire_collapse_timers(&mut doc, t0 + Duration::from_secs(3)).is_empty());
}

#[test]
fn disabled_auto_collapse_never_registers_headers() {
    let (mut doc, header) = page_with_section(900.0);
    let config = BoosterConfig { auto_collapse_enabled: false, ..BoosterConfig::default() };
    let mut booster = Booster::new(config).unwrap();
    let t0 = Instant::now();
    cycle(&mut booster, &mut doc, t0);
    assert_eq!(booster.scan(&doc).new_headers, 0);
    assert!(booster.fire_collapse_timers(&mut doc, t0 + Duration::from_secs(10)).is_empty());
    assert!(is_expanded(&doc, header));
}
