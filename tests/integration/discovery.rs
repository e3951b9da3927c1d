// =====
// TESTS: 7
// =====
//
// Discovery scanner, container locator and deep query over fixture pages.

use pretty_assertions::assert_eq;
use std::time::Instant;
use transcript_booster::deep_query::deep_query;
use transcript_booster::discovery::{Confidence, discover_blocks};
use transcript_booster::dom::{PageFixture, Selector};
use transcript_booster::locator::ContainerChange;

use crate::helpers::{blocks, booster, container, cycle, select, transcript_page};

// --- Idempotent registration ---

#[test]
fn every_block_registered_exactly_once_across_cycles() {
    let mut doc = transcript_page(20, 800.0);
    let mut booster = booster();
    let first = booster.scan(&doc);
    assert_eq!(first.new_blocks, 20);
    for _ in 0..10 {
        assert_eq!(booster.scan(&doc).new_blocks, 0);
        booster.process_intersections(&mut doc, Instant::now());
    }
    assert_eq!(booster.tracked_blocks(), 20);
    assert_eq!(booster.status(&doc).total, 20);
}

#[test]
fn nested_turn_containers_count_once() {
    let mut doc = PageFixture::from_json(
        r#"{
            "viewport": {"width": 1000, "height": 900},
            "body": [{
                "tag": "div", "class": "layout-main", "overflowY": "auto", "clientHeight": 900,
                "children": [{
                    "tag": "ms-chat-turn", "repeat": 3,
                    "children": [{"tag": "div", "class": "chat-turn-container", "height": 800, "text": "turn {n}"}]
                }]
            }]
        }"#,
    )
    .unwrap()
    .build();
    let mut booster = booster();
    cycle(&mut booster, &mut doc, Instant::now());
    assert_eq!(booster.tracked_blocks(), 3);
    let status = booster.status(&doc);
    assert_eq!(status.total, 3);
    assert_eq!(status.frozen, 1);

    let transcript = booster.export(&mut doc).unwrap();
    let texts: Vec<&str> = transcript.turns.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["turn 1", "turn 2", "turn 3"]);
}

// --- Scenario C: nested shadow trees ---

#[test]
fn deep_query_reaches_every_shadow_level() {
    let doc = PageFixture::from_json(
        r#"{"body": [{
            "tag": "chat-app",
            "shadow": [
                {"tag": "ms-chat-turn", "id": "level-1"},
                {"tag": "turn-list", "children": [{
                    "tag": "turn-group",
                    "shadow": [
                        {"tag": "ms-chat-turn", "id": "level-2"},
                        {"tag": "turn-item", "shadow": [{"tag": "ms-chat-turn", "id": "level-3"}]}
                    ]
                }]}
            ]
        }]}"#,
    )
    .unwrap()
    .build();
    let found: Vec<String> = deep_query(&doc, Some(doc.root()), &Selector::parse("ms-chat-turn").unwrap())
        .into_iter()
        .filter_map(|id| doc.attribute(id, "id").map(str::to_owned))
        .collect();
    assert_eq!(found, vec!["level-1", "level-2", "level-3"]);
}

#[test]
fn scanner_registers_blocks_inside_shadow_trees() {
    let mut doc = PageFixture::from_json(
        r#"{"body": [{
            "tag": "div", "class": "layout-main", "overflowY": "auto", "clientHeight": 900,
            "children": [{"tag": "chat-turns", "shadow": [{"tag": "ms-chat-turn", "height": 600, "repeat": 8}]}]
        }]}"#,
    )
    .unwrap()
    .build();
    let mut booster = booster();
    cycle(&mut booster, &mut doc, Instant::now());
    assert_eq!(booster.tracked_blocks(), 8);
    assert!(booster.status(&doc).frozen > 0);
}

// --- Heuristic fallback ---

#[test]
fn heuristic_group_used_when_selectors_miss() {
    let mut doc = PageFixture::from_json(
        r#"{"body": [{
            "tag": "div", "overflowY": "scroll", "clientHeight": 900,
            "children": [
                {"tag": "div", "class": "code-view", "children": [{"tag": "div", "height": 10, "repeat": 50}]},
                {"tag": "div", "children": [{"tag": "div", "class": "msg", "height": 700, "repeat": 6}]}
            ]
        }]}"#,
    )
    .unwrap()
    .build();
    let mut booster = booster();
    let report = booster.scan(&doc);
    assert_eq!(report.confidence, Confidence::Heuristic);
    assert_eq!(report.new_blocks, 6);
    assert_eq!(booster.tracked_blocks(), 6);

    // The exporter sees the very same blocks.
    let discovery = discover_blocks(&doc, booster.container(&doc), booster.selectors());
    assert_eq!(discovery.blocks, select(&doc, ".msg"));
    booster.process_intersections(&mut doc, Instant::now());
}

// --- Container re-resolution ---

#[test]
fn container_survives_empty_search_but_not_detachment() {
    let mut doc = transcript_page(3, 800.0);
    let mut booster = booster();
    let first = container(&doc);
    assert_eq!(booster.scan(&doc).container, ContainerChange::Acquired(first));

    // Still attached, but no longer matches any rule.
    doc.set_overflow_y(first, transcript_booster::dom::Overflow::Visible);
    assert_eq!(booster.scan(&doc).container, ContainerChange::Unchanged);
    assert_eq!(booster.container(&doc), Some(first));

    doc.remove(first);
    assert_eq!(booster.scan(&doc).container, ContainerChange::Lost(first));
    assert_eq!(booster.container(&doc), None);
}

#[test]
fn replacement_container_is_adopted() {
    let mut doc = transcript_page(3, 800.0);
    let mut booster = booster();
    let old = container(&doc);
    booster.scan(&doc);

    let new = doc.create_element("main");
    doc.add_class(new, "layout-main");
    doc.set_overflow_y(new, transcript_booster::dom::Overflow::Auto);
    doc.set_client_height(new, Some(900.0));
    doc.remove(old);
    doc.append_child(doc.body(), new);
    let turn = doc.create_element("ms-chat-turn");
    doc.append_child(new, turn);

    assert_eq!(booster.scan(&doc).container, ContainerChange::Replaced { old, new });
    assert_eq!(blocks(&doc), vec![turn]);
}
