// =====
// TESTS: 8
// =====
//
// Freeze/thaw behaviour of the visibility classifier, driven through the
// booster the way the event loop drives it.

use pretty_assertions::assert_eq;
use std::time::Instant;
use transcript_booster::dom::InlineStyle;
use transcript_booster::style::FROZEN_CLASS;

use crate::helpers::{blocks, booster, container, cycle, transcript_page};

fn frozen_indices(doc: &transcript_booster::dom::Document) -> Vec<usize> {
    blocks(doc)
        .iter()
        .enumerate()
        .filter(|(_, b)| doc.has_class(**b, FROZEN_CLASS))
        .map(|(i, _)| i)
        .collect()
}

// --- Scenario A: long transcript ---

#[test]
fn hundred_blocks_freeze_outside_margin_and_follow_scroll() {
    let mut doc = transcript_page(100, 800.0);
    let mut booster = booster();
    cycle(&mut booster, &mut doc, Instant::now());

    let status = booster.status(&doc);
    assert_eq!(status.total, 100);
    assert_eq!(status.frozen, 98);
    assert_eq!(frozen_indices(&doc), (2..100).collect::<Vec<_>>());

    let scroller = container(&doc);
    doc.set_scroll_top(scroller, f64::MAX);
    cycle(&mut booster, &mut doc, Instant::now());

    let status = booster.status(&doc);
    assert_eq!(status.total, 100);
    assert_eq!(status.frozen, 98);
    assert_eq!(frozen_indices(&doc), (0..98).collect::<Vec<_>>());
}

#[test]
fn freezing_does_not_change_scroll_height() {
    let mut doc = transcript_page(30, 800.0);
    let scroller = container(&doc);
    let before = doc.scroll_height(scroller);
    let mut booster = booster();
    cycle(&mut booster, &mut doc, Instant::now());
    assert!(booster.status(&doc).frozen > 0);
    assert_eq!(doc.scroll_height(scroller), before);
}

// --- Freeze floor ---

#[test]
fn short_offscreen_block_is_never_frozen() {
    let mut doc = transcript_page(1, 5_000.0);
    let scroller = container(&doc);
    let short = doc.create_element("ms-chat-turn");
    doc.set_intrinsic_height(short, 30.0);
    doc.append_child(scroller, short);

    let mut booster = booster();
    for _ in 0..5 {
        cycle(&mut booster, &mut doc, Instant::now());
    }
    assert!(!doc.has_class(short, FROZEN_CLASS));
    assert_eq!(booster.status(&doc).total, 2);
}

#[test]
fn block_exactly_at_floor_is_not_frozen() {
    let mut doc = transcript_page(1, 5_000.0);
    let scroller = container(&doc);
    let edge = doc.create_element("ms-chat-turn");
    doc.set_intrinsic_height(edge, 50.0);
    doc.append_child(scroller, edge);

    let mut booster = booster();
    cycle(&mut booster, &mut doc, Instant::now());
    assert!(!doc.has_class(edge, FROZEN_CLASS));
}

// --- Geometry preservation ---

#[test]
fn frozen_placeholder_matches_measured_box_and_thaw_clears_it() {
    let mut doc = transcript_page(6, 700.0);
    let target = blocks(&doc)[5];
    let measured = doc.bounding_rect(target);
    let mut booster = booster();
    cycle(&mut booster, &mut doc, Instant::now());

    assert_eq!(
        doc.style(target).cloned(),
        Some(InlineStyle {
            height: Some(measured.height),
            contain_intrinsic_size: Some((measured.width, measured.height)),
        })
    );

    doc.set_scroll_top(container(&doc), f64::MAX);
    cycle(&mut booster, &mut doc, Instant::now());
    assert!(!doc.has_class(target, FROZEN_CLASS));
    assert_eq!(doc.style(target).cloned(), Some(InlineStyle::default()));
}

#[test]
fn stripped_block_regains_natural_height_when_scrolled_back() {
    let mut doc = transcript_page(6, 800.0);
    let target = blocks(&doc)[5];
    let mut booster = booster();
    cycle(&mut booster, &mut doc, Instant::now());
    assert!(doc.has_class(target, FROZEN_CLASS));

    doc.remove_class(target, FROZEN_CLASS);
    doc.set_intrinsic_height(target, 1500.0);
    assert_eq!(doc.client_height(target), 800.0);

    doc.set_scroll_top(container(&doc), f64::MAX);
    cycle(&mut booster, &mut doc, Instant::now());
    assert_eq!(doc.style(target).cloned(), Some(InlineStyle::default()));
    assert_eq!(doc.client_height(target), 1500.0);
}

// --- Counter bounds ---

#[test]
fn frozen_count_recomputed_when_page_strips_class() {
    let mut doc = transcript_page(10, 800.0);
    let mut booster = booster();
    cycle(&mut booster, &mut doc, Instant::now());
    assert_eq!(booster.status(&doc).frozen, 8);

    for block in blocks(&doc).into_iter().skip(5) {
        doc.remove_class(block, FROZEN_CLASS);
    }
    assert_eq!(booster.status(&doc).frozen, 3);
}

#[test]
fn frozen_count_never_exceeds_tracked_total() {
    let mut doc = transcript_page(3, 100.0);
    let mut booster = booster();
    cycle(&mut booster, &mut doc, Instant::now());
    for _ in 0..10 {
        let stray = doc.create_element("section");
        doc.add_class(stray, FROZEN_CLASS);
        doc.append_child(doc.body(), stray);
    }
    let status = booster.status(&doc);
    assert_eq!(status.total, 3);
    assert_eq!(status.frozen, 3);
}
