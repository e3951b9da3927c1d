use std::time::Instant;
use transcript_booster::config::BoosterConfig;
use transcript_booster::context::Booster;
use transcript_booster::deep_query::deep_query;
use transcript_booster::dom::{Document, NodeId, PageFixture, Selector};

pub const VIEWPORT_HEIGHT: f64 = 900.0;

/// A `.layout-main` scroll container filling the viewport, holding `blocks`
/// turns of `height` pixels each.
pub fn transcript_page(blocks: usize, height: f64) -> Document {
    PageFixture::from_json(&format!(
        r#"{{
            "viewport": {{"width": 1000, "height": {VIEWPORT_HEIGHT}}},
            "body": [{{
                "tag": "div", "class": "layout-main", "overflowY": "auto",
                "clientHeight": {VIEWPORT_HEIGHT},
                "children": [{{"tag": "ms-chat-turn", "height": {height}, "repeat": {blocks}, "text": "turn {{n}}"}}]
            }}]
        }}"#
    ))
    .unwrap()
    .build()
}

pub fn booster() -> Booster {
    Booster::new(BoosterConfig::default()).unwrap()
}

/// One scan followed by intersection delivery, as one loop wake-up does.
pub fn cycle(booster: &mut Booster, doc: &mut Document, now: Instant) {
    booster.scan(doc);
    booster.process_intersections(doc, now);
}

pub fn select(doc: &Document, selector: &str) -> Vec<NodeId> {
    deep_query(doc, Some(doc.root()), &Selector::parse(selector).unwrap())
}

pub fn container(doc: &Document) -> NodeId {
    select(doc, ".layout-main")[0]
}

pub fn blocks(doc: &Document) -> Vec<NodeId> {
    select(doc, "ms-chat-turn")
}
