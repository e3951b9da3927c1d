// =====
// TESTS: 4
// =====
//
// Transcript export from the page and from captured responses.

use pretty_assertions::assert_eq;
use std::time::Instant;
use transcript_booster::capture::transcript_from_capture;
use transcript_booster::dom::PageFixture;
use transcript_booster::export::{ExportError, TurnRole};
use transcript_booster::style::{EXPORTING_CLASS, FROZEN_CLASS};

use crate::helpers::{blocks, booster, cycle, transcript_page};

// --- Scenario D: nothing to export ---

#[tokio::test]
async fn export_without_blocks_aborts_and_writes_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("transcript.md");
    let mut doc = PageFixture::from_json(r#"{"body": [{"tag": "p", "text": "Loading..."}]}"#)
        .unwrap()
        .build();
    let mut booster = booster();
    booster.scan(&doc);

    let result = booster.export_to_file(&mut doc, &out).await;
    assert_eq!(result, Err(ExportError::NoBlocks));
    assert!(!out.exists());
}

#[tokio::test]
async fn export_includes_frozen_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("transcript.md");
    let mut doc = transcript_page(12, 800.0);
    let mut booster = booster();
    cycle(&mut booster, &mut doc, Instant::now());
    assert!(doc.has_class(blocks(&doc)[11], FROZEN_CLASS));

    let transcript = booster.export_to_file(&mut doc, &out).await.unwrap();
    assert_eq!(transcript.turns.len(), 12);
    assert_eq!(transcript.turns[11].text, "turn 12");
    let markdown = std::fs::read_to_string(&out).unwrap();
    assert!(markdown.ends_with("## Turn\n\nturn 12\n"));
    assert!(!doc.has_class(doc.body(), EXPORTING_CLASS));
    // Freezing is untouched by the export.
    assert!(doc.has_class(blocks(&doc)[11], FROZEN_CLASS));
}

#[test]
fn roles_read_from_markup() {
    let mut doc = PageFixture::from_json(
        r#"{"body": [
            {"tag": "ms-chat-turn", "attrs": {"data-turn-role": "User"}, "text": "Question"},
            {"tag": "ms-chat-turn", "children": [{"tag": "div", "class": "model turn-content", "text": "Answer"}]}
        ]}"#,
    )
    .unwrap()
    .build();
    let transcript = booster().export(&mut doc).unwrap();
    let roles: Vec<TurnRole> = transcript.turns.iter().map(|t| t.role).collect();
    assert_eq!(roles, vec![TurnRole::User, TurnRole::Model]);
}

#[test]
fn captured_payload_builds_transcript_without_page() {
    let mut booster = booster();
    let body = r#"[[["prompt", [{"role": "user", "text": "Hi"}, {"role": "model", "parts": [{"text": "Hello"}]}]]]]"#;
    assert!(booster.offer_response("https://example.test/ResolveDriveResource?id=1", body));
    let payload = booster.capture().payload().unwrap();
    let transcript = transcript_from_capture(payload);
    assert_eq!(
        transcript.to_markdown(),
        "## User\n\nHi\n\n## Model\n\nHello\n"
    );
}
