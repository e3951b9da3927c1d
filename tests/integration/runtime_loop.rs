// =====
// TESTS: 5
// =====
//
// The event loop end to end, on paused tokio time.

use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio::sync::mpsc;
use transcript_booster::dom::{ElementSpec, PageFixture};
use transcript_booster::runtime::{HostEvent, ScheduledEvent, replay, run};

use crate::helpers::{booster, select, transcript_page};

fn quit_after(tx: mpsc::UnboundedSender<HostEvent>, after: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        let _ = tx.send(HostEvent::Quit);
    });
}

#[tokio::test(start_paused = true)]
async fn appended_turns_are_tracked_on_next_scan() {
    let mut doc = transcript_page(4, 800.0);
    let mut booster = booster();
    booster.install(&mut doc, None);
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(HostEvent::Append {
        parent: ".layout-main".to_owned(),
        element: ElementSpec {
            tag: "ms-chat-turn".to_owned(),
            height: Some(800.0),
            repeat: Some(3),
            ..ElementSpec::default()
        },
    })
    .unwrap();
    quit_after(tx, Duration::from_millis(2_500));

    let summary = run(&mut booster, &mut doc, rx, |_| {}).await;
    assert_eq!(summary.scans, 1);
    assert_eq!(summary.status.total, 7);
    assert_eq!(summary.status.frozen, 5);
    let hud = booster.hud_element().unwrap();
    assert!(doc.inner_html(hud).unwrap().contains("Booster: 5 / 7"));
}

#[tokio::test(start_paused = true)]
async fn scroll_event_thaws_and_freezes() {
    let mut doc = transcript_page(10, 800.0);
    let mut booster = booster();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(replay(
        vec![
            ScheduledEvent {
                after_ms: 3_000,
                event: HostEvent::Scroll { selector: Some(".layout-main".to_owned()), top: 1e9 },
            },
            ScheduledEvent { after_ms: 3_500, event: HostEvent::Quit },
        ],
        tx,
        Duration::ZERO,
    ));
    let mut frozen_seen = Vec::new();
    let summary = run(&mut booster, &mut doc, rx, |status| frozen_seen.push(status.frozen)).await;
    assert_eq!(frozen_seen, vec![8, 8]);
    let blocks = select(&doc, "ms-chat-turn");
    assert!(doc.has_class(blocks[0], transcript_booster::style::FROZEN_CLASS));
    assert!(!doc.has_class(blocks[9], transcript_booster::style::FROZEN_CLASS));
    assert_eq!(summary.events, 1);
}

#[tokio::test(start_paused = true)]
async fn collapse_timer_fires_inside_loop() {
    let mut doc = transcript_page(10, 800.0);
    let scroller = select(&doc, ".layout-main")[0];
    let section = doc.append_spec(
        scroller,
        &ElementSpec {
            tag: "ms-code-block".to_owned(),
            children: vec![
                ElementSpec {
                    tag: "mat-expansion-panel-header".to_owned(),
                    height: Some(40.0),
                    attrs: [("aria-expanded".to_owned(), "true".to_owned())].into(),
                    ..ElementSpec::default()
                },
                ElementSpec { tag: "pre".to_owned(), height: Some(1_200.0), ..ElementSpec::default() },
            ],
            ..ElementSpec::default()
        },
    );
    assert_eq!(section.len(), 1);
    let mut booster = booster();
    let (tx, rx) = mpsc::unbounded_channel();
    quit_after(tx, Duration::from_secs(10));

    let summary = run(&mut booster, &mut doc, rx, |_| {}).await;
    assert_eq!(summary.collapsed, 1);
    let header = select(&doc, "mat-expansion-panel-header")[0];
    assert_eq!(doc.attribute(header, "aria-expanded"), Some("false"));
}

#[tokio::test(start_paused = true)]
async fn channel_close_ends_the_loop() {
    let mut doc = transcript_page(2, 800.0);
    let mut booster = booster();
    let (tx, rx) = mpsc::unbounded_channel::<HostEvent>();
    tokio::spawn(replay(Vec::new(), tx, Duration::from_secs(5)));
    let summary = run(&mut booster, &mut doc, rx, |_| {}).await;
    // Initial scan at 2s, then 4s.
    assert_eq!(summary.scans, 2);
    assert_eq!(summary.events, 0);
}

#[tokio::test(start_paused = true)]
async fn demo_fixtures_run_to_completion() {
    let mut doc = PageFixture::from_json(include_str!("../../demos/page.json")).unwrap().build();
    let events = ScheduledEvent::list_from_json(include_str!("../../demos/events.json")).unwrap();
    let mut booster = booster();
    booster.install(&mut doc, None);
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(replay(events, tx, Duration::ZERO));
    let summary = run(&mut booster, &mut doc, rx, |_| {}).await;
    assert_eq!(summary.events, 4);
    assert_eq!(summary.status.total, 43);
    assert!(summary.status.frozen > 0);
    assert!(summary.status.frozen <= summary.status.total);
    assert_eq!(summary.status.capture, transcript_booster::capture::CaptureStatus::Captured { bytes: 68 });
}
