use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use morphext::app::{self, MorphApp};
use morphext::{InboundEvent, SyncMessage, WorkerSession};

fn boot() -> (
    WorkerSession<MorphApp>,
    mpsc::UnboundedReceiver<SyncMessage>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut session = WorkerSession::new(MorphApp::new(), tx);
    session.bootstrap().expect("bootstrap succeeds");
    (session, rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<SyncMessage>) -> Vec<SyncMessage> {
    let mut out = Vec::new();
    while let Ok(message) = rx.try_recv() {
        out.push(message);
    }
    out
}

fn value_patch(model: &str, attr: &str, new: Value) -> String {
    json!({
        "events": [{
            "kind": "ModelChanged",
            "model": {"id": model},
            "attr": attr,
            "new": new,
        }],
    })
    .to_string()
}

fn commit(word: &str) -> InboundEvent {
    InboundEvent::Patch {
        patch: value_patch(app::TEXT_INPUT, "value_input", json!(word)),
    }
}

/// Receive morph frames until the animation settles on `target`.
async fn collect_frames(
    rx: &mut mpsc::UnboundedReceiver<SyncMessage>,
    target: &str,
) -> Vec<String> {
    let mut frames = Vec::new();
    loop {
        let message = tokio::time::timeout(Duration::from_secs(60), rx.recv())
            .await
            .expect("animation stalled")
            .expect("outbound channel closed");
        match message {
            SyncMessage::Patch { patch, .. } => {
                let event = &patch["events"][0];
                assert_eq!(event["model"]["id"], json!(app::MORPHING_TEXT));
                let frame = event["new"].as_str().expect("frame is a string").to_string();
                let done = frame == target;
                frames.push(frame);
                if done {
                    return frames;
                }
            }
            other => panic!("unexpected message during animation: {other:?}"),
        }
    }
}

#[tokio::test]
async fn bootstrap_reports_progress_then_render() {
    let (_session, mut rx) = boot();
    let messages = drain(&mut rx);

    let statuses: Vec<&str> = messages
        .iter()
        .filter_map(|message| match message {
            SyncMessage::Status { msg } => Some(msg.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![
            "Loading runtime",
            "Installing bokeh",
            "Installing panel",
            "Installing pyodide-http==0.1.0",
            "Executing code",
        ]
    );

    match messages.last().expect("bootstrap sent messages") {
        SyncMessage::Render {
            docs_json,
            render_items,
            root_ids,
        } => {
            assert_eq!(root_ids, &vec![app::TEMPLATE.to_string()]);
            assert_eq!(render_items.len(), 1);
            assert_eq!(docs_json["title"], json!(app::TITLE));
        }
        other => panic!("expected render message, got {other:?}"),
    }
}

#[tokio::test]
async fn inbound_patch_yields_one_idle_and_no_echo() {
    let (mut session, mut rx) = boot();
    session.handle(InboundEvent::Rendered).unwrap();
    drain(&mut rx);

    session
        .handle(InboundEvent::Patch {
            patch: value_patch(app::MORPH_SPEED, "value", json!(0.05)),
        })
        .unwrap();

    assert_eq!(drain(&mut rx), vec![SyncMessage::Idle]);
}

#[tokio::test]
async fn malformed_patch_fails_without_idle() {
    let (mut session, mut rx) = boot();
    session.handle(InboundEvent::Rendered).unwrap();
    drain(&mut rx);

    let result = session.handle(InboundEvent::Patch {
        patch: "{\"events\": 42}".into(),
    });
    assert!(result.is_err());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn committed_input_morphs_to_the_target() {
    let (mut session, mut rx) = boot();
    session.handle(InboundEvent::Rendered).unwrap();
    drain(&mut rx);

    session.handle(commit("hi")).unwrap();
    assert_eq!(drain(&mut rx), vec![SyncMessage::Idle]);

    let frames = collect_frames(&mut rx, "hi").await;
    assert!(frames.len() <= 9, "at most (2+1)*3 distinct frames");
    for frame in &frames {
        assert_eq!(frame.chars().count(), 2);
        assert_eq!(frame.chars().next(), Some('h'));
    }
}

#[tokio::test(start_paused = true)]
async fn rapid_second_commit_preempts_the_first() {
    let (mut session, mut rx) = boot();
    session.handle(InboundEvent::Rendered).unwrap();
    drain(&mut rx);

    // No await between the two commits: the first animation task is never
    // polled before its cancellation is queued.
    session.handle(commit("aaaaaa")).unwrap();
    session.handle(commit("zz")).unwrap();
    assert_eq!(drain(&mut rx), vec![SyncMessage::Idle, SyncMessage::Idle]);

    let frames = collect_frames(&mut rx, "zz").await;
    for frame in &frames {
        assert_eq!(frame.chars().count(), 2, "no frame from the stale run");
        assert_eq!(frame.chars().next(), Some('z'));
    }
}

#[tokio::test(start_paused = true)]
async fn control_widgets_are_read_at_commit_time() {
    let (mut session, mut rx) = boot();
    session.handle(InboundEvent::Rendered).unwrap();
    drain(&mut rx);

    session
        .handle(InboundEvent::Patch {
            patch: value_patch(app::MORPH_ITERATIONS, "value", json!(1)),
        })
        .unwrap();
    session.handle(commit("ab")).unwrap();
    drain(&mut rx);

    let frames = collect_frames(&mut rx, "ab").await;
    assert!(frames.len() <= 3, "multiplier 1 caps the run at (2+1)*1 frames");
}

#[tokio::test(start_paused = true)]
async fn out_of_range_iteration_count_is_clamped_to_the_widget_range() {
    let (mut session, mut rx) = boot();
    session.handle(InboundEvent::Rendered).unwrap();
    drain(&mut rx);

    // 2^32 + 1 truncates to 1 as a u32; the widget's 1..=100 range must win.
    session
        .handle(InboundEvent::Patch {
            patch: value_patch(app::MORPH_ITERATIONS, "value", json!(4_294_967_297u64)),
        })
        .unwrap();
    session.handle(commit("ab")).unwrap();
    drain(&mut rx);

    let frames = collect_frames(&mut rx, "ab").await;
    assert!(
        frames.len() > 3,
        "a clamped multiplier of 100 runs far past the 3 frames a wrapped \
         multiplier of 1 would allow, got {}",
        frames.len()
    );
    assert!(frames.len() <= 300, "at most (2+1)*100 distinct frames");
}

#[tokio::test]
async fn location_sync_never_fails_on_unknown_fields() {
    let (mut session, mut rx) = boot();
    drain(&mut rx);

    session
        .handle(InboundEvent::Location {
            location: json!({"search": "?word=hi", "brand_new_field": {"x": 1}}).to_string(),
        })
        .unwrap();
    assert!(drain(&mut rx).is_empty(), "location sync is silent");

    let err = session.handle(InboundEvent::Location {
        location: "[1, 2, 3]".into(),
    });
    assert!(err.is_err(), "non-object location payload is malformed");
}
