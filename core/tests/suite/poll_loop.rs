use std::sync::Arc;
use std::time::Duration;

use burp_core::LineSegmenter;
use burp_core::MemoryTranscript;
use burp_core::PollDriver;
use burp_core::Reconciler;
use burp_core::TranscriptEvent;
use burp_protocol::ChannelId;
use burp_protocol::Event;
use burp_protocol::Nickname;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use super::fake::ScriptedBackend;
use super::fake::server_error;

fn t(second: u32) -> String {
    format!("2025-09-01T12:00:{second:02}Z")
}

fn driver(
    backend: &Arc<ScriptedBackend>,
    sink: &Arc<MemoryTranscript>,
) -> PollDriver<ScriptedBackend> {
    let reconciler = Reconciler::new(Nickname::default(), LineSegmenter::default());
    PollDriver::new(
        Arc::clone(backend),
        sink.clone(),
        ChannelId::sanitize("lobby").unwrap(),
        reconciler,
    )
}

/// Run until the script is used up, then cancel and return the final state.
async fn run_to_end(driver: PollDriver<ScriptedBackend>, backend: &ScriptedBackend) -> Reconciler {
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(driver.run(cancel.clone()));
    backend.drained().await;
    cancel.cancel();
    handle.await.expect("poller task")
}

#[tokio::test]
async fn catch_up_replays_history_then_polls_after_newest() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_recent(vec![
                Event::assistant("", t(3)),
                Event::assistant("the answer\n", t(2)),
                Event::user("question", t(1)),
            ])
            .then_event(Event::user("follow-up", t(4))),
    );
    let sink = Arc::new(MemoryTranscript::new());

    let reconciler = run_to_end(driver(&backend, &sink), &backend).await;

    assert_eq!(backend.recent_calls(), 1);
    assert_eq!(backend.afters(), vec![Some(t(3)), Some(t(4))]);
    assert_eq!(
        sink.texts(),
        vec![
            ("anon".to_string(), "question".to_string()),
            ("burp".to_string(), "the answer".to_string()),
            ("anon".to_string(), "follow-up".to_string()),
        ]
    );
    assert_eq!(reconciler.cursor().after(), Some(t(4).as_str()));
}

#[tokio::test]
async fn first_wait_omits_after_when_there_is_no_cursor() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .then_event(Event::timeout_sentinel(t(10)))
            .then_event(Event::timeout_sentinel(t(40))),
    );
    let sink = Arc::new(MemoryTranscript::new());

    run_to_end(driver(&backend, &sink), &backend).await;

    assert_eq!(backend.afters(), vec![None, Some(t(10)), Some(t(40))]);
    assert!(sink.events().is_empty());
    assert!(
        backend
            .wait_calls()
            .iter()
            .all(|call| call.channel.as_str() == "lobby")
    );
}

#[tokio::test(start_paused = true)]
async fn failed_poll_retries_with_identical_cursor_after_delay() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .then_event(Event::user("one", t(1)))
            .then_fail()
            .then_event(Event::user("two", t(2))),
    );
    let sink = Arc::new(MemoryTranscript::new());

    let reconciler = run_to_end(driver(&backend, &sink), &backend).await;

    assert_eq!(
        backend.afters(),
        vec![None, Some(t(1)), Some(t(1)), Some(t(2))]
    );
    let calls = backend.wait_calls();
    assert!(calls[2].at - calls[1].at >= Duration::from_secs(5));
    assert_eq!(
        sink.texts(),
        vec![
            ("anon".to_string(), "one".to_string()),
            (
                "help".to_string(),
                "poll failed; retrying in 5s: status 500".to_string()
            ),
            ("anon".to_string(), "two".to_string()),
        ]
    );
    assert_eq!(reconciler.cursor().after(), Some(t(2).as_str()));
}

#[tokio::test(start_paused = true)]
async fn retry_delay_is_configurable() {
    let backend = Arc::new(ScriptedBackend::new().then_fail().then_fail());
    let sink = Arc::new(MemoryTranscript::new());
    let driver = driver(&backend, &sink).with_retry_delay(Duration::from_millis(250));

    run_to_end(driver, &backend).await;

    let calls = backend.wait_calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[1].at - calls[0].at >= Duration::from_millis(250));
    assert!(calls[1].at - calls[0].at < Duration::from_secs(5));
    assert_eq!(
        sink.texts()[0].1,
        "poll failed; retrying in 0.25s: status 500"
    );
}

#[tokio::test]
async fn history_failure_is_reported_and_live_loop_still_starts() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_recent_error(server_error())
            .then_event(Event::user("live", t(5))),
    );
    let sink = Arc::new(MemoryTranscript::new());

    run_to_end(driver(&backend, &sink), &backend).await;

    assert_eq!(
        sink.texts(),
        vec![
            (
                "help".to_string(),
                "history load failed: status 500".to_string()
            ),
            ("anon".to_string(), "live".to_string()),
        ]
    );
    assert_eq!(backend.afters(), vec![None, Some(t(5))]);
}

#[tokio::test]
async fn catch_up_can_be_skipped() {
    let backend = Arc::new(ScriptedBackend::new().with_recent(vec![Event::user("old", t(1))]));
    let sink = Arc::new(MemoryTranscript::new());

    run_to_end(driver(&backend, &sink).with_catch_up(false), &backend).await;

    assert_eq!(backend.recent_calls(), 0);
    assert_eq!(backend.afters(), vec![None]);
    assert!(sink.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_interrupts_retry_sleep() {
    let backend = Arc::new(ScriptedBackend::new().then_fail());
    let sink = Arc::new(MemoryTranscript::new());
    let driver = driver(&backend, &sink).with_retry_delay(Duration::from_secs(3600));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(driver.run(cancel.clone()));
    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();
    let reconciler = handle.await.expect("poller task");

    assert_eq!(backend.wait_calls().len(), 1);
    assert_eq!(reconciler.cursor().after(), None);
    assert!(matches!(
        sink.events().as_slice(),
        [TranscriptEvent::Line(line)] if line.text.starts_with("poll failed; retrying in 3600s")
    ));
}

#[tokio::test]
async fn cancel_before_start_skips_everything() {
    let backend = Arc::new(ScriptedBackend::new().with_recent(vec![Event::user("old", t(1))]));
    let sink = Arc::new(MemoryTranscript::new());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let reconciler = driver(&backend, &sink).run(cancel).await;

    assert_eq!(backend.recent_calls(), 0);
    assert!(backend.wait_calls().is_empty());
    assert_eq!(reconciler.cursor().after(), None);
}
