use std::sync::Arc;

use burp_backend_client::ClientError;
use burp_core::Cancelled;
use burp_core::ChatSession;
use burp_core::CoreError;
use burp_core::MemoryTranscript;
use burp_core::OrCancelExt;
use burp_core::TranscriptEvent;
use burp_core::config::AppConfig;
use burp_protocol::Event;
use burp_protocol::MAX_MESSAGE_BYTES;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use super::fake::ScriptedBackend;

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.session.channel = "lobby".to_string();
    config.session.nickname = "alice".to_string();
    config.session.load_history = false;
    config.generation.temperature = Some(0.5);
    config.generation.top_k = Some(20);
    config
}

fn session(
    backend: ScriptedBackend,
) -> (
    ChatSession<ScriptedBackend>,
    Arc<ScriptedBackend>,
    Arc<MemoryTranscript>,
) {
    let backend = Arc::new(backend);
    let sink = Arc::new(MemoryTranscript::new());
    let session = ChatSession::new(&config(), Arc::clone(&backend), sink.clone()).unwrap();
    (session, backend, sink)
}

#[tokio::test]
async fn submit_trims_and_sends_with_session_settings() {
    let (session, backend, sink) = session(ScriptedBackend::new());

    assert!(session.submit("  hello there \n").await.unwrap());

    let asks = backend.asks();
    assert_eq!(asks.len(), 1);
    assert_eq!(asks[0].body, "hello there");
    assert_eq!(asks[0].channel.as_str(), "lobby");
    assert_eq!(asks[0].model.as_str(), "gpt-5-nano");
    assert_eq!(asks[0].params.temperature, Some(0.5));
    assert_eq!(asks[0].params.top_k, Some(20));
    assert_eq!(asks[0].params.max_tokens, None);
    // Busy stays on until the assistant's end-of-stream arrives.
    assert_eq!(sink.events(), vec![TranscriptEvent::Busy(true)]);
}

#[tokio::test]
async fn blank_input_is_ignored() {
    let (session, backend, sink) = session(ScriptedBackend::new());
    assert!(!session.submit(" \t\n").await.unwrap());
    assert!(backend.asks().is_empty());
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn oversized_message_is_rejected_locally() {
    let (session, backend, sink) = session(ScriptedBackend::new());
    let err = session
        .submit(&"x".repeat(MAX_MESSAGE_BYTES + 1))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::MessageTooLong { .. }));
    assert!(backend.asks().is_empty());
    assert_eq!(
        sink.texts(),
        vec![(
            "help".to_string(),
            format!(
                "message too long ({} bytes, max {MAX_MESSAGE_BYTES})",
                MAX_MESSAGE_BYTES + 1
            )
        )]
    );
}

#[tokio::test]
async fn rejected_send_clears_busy_and_reports() {
    let (session, _backend, sink) = session(ScriptedBackend::new().with_ask_status(400));

    let err = session.submit("hi").await.unwrap_err();
    assert!(matches!(err, CoreError::Rejected { status: 400 }));

    let events = sink.events();
    assert_eq!(events[0], TranscriptEvent::Busy(true));
    assert_eq!(events[1], TranscriptEvent::Busy(false));
    assert_eq!(
        sink.texts(),
        vec![(
            "help".to_string(),
            "try again; send failed: server rejected the message (status 400)".to_string()
        )]
    );
}

#[tokio::test]
async fn transport_failure_is_reported() {
    let (session, _backend, sink) = session(ScriptedBackend::new().with_ask_error(
        ClientError::Status {
            status: 503,
            body: String::new(),
        },
    ));

    assert!(matches!(
        session.submit("hi").await,
        Err(CoreError::Client(_))
    ));
    assert_eq!(
        sink.texts(),
        vec![(
            "help".to_string(),
            "try again; send failed: status 503".to_string()
        )]
    );
}

#[tokio::test(start_paused = true)]
async fn stalled_send_can_be_interrupted() {
    let (session, backend, _sink) = session(ScriptedBackend::new().with_hanging_ask());
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = session.submit("hello").or_cancel(&shutdown).await;

    assert!(matches!(result, Err(Cancelled)));
    assert_eq!(backend.asks().len(), 1);
}

#[tokio::test]
async fn identity_setters_ignore_values_that_sanitize_to_nothing() {
    let (mut session, _backend, _sink) = session(ScriptedBackend::new());

    assert!(!session.set_nickname("!!!"));
    assert_eq!(session.nickname().as_str(), "alice");
    assert!(session.set_nickname("bob-the-builder"));
    assert_eq!(session.nickname().as_str(), "bobthebuilder");

    assert!(!session.set_channel("  "));
    assert_eq!(session.channel_label(), "#lobby");
    assert!(session.set_channel("status"));
    assert_eq!(session.channel_label(), "!status");
}

#[tokio::test]
async fn running_poller_follows_nickname_changes() {
    let (mut session, backend, sink) =
        session(ScriptedBackend::new().then_event(Event::user("first", "2025-09-01T12:00:01Z")));

    let cancel = CancellationToken::new();
    let handle = session.spawn_poller(cancel.clone());
    backend.drained().await;

    assert!(session.set_nickname("bob"));
    backend.push_event(Event::user("second", "2025-09-01T12:00:02Z"));
    backend.drained().await;
    cancel.cancel();
    let reconciler = handle.await.unwrap();

    assert_eq!(
        sink.texts(),
        vec![
            ("alice".to_string(), "first".to_string()),
            ("bob".to_string(), "second".to_string()),
        ]
    );
    assert_eq!(reconciler.cursor().after(), Some("2025-09-01T12:00:02Z"));
}

#[tokio::test]
async fn restored_poller_resumes_without_replaying_history() {
    let mut config = config();
    config.session.load_history = true;
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_recent(vec![Event::user("old", "2025-09-01T12:00:01Z")]),
    );
    let sink = Arc::new(MemoryTranscript::new());
    let mut session = ChatSession::new(&config, Arc::clone(&backend), sink.clone()).unwrap();

    let cancel = CancellationToken::new();
    let handle = session.spawn_poller(cancel.clone());
    backend.drained().await;
    cancel.cancel();
    session.restore(handle.await.unwrap());

    let cancel = CancellationToken::new();
    let handle = session.spawn_poller(cancel.clone());
    backend.drained().await;
    cancel.cancel();
    handle.await.unwrap();

    assert_eq!(backend.recent_calls(), 1);
    assert_eq!(
        backend.afters(),
        vec![
            Some("2025-09-01T12:00:01Z".to_string()),
            Some("2025-09-01T12:00:01Z".to_string()),
        ]
    );
    assert_eq!(sink.texts().len(), 1);
}

#[tokio::test]
async fn switching_channel_drops_saved_cursor() {
    let mut config = config();
    config.session.load_history = true;
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_recent(vec![Event::user("old", "2025-09-01T12:00:01Z")]),
    );
    let sink = Arc::new(MemoryTranscript::new());
    let mut session = ChatSession::new(&config, Arc::clone(&backend), sink.clone()).unwrap();

    let cancel = CancellationToken::new();
    let handle = session.spawn_poller(cancel.clone());
    backend.drained().await;
    cancel.cancel();
    session.restore(handle.await.unwrap());

    assert!(session.set_channel("other"));

    let cancel = CancellationToken::new();
    let handle = session.spawn_poller(cancel.clone());
    backend.drained().await;
    cancel.cancel();
    let reconciler = handle.await.unwrap();

    assert_eq!(backend.recent_calls(), 2);
    assert_eq!(
        backend.afters(),
        vec![Some("2025-09-01T12:00:01Z".to_string()), None]
    );
    let calls = backend.wait_calls();
    assert_eq!(calls[1].channel.as_str(), "other");
    assert_eq!(reconciler.cursor().after(), None);
}

#[tokio::test]
async fn rejoining_same_channel_keeps_saved_cursor() {
    let backend = Arc::new(
        ScriptedBackend::new().then_event(Event::user("hi", "2025-09-01T12:00:03Z")),
    );
    let sink = Arc::new(MemoryTranscript::new());
    let mut session = ChatSession::new(&config(), Arc::clone(&backend), sink.clone()).unwrap();

    let cancel = CancellationToken::new();
    let handle = session.spawn_poller(cancel.clone());
    backend.drained().await;
    cancel.cancel();
    session.restore(handle.await.unwrap());

    assert!(session.set_channel("lobby"));

    let cancel = CancellationToken::new();
    let handle = session.spawn_poller(cancel.clone());
    backend.drained().await;
    cancel.cancel();
    handle.await.unwrap();

    assert_eq!(
        backend.afters().last().cloned().flatten().as_deref(),
        Some("2025-09-01T12:00:03Z")
    );
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = config();
    config.session.model = String::new();
    let result = ChatSession::new(
        &config,
        Arc::new(ScriptedBackend::new()),
        Arc::new(MemoryTranscript::new()),
    );
    assert!(matches!(result, Err(CoreError::Config(_))));
}
