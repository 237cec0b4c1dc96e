//! A full session against a mocked HTTP server.

use std::sync::Arc;
use std::time::Duration;

use burp_backend_client::HttpChatClient;
use burp_core::ChatSession;
use burp_core::MemoryTranscript;
use burp_core::TranscriptEvent;
use burp_core::config::AppConfig;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_string;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;

fn t(second: u32) -> String {
    format!("2025-09-01T12:00:{second:02}Z")
}

async fn mount_wait(server: &MockServer, after: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/wait"))
        .and(query_param("id", "lobby"))
        .and(query_param("after", after))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn wait_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == "/wait")
        .count()
}

#[tokio::test]
async fn history_send_and_streamed_reply() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/recent"))
        .and(query_param("id", "lobby"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"ID": "lobby", "Body": "", "Time": t(2), "Role": 1},
            {"ID": "lobby", "Body": "earlier answer", "Time": t(1), "Role": 1},
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ask"))
        .and(query_param("id", "lobby"))
        .and(query_param("model", "gpt-5-nano"))
        .and(body_string("hi bot"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    mount_wait(&server, &t(2), json!({"Body": "hi bot", "Time": t(3), "Role": 2})).await;
    mount_wait(&server, &t(3), json!({"Body": "Hello  \n\n wor", "Time": t(4), "Role": 1})).await;
    mount_wait(&server, &t(4), json!({"Body": "ld", "Time": t(5), "Role": 1})).await;
    mount_wait(&server, &t(5), json!({"Body": "", "Time": t(6), "Role": 1})).await;
    mount_wait(&server, &t(6), json!({"Body": "", "Time": t(7), "LongPollTimeout": true})).await;
    // Nothing newer: hold the poll open like the real server would.
    Mock::given(method("GET"))
        .and(path("/wait"))
        .and(query_param("after", t(7)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(30))
                .set_body_json(json!({"LongPollTimeout": true, "Time": t(59)})),
        )
        .mount(&server)
        .await;

    let mut config = AppConfig::default();
    config.server.url = server.uri();
    config.session.channel = "lobby".to_string();
    config.session.nickname = "alice".to_string();

    let backend = Arc::new(HttpChatClient::new(&config.server.url, None).expect("client"));
    let sink = Arc::new(MemoryTranscript::new());
    let mut session = ChatSession::new(&config, backend, sink.clone()).expect("session");

    assert!(session.submit("hi bot").await.expect("submit"));

    let cancel = CancellationToken::new();
    let handle = session.spawn_poller(cancel.clone());
    tokio::time::timeout(Duration::from_secs(10), async {
        while wait_requests(&server).await < 6 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("poller reached the idle long-poll");
    cancel.cancel();
    let reconciler = handle.await.expect("poller task");

    assert_eq!(
        sink.texts(),
        vec![
            ("burp".to_string(), "earlier answer".to_string()),
            ("alice".to_string(), "hi bot".to_string()),
            ("burp".to_string(), "Hello".to_string()),
            ("burp".to_string(), "world".to_string()),
        ]
    );
    let turns: Vec<String> = sink
        .events()
        .into_iter()
        .filter_map(|event| match event {
            TranscriptEvent::TurnComplete(message) => Some(message.text()),
            _ => None,
        })
        .collect();
    assert_eq!(turns, vec!["earlier answer", "Hello\nworld"]);
    assert_eq!(reconciler.cursor().after(), Some(t(7).as_str()));
}
