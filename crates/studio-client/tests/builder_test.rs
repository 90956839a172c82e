use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use studio_client::builder::{ChatMessage, Role};
use studio_client::{
    ApiClient, Artifact, BuilderEvent, ClientConfig, ClientError, Conversation, Phase, run_turn,
};
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token(content: &str) -> BuilderEvent {
    BuilderEvent::Token {
        content: content.to_string(),
    }
}

fn last(conversation: &Conversation) -> &ChatMessage {
    conversation.messages().last().unwrap()
}

#[test]
fn test_begin_send_guards() {
    let mut conversation = Conversation::default();

    // 1. Empty text
    assert!(matches!(
        conversation.begin_send("   ", vec![]),
        Err(ClientError::Validation(_))
    ));

    // 2. Too many attachments
    let six = (0..6).map(|i| format!("file_{i}")).collect();
    assert!(matches!(
        conversation.begin_send("hi", six),
        Err(ClientError::TooManyAttachments { count: 6, max: 5 })
    ));
    assert!(conversation.messages().is_empty());

    // 3. Busy while streaming
    conversation.begin_send("hi", vec!["file_1".into()]).unwrap();
    assert!(matches!(
        conversation.begin_send("again", vec![]),
        Err(ClientError::ConversationBusy)
    ));
    assert_eq!(conversation.messages().len(), 2);
    assert_eq!(conversation.messages()[0].role, Role::User);
    assert_eq!(conversation.messages()[0].attachments, vec!["file_1".to_string()]);
}

#[test]
fn test_attachment_limit_follows_config() {
    let config = ClientConfig::default().with_max_attachments(2);
    let mut conversation = Conversation::from_config(&config);

    let three = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    assert!(matches!(
        conversation.begin_send("hi", three),
        Err(ClientError::TooManyAttachments { count: 3, max: 2 })
    ));
    assert!(conversation.begin_send("hi", vec!["a".into(), "b".into()]).is_ok());
}

#[test]
fn test_tokens_append_in_order_then_done() {
    let mut conversation = Conversation::default();
    conversation.begin_send("build me a scraper", vec![]).unwrap();
    assert_eq!(conversation.phase(), &Phase::Streaming);

    conversation.apply(BuilderEvent::Status {
        message: "thinking".into(),
    });
    assert_eq!(conversation.status(), Some("thinking"));

    for piece in ["Sure", ", ", "here"] {
        conversation.apply(token(piece));
    }
    conversation.apply(BuilderEvent::Done);

    assert_eq!(last(&conversation).content, "Sure, here");
    assert_eq!(conversation.phase(), &Phase::Idle);
    assert!(!conversation.is_streaming());
    assert!(!conversation.apply(token("late")), "events after done are ignored");
}

#[test]
fn test_generation_survives_done() {
    let mut conversation = Conversation::default();
    conversation.begin_send("make a node", vec![]).unwrap();

    conversation.apply(token("Done."));
    conversation.apply(BuilderEvent::GenerationComplete {
        node: Some(json!({ "node_type": "custom_parser" })),
    });
    conversation.apply(BuilderEvent::Done);

    assert!(matches!(conversation.artifact(), Some(Artifact::Node(_))));
    assert!(matches!(conversation.phase(), Phase::Generated { .. }));

    // A new message can be sent from the generated phase.
    conversation.begin_send("thanks", vec![]).unwrap();
    assert_eq!(conversation.phase(), &Phase::Streaming);
}

#[test]
fn test_error_event_returns_to_idle() {
    let mut conversation = Conversation::default();
    conversation.begin_send("hello", vec![]).unwrap();

    conversation.apply(BuilderEvent::Error {
        message: "provider unavailable".into(),
    });

    assert_eq!(conversation.phase(), &Phase::Idle);
    assert_eq!(conversation.last_error(), Some("provider unavailable"));
    assert_eq!(conversation.messages().len(), 1, "empty reply removed");
}

#[test]
fn test_cancel_trims_very_short_replies() {
    let mut conversation = Conversation::default();
    conversation.begin_send("hello", vec![]).unwrap();
    conversation.apply(token(" O k"));

    assert!(conversation.cancel());
    assert_eq!(conversation.messages().len(), 1);
    assert_eq!(conversation.phase(), &Phase::Idle);
    assert!(!conversation.cancel(), "nothing left to cancel");
}

#[test]
fn test_cancel_keeps_partial_reply() {
    let mut conversation = Conversation::default();
    conversation.begin_send("hello", vec![]).unwrap();
    conversation.apply(token("Here is a partial"));

    conversation.cancel();

    assert_eq!(conversation.messages().len(), 2);
    assert_eq!(last(&conversation).content, "Here is a partial");
    assert!(!conversation.apply(token(" answer")));
}

#[test]
fn test_event_decoding_skips_malformed_payloads() {
    assert_eq!(
        BuilderEvent::decode(None, r#"{"type":"token","content":"a"}"#),
        Some(token("a"))
    );
    assert_eq!(
        BuilderEvent::decode(Some("status"), r#"{"message":"working"}"#),
        Some(BuilderEvent::Status {
            message: "working".into()
        })
    );
    assert_eq!(BuilderEvent::decode(None, "[DONE]"), Some(BuilderEvent::Done));

    assert_eq!(BuilderEvent::decode(None, "{oops"), None);
    assert_eq!(BuilderEvent::decode(None, "[1, 2]"), None);
    assert_eq!(BuilderEvent::decode(None, r#"{"content":"a"}"#), None);
    assert_eq!(BuilderEvent::decode(None, r#"{"type":"mystery"}"#), None);
    assert_eq!(BuilderEvent::decode(None, r#"{"type":"token"}"#), None);
}

#[tokio::test]
async fn test_named_events_and_split_lines_decode() {
    let server = MockServer::start().await;
    let body = concat!(
        "event: token\r\n",
        "data: {\"content\":\"multi\"}\r\n\r\n",
        "event: status\n",
        "data: {\"message\":\n",
        "data: \"line\"}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/builder/conversations/conv_2/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let events: Vec<BuilderEvent> = client
        .stream_message("conv_2", "hi", &[])
        .await
        .unwrap()
        .map(|e| e.unwrap())
        .collect()
        .await;

    assert_eq!(
        events,
        vec![
            token("multi"),
            BuilderEvent::Status {
                message: "line".into()
            },
            BuilderEvent::Done,
        ]
    );
}

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(&ClientConfig::default().with_base_url(server.uri())).unwrap()
}

async fn mount_conversation(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/builder/conversations"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "conv_1" })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_run_turn_streams_a_workflow_draft() {
    let server = MockServer::start().await;
    mount_conversation(&server).await;

    let body = concat!(
        ": connected\n\n",
        "data: {\"type\":\"status\",\"message\":\"planning\"}\n\n",
        "data: {\"type\":\"token\",\"content\":\"Hel\"}\n\n",
        "data: {not json}\n\n",
        "data: {\"type\":\"token\",\"content\":\"lo\"}\n\n",
        "data: {\"type\":\"workflow_draft\",\"workflow\":{\"name\":\"Scraper\",\"nodes\":[]}}\n\n",
        "data: {\"type\":\"done\"}\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/builder/conversations/conv_1/messages"))
        .and(body_partial_json(json!({ "content": "scrape a page", "attachments": ["f1"] })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut conversation = Conversation::default();
    let (_cancel_tx, cancel_rx) = mpsc::channel(1);

    run_turn(&client, &mut conversation, "scrape a page", vec!["f1".into()], cancel_rx)
        .await
        .unwrap();

    assert_eq!(conversation.id.as_deref(), Some("conv_1"));
    assert_eq!(last(&conversation).content, "Hello");
    let draft = conversation.artifact().unwrap().workflow_document().unwrap();
    assert_eq!(draft.name, "Scraper");
    assert!(!conversation.is_streaming());
}

#[tokio::test]
async fn test_run_turn_with_dropped_cancel_sender_still_completes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/builder/conversations/conv_7/messages"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                "data: {\"type\":\"token\",\"content\":\"ok!\"}\n\n",
                "text/event-stream",
            ),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut conversation = Conversation::default().with_id("conv_7");
    let (cancel_tx, cancel_rx) = mpsc::channel(1);
    drop(cancel_tx);

    run_turn(&client, &mut conversation, "hi", vec![], cancel_rx)
        .await
        .unwrap();

    // The stream ended without `done`; the reply is kept and the phase closed.
    assert_eq!(last(&conversation).content, "ok!");
    assert_eq!(conversation.phase(), &Phase::Idle);
}

#[tokio::test]
async fn test_run_turn_cancel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/builder/conversations/conv_1/messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("data: {\"type\":\"done\"}\n\n", "text/event-stream")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut conversation = Conversation::default().with_id("conv_1");
    let (cancel_tx, cancel_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = cancel_tx.send(()).await;
    });

    let result = run_turn(&client, &mut conversation, "long task", vec![], cancel_rx).await;

    assert!(matches!(result, Err(ClientError::Cancelled)));
    assert!(!conversation.is_streaming());
    assert_eq!(conversation.messages().len(), 1, "empty reply trimmed");
}

#[tokio::test]
async fn test_run_turn_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/builder/conversations/conv_1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut conversation = Conversation::default().with_id("conv_1");
    let (_cancel_tx, cancel_rx) = mpsc::channel(1);

    let err = run_turn(&client, &mut conversation, "hi", vec![], cancel_rx)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Status { status: 500, .. }));
    assert_eq!(conversation.phase(), &Phase::Idle);
    assert!(conversation.last_error().is_some());

    // The conversation is usable again.
    assert!(conversation.begin_send("retry", vec![]).is_ok());
}
