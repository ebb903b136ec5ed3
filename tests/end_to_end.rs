//! Producer and consumer talking over a real socket.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{ spawn_server, RecordingView };
use futures::{ stream, StreamExt };
use serde_json::json;
use streamchat::client::{ ChatClient, ChatSession, SubmitOutcome };
use streamchat::config::script::{ ScriptConfig, ScriptedReply };
use streamchat::models::chat::{ Message, Role };
use streamchat::client::ClientError;
use streamchat::source::scripted::ScriptedSource;
use streamchat::source::{ MessageSource, MessageStream, SourceError };
use streamchat::stream::FramePolicy;

#[tokio::test]
async fn submit_appends_user_message_then_streamed_replies() {
    let base = spawn_server(Arc::new(ScriptedSource::default()), Duration::from_millis(20)).await;
    let client = ChatClient::new(&base, FramePolicy::Strict).expect("client");
    let mut session = ChatSession::new(client);
    let mut view = RecordingView::default();

    session.set_input("hello there");
    let outcome = session.submit(&mut view).await;

    assert!(matches!(outcome, SubmitOutcome::Completed { received: 3 }), "got {:?}", outcome);
    assert!(!session.is_loading());
    assert_eq!(view.loading, vec![true, false]);
    assert_eq!(session.input(), "");

    let messages = session.conversation().messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "hello there");
    let replies: Vec<_> = messages[1..].iter().map(|m| (m.id.as_str(), m.role)).collect();
    assert_eq!(replies, vec![("1", Role::Assistant), ("2", Role::Assistant), ("3", Role::Assistant)]);
    assert_eq!(view.appended, messages.to_vec());
}

#[tokio::test]
async fn second_turn_keeps_appending() {
    let base = spawn_server(Arc::new(ScriptedSource::default()), Duration::ZERO).await;
    let mut session = ChatSession::new(ChatClient::new(&base, FramePolicy::Strict).expect("client"));
    let mut view = RecordingView::default();

    session.set_input("one");
    session.submit(&mut view).await;
    session.set_input("two");
    session.submit(&mut view).await;

    let conv = session.conversation().messages();
    assert_eq!(conv.len(), 8);
    assert_eq!(conv[4].content, "two");
    // Assistant ids repeat across turns; the conversation keeps both copies.
    assert_eq!(conv[1].id, conv[5].id);
}

#[tokio::test]
async fn message_round_trips_field_for_field() {
    let script = ScriptConfig {
        replies: vec![
            ScriptedReply { content: "multi\nline ✓ 😀".into(), tool_invocations: None },
            ScriptedReply {
                content: String::new(),
                tool_invocations: Some(json!({ "name": "lookup", "args": { "q": "rust" } })),
            }
        ],
    };
    let base = spawn_server(Arc::new(ScriptedSource::new(script)), Duration::ZERO).await;
    let client = ChatClient::new(&base, FramePolicy::Strict).expect("client");

    let received: Vec<Message> = client
        .stream_chat(&[]).await
        .expect("stream")
        .map(|r| r.expect("message"))
        .collect().await;

    assert_eq!(received, vec![
        Message::assistant("1", "multi\nline ✓ 😀"),
        Message::assistant("2", "").with_tool_invocations(json!({ "name": "lookup", "args": { "q": "rust" } }))
    ]);
}

#[tokio::test]
async fn frames_arrive_before_the_stream_ends() {
    let base = spawn_server(Arc::new(ScriptedSource::default()), Duration::from_millis(300)).await;
    let client = ChatClient::new(&base, FramePolicy::Strict).expect("client");
    let mut stream = client.stream_chat(&[]).await.expect("stream");

    let started = tokio::time::Instant::now();
    let first = stream.next().await.expect("first").expect("message");
    assert_eq!(first.id, "1");
    assert!(started.elapsed() < Duration::from_millis(300));

    let rest: Vec<_> = stream.collect().await;
    assert_eq!(rest.len(), 2);
    assert!(started.elapsed() >= Duration::from_millis(500));
}

#[tokio::test]
async fn unreachable_server_fails_without_rollback() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = ChatClient::new(&format!("http://{}", addr), FramePolicy::Strict).expect("client");
    let mut session = ChatSession::new(client);
    let mut view = RecordingView::default();

    session.set_input("anyone?");
    let outcome = session.submit(&mut view).await;

    assert!(matches!(outcome, SubmitOutcome::Failed { received: 0, .. }));
    assert_eq!(session.conversation().len(), 1);
    assert_eq!(view.loading, vec![true, false]);
    assert!(!session.is_loading());
}

/// Yields one good message, then fails.
struct BreaksAfterFirst;

#[async_trait]
impl MessageSource for BreaksAfterFirst {
    async fn respond(&self, _history: &[Message]) -> Result<MessageStream, SourceError> {
        let items: Vec<Result<Message, SourceError>> = vec![
            Ok(Message::assistant("1", "partial answer")),
            Err(SourceError::Backend("model crashed".into()))
        ];
        Ok(Box::pin(stream::iter(items)))
    }

    fn name(&self) -> &str {
        "breaks-after-first"
    }
}

#[tokio::test]
async fn frames_before_a_source_failure_still_reach_the_client() {
    for delay in [Duration::ZERO, Duration::from_millis(200)] {
        let base = spawn_server(Arc::new(BreaksAfterFirst), delay).await;
        let mut session = ChatSession::new(ChatClient::new(&base, FramePolicy::Strict).expect("client"));
        let mut view = RecordingView::default();

        session.set_input("hello");
        let outcome = session.submit(&mut view).await;

        match outcome {
            SubmitOutcome::Failed { received, error } => {
                assert_eq!(received, 1, "delay {:?}", delay);
                assert!(matches!(error, ClientError::Stream(_)), "got {:?}", error);
            }
            other => panic!("expected a truncated stream, got {:?}", other),
        }
        let last = session.conversation().messages().last().expect("reply");
        assert_eq!(last.content, "partial answer");
        assert_eq!(view.loading, vec![true, false]);
    }
}

#[tokio::test]
async fn cancelled_submit_clears_loading() {
    let base = spawn_server(Arc::new(ScriptedSource::default()), Duration::from_millis(500)).await;
    let mut session = ChatSession::new(ChatClient::new(&base, FramePolicy::Strict).expect("client"));
    let mut view = RecordingView::default();

    session.set_input("slow please");
    let timed_out = tokio::time::timeout(Duration::from_millis(200), session.submit(&mut view)).await;

    assert!(timed_out.is_err());
    assert!(!session.is_loading());
    assert_eq!(view.loading, vec![true, false]);
    // The user message and the first, undelayed frame were appended before the cut.
    assert_eq!(session.conversation().len(), 2);
}
