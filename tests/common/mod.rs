#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use streamchat::client::ConversationView;
use streamchat::models::chat::Message;
use streamchat::server::{ router, AppState };
use streamchat::source::MessageSource;

/// Records every update a session pushes to its view.
#[derive(Default)]
pub struct RecordingView {
    pub appended: Vec<Message>,
    pub loading: Vec<bool>,
}

impl ConversationView for RecordingView {
    fn message_appended(&mut self, message: &Message) {
        self.appended.push(message.clone());
    }

    fn loading_changed(&mut self, loading: bool) {
        self.loading.push(loading);
    }
}

pub fn ndjson(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}\n", serde_json::to_string(m).expect("serialize")))
        .collect()
}

/// Serves the chat router on an ephemeral port and returns its base URL.
pub async fn spawn_server(source: Arc<dyn MessageSource>, frame_delay: Duration) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = router(AppState::new(source, frame_delay));

    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.expect("serve");
    });

    format!("http://{}", addr)
}
