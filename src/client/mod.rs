pub mod repl;
pub mod session;

use futures::{ Stream, StreamExt };
use log::{ debug, info };
use reqwest::{ Client as HttpClient, StatusCode };
use std::pin::Pin;
use thiserror::Error;
use url::Url;

use crate::models::chat::{ ChatRequest, Message };
use crate::stream::{ decode_frames, DecodeError, FramePolicy, CHAT_ROUTE };

pub use session::{ ChatSession, ConversationView, SubmitOutcome, SUGGESTIONS };

pub type ChatStream = Pin<Box<dyn Stream<Item = Result<Message, ClientError>> + Send>>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server URL: {0}")] InvalidUrl(#[from] url::ParseError),
    #[error("request failed: {0}")] Http(#[from] reqwest::Error),
    #[error("server returned HTTP {status}: {body}")] Status {
        status: u16,
        body: String,
    },
    #[error("No response body")]
    NoBody,
    #[error(transparent)] Stream(#[from] DecodeError),
}

/// HTTP side of the consumer: posts the history and decodes the streamed reply.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: HttpClient,
    endpoint: Url,
    policy: FramePolicy,
}

impl ChatClient {
    pub fn new(server_url: &str, policy: FramePolicy) -> Result<Self, ClientError> {
        let mut base = Url::parse(server_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(CHAT_ROUTE.trim_start_matches('/'))?;

        Ok(Self {
            http: HttpClient::new(),
            endpoint,
            policy,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn policy(&self) -> FramePolicy {
        self.policy
    }

    /// Sends `history` and returns the reply as a stream of messages, each
    /// yielded as soon as its frame is complete.
    pub async fn stream_chat(&self, history: &[Message]) -> Result<ChatStream, ClientError> {
        let body = ChatRequest { messages: history.to_vec() };
        debug!("POST {} with {} messages", self.endpoint, body.messages.len());

        let response = self.http.post(self.endpoint.clone()).json(&body).send().await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Err(ClientError::NoBody);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status: status.as_u16(), body });
        }
        info!("Receiving chat stream from {}", self.endpoint);

        let frames = decode_frames::<_, _, _, Message>(response.bytes_stream(), self.policy);
        Ok(Box::pin(frames.map(|item| item.map_err(ClientError::from))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_appends_chat_route() {
        let client = ChatClient::new("http://127.0.0.1:3000", FramePolicy::Strict).expect("client");
        assert_eq!(client.endpoint().as_str(), "http://127.0.0.1:3000/api/chat");
    }

    #[test]
    fn endpoint_keeps_path_prefix() {
        let client = ChatClient::new("https://example.test/chat-app", FramePolicy::Strict).expect(
            "client"
        );
        assert_eq!(client.endpoint().as_str(), "https://example.test/chat-app/api/chat");
    }

    #[test]
    fn keeps_configured_policy() {
        let client = ChatClient::new("http://127.0.0.1:3000", FramePolicy::Tolerant).expect("client");
        assert_eq!(client.policy(), FramePolicy::Tolerant);
    }

    #[test]
    fn rejects_unparseable_url() {
        assert!(matches!(ChatClient::new("not a url", FramePolicy::Strict), Err(ClientError::InvalidUrl(_))));
    }
}
