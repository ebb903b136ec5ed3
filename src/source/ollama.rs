use async_trait::async_trait;
use futures::StreamExt;
use log::{ info, warn };
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;
use uuid::Uuid;

use super::{ create_message_stream, MessageSource, MessageStream, SourceConfig, SourceError, SourceType };
use crate::models::chat::{ Message, Role };
use crate::stream::{ decode_frames, FramePolicy };

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "cogito:3b";

/// Answers with one assistant message generated by an Ollama model.
#[derive(Debug)]
pub struct OllamaSource {
    http: HttpClient,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChunkMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct OllamaChunk {
    message: Option<OllamaChunkMessage>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

impl OllamaSource {
    pub fn new(base_url: Option<String>, model: Option<String>) -> Self {
        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.into());

        Self {
            http: HttpClient::new(),
            base_url: url.trim_end_matches('/').to_string(),
            model,
        }
    }

    pub fn from_config(config: &SourceConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        if config.source_type != SourceType::Ollama {
            return Err("Invalid config type for OllamaSource".into());
        }

        Ok(Self::new(config.base_url.clone(), config.model.clone()))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl MessageSource for OllamaSource {
    async fn respond(&self, history: &[Message]) -> Result<MessageStream, SourceError> {
        let url = format!("{}/api/chat", self.base_url);
        let req = OllamaChatRequest {
            model: &self.model,
            messages: history
                .iter()
                .map(|m| OllamaMessage { role: m.role, content: &m.content })
                .collect(),
            stream: true,
        };

        let response = self.http.post(&url).json(&req).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status { status, body });
        }
        info!("Streaming completion from Ollama model {}", self.model);

        let chunks = decode_frames::<_, _, _, OllamaChunk>(
            response.bytes_stream(),
            FramePolicy::Tolerant
        );

        Ok(
            create_message_stream(move |tx| async move {
                let mut chunks = std::pin::pin!(chunks);
                let mut content = String::new();
                let mut finished = false;

                while let Some(chunk) = chunks.next().await {
                    match chunk {
                        Ok(OllamaChunk { error: Some(message), .. }) => {
                            let _ = tx.send(Err(SourceError::Backend(message))).await;
                            return;
                        }
                        Ok(chunk) => {
                            if let Some(message) = chunk.message {
                                content.push_str(&message.content);
                            }
                            if chunk.done {
                                finished = true;
                                break;
                            }
                        }
                        Err(e) => {
                            let _ = tx.send(Err(e.into())).await;
                            return;
                        }
                    }
                }

                if !finished {
                    warn!("Ollama stream ended without a done marker");
                }
                if content.is_empty() {
                    return;
                }
                let message = Message::assistant(Uuid::new_v4().to_string(), content);
                let _ = tx.send(Ok(message)).await;
            })
        )
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
