pub mod ollama;
pub mod scripted;

use async_trait::async_trait;
use futures::{ Future, Stream };
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;
use std::fmt;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use log::info;

use crate::config::script::{ load_script, ScriptConfig };
use crate::models::chat::Message;
use crate::stream::DecodeError;
use self::ollama::OllamaSource;
use self::scripted::ScriptedSource;

pub type MessageStream = Pin<Box<dyn Stream<Item = Result<Message, SourceError>> + Send>>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("backend request failed: {0}")] Http(#[from] reqwest::Error),
    #[error("backend returned HTTP {status}: {body}")] Status {
        status: u16,
        body: String,
    },
    #[error("backend stream error: {0}")] Decode(#[from] DecodeError),
    #[error("{0}")] Backend(String),
}

/// Supplies the assistant messages streamed back for one chat request.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn respond(&self, history: &[Message]) -> Result<MessageStream, SourceError>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Scripted,
    Ollama,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseSourceTypeError {
    message: String,
}

impl fmt::Display for ParseSourceTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseSourceTypeError {}

impl FromStr for SourceType {
    type Err = ParseSourceTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scripted" => Ok(SourceType::Scripted),
            "ollama" => Ok(SourceType::Ollama),
            _ =>
                Err(ParseSourceTypeError {
                    message: format!("Invalid message source: '{}'", s),
                }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub source_type: SourceType,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub script_path: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            source_type: SourceType::Scripted,
            base_url: None,
            model: None,
            script_path: None,
        }
    }
}

/// Runs `producer` on its own task and exposes what it sends as a [`MessageStream`].
pub fn create_message_stream<F, Fut>(producer: F) -> MessageStream
    where
        F: FnOnce(mpsc::Sender<Result<Message, SourceError>>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static
{
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        producer(tx).await;
    });

    Box::pin(ReceiverStream::new(rx))
}

pub fn new_source(
    config: &SourceConfig
) -> Result<Arc<dyn MessageSource>, Box<dyn StdError + Send + Sync>> {
    let source: Arc<dyn MessageSource> = match config.source_type {
        SourceType::Scripted => {
            let script = match &config.script_path {
                Some(path) => load_script(path)?,
                None => ScriptConfig::default(),
            };
            Arc::new(ScriptedSource::new(script))
        }
        SourceType::Ollama => {
            let specific_source = OllamaSource::from_config(config)?;
            Arc::new(specific_source)
        }
    };
    info!("Message source configured: {}", source.name());
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_type_parses() {
        assert_eq!("Scripted".parse::<SourceType>(), Ok(SourceType::Scripted));
        assert_eq!("ollama".parse::<SourceType>(), Ok(SourceType::Ollama));
        assert!("openai".parse::<SourceType>().is_err());
    }

    #[test]
    fn default_config_builds_scripted_source() {
        let source = new_source(&SourceConfig::default()).expect("scripted source");
        assert_eq!(source.name(), "scripted");
    }

    #[test]
    fn missing_script_fails_construction() {
        let config = SourceConfig {
            script_path: Some("/no/such/script.json".into()),
            ..SourceConfig::default()
        };
        assert!(new_source(&config).is_err());
    }
}
