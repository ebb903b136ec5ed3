use async_trait::async_trait;
use futures::stream;
use log::debug;

use super::{ MessageSource, MessageStream, SourceError };
use crate::config::script::ScriptConfig;
use crate::models::chat::Message;

/// Plays back a fixed list of assistant replies regardless of the history.
///
/// Ids restart at `"1"` for every response.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    script: ScriptConfig,
}

impl ScriptedSource {
    pub fn new(script: ScriptConfig) -> Self {
        Self { script }
    }

    fn messages(&self) -> Vec<Message> {
        self.script.replies
            .iter()
            .enumerate()
            .map(|(idx, reply)| {
                let message = Message::assistant((idx + 1).to_string(), reply.content.clone());
                match &reply.tool_invocations {
                    Some(invocations) => message.with_tool_invocations(invocations.clone()),
                    None => message,
                }
            })
            .collect()
    }
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new(ScriptConfig::default())
    }
}

#[async_trait]
impl MessageSource for ScriptedSource {
    async fn respond(&self, history: &[Message]) -> Result<MessageStream, SourceError> {
        debug!("Scripted source answering a history of {} messages", history.len());
        let items: Vec<Result<Message, SourceError>> = self.messages().into_iter().map(Ok).collect();
        Ok(Box::pin(stream::iter(items)))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
