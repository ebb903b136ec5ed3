use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;
use thiserror::Error;
use log::info;

const DEFAULT_REPLIES: [&str; 3] = [
    "Hello! How can I assist you today?",
    "Here's more information in a follow-up message.",
    "This is the final part of the response.",
];

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Script file IO error for '{path}': {source}")] Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Script JSON parsing error for '{path}': {source}")] Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Script '{0}' contains no replies")] Empty(String),
}

/// One assistant reply played back by the scripted source.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScriptedReply {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_invocations: Option<JsonValue>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ScriptConfig {
    pub replies: Vec<ScriptedReply>,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            replies: DEFAULT_REPLIES.iter()
                .map(|content| ScriptedReply {
                    content: content.to_string(),
                    tool_invocations: None,
                })
                .collect(),
        }
    }
}

pub fn load_script<P: AsRef<Path>>(path: P) -> Result<ScriptConfig, ScriptError> {
    let display = path.as_ref().display().to_string();
    let file_content = fs::read_to_string(&path).map_err(|source| ScriptError::Io {
        path: display.clone(),
        source,
    })?;
    let config: ScriptConfig = serde_json::from_str(&file_content).map_err(|source| ScriptError::Json {
        path: display.clone(),
        source,
    })?;
    if config.replies.is_empty() {
        return Err(ScriptError::Empty(display));
    }
    info!("Loaded {} scripted replies from '{}'", config.replies.len(), display);
    Ok(config)
}
