use serde::{ Serialize, Deserialize };
use serde_json::Value as JsonValue;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One record of a conversation, and the unit carried by each stream frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    /// Opaque structured payload. Shown in place of `content` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_invocations: Option<JsonValue>,
}

impl Message {
    pub fn user(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
            content: content.into(),
            tool_invocations: None,
        }
    }

    pub fn assistant(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            content: content.into(),
            tool_invocations: None,
        }
    }

    pub fn with_tool_invocations(mut self, invocations: JsonValue) -> Self {
        self.tool_invocations = Some(invocations);
        self
    }

    /// Text to render for this message.
    pub fn display_text(&self) -> String {
        match &self.tool_invocations {
            Some(invocations) =>
                serde_json
                    ::to_string_pretty(invocations)
                    .unwrap_or_else(|_| invocations.to_string()),
            None => self.content.clone(),
        }
    }
}

/// Body of `POST /api/chat`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Ordered, append-only list of messages owned by one client session.
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_uses_camel_case_tool_invocations() {
        let msg = Message::assistant("7", "").with_tool_invocations(json!({ "name": "weather" }));
        let encoded = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(
            encoded,
            json!({
                "id": "7",
                "role": "assistant",
                "content": "",
                "toolInvocations": { "name": "weather" }
            })
        );
    }

    #[test]
    fn absent_tool_invocations_are_omitted() {
        let encoded = serde_json::to_string(&Message::user("1", "hi")).expect("serialize");
        assert_eq!(encoded, r#"{"id":"1","role":"user","content":"hi"}"#);
    }

    #[test]
    fn unknown_role_is_rejected() {
        let parsed = serde_json::from_str::<Message>(r#"{"id":"1","role":"system","content":"x"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn display_prefers_tool_invocations() {
        let msg = Message::assistant("1", "ignored").with_tool_invocations(json!({ "name": "a" }));
        assert_eq!(msg.display_text(), "{\n  \"name\": \"a\"\n}");
        assert_eq!(Message::assistant("2", "plain").display_text(), "plain");
    }

    #[test]
    fn conversation_keeps_arrival_order() {
        let mut conv = Conversation::new();
        conv.push(Message::assistant("2", "second"));
        conv.push(Message::assistant("1", "first"));
        conv.push(Message::assistant("1", "first"));
        let ids: Vec<_> = conv.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "1"]);
    }
}
