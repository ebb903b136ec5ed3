use chrono::Utc;
use futures::StreamExt;
use log::{ error, info };

use super::{ ChatClient, ClientError };
use crate::models::chat::{ Conversation, Message };

/// Canned prompts offered while the conversation is empty.
pub const SUGGESTIONS: [&str; 4] = [
    "What's the weather like today?",
    "Tell me a fun fact",
    "How can I learn programming?",
    "Write a short story",
];

/// Receives conversation updates as they happen.
pub trait ConversationView {
    fn message_appended(&mut self, message: &Message);

    fn loading_changed(&mut self, _loading: bool) {}
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// The input was blank; nothing was sent.
    Ignored,
    Completed {
        received: usize,
    },
    /// The request failed after `received` messages had been appended.
    Failed {
        received: usize,
        error: ClientError,
    },
}

/// Client-side state of one chat session.
///
/// `submit` takes `&mut self`, so a session never has two requests in flight.
pub struct ChatSession {
    client: ChatClient,
    conversation: Conversation,
    input: String,
    loading: bool,
    last_user_id: i64,
}

impl ChatSession {
    pub fn new(client: ChatClient) -> Self {
        Self {
            client,
            conversation: Conversation::new(),
            input: String::new(),
            loading: false,
            last_user_id: 0,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// Prefills the input with suggestion `index` (zero-based).
    pub fn apply_suggestion(&mut self, index: usize) -> Option<&str> {
        let suggestion = SUGGESTIONS.get(index)?;
        self.input = suggestion.to_string();
        Some(suggestion)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Sends the current input and appends every streamed reply.
    ///
    /// Errors never escape: they end loading and leave whatever was already
    /// appended in place.
    pub async fn submit<V: ConversationView + ?Sized>(&mut self, view: &mut V) -> SubmitOutcome {
        if self.input.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }

        let content = std::mem::take(&mut self.input);
        let user_message = Message::user(self.next_user_id(), content);
        append(&mut self.conversation, user_message, view);

        let mut received = 0usize;
        let result = {
            // Dropping the submit future drops the guard too, so loading is
            // cleared on cancellation as well as on completion.
            let mut guard = LoadingGuard::start(&mut self.loading, view);
            receive(&self.client, &mut self.conversation, &mut *guard.view, &mut received).await
        };

        match result {
            Ok(()) => {
                info!("Chat response complete with {} messages", received);
                SubmitOutcome::Completed { received }
            }
            Err(e) => {
                error!("Error fetching response: {}", e);
                SubmitOutcome::Failed { received, error: e }
            }
        }
    }

    // Millisecond timestamp, bumped when two messages land in the same millisecond.
    fn next_user_id(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        self.last_user_id = now.max(self.last_user_id + 1);
        self.last_user_id.to_string()
    }
}

struct LoadingGuard<'a, V: ConversationView + ?Sized> {
    loading: &'a mut bool,
    view: &'a mut V,
}

impl<'a, V: ConversationView + ?Sized> LoadingGuard<'a, V> {
    fn start(loading: &'a mut bool, view: &'a mut V) -> Self {
        *loading = true;
        view.loading_changed(true);
        Self { loading, view }
    }
}

impl<V: ConversationView + ?Sized> Drop for LoadingGuard<'_, V> {
    fn drop(&mut self) {
        *self.loading = false;
        self.view.loading_changed(false);
    }
}

async fn receive<V: ConversationView + ?Sized>(
    client: &ChatClient,
    conversation: &mut Conversation,
    view: &mut V,
    received: &mut usize
) -> Result<(), ClientError> {
    let mut stream = client.stream_chat(conversation.messages()).await?;

    while let Some(item) = stream.next().await {
        append(conversation, item?, view);
        *received += 1;
    }
    Ok(())
}

fn append<V: ConversationView + ?Sized>(conversation: &mut Conversation, message: Message, view: &mut V) {
    view.message_appended(&message);
    conversation.push(message);
}
