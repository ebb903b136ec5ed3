//! Line-oriented terminal front-end for a [`ChatSession`].

use std::error::Error;
use std::io::Write;
use log::info;
use tokio::io::{ AsyncBufReadExt, BufReader };

use super::{ ChatClient, ChatSession, ConversationView, SubmitOutcome, SUGGESTIONS };
use crate::cli::ChatArgs;
use crate::models::chat::Message;

pub fn render_message(message: &Message) -> String {
    format!("{}: {}", message.role, message.display_text())
}

/// Writes appended messages and the loading marker to a terminal.
pub struct TerminalView<W: Write> {
    out: W,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{}", text);
        let _ = self.out.flush();
    }
}

impl<W: Write> ConversationView for TerminalView<W> {
    fn message_appended(&mut self, message: &Message) {
        let text = render_message(message);
        self.line(&text);
    }

    fn loading_changed(&mut self, loading: bool) {
        if loading {
            self.line("...");
        }
    }
}

pub fn welcome_text() -> String {
    let mut text = String::from("Welcome! Start a conversation or try one of the suggestions below.\n");
    for (idx, suggestion) in SUGGESTIONS.iter().enumerate() {
        text.push_str(&format!("  /{}  {}\n", idx + 1, suggestion));
    }
    text.push_str("Type /quit to leave.");
    text
}

pub async fn run_repl(args: &ChatArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let client = ChatClient::new(&args.server_url, args.frame_policy)?;
    info!("Chatting with {} (frame policy: {})", client.endpoint(), client.policy());

    let mut session = ChatSession::new(client);
    let mut view = TerminalView::new(std::io::stdout());
    view.line(&welcome_text());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();

        if trimmed == "/quit" {
            break;
        }
        if let Some(number) = trimmed.strip_prefix('/') {
            let picked = number
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|idx| session.apply_suggestion(idx).map(str::to_string));
            match picked {
                Some(text) => view.line(&format!("Input: {} (press Enter to send)", text)),
                None => view.line(&format!("Unknown command: {}", trimmed)),
            }
            continue;
        }
        if !trimmed.is_empty() || session.input().trim().is_empty() {
            session.set_input(line);
        }

        if let SubmitOutcome::Failed { error, .. } = session.submit(&mut view).await {
            view.line(&format!("Request failed: {}", error));
        }
    }

    info!("Chat session ended with {} messages", session.conversation().len());
    Ok(())
}
