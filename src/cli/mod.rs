use clap::{ Args as ClapArgs, Parser, Subcommand };
use std::time::Duration;

use crate::source::{ ParseSourceTypeError, SourceConfig };
use crate::stream::FramePolicy;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the chat server that streams assistant messages as JSON Lines.
    Serve(ServeArgs),
    /// Open an interactive terminal chat against a running server.
    Chat(ChatArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3000")]
    pub server_addr: String,

    /// Pause between consecutive frames of one response, in milliseconds.
    #[arg(long, env = "FRAME_DELAY_MS", default_value = "1000")]
    pub frame_delay_ms: u64,

    // --- Message Source Args ---
    /// Where assistant messages come from (scripted, ollama)
    #[arg(long, env = "MESSAGE_SOURCE", default_value = "scripted")]
    pub source: String,

    /// Base URL of the model backend (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "SOURCE_BASE_URL")] // No default, let sources handle defaults if None
    pub source_base_url: Option<String>,

    /// Model name used by the backend (e.g., llama3)
    #[arg(long, env = "SOURCE_MODEL")]
    pub source_model: Option<String>,

    /// JSON file with the replies played back by the scripted source.
    #[arg(long, env = "SCRIPT_PATH")]
    pub script_path: Option<String>,

    // --- TLS Args ---
    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

impl ServeArgs {
    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.frame_delay_ms)
    }

    pub fn source_config(&self) -> Result<SourceConfig, ParseSourceTypeError> {
        Ok(SourceConfig {
            source_type: self.source.parse()?,
            base_url: self.source_base_url.clone(),
            model: self.source_model.clone(),
            script_path: self.script_path.clone(),
        })
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ChatArgs {
    /// Base URL of the chat server.
    #[arg(long, env = "CHAT_SERVER_URL", default_value = "http://127.0.0.1:3000")]
    pub server_url: String,

    /// What to do with a malformed frame (strict, tolerant)
    #[arg(long, env = "FRAME_POLICY", default_value = "strict")]
    pub frame_policy: FramePolicy,
}
