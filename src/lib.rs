pub mod cli;
pub mod client;
pub mod config;
pub mod models;
pub mod server;
pub mod source;
pub mod stream;

use cli::{ Args, ChatArgs, Command, ServeArgs };
use log::info;
use server::Server;
use source::new_source;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.command {
        Command::Serve(serve_args) => serve(serve_args).await,
        Command::Chat(chat_args) => chat(chat_args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Server Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("Frame Delay: {} ms", args.frame_delay_ms);
    info!("Message Source: {}", args.source);
    info!("Source Base URL: {}", args.source_base_url.as_deref().unwrap_or("source default"));
    info!("Source Model: {}", args.source_model.as_deref().unwrap_or("source default"));
    if let Some(path) = &args.script_path {
        info!("Script Path: {}", path);
    }
    info!("TLS Enabled: {}", args.enable_tls);
    info!("----------------------------");

    let source = new_source(&args.source_config()?)?;
    let server = Server::new(args.server_addr.clone(), source, args);
    server.run().await
}

async fn chat(args: ChatArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    client::repl::run_repl(&args).await
}
