pub mod api;

use crate::cli::ServeArgs;
use crate::source::MessageSource;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

pub use api::{ router, AppState };

pub struct Server {
    addr: String,
    source: Arc<dyn MessageSource>,
    args: ServeArgs,
}

impl Server {
    pub fn new(addr: String, source: Arc<dyn MessageSource>, args: ServeArgs) -> Self {
        Self { addr, source, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid server address '{}': {}", self.addr, e))?;
        let state = AppState::new(self.source.clone(), self.args.frame_delay());

        api::start_http_server(addr, state, &self.args).await
    }
}
