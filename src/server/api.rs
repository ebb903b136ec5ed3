use crate::cli::ServeArgs;
use crate::models::chat::ChatRequest;
use crate::source::{ MessageSource, MessageStream };
use crate::stream::{ encode_frame, CHAT_ROUTE, CONTENT_TYPE };
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use axum::{
    body::{ Body, Bytes },
    extract::State,
    http::{ header, StatusCode },
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use axum_server::Handle;
use futures::{ Future, Stream, StreamExt };
use serde_json::json;
use tokio::sync::mpsc;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn, error, debug };

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    source: Arc<dyn MessageSource>,
    frame_delay: Duration,
}

impl AppState {
    pub fn new(source: Arc<dyn MessageSource>, frame_delay: Duration) -> Self {
        Self { source, frame_delay }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route(CHAT_ROUTE, post(chat_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    addr: SocketAddr,
    state: AppState,
    args: &ServeArgs
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = router(state);

    if args.enable_tls {
        let (cert_path, key_path) = match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert_path), Some(key_path)) => (cert_path, key_path),
            _ => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                return Err("TLS enabled without cert/key".into());
            }
        };
        info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);

        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            cert_path,
            key_path
        ).await?;

        let handle = Handle::new();
        stop_on(handle.clone(), shutdown_signal());

        info!("Starting HTTPS chat server on: https://{}", addr);
        axum_server
            ::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(app.into_make_service()).await?;
    } else {
        let listener = tokio::net::TcpListener
            ::bind(addr).await
            .map_err(|e| format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e))?;

        info!("Starting HTTP chat server on: http://{}", addr);
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal()).await?;
    }

    info!("Chat server stopped");
    Ok(())
}

/// Starts a graceful shutdown of the server behind `handle` once `signal` resolves.
pub fn stop_on<F>(handle: Handle, signal: F) where F: Future<Output = ()> + Send + 'static {
    tokio::spawn(async move {
        signal.await;
        handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn chat_handler(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    info!("Chat request with {} messages of history", req.messages.len());

    let messages = match state.source.respond(&req.messages).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Message source '{}' failed: {}", state.source.name(), e);
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": format!("Message source failed: {}", e) })),
            ).into_response();
        }
    };

    let frames = frame_stream(messages, state.frame_delay);
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], Body::from_stream(frames)).into_response()
}

/// Encodes each message as one JSON Lines frame, pausing `frame_delay`
/// between frames. A source failure ends the body with an error so the
/// client sees a truncated transfer rather than a clean end of stream.
pub fn frame_stream(
    messages: MessageStream,
    frame_delay: Duration
) -> impl Stream<Item = Result<Bytes, io::Error>> + Send + 'static {
    let (tx, mut rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let mut messages = messages;
        let mut sent = 0usize;

        while let Some(item) = messages.next().await {
            let message = match item {
                Ok(message) => message,
                Err(e) => {
                    error!("Message source failed after {} frames: {}", sent, e);
                    let _ = tx.send(Err(io::Error::new(io::ErrorKind::Other, e.to_string()))).await;
                    return;
                }
            };

            let frame = match encode_frame(&message) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Dropping message {}: {}", message.id, e);
                    continue;
                }
            };

            if sent > 0 && !frame_delay.is_zero() {
                tokio::time::sleep(frame_delay).await;
            }

            if tx.send(Ok(Bytes::from(frame))).await.is_err() {
                info!("Client disconnected after {} frames", sent);
                return;
            }
            sent += 1;
        }

        debug!("Chat stream closed after {} frames", sent);
    });

    async_stream::stream! {
        while let Some(item) = rx.recv().await {
            if item.is_err() {
                // Hyper drops buffered body data when the body errors. Returning
                // Pending once lets it flush the frames already handed over.
                tokio::task::yield_now().await;
            }
            yield item;
        }
    }
}
