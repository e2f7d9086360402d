//! Streaming ingress for the orchestrator (axum + ws).
//!
//! One WebSocket text frame in (a StreamChat request as JSON), an ordered
//! stream of chunk frames out: `status` chunks, `content`, then exactly one
//! `complete` per successful turn (or exactly one `error`). `GET /status`
//! reports the service's agents and features.
//!
//! **Public API**: [`run_serve`], [`run_serve_on_listener`].

mod app;
mod connection;

use std::sync::Arc;

use switchboard::llm::{select_model, OpenAiGateway};
use switchboard::tools::BackendToolClient;
use switchboard::Orchestrator;
use tokio::net::TcpListener;
use tracing::info;

use app::{router, AppState};

const DEFAULT_WS_ADDR: &str = "127.0.0.1:8080";

/// Runs the server on an existing listener with an injected orchestrator.
/// Used by tests (bind to 127.0.0.1:0 then pass the listener).
pub async fn run_serve_on_listener(
    listener: TcpListener,
    orchestrator: Arc<Orchestrator>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = listener.local_addr()?;
    info!("orchestrator ingress listening on ws://{}", addr);
    let state = Arc::new(AppState { orchestrator });
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Runs the server with production wiring: the OpenAI gateway and the
/// backend tool client from the environment. Listens on `addr` (default
/// 127.0.0.1:8080).
pub async fn run_serve(addr: Option<&str>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let _ = config::load_and_apply(None);
    let llm = Arc::new(OpenAiGateway::new(select_model(None)));
    let tools = Arc::new(BackendToolClient::from_env());
    let db_path = std::env::var("CHECKPOINT_DB").unwrap_or_else(|_| "checkpoints.db".to_string());
    let orchestrator = Arc::new(Orchestrator::with_sqlite_checkpoints(
        llm,
        tools,
        std::path::Path::new(&db_path),
    )?);

    let addr = addr.unwrap_or(DEFAULT_WS_ADDR);
    let listener = TcpListener::bind(addr).await?;
    run_serve_on_listener(listener, orchestrator).await
}
