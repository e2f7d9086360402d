//! Axum app: state, router, WebSocket upgrade, and the status handler.

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::{Json, Response},
    routing::get,
    Router,
};
use std::sync::Arc;

use switchboard::service::capabilities;
use switchboard::Orchestrator;

use super::connection::handle_socket;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) orchestrator: Arc<Orchestrator>,
}

pub(crate) fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let orchestrator = state.orchestrator.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, orchestrator))
}

async fn status_handler() -> Json<serde_json::Value> {
    Json(capabilities())
}
