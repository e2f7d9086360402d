//! WebSocket connection lifecycle: one StreamChat request per text frame,
//! chunk frames streamed back.

use axum::extract::ws::{Message, WebSocket};
use std::sync::Arc;
use tokio_stream::StreamExt;

use chunk_stream::{ChatChunk, StreamChatRequest};
use switchboard::Orchestrator;

pub(crate) async fn handle_socket(mut socket: WebSocket, orchestrator: Arc<Orchestrator>) {
    while let Some(res) = socket.recv().await {
        let msg = match res {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("read error (client closed?): {}", e);
                let _ = socket.close().await;
                break;
            }
        };
        let text = match &msg {
            Message::Text(t) => t.clone(),
            Message::Binary(b) => String::from_utf8_lossy(b).into_owned(),
            _ => continue,
        };

        if let Err(e) = handle_request_and_stream(&text, &mut socket, &orchestrator).await {
            tracing::warn!("stream_chat error: {}", e);
            let _ = socket.close().await;
            break;
        }
    }
}

async fn send_chunk(
    socket: &mut WebSocket,
    chunk: &ChatChunk,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let frame = serde_json::to_string(chunk)?;
    socket.send(Message::Text(frame)).await?;
    Ok(())
}

async fn handle_request_and_stream(
    text: &str,
    socket: &mut WebSocket,
    orchestrator: &Arc<Orchestrator>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let request: StreamChatRequest = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            send_chunk(
                socket,
                &ChatChunk::error(format!("parse error: {}", e), "orchestrator"),
            )
            .await?;
            return Ok(());
        }
    };

    tracing::info!(
        user_id = %request.user_id,
        conversation_id = %request.conversation_id,
        agent_type = %request.agent_type,
        "stream_chat"
    );
    let mut chunks = orchestrator.stream_chat(request);
    while let Some(chunk) = chunks.next().await {
        send_chunk(socket, &chunk).await?;
    }
    Ok(())
}
