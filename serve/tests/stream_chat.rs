//! End-to-end ingress test: one request frame in, chunk frames out.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use chunk_stream::{ChatChunk, ChunkType};
use switchboard::llm::ScriptedLlm;
use switchboard::tools::RecordingTools;
use switchboard::Orchestrator;

fn scripted_orchestrator() -> Arc<Orchestrator> {
    let llm = Arc::new(ScriptedLlm::with_rules(
        vec![(
            "Route this user message",
            r#"{"target_agent": "chat", "action_intent": "converse", "confidence": 0.8, "reasoning": "greeting"}"#,
        )],
        "Hello from the orchestrator!",
    ));
    Arc::new(Orchestrator::new(llm, Arc::new(RecordingTools::default())).unwrap())
}

/// **Scenario**: a StreamChat request over the WebSocket yields status,
/// content, and exactly one complete frame; a malformed frame yields an
/// error chunk.
#[tokio::test(flavor = "multi_thread")]
async fn stream_chat_over_websocket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let orchestrator = scripted_orchestrator();
    tokio::spawn(async move {
        let _ = serve::run_serve_on_listener(listener, orchestrator).await;
    });

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/", addr))
        .await
        .expect("connect");

    ws.send(Message::Text(
        r#"{"user_id":"u1","conversation_id":"c1","query":"hello"}"#.into(),
    ))
    .await
    .unwrap();

    let mut chunks: Vec<ChatChunk> = Vec::new();
    while let Some(Ok(frame)) = ws.next().await {
        let Message::Text(text) = frame else { continue };
        let chunk: ChatChunk = serde_json::from_str(&text).unwrap();
        let done = chunk.chunk_type == ChunkType::Complete;
        chunks.push(chunk);
        if done {
            break;
        }
    }

    assert!(chunks.iter().any(|c| c.chunk_type == ChunkType::Status));
    let content = chunks
        .iter()
        .find(|c| c.chunk_type == ChunkType::Content)
        .unwrap();
    assert_eq!(content.message, "Hello from the orchestrator!");
    assert_eq!(
        chunks
            .iter()
            .filter(|c| c.chunk_type == ChunkType::Complete)
            .count(),
        1
    );

    // Malformed request: exactly one error chunk comes back.
    ws.send(Message::Text("{not json".into())).await.unwrap();
    let frame = ws.next().await.unwrap().unwrap();
    let Message::Text(text) = frame else {
        panic!("expected text frame");
    };
    let chunk: ChatChunk = serde_json::from_str(&text).unwrap();
    assert_eq!(chunk.chunk_type, ChunkType::Error);
    assert!(chunk.message.contains("parse error"));
}
