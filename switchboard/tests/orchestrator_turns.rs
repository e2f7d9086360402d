//! Orchestrator turn streaming: chunk ordering, alias fallback, HITL
//! follow-up routing, error paths, and the single-shot connection recovery.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_stream::StreamExt;

use chunk_stream::{ChatChunk, ChunkType, StreamChatRequest};
use switchboard::agents::{Agent, AgentReply};
use switchboard::llm::ScriptedLlm;
use switchboard::state::{ChatMessage, TurnMetadata};
use switchboard::tools::RecordingTools;
use switchboard::{Orchestrator, OrchestratorError};

fn request(user: &str, conversation: &str, query: &str, agent_type: &str) -> StreamChatRequest {
    StreamChatRequest {
        user_id: user.into(),
        conversation_id: conversation.into(),
        query: query.into(),
        agent_type: agent_type.into(),
        ..Default::default()
    }
}

async fn collect(stream: tokio_stream::wrappers::ReceiverStream<ChatChunk>) -> Vec<ChatChunk> {
    let mut stream = stream;
    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next().await {
        chunks.push(chunk);
    }
    chunks
}

fn count(chunks: &[ChatChunk], kind: ChunkType) -> usize {
    chunks.iter().filter(|c| c.chunk_type == kind).count()
}

fn classifier_chat_llm() -> Arc<ScriptedLlm> {
    Arc::new(ScriptedLlm::with_rules(
        vec![(
            "Route this user message",
            r#"{"target_agent": "chat", "action_intent": "converse", "confidence": 0.8, "reasoning": "small talk"}"#,
        )],
        "Hello! How can I help?",
    ))
}

/// **Scenario**: boundary behavior — empty history, no checkpoint: the
/// classifier runs, routing succeeds, and the turn completes with exactly
/// one complete chunk after the content chunk.
#[tokio::test]
async fn fresh_turn_streams_status_content_complete() {
    let orchestrator = Arc::new(
        Orchestrator::new(classifier_chat_llm(), Arc::new(RecordingTools::default())).unwrap(),
    );
    let chunks = collect(orchestrator.stream_chat(request("u1", "c1", "hi there", "auto"))).await;

    assert!(count(&chunks, ChunkType::Status) >= 1);
    assert_eq!(count(&chunks, ChunkType::Content), 1);
    assert_eq!(count(&chunks, ChunkType::Complete), 1);
    assert_eq!(count(&chunks, ChunkType::Error), 0);

    let status = chunks
        .iter()
        .find(|c| c.chunk_type == ChunkType::Status)
        .unwrap();
    assert!(status.message.contains("chat processing"));
    assert_eq!(status.agent_name, "orchestrator");

    let content = chunks
        .iter()
        .find(|c| c.chunk_type == ChunkType::Content)
        .unwrap();
    assert_eq!(content.message, "Hello! How can I help?");
    assert_eq!(content.agent_name, "chat");

    // Complete comes last.
    assert_eq!(chunks.last().unwrap().chunk_type, ChunkType::Complete);
}

/// **Scenario**: an unknown explicit agent type warns and falls back to
/// chat (alias table behavior).
#[tokio::test]
async fn unknown_agent_type_warns_and_falls_back() {
    let orchestrator = Arc::new(
        Orchestrator::new(classifier_chat_llm(), Arc::new(RecordingTools::default())).unwrap(),
    );
    let chunks = collect(orchestrator.stream_chat(request("u1", "c2", "hi", "wargaming_agent"))).await;

    let warning = chunks
        .iter()
        .find(|c| c.chunk_type == ChunkType::Warning && c.message.contains("Unknown agent type"))
        .expect("warning chunk");
    assert!(warning.message.contains("wargaming_agent"));
    assert_eq!(count(&chunks, ChunkType::Complete), 1);
    let content = chunks
        .iter()
        .find(|c| c.chunk_type == ChunkType::Content)
        .unwrap();
    assert_eq!(content.agent_name, "chat");
}

/// **Scenario**: an aliased agent type dispatches without a warning.
#[tokio::test]
async fn aliased_agent_type_resolves() {
    let orchestrator = Arc::new(
        Orchestrator::new(classifier_chat_llm(), Arc::new(RecordingTools::default())).unwrap(),
    );
    let chunks = collect(orchestrator.stream_chat(request(
        "u1",
        "c3",
        "hi",
        "podcast_script_agent",
    )))
    .await;
    assert!(
        !chunks
            .iter()
            .any(|c| c.chunk_type == ChunkType::Warning && c.message.contains("Unknown agent")),
        "aliased types must not warn"
    );
    let content = chunks
        .iter()
        .find(|c| c.chunk_type == ChunkType::Content)
        .unwrap();
    assert_eq!(content.agent_name, "chat");
}

/// **Scenario**: quick-answer follow-up across turns through the
/// orchestrator: turn 1 gets a quick answer from research; the affirmative
/// turn 2 routes back to research (no classifier call) and runs the full
/// pipeline.
#[tokio::test]
async fn quick_answer_followup_routes_to_research() {
    let llm = Arc::new(ScriptedLlm::with_rules(
        vec![
            (
                "Route this user message",
                r#"{"target_agent": "full_research_agent", "action_intent": "research", "confidence": 0.9, "reasoning": "factual"}"#,
            ),
            (
                "can be answered accurately from general knowledge",
                r#"{"can_answer_quickly": true, "confidence": 0.9,
                    "quick_answer": "Black tea brews at 200-212F.", "reasoning": "known"}"#,
            ),
            (
                "Assess whether the combined research results",
                r#"{"sufficient": true, "has_relevant_info": true, "confidence": 0.9,
                    "missing_info": [], "reasoning": "covered", "best_source": "both",
                    "needs_more_local": false, "needs_more_web": false}"#,
            ),
            (
                "synthesized single answer or multiple distinct options",
                r#"{"query_type": "objective", "confidence": 0.9, "reasoning": "factual",
                    "should_present_options": false, "num_options": null}"#,
            ),
            (
                "provide a comprehensive answer",
                "Deep dive: tea temperature depends on oxidation level.",
            ),
        ],
        "fallback",
    ));
    let tools = Arc::new(RecordingTools::default());
    let orchestrator = Arc::new(Orchestrator::new(llm, tools.clone()).unwrap());

    let first = collect(orchestrator.stream_chat(request(
        "u2",
        "c1",
        "What temperature for black tea?",
        "auto",
    )))
    .await;
    let first_content = first
        .iter()
        .find(|c| c.chunk_type == ChunkType::Content)
        .unwrap();
    assert!(first_content.message.contains("200-212F"));
    assert!(first_content.message.contains("deeper search"));
    assert!(tools.calls().is_empty());

    let second = collect(orchestrator.stream_chat(request("u2", "c1", "yes, tell me more", "auto"))).await;
    let second_content = second
        .iter()
        .find(|c| c.chunk_type == ChunkType::Content)
        .unwrap();
    assert!(second_content.message.contains("Deep dive"));
    assert!(tools.calls().contains(&"search_documents".to_string()));
}

struct FailingAgent;

#[async_trait]
impl Agent for FailingAgent {
    fn name(&self) -> &str {
        "chat"
    }
    async fn process(
        &self,
        _query: &str,
        _metadata: &TurnMetadata,
        _history: &[ChatMessage],
    ) -> Result<AgentReply, OrchestratorError> {
        Err(OrchestratorError::Workflow("node exploded".into()))
    }
}

/// **Scenario**: a fatal workflow error yields exactly one error chunk and
/// no complete chunk.
#[tokio::test]
async fn fatal_error_yields_single_error_chunk() {
    let mut orchestrator =
        Orchestrator::new(classifier_chat_llm(), Arc::new(RecordingTools::default())).unwrap();
    orchestrator.register_agent(Arc::new(FailingAgent));
    let orchestrator = Arc::new(orchestrator);

    let chunks = collect(orchestrator.stream_chat(request("u3", "c1", "hi", "chat"))).await;
    assert_eq!(count(&chunks, ChunkType::Error), 1);
    assert_eq!(count(&chunks, ChunkType::Complete), 0);
    assert!(chunks.last().unwrap().message.contains("node exploded"));
}

struct FlakyAgent {
    calls: AtomicUsize,
}

#[async_trait]
impl Agent for FlakyAgent {
    fn name(&self) -> &str {
        "chat"
    }
    async fn process(
        &self,
        _query: &str,
        _metadata: &TurnMetadata,
        _history: &[ChatMessage],
    ) -> Result<AgentReply, OrchestratorError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(OrchestratorError::Transport(
                "grpc: the connection is closed".into(),
            ))
        } else {
            Ok(AgentReply::complete("recovered"))
        }
    }
}

/// **Scenario**: "connection is closed" triggers the single-shot recovery:
/// the turn retries once and completes; the retry is visible as a warning.
#[tokio::test]
async fn connection_closed_retries_once() {
    let mut orchestrator =
        Orchestrator::new(classifier_chat_llm(), Arc::new(RecordingTools::default())).unwrap();
    orchestrator.register_agent(Arc::new(FlakyAgent {
        calls: AtomicUsize::new(0),
    }));
    let orchestrator = Arc::new(orchestrator);

    let chunks = collect(orchestrator.stream_chat(request("u4", "c1", "hi", "chat"))).await;
    assert!(chunks
        .iter()
        .any(|c| c.chunk_type == ChunkType::Warning && c.message.contains("retrying")));
    let content = chunks
        .iter()
        .find(|c| c.chunk_type == ChunkType::Content)
        .unwrap();
    assert_eq!(content.message, "recovered");
    assert_eq!(count(&chunks, ChunkType::Complete), 1);
    assert_eq!(count(&chunks, ChunkType::Error), 0);
}
