//! Orchestrator service: the per-turn control plane.
//!
//! One StreamChat call per user message: load checkpointed shared memory,
//! merge the request's context, pick an agent (explicit, HITL-resume, or
//! classified), dispatch, and stream status/content/complete chunks back.
//! On a closed tool connection the turn is reset and retried exactly once.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use chunk_stream::{ChatChunk, StreamChatRequest};
use stategraph::{MemorySaver, SqliteSaver};

use crate::agents::chat::ChatAgent;
use crate::agents::formatting::FormattingAgent;
use crate::agents::image::ImageGenerationAgent;
use crate::agents::org::OrgAgent;
use crate::agents::research::{is_affirmative_short_reply, ResearchAgent, RESEARCH_AGENT};
use crate::agents::weather::WeatherAgent;
use crate::agents::{AgentRegistry, CHAT_AGENT};
use crate::base::checkpoint_config;
use crate::classifier::IntentClassifier;
use crate::editor::extract_active_editor;
use crate::error::OrchestratorError;
use crate::llm::LlmGateway;
use crate::state::{ChatMessage, PermissionState, Role, SharedMemory, TurnMetadata};
use crate::tools::ToolService;

/// Capability listing surfaced by the ingress status endpoint.
pub fn capabilities() -> serde_json::Value {
    serde_json::json!({
        "agents": "chat,full_research_agent,org_agent,data_formatting_agent,weather_agent,image_generation_agent",
        "features": "multi_round_research,query_expansion,gap_analysis,web_search,caching,quick_answers,org_inbox_management,org_project_capture,project_content_routing,weather_forecasts,image_generation,formatting",
    })
}

/// The orchestrator: one instance per process; graphs are built once and
/// shared across turns.
pub struct Orchestrator {
    registry: AgentRegistry,
    classifier: IntentClassifier,
    research: Arc<ResearchAgent>,
    org: Arc<OrgAgent>,
    tools: Arc<dyn ToolService>,
}

impl Orchestrator {
    /// Builds the orchestrator and every agent over the given gateways.
    /// Checkpointing uses in-memory savers; production wiring can swap in
    /// `SqliteSaver`s through the agent constructors.
    pub fn new(
        llm: Arc<dyn LlmGateway>,
        tools: Arc<dyn ToolService>,
    ) -> Result<Self, stategraph::CompilationError> {
        let research = Arc::new(ResearchAgent::new(
            llm.clone(),
            tools.clone(),
            Arc::new(MemorySaver::new()),
        )?);
        let org = Arc::new(OrgAgent::new(
            llm.clone(),
            tools.clone(),
            Arc::new(MemorySaver::new()),
        )?);

        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(ChatAgent::new(llm.clone())));
        registry.register(research.clone());
        registry.register(org.clone());
        registry.register(Arc::new(FormattingAgent::new(llm.clone())));
        registry.register(Arc::new(WeatherAgent {
            llm: llm.clone(),
            tools: tools.clone(),
        }));
        registry.register(Arc::new(ImageGenerationAgent {
            tools: tools.clone(),
        }));

        Ok(Self {
            registry,
            classifier: IntentClassifier::new(llm),
            research,
            org,
            tools,
        })
    }

    /// Production wiring: durable SQLite checkpoints at `db_path` so threads
    /// survive restarts.
    pub fn with_sqlite_checkpoints(
        llm: Arc<dyn LlmGateway>,
        tools: Arc<dyn ToolService>,
        db_path: &std::path::Path,
    ) -> Result<Self, OrchestratorError> {
        let research_saver: Arc<SqliteSaver<crate::agents::research::ResearchState>> = Arc::new(
            SqliteSaver::new(db_path)
                .map_err(|e| OrchestratorError::Config(format!("checkpoint store: {}", e)))?,
        );
        let org_saver: Arc<SqliteSaver<crate::agents::org::OrgState>> = Arc::new(
            SqliteSaver::new(db_path.with_extension("org.db"))
                .map_err(|e| OrchestratorError::Config(format!("checkpoint store: {}", e)))?,
        );
        let research = Arc::new(
            ResearchAgent::new(llm.clone(), tools.clone(), research_saver)
                .map_err(|e| OrchestratorError::Config(e.to_string()))?,
        );
        let org = Arc::new(
            OrgAgent::new(llm.clone(), tools.clone(), org_saver)
                .map_err(|e| OrchestratorError::Config(e.to_string()))?,
        );

        let mut registry = AgentRegistry::new();
        registry.register(Arc::new(ChatAgent::new(llm.clone())));
        registry.register(research.clone());
        registry.register(org.clone());
        registry.register(Arc::new(FormattingAgent::new(llm.clone())));
        registry.register(Arc::new(WeatherAgent {
            llm: llm.clone(),
            tools: tools.clone(),
        }));
        registry.register(Arc::new(ImageGenerationAgent {
            tools: tools.clone(),
        }));

        Ok(Self {
            registry,
            classifier: IntentClassifier::new(llm),
            research,
            org,
            tools,
        })
    }

    /// Replaces (or adds) an agent in the registry. Used by tests and by
    /// deployments that carry extra agents.
    pub fn register_agent(&mut self, agent: Arc<dyn crate::agents::Agent>) {
        self.registry.register(agent);
    }

    /// Streams one turn. Exactly one `complete` chunk on success, exactly
    /// one `error` chunk on failure.
    pub fn stream_chat(self: &Arc<Self>, request: StreamChatRequest) -> ReceiverStream<ChatChunk> {
        let (tx, rx) = mpsc::channel(64);
        let this = self.clone();
        tokio::spawn(async move {
            this.run_turn(request, tx).await;
        });
        ReceiverStream::new(rx)
    }

    async fn run_turn(&self, request: StreamChatRequest, tx: mpsc::Sender<ChatChunk>) {
        match self.execute_turn(&request, &tx).await {
            Ok(()) => {}
            Err(e) if e.is_connection_closed() => {
                // Single-shot recovery: reset the tool connection and retry
                // the same turn once.
                warn!(error = %e, "tool connection closed; resetting and retrying turn");
                self.tools.reset_connection();
                let _ = tx
                    .send(ChatChunk::warning(
                        "Backend connection lost; retrying...",
                        "orchestrator",
                    ))
                    .await;
                if let Err(e2) = self.execute_turn(&request, &tx).await {
                    let _ = tx
                        .send(ChatChunk::error(e2.to_string(), "orchestrator"))
                        .await;
                }
            }
            Err(e) => {
                let _ = tx
                    .send(ChatChunk::error(e.to_string(), "orchestrator"))
                    .await;
            }
        }
    }

    /// Checkpoint shared-memory pre-load: the classifier needs
    /// `primary_agent_selected` from prior turns. Empty is normal on a first
    /// turn.
    async fn load_checkpoint_shared_memory(&self, request: &StreamChatRequest) -> SharedMemory {
        let metadata = TurnMetadata {
            user_id: request.user_id.clone(),
            conversation_id: request.conversation_id.clone(),
            ..Default::default()
        };
        let config = checkpoint_config(&metadata);
        let mut shared_memory = SharedMemory::default();
        if let Ok(Some(snapshot)) = self.research.graph().get_state(&config).await {
            shared_memory = snapshot.values.shared_memory;
        }
        if let Ok(Some(snapshot)) = self.org.graph().get_state(&config).await {
            shared_memory.absorb(&snapshot.values.shared_memory);
        }
        shared_memory
    }

    /// Shared-memory fields carried on the request itself: the active
    /// editor and the permission grants (`true` maps to `granted`, unset
    /// means unchanged).
    fn extract_request_shared_memory(request: &StreamChatRequest) -> SharedMemory {
        let mut shared_memory = SharedMemory::default();
        if let Some(editor) = &request.active_editor {
            shared_memory.active_editor = Some(extract_active_editor(editor));
        }
        if let Some(grants) = &request.permission_grants {
            if grants.web_search_permission {
                shared_memory.web_search_permission = Some(PermissionState::Granted);
            }
            if grants.web_crawl_permission {
                shared_memory.web_crawl_permission = Some(PermissionState::Granted);
            }
            if grants.file_write_permission {
                shared_memory.file_write_permission = Some(PermissionState::Granted);
            }
            if grants.external_api_permission {
                shared_memory.external_api_permission = Some(PermissionState::Granted);
            }
        }
        shared_memory
    }

    fn parse_history(request: &StreamChatRequest) -> Vec<ChatMessage> {
        request
            .conversation_history
            .iter()
            .map(|turn| ChatMessage {
                role: match turn.role.as_str() {
                    "assistant" => Role::Assistant,
                    "system" => Role::System,
                    _ => Role::User,
                },
                content: turn.content.clone(),
                timestamp: turn.timestamp.clone(),
            })
            .collect()
    }

    async fn select_agent(
        &self,
        request: &StreamChatRequest,
        metadata: &mut TurnMetadata,
        tx: &mpsc::Sender<ChatChunk>,
    ) -> String {
        // Explicit agent types are honored (through the alias table).
        if request.agent_type != "auto" {
            let (name, unknown) = self.registry.canonicalize(&request.agent_type);
            if unknown {
                warn!(agent_type = %request.agent_type, "unknown agent type");
                let _ = tx
                    .send(ChatChunk::warning(
                        format!(
                            "Unknown agent type '{}'; falling back to chat",
                            request.agent_type
                        ),
                        "orchestrator",
                    ))
                    .await;
            }
            return name;
        }

        // A paused web-permission gate routes straight back to research.
        if self.research.pending_web_permission(metadata).await {
            info!("pending web permission; routing to research for HITL resume");
            return RESEARCH_AGENT.to_string();
        }

        // Quick-answer follow-up: an affirmative short reply continues with
        // the research agent and skips the gate.
        let primary = metadata.shared_memory.primary_agent_selected.clone();
        if primary.as_deref() == Some(RESEARCH_AGENT) && is_affirmative_short_reply(&request.query)
        {
            metadata.skip_quick_answer = true;
            return RESEARCH_AGENT.to_string();
        }

        let classification = self
            .classifier
            .classify(&request.query, &metadata.shared_memory, &self.registry.names())
            .await;
        info!(
            target = %classification.target_agent,
            confidence = classification.confidence,
            "intent classified"
        );
        let (name, unknown) = self.registry.canonicalize(&classification.target_agent);
        if unknown {
            let _ = tx
                .send(ChatChunk::warning(
                    format!(
                        "Classifier chose unknown agent '{}'; falling back to chat",
                        classification.target_agent
                    ),
                    "orchestrator",
                ))
                .await;
        }
        name
    }

    async fn execute_turn(
        &self,
        request: &StreamChatRequest,
        tx: &mpsc::Sender<ChatChunk>,
    ) -> Result<(), OrchestratorError> {
        let persona = request
            .persona
            .clone()
            .map(|p| p.with_defaults())
            .unwrap_or_default();

        let mut shared_memory = self.load_checkpoint_shared_memory(request).await;
        shared_memory.absorb(&Self::extract_request_shared_memory(request));

        let model = request.metadata.get("model").cloned();
        if model.is_none() && std::env::var("OPENAI_MODEL").is_err() {
            // ConfigError degrades to a warning plus defaults.
            let _ = tx
                .send(ChatChunk::warning(
                    "No model configured for this user; using the default",
                    "orchestrator",
                ))
                .await;
        }

        let mut metadata = TurnMetadata {
            user_id: request.user_id.clone(),
            conversation_id: request.conversation_id.clone(),
            persona,
            model,
            shared_memory,
            skip_quick_answer: false,
            extra: request.metadata.clone(),
        };

        let agent_name = self.select_agent(request, &mut metadata, tx).await;
        let _ = tx
            .send(ChatChunk::status(
                format!("{} processing your message...", agent_name),
                "orchestrator",
            ))
            .await;

        let history = Self::parse_history(request);
        let agent = self
            .registry
            .get(&agent_name)
            .ok_or_else(|| OrchestratorError::Workflow(format!("no agent '{}'", agent_name)))?;
        let reply = agent.process(&request.query, &metadata, &history).await?;

        let _ = tx
            .send(ChatChunk::content(reply.response, agent_name.clone()))
            .await;
        let _ = tx
            .send(ChatChunk::complete(
                format!("{} complete (status: {})", agent_name, reply.task_status),
                "system",
            ))
            .await;
        Ok(())
    }

    /// The fallback agent name, exposed for callers that need it.
    pub fn fallback_agent() -> &'static str {
        CHAT_AGENT
    }
}
