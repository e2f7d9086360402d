//! Weather agent: location extraction, a tool-service lookup, and a short
//! persona-toned summary.

use std::sync::Arc;

use async_trait::async_trait;

use crate::base::datetime_context;
use crate::error::OrchestratorError;
use crate::llm::{LlmGateway, LlmRequest};
use crate::state::{ChatMessage, TurnMetadata};
use crate::tools::ToolService;

use super::{Agent, AgentReply};

pub const WEATHER_AGENT: &str = "weather_agent";

pub struct WeatherAgent {
    pub llm: Arc<dyn LlmGateway>,
    pub tools: Arc<dyn ToolService>,
}

/// Crude location pull: the tail after "in"/"for", else the whole query.
fn extract_location(query: &str) -> String {
    let lower = query.to_lowercase();
    for marker in [" in ", " for ", " at "] {
        if let Some(pos) = lower.rfind(marker) {
            let tail = query[pos + marker.len()..].trim().trim_end_matches('?');
            if !tail.is_empty() {
                return tail.to_string();
            }
        }
    }
    query.trim_end_matches('?').to_string()
}

#[async_trait]
impl Agent for WeatherAgent {
    fn name(&self) -> &str {
        WEATHER_AGENT
    }

    async fn process(
        &self,
        query: &str,
        metadata: &TurnMetadata,
        _history: &[ChatMessage],
    ) -> Result<AgentReply, OrchestratorError> {
        let location = extract_location(query);
        let report = match self
            .tools
            .get_weather(
                &location,
                &metadata.user_id,
                &["current".to_string(), "forecast".to_string()],
                None,
            )
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "weather lookup failed");
                return Ok(AgentReply::complete(format!(
                    "I couldn't fetch the weather for {} right now.",
                    location
                )));
            }
        };

        let prompt = format!(
            "Summarize this weather report for the user in a couple of sentences.\n\n\
             LOCATION: {}\nCURRENT: {}\nFORECAST: {}\nALERTS: {}",
            report.location,
            report.current_conditions,
            serde_json::to_string(&report.forecast).unwrap_or_default(),
            serde_json::to_string(&report.alerts).unwrap_or_default(),
        );
        let response = self
            .llm
            .complete(
                LlmRequest::new(prompt)
                    .with_system(datetime_context(&metadata.persona.timezone))
                    .with_temperature(0.4),
            )
            .await?;
        Ok(AgentReply::complete(response))
    }
}
