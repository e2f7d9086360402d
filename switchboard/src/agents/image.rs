//! Image-generation agent: hands the prompt to the tool service and reports
//! what was produced.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::OrchestratorError;
use crate::state::{ChatMessage, TurnMetadata};
use crate::tools::{ImageRequest, ToolService};

use super::{Agent, AgentReply};

pub const IMAGE_AGENT: &str = "image_generation_agent";

pub struct ImageGenerationAgent {
    pub tools: Arc<dyn ToolService>,
}

#[async_trait]
impl Agent for ImageGenerationAgent {
    fn name(&self) -> &str {
        IMAGE_AGENT
    }

    async fn process(
        &self,
        query: &str,
        metadata: &TurnMetadata,
        _history: &[ChatMessage],
    ) -> Result<AgentReply, OrchestratorError> {
        let result = self
            .tools
            .generate_image(ImageRequest {
                prompt: query.to_string(),
                size: "1024x1024".into(),
                format: "png".into(),
                num_images: 1,
                user_id: metadata.user_id.clone(),
                ..Default::default()
            })
            .await;

        match result {
            Ok(images) if images.success && !images.images.is_empty() => {
                let listing = images
                    .images
                    .iter()
                    .map(|i| format!("- {} ({}x{})", i.filename, i.width, i.height))
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(AgentReply::complete(format!(
                    "Generated {} image(s) with {}:\n{}",
                    images.images.len(),
                    images.model,
                    listing
                )))
            }
            Ok(_) => Ok(AgentReply::complete(
                "Image generation finished but produced no files.",
            )),
            Err(e) => {
                tracing::warn!(error = %e, "image generation failed");
                Ok(AgentReply::complete(format!(
                    "Image generation failed: {}",
                    e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::RecordingTools;

    /// **Scenario**: a run with no produced files reports that plainly.
    #[tokio::test]
    async fn empty_result_reported() {
        let tools = Arc::new(RecordingTools::default());
        let agent = ImageGenerationAgent {
            tools: tools.clone(),
        };
        let reply = agent
            .process("a lighthouse at dusk", &TurnMetadata::default(), &[])
            .await
            .unwrap();
        assert!(reply.response.contains("no files"));
        assert_eq!(tools.calls(), vec!["generate_image"]);
    }
}
