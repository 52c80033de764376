use anyhow::Context;
use async_trait::async_trait;
use enrich_core::config::AssistantConfig;
use enrich_core::semantic::{AssistantError, MappingAssistant, MappingRequest, SYSTEM_PROMPT};
use mapping_agent::{agent_run, AgentClient, AgentError, RunConfig};
use tracing::debug;

/// [`MappingAssistant`] backed by a chat-completions endpoint.
pub struct AgentAssistant {
    client: AgentClient,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AgentAssistant {
    /// A missing API key is allowed; local endpoints often don't need one.
    pub fn from_config(cfg: &AssistantConfig) -> anyhow::Result<Self> {
        let client = AgentClient::new(&cfg.base_url, cfg.api_key(), cfg.timeout())
            .context("failed to build assistant client")?;
        Ok(Self {
            client,
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
        })
    }

    fn run_config(&self, request: &MappingRequest) -> RunConfig {
        RunConfig {
            system_prompt: Some(SYSTEM_PROMPT.to_string()),
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            json_mode: true,
            ..RunConfig::new(&self.model, request.prompt())
        }
    }
}

#[async_trait]
impl MappingAssistant for AgentAssistant {
    async fn propose_mapping(&self, request: &MappingRequest) -> Result<String, AssistantError> {
        let result = agent_run(&self.client, self.run_config(request))
            .await
            .map_err(to_assistant_error)?;
        debug!(
            model = %result.model,
            completion_tokens = result.usage.completion_tokens,
            "assistant replied"
        );
        Ok(result.text)
    }
}

fn to_assistant_error(e: AgentError) -> AssistantError {
    match e {
        AgentError::Timeout => AssistantError::Timeout,
        AgentError::Http { status, body } if (400..500).contains(&status) && status != 429 => {
            AssistantError::Rejected(format!("HTTP {status}: {body}"))
        }
        AgentError::EmptyResponse => AssistantError::Rejected(e.to_string()),
        other => AssistantError::Unavailable(other.to_string()),
    }
}
