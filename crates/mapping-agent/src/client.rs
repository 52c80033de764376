use std::time::Duration;

use tracing::debug;

use crate::types::{ChatRequest, ChatResponse};
use crate::{AgentError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// HTTP client for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl AgentClient {
    /// `api_key` may be `None` for local endpoints that don't authenticate.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AgentError::Setup(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `POST {base_url}/chat/completions`.
    pub async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self.http.post(&url).json(request).timeout(self.timeout);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        debug!(%url, status = status.as_u16(), bytes = body.len(), "chat completion");

        if !status.is_success() {
            return Err(AgentError::Http {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|source| AgentError::Decode { body, source })
    }
}
