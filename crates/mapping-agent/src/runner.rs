use tracing::{debug, warn};

use crate::client::AgentClient;
use crate::types::{ChatMessage, ChatRequest, ResponseFormat, Usage};
use crate::{AgentError, Result};

// ─── RunConfig ────────────────────────────────────────────────────────────

/// Configuration for a single completion run.
///
/// Pass to [`run`] to send one request and receive a [`RunResult`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub model: String,
    /// Sent as the leading `system` message when set.
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Request `response_format: json_object`.
    pub json_mode: bool,
}

impl RunConfig {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
            json_mode: false,
        }
    }

    fn into_request(self) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(sp) = self.system_prompt {
            messages.push(ChatMessage::system(sp));
        }
        messages.push(ChatMessage::user(self.prompt));
        ChatRequest {
            model: self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format: self.json_mode.then(ResponseFormat::json_object),
        }
    }
}

// ─── RunResult ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Text of the first non-empty choice.
    pub text: String,
    /// Model that served the request, as reported by the endpoint.
    pub model: String,
    pub usage: Usage,
    /// `"length"` means the reply was cut at `max_tokens`.
    pub finish_reason: Option<String>,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Send one chat completion and return its text.
///
/// Returns [`AgentError::EmptyResponse`] when the endpoint answers with no
/// choices or only blank content.
pub async fn run(client: &AgentClient, config: RunConfig) -> Result<RunResult> {
    let request = config.into_request();
    let resp = client.complete(&request).await?;

    let choice = resp
        .choices
        .iter()
        .find(|c| c.message.content.as_deref().is_some_and(|t| !t.trim().is_empty()))
        .ok_or(AgentError::EmptyResponse)?;
    let text = choice.message.content.clone().unwrap_or_default();
    if choice.finish_reason.as_deref() == Some("length") {
        warn!(model = %resp.model, "completion truncated at max_tokens");
    }

    let usage = resp.usage.clone().unwrap_or_default();
    debug!(
        model = %resp.model,
        prompt_tokens = usage.prompt_tokens,
        completion_tokens = usage.completion_tokens,
        "completion received"
    );
    Ok(RunResult {
        text,
        model: if resp.model.is_empty() { request.model } else { resp.model.clone() },
        usage,
        finish_reason: choice.finish_reason.clone(),
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;

    fn client(server: &mockito::ServerGuard) -> AgentClient {
        AgentClient::new(server.url(), Some("sk-test".into()), Duration::from_secs(5)).unwrap()
    }

    fn mapping_config() -> RunConfig {
        RunConfig {
            system_prompt: Some("Map fields.".into()),
            max_tokens: Some(256),
            temperature: Some(0.0),
            json_mode: true,
            ..RunConfig::new("gpt-4o-mini", "Fields: Branch")
        }
    }

    #[tokio::test]
    async fn run_success_returns_text_and_usage() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 256,
                "response_format": {"type": "json_object"},
                "messages": [
                    {"role": "system", "content": "Map fields."},
                    {"role": "user", "content": "Fields: Branch"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "id": "cmpl-1",
                    "model": "gpt-4o-mini-2024-07-18",
                    "choices": [{
                        "index": 0,
                        "message": {"role": "assistant", "content": "{\"Branch\": \"Navy\"}"},
                        "finish_reason": "stop"
                    }],
                    "usage": {"prompt_tokens": 40, "completion_tokens": 8, "total_tokens": 48}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let result = run(&client(&server), mapping_config()).await.unwrap();
        assert_eq!(result.text, "{\"Branch\": \"Navy\"}");
        assert_eq!(result.model, "gpt-4o-mini-2024-07-18");
        assert_eq!(result.usage.total_tokens, 48);
        assert_eq!(result.finish_reason.as_deref(), Some("stop"));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn plain_config_sends_only_user_message() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Json(json!({
                "model": "local",
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"hi"}}]}"#)
            .create_async()
            .await;

        let result = run(&client(&server), RunConfig::new("local", "hello")).await.unwrap();
        assert_eq!(result.text, "hi");
        // Endpoint didn't report a model; the requested one is kept.
        assert_eq!(result.model, "local");
        assert_eq!(result.usage, Usage::default());
        m.assert_async().await;
    }

    #[tokio::test]
    async fn no_choices_is_empty_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"model":"m","choices":[]}"#)
            .create_async()
            .await;

        let err = run(&client(&server), mapping_config()).await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyResponse));
    }

    #[tokio::test]
    async fn null_content_is_empty_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"model":"m","choices":[{"message":{"content":null},"finish_reason":"content_filter"}]}"#)
            .create_async()
            .await;

        let err = run(&client(&server), mapping_config()).await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyResponse));
    }

    #[tokio::test]
    async fn server_error_propagates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let err = run(&client(&server), mapping_config()).await.unwrap_err();
        assert!(matches!(err, AgentError::Http { status: 503, .. }));
    }
}
