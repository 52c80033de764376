use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to parse completion response: {source}\n  body: {body}")]
    Decode {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("completion contained no text")]
    EmptyResponse,

    #[error("client setup failed: {0}")]
    Setup(String),
}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AgentError::Timeout
        } else {
            AgentError::Network(e.to_string())
        }
    }
}
