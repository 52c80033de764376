//! `mapping-agent`: a small client for OpenAI-compatible chat-completions
//! endpoints, used to propose field mappings for payload data the alias
//! table couldn't place.
//!
//! ```text
//! RunConfig ──► run() ──► AgentClient::complete ──► POST {base_url}/chat/completions
//!                 │
//!                 ▼
//!             RunResult { text, model, usage }
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use mapping_agent::{agent_run, AgentClient, RunConfig};
//! use std::time::Duration;
//!
//! let client = AgentClient::new("https://api.openai.com/v1", Some(key), Duration::from_secs(30))?;
//! let result = agent_run(&client, RunConfig::new("gpt-4o-mini", "Reply with {}")).await?;
//! println!("{}", result.text);
//! ```

pub mod client;
pub mod error;
pub mod runner;
pub mod types;

pub use client::{AgentClient, DEFAULT_BASE_URL};
pub use error::AgentError;
pub use runner::{run as agent_run, RunConfig, RunResult};
pub use types::{ChatMessage, ChatRequest, ChatResponse, Role, Usage};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, AgentError>;
