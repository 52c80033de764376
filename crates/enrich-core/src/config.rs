use crate::aliases::{AliasEntry, AliasTable, Transform};
use crate::coerce::{CoercionLimits, MULTI_CHOICE_LIMIT, TEXT_LIMIT};
use crate::error::{EnrichError, Result};
use crate::notion;
use crate::paths;
use crate::schema::DEFAULT_TITLE_FIELD;
use crate::semantic::RESIDUAL_CHAR_BUDGET;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Environment variable holding the integration token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Default store (database) id for commands that don't name one.
    #[serde(default)]
    pub store_id: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_store_url() -> String {
    notion::DEFAULT_BASE_URL.to_string()
}

fn default_api_version() -> String {
    notion::DEFAULT_API_VERSION.to_string()
}

fn default_token_env() -> String {
    "NOTION_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_store_url(),
            api_version: default_api_version(),
            token_env: default_token_env(),
            store_id: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StoreConfig {
    pub fn token(&self) -> Result<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| EnrichError::Config(format!("{} is not set", self.token_env)))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// AssistantConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantConfig {
    #[serde(default = "default_assistant_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
}

fn default_assistant_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: default_assistant_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
        }
    }
}

impl AssistantConfig {
    /// API key from the configured environment variable, if set.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default = "default_text_limit")]
    pub text_limit: usize,
    #[serde(default = "default_multi_choice_limit")]
    pub multi_choice_limit: usize,
    /// Master switch for the semantic fallback stage.
    #[serde(default = "default_semantic")]
    pub semantic: bool,
    #[serde(default = "default_residual_budget")]
    pub residual_char_budget: usize,
    /// Title field of the identity-only schema used when the live schema is
    /// unavailable.
    #[serde(default = "default_fallback_title")]
    pub fallback_title_field: String,
}

fn default_text_limit() -> usize {
    TEXT_LIMIT
}

fn default_multi_choice_limit() -> usize {
    MULTI_CHOICE_LIMIT
}

fn default_semantic() -> bool {
    true
}

fn default_residual_budget() -> usize {
    RESIDUAL_CHAR_BUDGET
}

fn default_fallback_title() -> String {
    DEFAULT_TITLE_FIELD.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            text_limit: default_text_limit(),
            multi_choice_limit: default_multi_choice_limit(),
            semantic: default_semantic(),
            residual_char_budget: default_residual_budget(),
            fallback_title_field: default_fallback_title(),
        }
    }
}

impl EngineConfig {
    pub fn limits(&self) -> CoercionLimits {
        CoercionLimits {
            text: self.text_limit,
            multi_choice: self.multi_choice_limit,
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant: Option<AssistantConfig>,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<AliasEntry>,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            store: StoreConfig::default(),
            assistant: None,
            engine: EngineConfig::default(),
            aliases: Vec::new(),
        }
    }
}

impl Config {
    /// Load `.enrich/config.yaml` under `root`; a missing file yields defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            debug!(path = %path.display(), "no config file; using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Built-in alias table with this config's `aliases` applied.
    pub fn alias_table(&self) -> AliasTable {
        AliasTable::with_overrides(&self.aliases)
    }

    /// Validate the configuration and return any warnings or errors.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            })
        };

        let engine = &self.engine;
        if engine.text_limit == 0 || engine.text_limit > 100_000 {
            error(format!(
                "engine.text_limit={} is out of range (1..=100000)",
                engine.text_limit
            ));
        }
        if engine.multi_choice_limit == 0 || engine.multi_choice_limit > 100 {
            error(format!(
                "engine.multi_choice_limit={} is out of range (1..=100)",
                engine.multi_choice_limit
            ));
        }
        if engine.residual_char_budget == 0 {
            error("engine.residual_char_budget must be positive".to_string());
        }
        if engine.fallback_title_field.trim().is_empty() {
            error("engine.fallback_title_field is empty".to_string());
        }
        if self.store.timeout_secs == 0 {
            error("store.timeout_secs must be positive".to_string());
        }

        let builtin = AliasTable::builtin();
        for entry in &self.aliases {
            if entry.fields.is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("alias '{}' lists no fields", entry.concept),
                });
            }
            if let Some(t) = &entry.transform {
                if t.parse::<Transform>().is_err() {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!(
                            "alias '{}' has unknown transform '{}' (ignored)",
                            entry.concept, t
                        ),
                    });
                }
            }
            if builtin.get(&entry.concept).is_none() && entry.paths.is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "alias '{}' is a new concept with no paths and will never match",
                        entry.concept
                    ),
                });
            }
        }

        if let Some(assistant) = &self.assistant {
            if assistant.model.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: "assistant.model is empty".to_string(),
                });
            }
            if assistant.timeout_secs == 0 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: "assistant.timeout_secs must be positive".to_string(),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
