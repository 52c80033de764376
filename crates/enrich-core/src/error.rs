use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("schema unavailable for store '{store_id}': {reason}")]
    SchemaUnavailable { store_id: String, reason: String },

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("payload has no value for title field '{0}'")]
    MissingIdentity(String),

    #[error("record lookup failed: {0}")]
    LookupFailure(String),

    #[error("semantic mapping unavailable: {0}")]
    SemanticMappingUnavailable(String),

    #[error("failed to persist record: {0}")]
    Persistence(#[source] StoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EnrichError>;
