//! Semantic fallback mapping.
//!
//! Payload data the alias table could not place is offered to a
//! natural-language assistant together with the schema fields that are still
//! free. The reply is untrusted: only candidate field names survive, and every
//! value goes through the same coercion as deterministic values.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::coerce::{coerce_with, CoercionLimits};
use crate::error::{EnrichError, Result};
use crate::schema::SchemaDescriptor;
use crate::types::{FieldMapping, FieldType, Provenance, TargetRecord};

/// Default cap on the residual JSON included in a prompt.
pub const RESIDUAL_CHAR_BUDGET: usize = 12_000;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant unavailable: {0}")]
    Unavailable(String),

    #[error("assistant timed out")]
    Timeout,

    #[error("assistant rejected the request: {0}")]
    Rejected(String),
}

/// The natural-language assistant behind the semantic stage.
#[async_trait]
pub trait MappingAssistant: Send + Sync {
    /// Raw reply text; expected to contain one JSON object.
    async fn propose_mapping(
        &self,
        request: &MappingRequest,
    ) -> std::result::Result<String, AssistantError>;
}

// ---------------------------------------------------------------------------
// MappingRequest
// ---------------------------------------------------------------------------

pub const SYSTEM_PROMPT: &str = "You map leftover fields of a person/organization \
record onto a database schema. Reply with a single JSON object whose keys are \
taken only from the listed field names and whose values are taken from the \
record. Omit any field you cannot fill with confidence. Do not invent values.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingRequest {
    pub residual: Value,
    /// Field name → type the assistant may fill.
    pub candidates: BTreeMap<String, FieldType>,
    #[serde(skip)]
    pub char_budget: usize,
}

impl MappingRequest {
    pub fn new(residual: Value, candidates: BTreeMap<String, FieldType>) -> Self {
        Self {
            residual,
            candidates,
            char_budget: RESIDUAL_CHAR_BUDGET,
        }
    }

    pub fn with_char_budget(mut self, budget: usize) -> Self {
        self.char_budget = budget;
        self
    }

    pub fn candidate_names(&self) -> impl Iterator<Item = &str> {
        self.candidates.keys().map(String::as_str)
    }

    /// User prompt: candidate fields with types, then the residual JSON.
    pub fn prompt(&self) -> String {
        let mut out = String::from("Fields you may fill (name: type):\n");
        for (name, ty) in &self.candidates {
            out.push_str(&format!("- {name}: {ty}\n"));
        }
        out.push_str("\nRecord data:\n");
        out.push_str(&self.residual_text());
        out.push_str("\n\nRespond with JSON only.");
        out
    }

    fn residual_text(&self) -> String {
        let json = serde_json::to_string(&self.residual).unwrap_or_default();
        if json.chars().count() <= self.char_budget {
            return json;
        }
        let mut cut: String = json.chars().take(self.char_budget).collect();
        cut.push_str(" …[truncated]");
        cut
    }
}

/// Schema fields the semantic stage may fill: not the title, not already
/// mapped, and not already holding a value on the existing record.
pub fn candidate_fields(
    schema: &SchemaDescriptor,
    mapped: &FieldMapping,
    existing: Option<&TargetRecord>,
) -> BTreeMap<String, FieldType> {
    schema
        .fields()
        .filter(|(name, _)| *name != schema.title_field())
        .filter(|(name, _)| !mapped.contains(name))
        .filter(|(name, _)| existing.map_or(true, |r| !r.fields.contains_key(*name)))
        .map(|(name, ty)| (name.to_string(), ty))
        .collect()
}

// ---------------------------------------------------------------------------
// Reply handling
// ---------------------------------------------------------------------------

/// Pull the first JSON object out of a reply that may wrap it in a fenced
/// code block or surrounding prose.
pub fn extract_json_object(reply: &str) -> Option<Map<String, Value>> {
    let trimmed = reply.trim();
    let mut attempts: Vec<&str> = vec![trimmed];
    if let Some(fenced) = fenced_block(trimmed) {
        attempts.push(fenced);
    }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            attempts.push(&trimmed[start..=end]);
        }
    }
    attempts
        .into_iter()
        .find_map(|text| match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    // Skip an info string such as "json".
    let body_start = after.find('\n').map_or(0, |i| i + 1);
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Keep only candidate keys with values that coerce to the field's type.
pub fn validate_proposal(
    proposal: Map<String, Value>,
    candidates: &BTreeMap<String, FieldType>,
    limits: &CoercionLimits,
) -> FieldMapping {
    let mut mapping = FieldMapping::new();
    for (key, value) in proposal {
        let Some(ty) = candidates.get(key.as_str()).copied() else {
            warn!(field = %key, "discarding assistant field outside candidates");
            continue;
        };
        if value.is_null() {
            continue;
        }
        match coerce_with(&value, ty, limits) {
            Ok(Some(v)) => mapping.insert(key, v, Provenance::Semantic),
            Ok(None) => {}
            Err(e) => debug!(field = %key, code = e.code(), "discarding assistant value: {e}"),
        }
    }
    mapping
}

/// Ask the assistant and validate its reply. Any failure is reported as
/// [`EnrichError::SemanticMappingUnavailable`]; callers treat it as an empty
/// contribution.
pub async fn map_semantic(
    assistant: &dyn MappingAssistant,
    request: &MappingRequest,
    limits: &CoercionLimits,
) -> Result<FieldMapping> {
    if request.candidates.is_empty() {
        return Ok(FieldMapping::new());
    }
    let reply = assistant
        .propose_mapping(request)
        .await
        .map_err(|e| EnrichError::SemanticMappingUnavailable(e.to_string()))?;
    let proposal = extract_json_object(&reply).ok_or_else(|| {
        EnrichError::SemanticMappingUnavailable("reply contained no JSON object".into())
    })?;
    let mapping = validate_proposal(proposal, &request.candidates, limits);
    info!(
        candidates = request.candidates.len(),
        accepted = mapping.len(),
        "semantic mapping complete"
    );
    Ok(mapping)
}
