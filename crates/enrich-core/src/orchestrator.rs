//! The reconciliation pipeline.
//!
//! `normalize → map deterministically → locate → merge → semantic fallback →
//! write`. Only a failed write (or a payload with no identity) is an error;
//! every other stage degrades to contributing nothing.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::aliases::AliasTable;
use crate::coerce::CoercionLimits;
use crate::config::Config;
use crate::error::{EnrichError, Result};
use crate::mapper::map_deterministic;
use crate::merge::{locate, merge};
use crate::payload::{self, normalize};
use crate::schema::{SchemaCache, SchemaDescriptor};
use crate::semantic::{candidate_fields, map_semantic, MappingAssistant, MappingRequest};
use crate::store::RecordStore;
use crate::types::{MergeAction, MergeOutcome, Provenance, TypedValue};

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub limits: CoercionLimits,
    pub semantic: bool,
    pub residual_char_budget: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            limits: CoercionLimits::default(),
            semantic: true,
            residual_char_budget: crate::semantic::RESIDUAL_CHAR_BUDGET,
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            limits: cfg.engine.limits(),
            semantic: cfg.engine.semantic,
            residual_char_budget: cfg.engine.residual_char_budget,
        }
    }
}

/// Everything `reconcile` would do, short of writing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub outcome: MergeOutcome,
    /// Fields the write would send: creates include the title, updates don't.
    pub write_set: BTreeMap<String, TypedValue>,
    /// Payload data left after deterministic mapping.
    pub residual: Value,
}

pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    assistant: Option<Arc<dyn MappingAssistant>>,
    schemas: SchemaCache,
    aliases: AliasTable,
    settings: EngineSettings,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            assistant: None,
            schemas: SchemaCache::default(),
            aliases: AliasTable::builtin(),
            settings: EngineSettings::default(),
        }
    }

    /// Reconciler configured from `cfg`: alias overrides, limits, and the
    /// fallback title field.
    pub fn from_config(store: Arc<dyn RecordStore>, cfg: &Config) -> Self {
        Self::new(store)
            .with_aliases(cfg.alias_table())
            .with_settings(EngineSettings::from(cfg))
            .with_schema_cache(SchemaCache::new(cfg.engine.fallback_title_field.clone()))
    }

    pub fn with_assistant(mut self, assistant: Arc<dyn MappingAssistant>) -> Self {
        self.assistant = Some(assistant);
        self
    }

    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_schema_cache(mut self, schemas: SchemaCache) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn schema_cache(&self) -> &SchemaCache {
        &self.schemas
    }

    /// Run every stage except the final write.
    ///
    /// With `schema` given the cache is bypassed; otherwise the cached (or
    /// freshly fetched) descriptor for `store_id` is used.
    pub async fn plan(
        &self,
        payload: &Value,
        store_id: &str,
        schema: Option<SchemaDescriptor>,
    ) -> Result<Plan> {
        let payload = normalize(payload.clone());
        let schema = match schema {
            Some(s) => Arc::new(s),
            None => self.schemas.get_schema(self.store.as_ref(), store_id).await,
        };

        let det = map_deterministic(&payload, &schema, &self.aliases, &self.settings.limits);
        let title = det
            .mapping
            .value(schema.title_field())
            .and_then(TypedValue::as_text)
            .map(str::to_string)
            .ok_or_else(|| EnrichError::MissingIdentity(schema.title_field().to_string()))?;

        let existing = match locate(self.store.as_ref(), store_id, &schema, &title).await {
            Ok(found) => found,
            Err(e) => {
                warn!(store_id, %title, error = %e, "lookup failed; treating as new record");
                None
            }
        };

        let (action, mut merged) = merge(existing.as_ref(), det.mapping.clone(), &schema);

        if self.semantic_enabled() && payload::key_count(&det.residual) > 0 {
            let candidates = candidate_fields(&schema, &det.mapping, existing.as_ref());
            if let Some(assistant) = &self.assistant {
                let request = MappingRequest::new(det.residual.clone(), candidates)
                    .with_char_budget(self.settings.residual_char_budget);
                match map_semantic(assistant.as_ref(), &request, &self.settings.limits).await {
                    Ok(semantic) => {
                        for (name, field) in semantic.iter() {
                            if !merged.contains(name) {
                                merged.insert(name.clone(), field.value.clone(), Provenance::Semantic);
                            }
                        }
                    }
                    Err(e) => warn!(store_id, error = %e, "semantic stage skipped"),
                }
            }
        }

        let dropped = merged.retain_known(&schema);
        if !dropped.is_empty() {
            warn!(?dropped, "dropped fields outside the schema");
        }

        let mut write_set = merged.write_set();
        if action == MergeAction::Updated {
            write_set.remove(schema.title_field());
        }

        let outcome = MergeOutcome {
            action,
            record_id: existing.map(|r| r.id),
            deterministic: merged.count(Provenance::Deterministic),
            semantic: merged.count(Provenance::Semantic),
            preserved: merged.count(Provenance::Preserved),
            mapping: merged,
        };
        Ok(Plan {
            outcome,
            write_set,
            residual: det.residual,
        })
    }

    /// Reconcile one payload and write the result: one create or one patch.
    pub async fn reconcile(
        &self,
        payload: &Value,
        store_id: &str,
        schema: Option<SchemaDescriptor>,
    ) -> Result<MergeOutcome> {
        let plan = self.plan(payload, store_id, schema).await?;
        let mut outcome = plan.outcome;

        match outcome.action {
            MergeAction::Created => {
                let id = self
                    .store
                    .create_record(store_id, &plan.write_set)
                    .await
                    .map_err(EnrichError::Persistence)?;
                outcome.record_id = Some(id);
            }
            MergeAction::Updated => {
                if let (Some(id), false) = (&outcome.record_id, plan.write_set.is_empty()) {
                    self.store
                        .patch_record(id, &plan.write_set)
                        .await
                        .map_err(EnrichError::Persistence)?;
                }
            }
        }

        info!(
            store_id,
            action = %outcome.action,
            record_id = outcome.record_id.as_deref().unwrap_or_default(),
            deterministic = outcome.deterministic,
            semantic = outcome.semantic,
            preserved = outcome.preserved,
            "reconciled"
        );
        Ok(outcome)
    }

    /// Reconcile payloads in order against one schema snapshot. The store's
    /// cache entry is refreshed once at the start of the batch.
    pub async fn reconcile_batch(
        &self,
        payloads: &[Value],
        store_id: &str,
    ) -> Vec<Result<MergeOutcome>> {
        self.schemas.invalidate(store_id);
        let mut results = Vec::with_capacity(payloads.len());
        for payload in payloads {
            results.push(self.reconcile(payload, store_id, None).await);
        }
        results
    }

    fn semantic_enabled(&self) -> bool {
        self.settings.semantic && self.assistant.is_some()
    }
}
