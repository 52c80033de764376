//! Target-store schema snapshots.
//!
//! A [`SchemaDescriptor`] is an immutable field-name → field-type dictionary
//! with exactly one title field. [`SchemaCache`] memoizes descriptors per
//! store id for the length of a batch.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::error::{EnrichError, Result};
use crate::store::RecordStore;
use crate::types::FieldType;

/// Title field name used by the identity-only fallback descriptor.
pub const DEFAULT_TITLE_FIELD: &str = "Name";

// ---------------------------------------------------------------------------
// SchemaDescriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    title_field: String,
    fields: BTreeMap<String, FieldType>,
    /// Lower-cased, trimmed name → declared name.
    folded: BTreeMap<String, String>,
}

impl SchemaDescriptor {
    pub fn new(fields: BTreeMap<String, FieldType>) -> Result<Self> {
        let titles: Vec<&String> = fields
            .iter()
            .filter(|(_, ty)| **ty == FieldType::Title)
            .map(|(name, _)| name)
            .collect();
        let title_field = match titles.as_slice() {
            [one] => (*one).clone(),
            [] => return Err(EnrichError::InvalidSchema("no title field".into())),
            many => {
                return Err(EnrichError::InvalidSchema(format!(
                    "expected exactly one title field, found {}",
                    many.len()
                )))
            }
        };

        let mut folded = BTreeMap::new();
        for name in fields.keys() {
            folded.entry(fold(name)).or_insert_with(|| name.clone());
        }

        Ok(Self {
            title_field,
            fields,
            folded,
        })
    }

    /// Identity-only descriptor used when the live schema can't be fetched.
    pub fn minimal(title_field: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(title_field.to_string(), FieldType::Title);
        let mut folded = BTreeMap::new();
        folded.insert(fold(title_field), title_field.to_string());
        Self {
            title_field: title_field.to_string(),
            fields,
            folded,
        }
    }

    /// Parse `{ "Field": { "type": "text" } }`; bare `"Field": "text"` entries
    /// are accepted too. Types the engine can't write are skipped.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| EnrichError::InvalidSchema("schema must be a JSON object".into()))?;
        let mut fields = BTreeMap::new();
        for (name, spec) in obj {
            let raw = match spec {
                Value::String(s) => Some(s.as_str()),
                Value::Object(o) => o.get("type").and_then(Value::as_str),
                _ => None,
            };
            let Some(raw) = raw else {
                return Err(EnrichError::InvalidSchema(format!(
                    "field '{name}' has no type"
                )));
            };
            match FieldType::from_store_type(raw) {
                Some(ty) => {
                    fields.insert(name.clone(), ty);
                }
                None => debug!(field = %name, store_type = raw, "skipping unwritable field type"),
            }
        }
        Self::new(fields)
    }

    /// Parse a Notion database object (`properties.<name>.type`). Workflow
    /// `status` properties belong to the page-status channel and are left out.
    pub fn from_notion_database(value: &Value) -> Result<Self> {
        let props = value
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| EnrichError::InvalidSchema("database has no properties".into()))?;
        let writable: serde_json::Map<String, Value> = props
            .iter()
            .filter(|(_, def)| def.get("type").and_then(Value::as_str) != Some("status"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self::from_json(&Value::Object(writable))
    }

    pub fn title_field(&self) -> &str {
        &self.title_field
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).copied()
    }

    /// Declared spelling of `name`, matched case-insensitively.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        if let Some((declared, _)) = self.fields.get_key_value(name) {
            return Some(declared);
        }
        self.folded.get(&fold(name)).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize back to the `{ "Field": { "type": "…" } }` shape.
    pub fn to_json(&self) -> Value {
        let map = self
            .fields
            .iter()
            .map(|(k, ty)| (k.clone(), serde_json::json!({ "type": ty.as_str() })))
            .collect();
        Value::Object(map)
    }
}

impl Serialize for SchemaDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, ty) in &self.fields {
            map.serialize_entry(name, &serde_json::json!({ "type": ty.as_str() }))?;
        }
        map.end()
    }
}

fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// SchemaCache
// ---------------------------------------------------------------------------

pub struct SchemaCache {
    entries: Mutex<HashMap<String, Arc<SchemaDescriptor>>>,
    fallback_title: String,
}

impl SchemaCache {
    pub fn new(fallback_title: impl Into<String>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            fallback_title: fallback_title.into(),
        }
    }

    /// Cached descriptor for `store_id`, fetching it on a miss. A transient
    /// fetch failure is retried once; if the schema still can't be read the
    /// identity-only descriptor is returned and nothing is cached.
    pub async fn get_schema(&self, store: &dyn RecordStore, store_id: &str) -> Arc<SchemaDescriptor> {
        if let Some(hit) = self.cached(store_id) {
            return hit;
        }
        match fetch_with_retry(store, store_id).await {
            Ok(schema) => {
                let schema = Arc::new(schema);
                info!(store_id, fields = schema.len(), "schema fetched");
                self.lock().insert(store_id.to_string(), Arc::clone(&schema));
                schema
            }
            Err(e) => {
                warn!(store_id, error = %e, "using identity-only schema");
                Arc::new(SchemaDescriptor::minimal(&self.fallback_title))
            }
        }
    }

    pub fn insert(&self, store_id: &str, schema: SchemaDescriptor) -> Arc<SchemaDescriptor> {
        let schema = Arc::new(schema);
        self.lock().insert(store_id.to_string(), Arc::clone(&schema));
        schema
    }

    pub fn invalidate(&self, store_id: &str) {
        self.lock().remove(store_id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn cached(&self, store_id: &str) -> Option<Arc<SchemaDescriptor>> {
        self.lock().get(store_id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<SchemaDescriptor>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE_FIELD)
    }
}

async fn fetch_with_retry(store: &dyn RecordStore, store_id: &str) -> Result<SchemaDescriptor> {
    let first = match store.fetch_schema(store_id).await {
        Ok(schema) => return Ok(schema),
        Err(e) => e,
    };
    if !first.is_transient() {
        return Err(EnrichError::SchemaUnavailable {
            store_id: store_id.to_string(),
            reason: first.to_string(),
        });
    }
    debug!(store_id, error = %first, "retrying schema fetch");
    store
        .fetch_schema(store_id)
        .await
        .map_err(|e| EnrichError::SchemaUnavailable {
            store_id: store_id.to_string(),
            reason: e.to_string(),
        })
}
