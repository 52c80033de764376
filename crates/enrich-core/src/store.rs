//! The record-store seam: what the engine needs from the target system, plus
//! an in-process implementation.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use thiserror::Error;

use crate::schema::SchemaDescriptor;
use crate::types::{TargetRecord, TypedValue};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(String),

    #[error("store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed store response: {0}")]
    Decode(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Network failures, rate limiting and server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Network(_) => true,
            StoreError::Status { status, .. } => *status == 429 || (500..=599).contains(status),
            StoreError::Decode(_) | StoreError::NotFound(_) => false,
        }
    }
}

/// Target record store. Implementations own transport, auth and timeouts.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_schema(&self, store_id: &str) -> Result<SchemaDescriptor, StoreError>;

    /// First record whose title field text equals `title` exactly.
    async fn query_record_by_title(
        &self,
        store_id: &str,
        title_field: &str,
        title: &str,
    ) -> Result<Option<TargetRecord>, StoreError>;

    /// Returns the store-assigned record id.
    async fn create_record(
        &self,
        store_id: &str,
        fields: &BTreeMap<String, TypedValue>,
    ) -> Result<String, StoreError>;

    /// Overwrite the given fields; fields not named are left untouched.
    async fn patch_record(
        &self,
        record_id: &str,
        fields: &BTreeMap<String, TypedValue>,
    ) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryInner {
    schemas: HashMap<String, SchemaDescriptor>,
    /// store id → records in insertion order
    records: HashMap<String, Vec<TargetRecord>>,
}

/// In-process store, used for offline mapping, dry runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(self, store_id: &str, schema: SchemaDescriptor) -> Self {
        self.lock().schemas.insert(store_id.to_string(), schema);
        self
    }

    /// Seed a record directly, bypassing the engine. Returns its id.
    pub fn insert_record(&self, store_id: &str, fields: BTreeMap<String, TypedValue>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.lock()
            .records
            .entry(store_id.to_string())
            .or_default()
            .push(TargetRecord {
                id: id.clone(),
                fields,
            });
        id
    }

    pub fn records(&self, store_id: &str) -> Vec<TargetRecord> {
        self.lock()
            .records
            .get(store_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn record(&self, record_id: &str) -> Option<TargetRecord> {
        self.lock()
            .records
            .values()
            .flatten()
            .find(|r| r.id == record_id)
            .cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_schema(&self, store_id: &str) -> Result<SchemaDescriptor, StoreError> {
        self.lock()
            .schemas
            .get(store_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("store '{store_id}'")))
    }

    async fn query_record_by_title(
        &self,
        store_id: &str,
        title_field: &str,
        title: &str,
    ) -> Result<Option<TargetRecord>, StoreError> {
        let inner = self.lock();
        let found = inner.records.get(store_id).and_then(|records| {
            records
                .iter()
                .find(|r| {
                    r.fields
                        .get(title_field)
                        .and_then(TypedValue::as_text)
                        .is_some_and(|t| t == title)
                })
                .cloned()
        });
        Ok(found)
    }

    async fn create_record(
        &self,
        store_id: &str,
        fields: &BTreeMap<String, TypedValue>,
    ) -> Result<String, StoreError> {
        Ok(self.insert_record(store_id, fields.clone()))
    }

    async fn patch_record(
        &self,
        record_id: &str,
        fields: &BTreeMap<String, TypedValue>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let record = inner
            .records
            .values_mut()
            .flatten()
            .find(|r| r.id == record_id)
            .ok_or_else(|| StoreError::NotFound(format!("record '{record_id}'")))?;
        for (name, value) in fields {
            record.fields.insert(name.clone(), value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldType;

    fn schema() -> SchemaDescriptor {
        let mut fields = BTreeMap::new();
        fields.insert("Name".to_string(), FieldType::Title);
        fields.insert("Company".to_string(), FieldType::Text);
        SchemaDescriptor::new(fields).unwrap()
    }

    fn fields(name: &str, company: &str) -> BTreeMap<String, TypedValue> {
        let mut f = BTreeMap::new();
        f.insert("Name".to_string(), TypedValue::Title(name.into()));
        f.insert("Company".to_string(), TypedValue::Text(company.into()));
        f
    }

    #[test]
    fn transient_classification() {
        assert!(StoreError::Network("reset".into()).is_transient());
        assert!(StoreError::Status { status: 503, body: String::new() }.is_transient());
        assert!(StoreError::Status { status: 429, body: String::new() }.is_transient());
        assert!(!StoreError::Status { status: 400, body: String::new() }.is_transient());
        assert!(!StoreError::Decode("bad".into()).is_transient());
    }

    #[tokio::test]
    async fn lookup_is_exact_and_case_sensitive() {
        let store = MemoryStore::new().with_schema("db", schema());
        store.insert_record("db", fields("Matt Stevens", "THF"));

        let hit = store
            .query_record_by_title("db", "Name", "Matt Stevens")
            .await
            .unwrap();
        assert!(hit.is_some());

        let miss = store
            .query_record_by_title("db", "Name", "matt stevens")
            .await
            .unwrap();
        assert!(miss.is_none());

        let other_store = store
            .query_record_by_title("other", "Name", "Matt Stevens")
            .await
            .unwrap();
        assert!(other_store.is_none());
    }

    #[tokio::test]
    async fn patch_overwrites_named_fields_only() {
        let store = MemoryStore::new();
        let id = store.insert_record("db", fields("Matt Stevens", "THF"));

        let mut patch = BTreeMap::new();
        patch.insert("Position".to_string(), TypedValue::Text("CEO".into()));
        store.patch_record(&id, &patch).await.unwrap();

        let record = store.record(&id).unwrap();
        assert_eq!(record.fields.len(), 3);
        assert_eq!(record.fields["Company"], TypedValue::Text("THF".into()));
    }

    #[tokio::test]
    async fn patch_unknown_record_is_not_found() {
        let store = MemoryStore::new();
        let err = store.patch_record("nope", &BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn missing_schema_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.fetch_schema("db").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
