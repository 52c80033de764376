//! Record lookup and the field-level merge policy.

use tracing::debug;

use crate::error::{EnrichError, Result};
use crate::schema::SchemaDescriptor;
use crate::store::RecordStore;
use crate::types::{FieldMapping, MergeAction, Provenance, TargetRecord};

/// Find the record whose title text equals `title` exactly.
pub async fn locate(
    store: &dyn RecordStore,
    store_id: &str,
    schema: &SchemaDescriptor,
    title: &str,
) -> Result<Option<TargetRecord>> {
    let found = store
        .query_record_by_title(store_id, schema.title_field(), title)
        .await
        .map_err(|e| EnrichError::LookupFailure(e.to_string()))?;
    debug!(store_id, title, found = found.is_some(), "record lookup");
    Ok(found)
}

/// Merge `incoming` over `existing`.
///
/// Without an existing record the mapping is returned as-is. Otherwise every
/// existing schema field is carried as [`Provenance::Preserved`] and incoming
/// values overwrite them, except the title field which keeps its stored value.
/// Merging the same mapping twice gives the same result.
pub fn merge(
    existing: Option<&TargetRecord>,
    incoming: FieldMapping,
    schema: &SchemaDescriptor,
) -> (MergeAction, FieldMapping) {
    let Some(existing) = existing else {
        return (MergeAction::Created, incoming);
    };

    let mut merged = FieldMapping::new();
    for (name, value) in &existing.fields {
        match schema.field_type(name) {
            Some(ty) if value.conforms_to(ty) => {
                merged.insert(name.clone(), value.clone(), Provenance::Preserved);
            }
            _ => debug!(field = %name, "existing field not in schema; left alone"),
        }
    }

    let title_field = schema.title_field();
    for (name, field) in incoming.iter() {
        if name == title_field && merged.contains(title_field) {
            continue;
        }
        merged.insert(name.clone(), field.value.clone(), field.provenance);
    }

    (MergeAction::Updated, merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{FieldType, TypedValue};
    use std::collections::BTreeMap;

    fn schema() -> SchemaDescriptor {
        let mut fields = BTreeMap::new();
        fields.insert("Name".to_string(), FieldType::Title);
        fields.insert("Position".to_string(), FieldType::Text);
        fields.insert("Company".to_string(), FieldType::Text);
        fields.insert("Employer".to_string(), FieldType::Text);
        SchemaDescriptor::new(fields).unwrap()
    }

    fn existing() -> TargetRecord {
        let mut fields = BTreeMap::new();
        fields.insert("Name".to_string(), TypedValue::Title("Matt Stevens".into()));
        fields.insert("Position".to_string(), TypedValue::Text("CEO".into()));
        fields.insert(
            "Company".to_string(),
            TypedValue::Text("The Honor Foundation".into()),
        );
        fields.insert("Legacy".to_string(), TypedValue::Text("old".into()));
        TargetRecord {
            id: "page-1".into(),
            fields,
        }
    }

    fn incoming() -> FieldMapping {
        let mut m = FieldMapping::new();
        m.insert("Name", TypedValue::Title("matt stevens".into()), Provenance::Deterministic);
        m.insert("Position", TypedValue::Text("President".into()), Provenance::Deterministic);
        m
    }

    #[test]
    fn no_existing_record_creates() {
        let (action, merged) = merge(None, incoming(), &schema());
        assert_eq!(action, MergeAction::Created);
        assert_eq!(merged, incoming());
    }

    #[test]
    fn incoming_wins_and_absent_fields_survive() {
        let record = existing();
        let (action, merged) = merge(Some(&record), incoming(), &schema());
        assert_eq!(action, MergeAction::Updated);
        assert_eq!(
            merged.value("Position"),
            Some(&TypedValue::Text("President".into()))
        );
        assert_eq!(merged.get("Position").unwrap().provenance, Provenance::Deterministic);
        assert_eq!(
            merged.value("Company"),
            Some(&TypedValue::Text("The Honor Foundation".into()))
        );
        assert_eq!(merged.get("Company").unwrap().provenance, Provenance::Preserved);
        // Unknown store fields are not part of the mapping.
        assert!(!merged.contains("Legacy"));
    }

    #[test]
    fn title_is_immutable_on_update() {
        let record = existing();
        let (_, merged) = merge(Some(&record), incoming(), &schema());
        let name = merged.get("Name").unwrap();
        assert_eq!(name.value, TypedValue::Title("Matt Stevens".into()));
        assert_eq!(name.provenance, Provenance::Preserved);
    }

    #[test]
    fn merge_is_idempotent() {
        let record = existing();
        let (_, once) = merge(Some(&record), incoming(), &schema());

        let mut applied = record.clone();
        for (name, value) in once.write_set() {
            applied.fields.insert(name, value);
        }
        let (_, twice) = merge(Some(&applied), incoming(), &schema());
        assert_eq!(once.values(), twice.values());
    }

    #[tokio::test]
    async fn locate_matches_exact_title() {
        let store = MemoryStore::new();
        store.insert_record("db", existing().fields);
        let hit = locate(&store, "db", &schema(), "Matt Stevens").await.unwrap();
        assert_eq!(hit.unwrap().fields.len(), 4);
        let miss = locate(&store, "db", &schema(), "Matt").await.unwrap();
        assert!(miss.is_none());
    }
}
