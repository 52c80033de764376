//! Deterministic field mapping driven by the alias table.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::aliases::AliasTable;
use crate::coerce::{coerce_with, CoercionLimits};
use crate::payload::{prune, remove_path};
use crate::schema::SchemaDescriptor;
use crate::types::{FieldMapping, Provenance};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeterministicMapping {
    pub mapping: FieldMapping,
    /// Payload data no written concept accounted for, with empty branches
    /// pruned.
    pub residual: Value,
    /// Keys of concepts that wrote at least one field.
    pub concepts: Vec<String>,
}

/// Map `payload` onto `schema` through `table`.
///
/// Every concept value fans out to each of its synonyms the schema declares.
/// When two concepts reach the same field the one earlier in the table keeps
/// it. Only identity concepts may write the title field. A concept that wrote
/// nothing leaves its paths in the residual.
pub fn map_deterministic(
    payload: &Value,
    schema: &SchemaDescriptor,
    table: &AliasTable,
    limits: &CoercionLimits,
) -> DeterministicMapping {
    let mut mapping = FieldMapping::new();
    let mut residual = payload.clone();
    let mut concepts = Vec::new();

    for concept in table.concepts() {
        let targets = concept.targets(schema);
        if targets.is_empty() {
            continue;
        }
        let Some(resolved) = concept.resolve(payload, table) else {
            continue;
        };

        let mut wrote = false;
        for field in targets {
            if mapping.contains(field) {
                continue;
            }
            if field == schema.title_field() && !concept.identity {
                continue;
            }
            let Some(ty) = schema.field_type(field) else {
                continue;
            };
            match coerce_with(&resolved.value, ty, limits) {
                Ok(Some(value)) => {
                    mapping.insert(field, value, Provenance::Deterministic);
                    wrote = true;
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(concept = %concept.key, field, code = e.code(), "skipping field: {e}");
                }
            }
        }

        if wrote {
            for path in &resolved.consumed {
                remove_path(&mut residual, path);
            }
            concepts.push(concept.key.clone());
        }
    }

    prune(&mut residual);
    debug!(
        fields = mapping.len(),
        concepts = concepts.len(),
        "deterministic mapping complete"
    );
    DeterministicMapping {
        mapping,
        residual,
        concepts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldType, TypedValue};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn schema(fields: &[(&str, FieldType)]) -> SchemaDescriptor {
        let map: BTreeMap<String, FieldType> =
            fields.iter().map(|(n, t)| (n.to_string(), *t)).collect();
        SchemaDescriptor::new(map).unwrap()
    }

    fn people_schema() -> SchemaDescriptor {
        schema(&[
            ("Name", FieldType::Title),
            ("Position", FieldType::Text),
            ("Company", FieldType::Text),
            ("Employer", FieldType::Text),
        ])
    }

    fn map(payload: &Value, schema: &SchemaDescriptor) -> DeterministicMapping {
        map_deterministic(
            payload,
            schema,
            &AliasTable::builtin(),
            &CoercionLimits::default(),
        )
    }

    fn text(m: &FieldMapping, name: &str) -> Option<String> {
        m.value(name).map(|v| v.to_string())
    }

    #[test]
    fn maps_the_canonical_person() {
        let payload = json!({
            "name": "Matt Stevens",
            "title": "CEO",
            "organization": {"name": "The Honor Foundation"}
        });
        let out = map(&payload, &people_schema());

        assert_eq!(out.mapping.len(), 4);
        assert_eq!(
            out.mapping.value("Name"),
            Some(&TypedValue::Title("Matt Stevens".into()))
        );
        assert_eq!(text(&out.mapping, "Position").as_deref(), Some("CEO"));
        assert_eq!(
            text(&out.mapping, "Company").as_deref(),
            Some("The Honor Foundation")
        );
        assert_eq!(
            text(&out.mapping, "Employer").as_deref(),
            Some("The Honor Foundation")
        );
        assert_eq!(out.mapping.count(Provenance::Deterministic), 4);
        assert_eq!(out.residual, json!({}));
    }

    #[test]
    fn fans_out_to_every_declared_synonym() {
        let s = schema(&[
            ("Name", FieldType::Title),
            ("Company", FieldType::Text),
            ("Employer", FieldType::Text),
            ("current company", FieldType::Text),
        ]);
        let out = map(&json!({"name": "A", "company": "Acme"}), &s);
        for field in ["Company", "Employer", "current company"] {
            assert_eq!(text(&out.mapping, field).as_deref(), Some("Acme"), "{field}");
        }
    }

    #[test]
    fn fan_out_coerces_per_field_type() {
        let s = schema(&[
            ("Name", FieldType::Title),
            ("Connections", FieldType::Number),
            ("LinkedIn Connections", FieldType::Text),
        ]);
        let out = map(&json!({"name": "A", "connections": "500+"}), &s);
        assert_eq!(
            out.mapping.value("Connections"),
            Some(&TypedValue::Number(500.into()))
        );
        assert_eq!(
            out.mapping.value("LinkedIn Connections"),
            Some(&TypedValue::Text("500".into()))
        );
    }

    #[test]
    fn unmatched_data_stays_in_residual() {
        let payload = json!({
            "name": "A",
            "title": "CEO",
            "organization": {"name": "Acme", "founded_year": 2011},
            "military_branch": "Navy",
            "headline": "Builder"
        });
        let out = map(&payload, &people_schema());
        // headline has no field in this schema; founded_year has no concept.
        assert_eq!(
            out.residual,
            json!({
                "organization": {"founded_year": 2011},
                "military_branch": "Navy",
                "headline": "Builder"
            })
        );
        assert_eq!(out.concepts, vec!["full_name", "job_title", "company"]);
    }

    #[test]
    fn coercion_failure_skips_only_that_field() {
        let s = schema(&[
            ("Name", FieldType::Title),
            ("Company Size", FieldType::Number),
            ("Headline", FieldType::Text),
        ]);
        // The size band ("51-200") is not numeric.
        let out = map(
            &json!({"name": "A", "organization_num_employees": 120, "headline": "Builder"}),
            &s,
        );
        assert!(!out.mapping.contains("Company Size"));
        assert!(out.mapping.contains("Headline"));
        assert_eq!(out.residual, json!({"organization_num_employees": 120}));
    }

    #[test]
    fn title_field_is_reserved_for_identity() {
        let s = schema(&[("Title", FieldType::Title), ("Position", FieldType::Text)]);
        let out = map(&json!({"title": "CEO"}), &s);
        assert!(!out.mapping.contains("Title"));
        assert_eq!(text(&out.mapping, "Position").as_deref(), Some("CEO"));

        let out = map(&json!({"name": "Matt", "title": "CEO"}), &s);
        assert_eq!(
            out.mapping.value("Title"),
            Some(&TypedValue::Title("Matt".into()))
        );
    }

    #[test]
    fn matches_schema_names_case_insensitively() {
        let s = schema(&[("name", FieldType::Title), ("EMAIL ", FieldType::Email)]);
        let out = map(&json!({"name": "A", "primary_email": "a@x.io"}), &s);
        assert_eq!(
            out.mapping.value("EMAIL "),
            Some(&TypedValue::Email("a@x.io".into()))
        );
        assert_eq!(out.residual, json!({}));
    }

    #[test]
    fn derived_concepts_populate_quality_fields() {
        let s = schema(&[
            ("Name", FieldType::Title),
            ("Data Sources", FieldType::MultiChoice),
            ("Seniority", FieldType::SingleChoice),
            ("Data Confidence", FieldType::SingleChoice),
            ("Completeness Score", FieldType::Number),
        ]);
        let payload = json!({
            "first_name": "Matt",
            "last_name": "Stevens",
            "title": "Chief Executive Officer",
            "email_status": "verified",
            "headline": "CEO"
        });
        let out = map(&payload, &s);
        assert_eq!(
            out.mapping.value("Name"),
            Some(&TypedValue::Title("Matt Stevens".into()))
        );
        assert_eq!(
            out.mapping.value("Data Sources"),
            Some(&TypedValue::MultiChoice(vec!["Apollo".into()]))
        );
        assert_eq!(
            out.mapping.value("Seniority"),
            Some(&TypedValue::SingleChoice("C-Level".into()))
        );
        assert_eq!(
            out.mapping.value("Data Confidence"),
            Some(&TypedValue::SingleChoice("Medium".into()))
        );
        assert_eq!(
            out.mapping.value("Completeness Score"),
            Some(&TypedValue::Number(18.into()))
        );
        // Derived values consume nothing.
        assert_eq!(out.residual, payload);
    }

    #[test]
    fn maps_a_profile_scrape() {
        let s = schema(&[
            ("Name", FieldType::Title),
            ("LinkedIn Current Position", FieldType::Text),
            ("LinkedIn Current Company", FieldType::Text),
        ]);
        let payload = json!({
            "fullName": "Matt Stevens",
            "currentPosition": "CEO",
            "currentCompany": "The Honor Foundation"
        });
        let out = map(&payload, &s);
        assert_eq!(
            text(&out.mapping, "LinkedIn Current Position").as_deref(),
            Some("CEO")
        );
        assert_eq!(
            text(&out.mapping, "LinkedIn Current Company").as_deref(),
            Some("The Honor Foundation")
        );
        assert_eq!(out.residual, json!({}));
    }

    #[test]
    fn connection_count_is_not_a_connection_name() {
        let s = schema(&[
            ("Name", FieldType::Title),
            ("Connections", FieldType::Number),
            ("Key Connections", FieldType::MultiChoice),
        ]);
        let out = map(&json!({"name": "A", "connections": "500+"}), &s);
        assert_eq!(
            out.mapping.value("Connections"),
            Some(&TypedValue::Number(500.into()))
        );
        assert!(!out.mapping.contains("Key Connections"));
    }

    #[test]
    fn connection_list_fills_network_fields() {
        let s = schema(&[
            ("Name", FieldType::Title),
            ("LinkedIn First Degree Connections", FieldType::Number),
            ("LinkedIn Connection Names", FieldType::Text),
            ("LinkedIn Connection Companies", FieldType::Text),
            ("LinkedIn Network Strength Score", FieldType::Number),
        ]);
        let payload = json!({
            "name": "Matt Stevens",
            "connections": [
                {"name": "Ann Lee", "title": "CEO", "company": "Acme", "industry": "Defense"},
                {"name": "Bo Park", "company": "Navy", "industry": "Government"}
            ]
        });
        let out = map(&payload, &s);
        assert_eq!(
            out.mapping.value("LinkedIn First Degree Connections"),
            Some(&TypedValue::Number(2.into()))
        );
        assert_eq!(
            text(&out.mapping, "LinkedIn Connection Names").as_deref(),
            Some("Ann Lee, Bo Park")
        );
        assert_eq!(
            text(&out.mapping, "LinkedIn Connection Companies").as_deref(),
            Some("Acme, Navy")
        );
        // 0.2 size + 4 industries + 5 C-level.
        assert_eq!(
            out.mapping.value("LinkedIn Network Strength Score"),
            Some(&TypedValue::Number(9.into()))
        );
    }

    #[test]
    fn mapping_is_independent_of_schema_declaration_order() {
        let a = map(
            &json!({"name": "A", "company": "Acme"}),
            &schema(&[
                ("Name", FieldType::Title),
                ("Employer", FieldType::Text),
                ("Company", FieldType::Text),
            ]),
        );
        let b = map(
            &json!({"company": "Acme", "name": "A"}),
            &schema(&[
                ("Company", FieldType::Text),
                ("Name", FieldType::Title),
                ("Employer", FieldType::Text),
            ]),
        );
        assert_eq!(a.mapping, b.mapping);
    }
}
