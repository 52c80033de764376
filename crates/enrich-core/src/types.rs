use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::schema::SchemaDescriptor;

// ---------------------------------------------------------------------------
// FieldType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    Title,
    Text,
    LongText,
    Email,
    Url,
    Phone,
    Number,
    SingleChoice,
    MultiChoice,
    Date,
    Boolean,
}

impl FieldType {
    pub fn all() -> &'static [FieldType] {
        &[
            FieldType::Title,
            FieldType::Text,
            FieldType::LongText,
            FieldType::Email,
            FieldType::Url,
            FieldType::Phone,
            FieldType::Number,
            FieldType::SingleChoice,
            FieldType::MultiChoice,
            FieldType::Date,
            FieldType::Boolean,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Title => "title",
            FieldType::Text => "text",
            FieldType::LongText => "long-text",
            FieldType::Email => "email",
            FieldType::Url => "url",
            FieldType::Phone => "phone",
            FieldType::Number => "number",
            FieldType::SingleChoice => "single-choice",
            FieldType::MultiChoice => "multi-choice",
            FieldType::Date => "date",
            FieldType::Boolean => "boolean",
        }
    }

    /// Map a store-native type name onto a field type. Returns `None` for
    /// types the engine never writes (formulas, relations, rollups, …).
    pub fn from_store_type(s: &str) -> Option<FieldType> {
        match s {
            "title" => Some(FieldType::Title),
            "text" | "rich_text" => Some(FieldType::Text),
            "long-text" | "long_text" => Some(FieldType::LongText),
            "email" => Some(FieldType::Email),
            "url" => Some(FieldType::Url),
            "phone" | "phone_number" => Some(FieldType::Phone),
            "number" => Some(FieldType::Number),
            "single-choice" | "select" | "status" => Some(FieldType::SingleChoice),
            "multi-choice" | "multi_select" => Some(FieldType::MultiChoice),
            "date" => Some(FieldType::Date),
            "boolean" | "checkbox" => Some(FieldType::Boolean),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = crate::error::EnrichError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::from_store_type(s)
            .ok_or_else(|| crate::error::EnrichError::InvalidSchema(format!("unknown field type '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// TypedValue
// ---------------------------------------------------------------------------

/// A value already shaped for one target field type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum TypedValue {
    Title(String),
    Text(String),
    Email(String),
    Url(String),
    Phone(String),
    Number(serde_json::Number),
    SingleChoice(String),
    MultiChoice(Vec<String>),
    /// ISO-8601 date (`YYYY-MM-DD`) or RFC 3339 date-time.
    Date(String),
    Boolean(bool),
}

impl TypedValue {
    /// Whether this value is a legal shape for a field of type `ty`.
    /// Long-text fields hold `Text` values.
    pub fn conforms_to(&self, ty: FieldType) -> bool {
        matches!(
            (self, ty),
            (TypedValue::Title(_), FieldType::Title)
                | (TypedValue::Text(_), FieldType::Text | FieldType::LongText)
                | (TypedValue::Email(_), FieldType::Email)
                | (TypedValue::Url(_), FieldType::Url)
                | (TypedValue::Phone(_), FieldType::Phone)
                | (TypedValue::Number(_), FieldType::Number)
                | (TypedValue::SingleChoice(_), FieldType::SingleChoice)
                | (TypedValue::MultiChoice(_), FieldType::MultiChoice)
                | (TypedValue::Date(_), FieldType::Date)
                | (TypedValue::Boolean(_), FieldType::Boolean)
        )
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TypedValue::Title(s)
            | TypedValue::Text(s)
            | TypedValue::Email(s)
            | TypedValue::Url(s)
            | TypedValue::Phone(s)
            | TypedValue::SingleChoice(s)
            | TypedValue::Date(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Number(n) => write!(f, "{n}"),
            TypedValue::MultiChoice(items) => f.write_str(&items.join(", ")),
            TypedValue::Boolean(b) => write!(f, "{b}"),
            other => f.write_str(other.as_text().unwrap_or_default()),
        }
    }
}

// ---------------------------------------------------------------------------
// Provenance / FieldMapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Deterministic,
    Semantic,
    Preserved,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Deterministic => "deterministic",
            Provenance::Semantic => "semantic",
            Provenance::Preserved => "preserved",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedField {
    pub value: TypedValue,
    pub provenance: Provenance,
}

/// Target field name → coerced value with provenance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping {
    fields: BTreeMap<String, MappedField>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: TypedValue, provenance: Provenance) {
        self.fields
            .insert(name.into(), MappedField { value, provenance });
    }

    pub fn get(&self, name: &str) -> Option<&MappedField> {
        self.fields.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&TypedValue> {
        self.fields.get(name).map(|f| &f.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<MappedField> {
        self.fields.remove(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MappedField)> {
        self.fields.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn count(&self, provenance: Provenance) -> usize {
        self.fields
            .values()
            .filter(|f| f.provenance == provenance)
            .count()
    }

    /// Drop every entry whose name is not in `schema` or whose value does not
    /// conform to the field's type. Returns the dropped names.
    pub fn retain_known(&mut self, schema: &SchemaDescriptor) -> Vec<String> {
        let mut dropped = Vec::new();
        self.fields.retain(|name, field| {
            let ok = schema
                .field_type(name)
                .is_some_and(|ty| field.value.conforms_to(ty));
            if !ok {
                dropped.push(name.clone());
            }
            ok
        });
        dropped
    }

    /// Fields that must be sent to the store: everything not preserved.
    pub fn write_set(&self) -> BTreeMap<String, TypedValue> {
        self.fields
            .iter()
            .filter(|(_, f)| f.provenance != Provenance::Preserved)
            .map(|(k, f)| (k.clone(), f.value.clone()))
            .collect()
    }

    pub fn values(&self) -> BTreeMap<String, TypedValue> {
        self.fields
            .iter()
            .map(|(k, f)| (k.clone(), f.value.clone()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// TargetRecord / MergeOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub id: String,
    pub fields: BTreeMap<String, TypedValue>,
}

impl TargetRecord {
    pub fn title_text(&self, schema: &SchemaDescriptor) -> Option<&str> {
        self.fields.get(schema.title_field())?.as_text()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeAction {
    Created,
    Updated,
}

impl MergeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            MergeAction::Created => "created",
            MergeAction::Updated => "updated",
        }
    }
}

impl fmt::Display for MergeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub action: MergeAction,
    /// Store id of the written record; `None` for a dry-run create.
    pub record_id: Option<String>,
    pub mapping: FieldMapping,
    pub deterministic: usize,
    pub semantic: usize,
    pub preserved: usize,
}

impl MergeOutcome {
    pub fn fields_populated(&self) -> usize {
        self.deterministic + self.semantic
    }
}
