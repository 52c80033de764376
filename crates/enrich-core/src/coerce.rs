//! Field coercion: turns an untyped provider value into the literal shape a
//! target field type requires.
//!
//! Every function here is pure. `Ok(None)` means "omit the field": the input
//! was absent or empty and the type has no meaningful empty value. A
//! [`CoercionError`] is per-field; callers skip the field and continue.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

use crate::types::{FieldType, TypedValue};

/// Maximum length of a rich-text run in the target store.
pub const TEXT_LIMIT: usize = 2000;

/// Maximum number of options written to a multi-choice field.
pub const MULTI_CHOICE_LIMIT: usize = 25;

/// Epoch values at or above this magnitude are read as milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoercionLimits {
    pub text: usize,
    pub multi_choice: usize,
}

impl Default for CoercionLimits {
    fn default() -> Self {
        Self {
            text: TEXT_LIMIT,
            multi_choice: MULTI_CHOICE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("not-numeric: {0}")]
    NotNumeric(String),

    #[error("bad-date: {0}")]
    BadDate(String),

    #[error("empty: a {0} field requires a value")]
    Empty(FieldType),
}

impl CoercionError {
    pub fn code(&self) -> &'static str {
        match self {
            CoercionError::NotNumeric(_) => "not-numeric",
            CoercionError::BadDate(_) => "bad-date",
            CoercionError::Empty(_) => "empty",
        }
    }
}

pub type Coerced = Result<Option<TypedValue>, CoercionError>;

/// Coerce with the store's default limits.
pub fn coerce(value: &Value, ty: FieldType) -> Coerced {
    coerce_with(value, ty, &CoercionLimits::default())
}

pub fn coerce_with(value: &Value, ty: FieldType, limits: &CoercionLimits) -> Coerced {
    match ty {
        FieldType::Title => match stringify(value) {
            Some(s) => Ok(Some(TypedValue::Title(truncate(s, limits.text)))),
            None => Err(CoercionError::Empty(FieldType::Title)),
        },
        FieldType::Text | FieldType::LongText => {
            Ok(stringify(value).map(|s| TypedValue::Text(truncate(s, limits.text))))
        }
        FieldType::Email => Ok(first_scalar(value).map(TypedValue::Email)),
        FieldType::Url => Ok(first_scalar(value).map(TypedValue::Url)),
        FieldType::Phone => Ok(first_scalar(value).map(TypedValue::Phone)),
        FieldType::Number => coerce_number(value),
        FieldType::SingleChoice => match stringify(value) {
            Some(s) => Ok(Some(TypedValue::SingleChoice(s))),
            None => Err(CoercionError::Empty(FieldType::SingleChoice)),
        },
        FieldType::MultiChoice => Ok(coerce_multi(value, limits.multi_choice)),
        FieldType::Date => coerce_date(value),
        FieldType::Boolean => Ok(Some(TypedValue::Boolean(truthy(value)))),
    }
}

/// Render any JSON value as display text. Arrays join their non-empty
/// elements with `", "`; objects serialize as compact JSON.
pub fn stringify(value: &Value) -> Option<String> {
    let s = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(stringify)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => serde_json::to_string(value).ok()?,
    };
    (!s.is_empty()).then_some(s)
}

fn truncate(s: String, limit: usize) -> String {
    if s.chars().count() <= limit {
        return s;
    }
    debug!(limit, "truncating text value");
    s.chars().take(limit).collect()
}

/// Contact-style scalars: strings, numbers, or the first usable array element.
fn first_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(_) | Value::Number(_) => stringify(value),
        Value::Array(items) => items.iter().find_map(first_scalar),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Coerced {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(Some(TypedValue::Number(n.clone()))),
        Value::String(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            if cleaned.is_empty() {
                return Ok(None);
            }
            if let Ok(i) = cleaned.parse::<i64>() {
                return Ok(Some(TypedValue::Number(Number::from(i))));
            }
            cleaned
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(|n| Some(TypedValue::Number(n)))
                .ok_or_else(|| CoercionError::NotNumeric(s.clone()))
        }
        other => Err(CoercionError::NotNumeric(other.to_string())),
    }
}

fn coerce_multi(value: &Value, cap: usize) -> Option<TypedValue> {
    let raw: Vec<String> = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().filter_map(option_label).collect(),
        other => option_label(other).into_iter().collect(),
    };

    let mut seen = HashSet::new();
    let options: Vec<String> = raw
        .iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .take(cap)
        .map(str::to_string)
        .collect();

    (!options.is_empty()).then_some(TypedValue::MultiChoice(options))
}

/// Option label for one multi-choice element. Objects contribute their
/// `name` (or `title`) member.
fn option_label(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("title"))
            .and_then(stringify),
        Value::Array(_) => None,
        other => stringify(other),
    }
}

fn coerce_date(value: &Value) -> Coerced {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            parse_iso_date(s)
                .map(|d| Some(TypedValue::Date(d)))
                .ok_or_else(|| CoercionError::BadDate(s.to_string()))
        }
        Value::Number(n) => {
            let raw = n
                .as_f64()
                .ok_or_else(|| CoercionError::BadDate(n.to_string()))?;
            let millis = if raw.abs() >= EPOCH_MILLIS_THRESHOLD {
                raw as i64
            } else {
                (raw * 1000.0) as i64
            };
            DateTime::<Utc>::from_timestamp_millis(millis)
                .map(|dt| Some(TypedValue::Date(dt.to_rfc3339_opts(SecondsFormat::Secs, false))))
                .ok_or_else(|| CoercionError::BadDate(n.to_string()))
        }
        other => Err(CoercionError::BadDate(other.to_string())),
    }
}

/// Accepts RFC 3339 date-times, zone-less ISO date-times (read as UTC),
/// calendar dates, and year-month (normalized to the first of the month).
/// Slash/dot formats and bare years are rejected as ambiguous.
fn parse_iso_date(s: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.to_rfc3339_opts(SecondsFormat::AutoSi, false));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().to_rfc3339_opts(SecondsFormat::AutoSi, false));
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.format("%Y-%m-%d").to_string());
    }
    if s.len() == 7 {
        if let Ok(d) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
            return Some(d.format("%Y-%m-%d").to_string());
        }
    }
    None
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_stringifies_scalars_and_arrays() {
        assert_eq!(
            coerce(&json!(42), FieldType::Text).unwrap(),
            Some(TypedValue::Text("42".into()))
        );
        assert_eq!(
            coerce(&json!(["Rust", null, "Go"]), FieldType::Text).unwrap(),
            Some(TypedValue::Text("Rust, Go".into()))
        );
        assert_eq!(coerce(&json!("   "), FieldType::Text).unwrap(), None);
        assert_eq!(coerce(&Value::Null, FieldType::LongText).unwrap(), None);
    }

    #[test]
    fn text_truncates_to_limit() {
        let long = "é".repeat(TEXT_LIMIT + 50);
        let out = coerce(&json!(long), FieldType::Text).unwrap().unwrap();
        match out {
            TypedValue::Text(s) => assert_eq!(s.chars().count(), TEXT_LIMIT),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn title_requires_value() {
        let err = coerce(&json!(""), FieldType::Title).unwrap_err();
        assert_eq!(err.code(), "empty");
        assert_eq!(
            coerce(&json!("Matt Stevens"), FieldType::Title).unwrap(),
            Some(TypedValue::Title("Matt Stevens".into()))
        );
    }

    #[test]
    fn contact_fields_omit_empty_and_pass_through() {
        assert_eq!(coerce(&json!(""), FieldType::Email).unwrap(), None);
        assert_eq!(coerce(&Value::Null, FieldType::Url).unwrap(), None);
        assert_eq!(
            coerce(&json!("not-an-email"), FieldType::Email).unwrap(),
            Some(TypedValue::Email("not-an-email".into()))
        );
        assert_eq!(
            coerce(&json!(["", "+1 555 0100"]), FieldType::Phone).unwrap(),
            Some(TypedValue::Phone("+1 555 0100".into()))
        );
    }

    #[test]
    fn number_accepts_native_and_numeric_strings() {
        assert_eq!(
            coerce(&json!(500), FieldType::Number).unwrap(),
            Some(TypedValue::Number(Number::from(500)))
        );
        assert_eq!(
            coerce(&json!(" 1,250 "), FieldType::Number).unwrap(),
            Some(TypedValue::Number(Number::from(1250)))
        );
        let f = coerce(&json!("3.5"), FieldType::Number).unwrap().unwrap();
        assert_eq!(f, TypedValue::Number(Number::from_f64(3.5).unwrap()));
    }

    #[test]
    fn number_rejects_non_numeric() {
        let err = coerce(&json!("five hundred"), FieldType::Number).unwrap_err();
        assert_eq!(err.code(), "not-numeric");
        assert!(coerce(&json!(true), FieldType::Number).is_err());
        assert_eq!(coerce(&Value::Null, FieldType::Number).unwrap(), None);
    }

    #[test]
    fn single_choice_wraps_value() {
        assert_eq!(
            coerce(&json!("Director"), FieldType::SingleChoice).unwrap(),
            Some(TypedValue::SingleChoice("Director".into()))
        );
        assert_eq!(
            coerce(&json!(null), FieldType::SingleChoice).unwrap_err().code(),
            "empty"
        );
    }

    #[test]
    fn multi_choice_splits_dedupes_and_caps() {
        let out = coerce(&json!("Rust, rust , Go,,Python"), FieldType::MultiChoice)
            .unwrap()
            .unwrap();
        assert_eq!(
            out,
            TypedValue::MultiChoice(vec!["Rust".into(), "Go".into(), "Python".into()])
        );

        let many: Vec<String> = (0..40).map(|i| format!("skill-{i}")).collect();
        match coerce(&json!(many), FieldType::MultiChoice).unwrap().unwrap() {
            TypedValue::MultiChoice(items) => {
                assert_eq!(items.len(), MULTI_CHOICE_LIMIT);
                assert_eq!(items[0], "skill-0");
            }
            other => panic!("unexpected {other:?}"),
        }

        let objects = json!([{"name": "Apollo"}, {"name": "LinkedIn"}]);
        assert_eq!(
            coerce(&objects, FieldType::MultiChoice).unwrap(),
            Some(TypedValue::MultiChoice(vec!["Apollo".into(), "LinkedIn".into()]))
        );
        assert_eq!(coerce(&json!([]), FieldType::MultiChoice).unwrap(), None);
    }

    #[test]
    fn date_accepts_iso_and_epoch() {
        assert_eq!(
            coerce(&json!("2021-06-01"), FieldType::Date).unwrap(),
            Some(TypedValue::Date("2021-06-01".into()))
        );
        assert_eq!(
            coerce(&json!("2021-06"), FieldType::Date).unwrap(),
            Some(TypedValue::Date("2021-06-01".into()))
        );
        assert_eq!(
            coerce(&json!("2021-06-01T10:30:00Z"), FieldType::Date).unwrap(),
            Some(TypedValue::Date("2021-06-01T10:30:00+00:00".into()))
        );
        assert_eq!(
            coerce(&json!(0), FieldType::Date).unwrap(),
            Some(TypedValue::Date("1970-01-01T00:00:00+00:00".into()))
        );
        assert_eq!(
            coerce(&json!(1_600_000_000_000i64), FieldType::Date).unwrap(),
            coerce(&json!(1_600_000_000), FieldType::Date).unwrap()
        );
    }

    #[test]
    fn date_rejects_ambiguous_formats() {
        for bad in ["03/04/2020", "2020", "June 1st", "01.02.2020"] {
            let err = coerce(&json!(bad), FieldType::Date).unwrap_err();
            assert_eq!(err.code(), "bad-date", "{bad}");
        }
        assert!(coerce(&json!(true), FieldType::Date).is_err());
    }

    #[test]
    fn boolean_is_never_omitted() {
        let cases = [
            (json!(true), true),
            (json!("verified"), true),
            (json!(3), true),
            (json!(0), false),
            (json!(""), false),
            (Value::Null, false),
            (json!(false), false),
        ];
        for (input, expected) in cases {
            assert_eq!(
                coerce(&input, FieldType::Boolean).unwrap(),
                Some(TypedValue::Boolean(expected)),
                "{input}"
            );
        }
    }

    #[test]
    fn every_success_conforms_to_its_type() {
        let inputs = [
            json!(null),
            json!(""),
            json!("text"),
            json!("2020-01-01"),
            json!("12"),
            json!(12),
            json!(-1.5),
            json!(true),
            json!(["a", "b"]),
            json!({"name": "x"}),
        ];
        for ty in FieldType::all() {
            for input in &inputs {
                if let Ok(Some(v)) = coerce(input, *ty) {
                    assert!(v.conforms_to(*ty), "{input} as {ty} gave {v:?}");
                }
            }
        }
    }
}
