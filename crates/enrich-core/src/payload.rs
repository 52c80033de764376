//! Provider payload helpers: envelope unwrapping, dotted-path access and
//! pruning of the unmapped residual.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Envelope keys that wrap the actual person object.
const WRAPPER_KEYS: &[&str] = &["person", "profile", "data"];

/// Unwrap provider envelopes until a plain person object remains.
///
/// A top-level array yields its first object. An object with exactly one
/// wrapper key holding an object is replaced by that object, keeping sibling
/// keys that don't collide. Anything that isn't an object ends up as `{}`.
pub fn normalize(raw: Value) -> Value {
    let mut current = raw;
    // Wrappers nest at most a couple of levels deep in practice.
    for _ in 0..4 {
        current = match current {
            Value::Array(items) => match items.into_iter().find(Value::is_object) {
                Some(first) => first,
                None => return Value::Object(Map::new()),
            },
            Value::Object(map) => match unwrap_envelope(map) {
                Ok(inner) => inner,
                Err(done) => return Value::Object(done),
            },
            _ => return Value::Object(Map::new()),
        };
    }
    match current {
        Value::Object(_) => current,
        _ => Value::Object(Map::new()),
    }
}

/// `Ok(inner)` when `map` is an envelope, `Err(map)` when it is already the
/// person object.
fn unwrap_envelope(mut map: Map<String, Value>) -> Result<Value, Map<String, Value>> {
    let wrappers: Vec<&str> = WRAPPER_KEYS
        .iter()
        .copied()
        .filter(|k| map.get(*k).is_some_and(|v| v.is_object() || is_object_array(v)))
        .collect();
    let [key] = wrappers.as_slice() else {
        return Err(map);
    };
    let Some(inner) = map.remove(*key) else {
        return Err(map);
    };
    let mut inner = match inner {
        Value::Object(o) => o,
        Value::Array(items) => match items.into_iter().find_map(|v| match v {
            Value::Object(o) => Some(o),
            _ => None,
        }) {
            Some(o) => o,
            None => return Err(map),
        },
        _ => return Err(map),
    };
    for (k, v) in map {
        inner.entry(k).or_insert(v);
    }
    Ok(Value::Object(inner))
}

fn is_object_array(v: &Value) -> bool {
    v.as_array()
        .is_some_and(|items| items.first().is_some_and(Value::is_object))
}

/// Resolve a dotted path. Numeric segments index into arrays.
pub fn lookup<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = payload;
    for segment in path.split('.') {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

/// Null, whitespace-only strings and empty containers carry no information.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Remove the node at `path`, if present.
pub fn remove_path(payload: &mut Value, path: &str) {
    let (parent, last) = match path.rsplit_once('.') {
        Some((parent, last)) => (lookup_mut(payload, parent), last),
        None => (Some(payload), path),
    };
    match parent {
        Some(Value::Object(map)) => {
            map.remove(last);
        }
        Some(Value::Array(items)) => {
            if let Ok(i) = last.parse::<usize>() {
                if i < items.len() {
                    items.remove(i);
                }
            }
        }
        _ => {}
    }
}

fn lookup_mut<'a>(payload: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut node = payload;
    for segment in path.split('.') {
        node = match node {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

/// Recursively drop nulls, blank strings and containers left empty.
pub fn prune(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for v in map.values_mut() {
                prune(v);
            }
            map.retain(|_, v| !is_blank(v));
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                prune(v);
            }
            items.retain(|v| !is_blank(v));
        }
        _ => {}
    }
}

/// Number of top-level keys, or zero for non-objects.
pub fn key_count(value: &Value) -> usize {
    value.as_object().map_or(0, Map::len)
}

// ---------------------------------------------------------------------------
// Provider detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Contact-intelligence people/organization records.
    ContactIntelligence,
    /// Professional-network profile scrapes.
    ProfessionalNetwork,
}

impl ProviderKind {
    /// Label written to data-source fields.
    pub fn label(self) -> &'static str {
        match self {
            ProviderKind::ContactIntelligence => "Apollo",
            ProviderKind::ProfessionalNetwork => "LinkedIn",
        }
    }

    fn markers(self) -> &'static [&'static str] {
        match self {
            ProviderKind::ContactIntelligence => &[
                "employment_history",
                "email_status",
                "organization",
                "organization_name",
                "phone_numbers",
                "departments",
                "apollo_id",
            ],
            ProviderKind::ProfessionalNetwork => &[
                "experience",
                "experiences",
                "education",
                "connections",
                "connectionsCount",
                "followers",
                "followersCount",
                "publicIdentifier",
                "public_identifier",
                "skills",
            ],
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Providers whose marker keys appear (non-blank) at the top level.
pub fn detect_sources(payload: &Value) -> Vec<ProviderKind> {
    let Some(map) = payload.as_object() else {
        return Vec::new();
    };
    [
        ProviderKind::ContactIntelligence,
        ProviderKind::ProfessionalNetwork,
    ]
    .into_iter()
    .filter(|kind| {
        kind.markers()
            .iter()
            .any(|k| map.get(*k).is_some_and(|v| !is_blank(v)))
    })
    .collect()
}
