//! Payload quality signals: completeness, confidence, network strength and
//! seniority.
//!
//! Everything here is a pure function of the payload so re-running a
//! reconciliation writes the same values.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use crate::aliases::{count, AliasTable};
use crate::payload::lookup;

/// Concepts counted toward the completeness score.
pub const TRACKED_CONCEPTS: &[&str] = &[
    "email",
    "phone",
    "job_title",
    "company",
    "location",
    "linkedin_url",
    "headline",
    "summary",
    "employment_history",
    "education",
    "skills",
];

/// Percentage (0–100) of [`TRACKED_CONCEPTS`] present in the payload.
pub fn completeness(payload: &Value, table: &AliasTable) -> u8 {
    let present = TRACKED_CONCEPTS
        .iter()
        .filter(|key| has(payload, table, key))
        .count();
    ((present * 100) as f64 / TRACKED_CONCEPTS.len() as f64).round() as u8
}

fn has(payload: &Value, table: &AliasTable, key: &str) -> bool {
    table
        .get(key)
        .is_some_and(|c| c.resolve_raw(payload).is_some())
}

/// A verification concept as it would be written: its own path first, then
/// its derivation. Confidence and the checkbox fields read the same answer.
fn verified(payload: &Value, table: &AliasTable, key: &str) -> bool {
    table
        .get(key)
        .and_then(|c| c.resolve(payload, table))
        .is_some_and(|r| r.value.as_bool() == Some(true))
}

/// Size of the list (or count) a concept's first present path carries.
fn concept_count(payload: &Value, table: &AliasTable, key: &str) -> u64 {
    table
        .get(key)
        .and_then(|c| c.paths.iter().find_map(|p| lookup(payload, p).and_then(count)))
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_points(points: u32) -> Self {
        match points {
            p if p >= 70 => ConfidenceLevel::High,
            p if p >= 40 => ConfidenceLevel::Medium,
            _ => ConfidenceLevel::Low,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Confidence {
    pub points: u32,
    pub level: ConfidenceLevel,
}

pub fn confidence(payload: &Value, table: &AliasTable) -> Confidence {
    let mut points = 0;

    if verified(payload, table, "email_verified") {
        points += 25;
    }
    if verified(payload, table, "phone_verified") {
        points += 20;
    }

    if has(payload, table, "company") {
        points += 10;
    }
    if has(payload, table, "headline") {
        points += 15;
    }
    if concept_count(payload, table, "employment_history") >= 2 {
        points += 15;
    }
    if concept_count(payload, table, "connections") >= 100 {
        points += 10;
    }
    if has(payload, table, "education") {
        points += 5;
    }

    Confidence {
        points,
        level: ConfidenceLevel::from_points(points),
    }
}

// ---------------------------------------------------------------------------
// Network strength
// ---------------------------------------------------------------------------

/// 0–100 score for a first-degree connection list: up to 20 for size (one
/// point per ten), 20 for industry diversity, 20 for C-level and 15 for VP
/// connections, 15 for connections sharing at least ten mutuals.
pub fn network_strength(connections: &[Value]) -> u8 {
    let people: Vec<&Value> = connections.iter().filter(|c| c.is_object()).collect();
    if people.is_empty() {
        return 0;
    }

    fn text<'v>(c: &'v Value, key: &str) -> Option<&'v str> {
        c.get(key).and_then(Value::as_str).map(str::trim)
    }
    let industries: HashSet<String> = people
        .iter()
        .filter_map(|c| text(c, "industry"))
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect();
    let rung = |level: &str| {
        people
            .iter()
            .filter_map(|c| text(c, "title"))
            .filter(|t| seniority_from_title(t) == Some(level))
            .count() as f64
    };
    let high_mutual = people
        .iter()
        .filter(|c| {
            ["mutual_connections", "mutualConnections"]
                .iter()
                .find_map(|k| c.get(*k).and_then(count))
                .unwrap_or(0)
                >= 10
        })
        .count() as f64;

    let score = (people.len() as f64 / 10.0).min(20.0)
        + (industries.len() as f64 * 2.0).min(20.0)
        + (rung("C-Level") * 5.0).min(20.0)
        + (rung("VP") * 3.0).min(15.0)
        + (high_mutual * 2.0).min(15.0);
    score.min(100.0) as u8
}

// ---------------------------------------------------------------------------
// Seniority
// ---------------------------------------------------------------------------

static VICE_PRESIDENT_RE: OnceLock<Regex> = OnceLock::new();
static LADDER: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();

fn vice_president_re() -> &'static Regex {
    VICE_PRESIDENT_RE.get_or_init(|| Regex::new(r"(?i)\bvice[\s-]+president\b").unwrap())
}

fn ladder() -> &'static [(&'static str, Regex)] {
    LADDER.get_or_init(|| {
        [
            ("C-Level", r"(?i)\b(ceo|cto|cfo|coo|chief|president)\b"),
            ("VP", r"(?i)\b(vp|svp|evp)\b"),
            ("Director", r"(?i)\b(director|dir)\b"),
            ("Manager", r"(?i)\b(manager|mgr)\b"),
            ("Senior", r"(?i)\b(senior|sr|lead)\b"),
            ("Entry", r"(?i)\b(associate|analyst|coordinator|assistant)\b"),
        ]
        .into_iter()
        .map(|(level, pattern)| (level, Regex::new(pattern).unwrap()))
        .collect()
    })
}

/// Highest rung of the seniority ladder whose keywords appear in `title`.
pub fn seniority_from_title(title: &str) -> Option<&'static str> {
    let title = vice_president_re().replace_all(title, "VP");
    ladder()
        .iter()
        .find(|(_, re)| re.is_match(&title))
        .map(|(level, _)| *level)
}
