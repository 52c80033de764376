//! The concept alias table.
//!
//! Each [`Concept`] names one piece of meaning ("current employer", "primary
//! email", …), the payload paths that can carry it, and every target field
//! name that can hold it. The table is plain data: supporting a new target
//! schema means adding synonyms, not code.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

use crate::coerce::stringify;
use crate::error::EnrichError;
use crate::payload::{detect_sources, is_blank, lookup};
use crate::quality;
use crate::schema::SchemaDescriptor;

/// Upper bound on names extracted from connection / skill lists.
pub const NAMES_LIMIT: usize = 25;

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// Reshapes the raw payload value before coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    #[default]
    None,
    /// Array length, or a number as-is ("500+" reads as 500).
    Count,
    /// One line per position: "Title at Company (start to end)".
    EmploymentSummary,
    /// One line per school: "Degree in Field, School".
    EducationSummary,
    /// Headcount → size band.
    HeadcountBucket,
    /// Display names of list entries.
    Names,
    /// Names of connection objects; scalar connection counts are ignored.
    ConnectionNames,
    ConnectionTitles,
    ConnectionCompanies,
}

impl Transform {
    pub fn all() -> &'static [Transform] {
        &[
            Transform::None,
            Transform::Count,
            Transform::EmploymentSummary,
            Transform::EducationSummary,
            Transform::HeadcountBucket,
            Transform::Names,
            Transform::ConnectionNames,
            Transform::ConnectionTitles,
            Transform::ConnectionCompanies,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Transform::None => "none",
            Transform::Count => "count",
            Transform::EmploymentSummary => "employment_summary",
            Transform::EducationSummary => "education_summary",
            Transform::HeadcountBucket => "headcount_bucket",
            Transform::Names => "names",
            Transform::ConnectionNames => "connection_names",
            Transform::ConnectionTitles => "connection_titles",
            Transform::ConnectionCompanies => "connection_companies",
        }
    }

    pub fn apply(self, value: &Value) -> Option<Value> {
        let out = match self {
            Transform::None => Some(value.clone()),
            Transform::Count => count(value).map(|n| json!(n)),
            Transform::EmploymentSummary => summarize(value, employment_line),
            Transform::EducationSummary => summarize(value, education_line),
            Transform::HeadcountBucket => headcount_bucket(value),
            Transform::Names => names(value),
            Transform::ConnectionNames => column(value, CONNECTION_NAME_KEYS),
            Transform::ConnectionTitles => column(value, CONNECTION_TITLE_KEYS),
            Transform::ConnectionCompanies => column(value, CONNECTION_COMPANY_KEYS),
        };
        out.filter(|v| !is_blank(v))
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Transform {
    type Err = EnrichError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Transform::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EnrichError::Config(format!("unknown transform '{s}'")))
    }
}

pub(crate) fn count(value: &Value) -> Option<u64> {
    match value {
        Value::Array(items) => Some(items.len() as u64),
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .filter(|c| *c != ',')
                .take_while(char::is_ascii_digit)
                .collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

fn summarize(value: &Value, line: fn(&Value) -> Option<String>) -> Option<Value> {
    match value {
        Value::Array(items) => {
            let lines: Vec<String> = items.iter().filter_map(line).collect();
            (!lines.is_empty()).then(|| Value::String(lines.join("; ")))
        }
        other => stringify(other).map(Value::String),
    }
}

fn first_text(entry: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        entry.get(*k).and_then(|v| match v {
            Value::Object(o) => o.get("name").and_then(stringify),
            other => stringify(other),
        })
    })
}

/// Dates come as strings, or as `{year, month}` objects from profile scrapes.
fn date_text(entry: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match entry.get(*k)? {
        Value::Object(o) => {
            let year = o.get("year").and_then(Value::as_u64)?;
            Some(match o.get("month").and_then(Value::as_u64) {
                Some(m) => format!("{year}-{m:02}"),
                None => year.to_string(),
            })
        }
        other => stringify(other),
    })
}

fn employment_line(entry: &Value) -> Option<String> {
    let title = first_text(entry, &["title", "position", "jobTitle"]);
    let org = first_text(
        entry,
        &["organization_name", "company", "companyName", "organization"],
    );
    let mut line = match (title, org) {
        (Some(t), Some(o)) => format!("{t} at {o}"),
        (Some(t), None) => t,
        (None, Some(o)) => o,
        (None, None) => return None,
    };
    if let Some(start) = date_text(entry, &["start_date", "startDate", "starts_at"]) {
        let end = date_text(entry, &["end_date", "endDate", "ends_at"])
            .unwrap_or_else(|| "present".to_string());
        line.push_str(&format!(" ({start} to {end})"));
    }
    Some(line)
}

fn education_line(entry: &Value) -> Option<String> {
    let school = first_text(entry, &["school", "schoolName", "school_name", "institution"]);
    let degree = first_text(entry, &["degree", "degreeName", "degree_name"]);
    let field = first_text(entry, &["field_of_study", "fieldOfStudy", "field"]);
    let head = match (degree, field) {
        (Some(d), Some(f)) => Some(format!("{d} in {f}")),
        (d, f) => d.or(f),
    };
    match (head, school) {
        (Some(h), Some(s)) => Some(format!("{h}, {s}")),
        (h, s) => h.or(s),
    }
}

fn headcount_bucket(value: &Value) -> Option<Value> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => match s.trim().replace(',', "").parse::<f64>() {
            Ok(n) => n,
            // Already a band ("51-200") or free text.
            Err(_) => return stringify(value).map(Value::String),
        },
        _ => return None,
    };
    let band = match n {
        n if n < 1.0 => return None,
        n if n <= 10.0 => "1-10",
        n if n <= 50.0 => "11-50",
        n if n <= 200.0 => "51-200",
        n if n <= 500.0 => "201-500",
        n if n <= 1000.0 => "501-1000",
        _ => "1000+",
    };
    Some(Value::String(band.to_string()))
}

fn names(value: &Value) -> Option<Value> {
    match value {
        Value::Array(items) => {
            let out: Vec<Value> = items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(_) => {
                        first_text(item, &["name", "fullName", "full_name", "title"])
                    }
                    other => stringify(other),
                })
                .take(NAMES_LIMIT)
                .map(Value::String)
                .collect();
            Some(Value::Array(out))
        }
        Value::String(_) => Some(value.clone()),
        _ => None,
    }
}

const CONNECTION_NAME_KEYS: &[&str] = &["name", "fullName", "full_name"];
const CONNECTION_TITLE_KEYS: &[&str] = &["title", "position", "occupation", "headline"];
const CONNECTION_COMPANY_KEYS: &[&str] = &["company", "companyName", "organization_name"];

/// One attribute from each object in a connection list. Anything other than
/// an array of objects yields nothing.
fn column(value: &Value, keys: &[&str]) -> Option<Value> {
    let Value::Array(items) = value else {
        return None;
    };
    let out: Vec<Value> = items
        .iter()
        .take(NAMES_LIMIT)
        .filter(|item| item.is_object())
        .filter_map(|item| first_text(item, keys))
        .map(Value::String)
        .collect();
    Some(Value::Array(out))
}

/// The first connection list (array of objects) among `connection_names`'s
/// paths.
pub(crate) fn connection_list<'p>(payload: &'p Value, table: &AliasTable) -> Option<&'p [Value]> {
    table.get("connection_names")?.paths.iter().find_map(|p| {
        lookup(payload, p)
            .and_then(Value::as_array)
            .filter(|items| items.iter().any(Value::is_object))
            .map(Vec::as_slice)
    })
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Computes a concept from the whole payload when no path carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Derivation {
    FullName,
    SeniorityFromTitle,
    EmailVerified,
    PhoneVerified,
    NetworkStrength,
    DataSources,
    CompletenessScore,
    DataConfidence,
    RawPayload,
}

impl Derivation {
    pub fn derive(self, payload: &Value, table: &AliasTable) -> Option<Value> {
        match self {
            Derivation::FullName => {
                let part = |keys: &[&str]| keys.iter().find_map(|k| payload.get(*k).and_then(stringify));
                let first = part(&["first_name", "firstName"]);
                let last = part(&["last_name", "lastName"]);
                let full = [first, last].into_iter().flatten().collect::<Vec<_>>().join(" ");
                (!full.is_empty()).then_some(Value::String(full))
            }
            Derivation::SeniorityFromTitle => {
                let title = table
                    .get("job_title")
                    .and_then(|c| c.resolve_raw(payload))
                    .and_then(|v| stringify(&v))?;
                quality::seniority_from_title(&title).map(|s| Value::String(s.to_string()))
            }
            Derivation::EmailVerified => payload
                .get("email_status")
                .and_then(Value::as_str)
                .map(|s| Value::Bool(s.eq_ignore_ascii_case("verified"))),
            Derivation::PhoneVerified => payload
                .get("phone_numbers")
                .and_then(Value::as_array)
                .map(|nums| {
                    Value::Bool(nums.iter().any(|n| {
                        n.get("status").and_then(Value::as_str) == Some("valid_number")
                    }))
                }),
            Derivation::NetworkStrength => {
                connection_list(payload, table).map(|list| json!(quality::network_strength(list)))
            }
            Derivation::DataSources => {
                let labels: Vec<Value> = detect_sources(payload)
                    .into_iter()
                    .map(|k| Value::String(k.label().to_string()))
                    .collect();
                (!labels.is_empty()).then_some(Value::Array(labels))
            }
            Derivation::CompletenessScore => Some(json!(quality::completeness(payload, table))),
            Derivation::DataConfidence => Some(Value::String(
                quality::confidence(payload, table).level.to_string(),
            )),
            Derivation::RawPayload => serde_json::to_string(payload).ok().map(Value::String),
        }
    }
}

// ---------------------------------------------------------------------------
// Concept
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub key: String,
    /// Dotted payload paths, most specific first.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Target field synonyms, matched case-insensitively.
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derive: Option<Derivation>,
    /// Also targets the schema's title field, whatever it is called.
    #[serde(default)]
    pub identity: bool,
}

/// A concept value found in a payload, with the paths it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub value: Value,
    /// Paths to drop from the residual once the value is written. Empty for
    /// derived values.
    pub consumed: Vec<String>,
}

impl Concept {
    fn new(key: &str, paths: &[&str], fields: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            paths: paths.iter().map(|s| s.to_string()).collect(),
            fields: fields.iter().map(|s| s.to_string()).collect(),
            transform: Transform::None,
            derive: None,
            identity: false,
        }
    }

    fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    fn with_derive(mut self, derive: Derivation) -> Self {
        self.derive = Some(derive);
        self
    }

    fn as_identity(mut self) -> Self {
        self.identity = true;
        self
    }

    /// First non-blank path value after the transform; derivations are not
    /// consulted.
    pub fn resolve_raw(&self, payload: &Value) -> Option<Value> {
        self.paths.iter().find_map(|path| {
            lookup(payload, path)
                .filter(|v| !is_blank(v))
                .and_then(|v| self.transform.apply(v))
        })
    }

    pub fn resolve(&self, payload: &Value, table: &AliasTable) -> Option<Resolved> {
        if let Some(value) = self.resolve_raw(payload) {
            let consumed = self
                .paths
                .iter()
                .filter(|p| lookup(payload, p).is_some())
                .cloned()
                .collect();
            return Some(Resolved { value, consumed });
        }
        let value = self.derive?.derive(payload, table)?;
        Some(Resolved {
            value,
            consumed: Vec::new(),
        })
    }

    /// Schema fields this concept can populate, in the schema's spelling.
    pub fn targets<'s>(&self, schema: &'s SchemaDescriptor) -> Vec<&'s str> {
        let mut out: Vec<&'s str> = Vec::new();
        if self.identity {
            out.push(schema.title_field());
        }
        for field in &self.fields {
            if let Some(name) = schema.resolve(field) {
                if !out.contains(&name) {
                    out.push(name);
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// AliasEntry (config extension)
// ---------------------------------------------------------------------------

/// A config-supplied extension: names an existing concept to add synonyms,
/// or a new concept key to append one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub concept: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
}

// ---------------------------------------------------------------------------
// AliasTable
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct AliasTable {
    concepts: Vec<Concept>,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AliasTable {
    pub fn new(concepts: Vec<Concept>) -> Self {
        Self { concepts }
    }

    /// Built-in table, then `entries` applied in order.
    pub fn with_overrides(entries: &[AliasEntry]) -> Self {
        let mut table = Self::builtin();
        table.extend(entries);
        table
    }

    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    pub fn get(&self, key: &str) -> Option<&Concept> {
        self.concepts.iter().find(|c| c.key == key)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn extend(&mut self, entries: &[AliasEntry]) {
        for entry in entries {
            let transform = match entry.transform.as_deref().map(str::parse::<Transform>) {
                Some(Ok(t)) => Some(t),
                Some(Err(e)) => {
                    warn!(concept = %entry.concept, error = %e, "ignoring alias transform");
                    None
                }
                None => None,
            };
            match self.concepts.iter_mut().find(|c| c.key == entry.concept) {
                Some(concept) => {
                    for path in &entry.paths {
                        if !concept.paths.contains(path) {
                            concept.paths.push(path.clone());
                        }
                    }
                    for field in &entry.fields {
                        let folded = field.trim().to_lowercase();
                        if !concept.fields.iter().any(|f| f.trim().to_lowercase() == folded) {
                            concept.fields.push(field.clone());
                        }
                    }
                    if let Some(t) = transform {
                        concept.transform = t;
                    }
                    debug!(concept = %entry.concept, "extended alias concept");
                }
                None => {
                    self.concepts.push(Concept {
                        key: entry.concept.clone(),
                        paths: entry.paths.clone(),
                        fields: entry.fields.clone(),
                        transform: transform.unwrap_or_default(),
                        derive: None,
                        identity: false,
                    });
                    debug!(concept = %entry.concept, "added alias concept");
                }
            }
        }
    }

    /// Lower-cased synonyms claimed by more than one concept.
    pub fn overlapping_fields(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        for concept in &self.concepts {
            for field in &concept.fields {
                let folded = field.trim().to_lowercase();
                if !seen.insert(folded.clone()) && !dupes.contains(&folded) {
                    dupes.push(folded);
                }
            }
        }
        dupes
    }

    pub fn builtin() -> Self {
        use Derivation as D;
        use Transform as T;

        let concepts = vec![
            // Identity
            Concept::new(
                "full_name",
                &["name", "full_name", "fullName"],
                &["Name", "Full Name", "Person Name"],
            )
            .with_derive(D::FullName)
            .as_identity(),
            Concept::new("first_name", &["first_name", "firstName"], &["First Name"]),
            Concept::new("last_name", &["last_name", "lastName"], &["Last Name"]),
            // Role
            Concept::new(
                "job_title",
                &[
                    "title",
                    "job_title",
                    "jobTitle",
                    "currentPosition",
                    "position",
                    "occupation",
                ],
                &[
                    "Position",
                    "Title",
                    "Job Title",
                    "Role",
                    "Current Position",
                    "Apollo Title",
                    "LinkedIn Current Position",
                ],
            ),
            Concept::new(
                "seniority",
                &["seniority"],
                &["Seniority", "Seniority Level", "Apollo Seniority"],
            )
            .with_derive(D::SeniorityFromTitle),
            Concept::new(
                "department",
                &["departments", "department"],
                &["Department", "Apollo Department"],
            ),
            Concept::new(
                "company",
                &[
                    "organization.name",
                    "organization_name",
                    "company",
                    "companyName",
                    "employer",
                    "current_company",
                    "currentCompany.name",
                    "currentCompany",
                ],
                &[
                    "Company",
                    "Employer",
                    "Current Company",
                    "Organization",
                    "Apollo Company",
                    "LinkedIn Current Company",
                ],
            ),
            Concept::new(
                "company_size",
                &[
                    "organization.estimated_num_employees",
                    "organization_num_employees",
                    "company_size",
                    "companySize",
                ],
                &["Company Size", "Apollo Company Size"],
            )
            .with_transform(T::HeadcountBucket),
            Concept::new(
                "revenue_range",
                &[
                    "organization_annual_revenue",
                    "organization.annual_revenue_printed",
                    "organization.annual_revenue",
                ],
                &["Revenue Range", "Annual Revenue", "Apollo Revenue Range"],
            ),
            Concept::new(
                "funding_stage",
                &["organization_funding_stage", "organization.latest_funding_stage"],
                &["Funding Stage", "Apollo Funding Stage"],
            ),
            Concept::new(
                "technologies",
                &["organization_technologies", "organization.technology_names"],
                &["Technologies", "Technographics", "Apollo Technographics"],
            )
            .with_transform(T::Names),
            Concept::new(
                "news_mentions",
                &["news_mentions_count", "news_mentions"],
                &["News Mentions", "Apollo News Mentions"],
            )
            .with_transform(T::Count),
            Concept::new(
                "patent_count",
                &["patent_count", "patents"],
                &["Patent Count", "Patents", "Apollo Patent Count"],
            )
            .with_transform(T::Count),
            Concept::new(
                "industry",
                &["industry", "organization.industry", "industryName"],
                &["Industry", "Apollo Industry", "LinkedIn Industry"],
            ),
            // Contact
            Concept::new(
                "email",
                &["email", "primary_email", "work_email", "emailAddress"],
                &["Email", "Primary Email", "Work Email", "Apollo Email"],
            ),
            Concept::new(
                "personal_email",
                &["personal_emails.0", "personal_email"],
                &["Personal Email", "Apollo Personal Email"],
            ),
            Concept::new(
                "email_verified",
                &["email_verified"],
                &["Email Verified", "Apollo Email Verified"],
            )
            .with_derive(D::EmailVerified),
            Concept::new(
                "phone",
                &[
                    "phone",
                    "phone_number",
                    "sanitized_phone",
                    "phone_numbers.0.sanitized_number",
                    "phone_numbers.0.raw_number",
                ],
                &["Phone", "Phone Number", "Apollo Phone"],
            ),
            Concept::new(
                "mobile",
                &["mobile_phone", "mobile_phone_number", "mobile"],
                &["Mobile", "Mobile Phone", "Apollo Mobile"],
            ),
            Concept::new(
                "phone_verified",
                &["phone_verified"],
                &["Phone Verified", "Apollo Phone Verified"],
            )
            .with_derive(D::PhoneVerified),
            Concept::new("email_source", &["email_source"], &["Email Source", "Apollo Email Source"]),
            Concept::new("phone_source", &["phone_source"], &["Phone Source", "Apollo Phone Source"]),
            // Place
            Concept::new(
                "location",
                &["location", "locationName", "addressWithCountry"],
                &["Location", "Geographic Location", "LinkedIn Location"],
            ),
            Concept::new("city", &["city"], &["City", "Apollo City"]),
            Concept::new("state", &["state"], &["State", "Apollo State"]),
            Concept::new("country", &["country"], &["Country", "Apollo Country"]),
            // Profiles
            Concept::new(
                "linkedin_url",
                &["linkedin_url", "linkedinUrl", "linkedin", "profileUrl", "profile_url"],
                &[
                    "LinkedIn",
                    "LinkedIn URL",
                    "LinkedIn Profile",
                    "Apollo LinkedIn URL",
                    "LinkedIn Public Profile URL",
                ],
            ),
            Concept::new("twitter_url", &["twitter_url"], &["Twitter", "Twitter URL"]),
            Concept::new("github_url", &["github_url"], &["GitHub", "GitHub URL"]),
            Concept::new(
                "photo_url",
                &["photo_url", "profilePicture", "profilePic"],
                &["Photo", "Photo URL", "Profile Picture"],
            ),
            Concept::new("headline", &["headline"], &["Headline", "LinkedIn Headline"]),
            Concept::new(
                "summary",
                &["summary", "about"],
                &["Summary", "About", "Bio", "LinkedIn Summary"],
            ),
            // Network
            Concept::new(
                "connections",
                &["connections", "connectionsCount", "num_connections"],
                &[
                    "Connections",
                    "LinkedIn Connections",
                    "LinkedIn First Degree Connections",
                ],
            )
            .with_transform(T::Count),
            Concept::new(
                "followers",
                &["followers", "followersCount", "follower_count"],
                &["Followers", "LinkedIn Followers"],
            )
            .with_transform(T::Count),
            Concept::new(
                "connection_names",
                &["first_degree_connections", "firstDegreeConnections", "connections"],
                &[
                    "Connection Names",
                    "Network Connections",
                    "Key Connections",
                    "LinkedIn Connection Names",
                ],
            )
            .with_transform(T::ConnectionNames),
            Concept::new(
                "connection_titles",
                &["first_degree_connections", "firstDegreeConnections", "connections"],
                &["Connection Titles", "LinkedIn Connection Titles"],
            )
            .with_transform(T::ConnectionTitles),
            Concept::new(
                "connection_companies",
                &["first_degree_connections", "firstDegreeConnections", "connections"],
                &["Connection Companies", "LinkedIn Connection Companies"],
            )
            .with_transform(T::ConnectionCompanies),
            Concept::new(
                "network_strength",
                &[],
                &["Network Strength", "Network Strength Score", "LinkedIn Network Strength Score"],
            )
            .with_derive(D::NetworkStrength),
            // History
            Concept::new(
                "employment_history",
                &["employment_history", "experience", "experiences", "positions"],
                &["Employment History", "Experience", "LinkedIn Experience"],
            )
            .with_transform(T::EmploymentSummary),
            Concept::new(
                "experience_count",
                &["employment_history", "experience", "experiences", "positions"],
                &["Experience Count", "LinkedIn Experience Count"],
            )
            .with_transform(T::Count),
            Concept::new(
                "education",
                &["education", "educations"],
                &["Education", "LinkedIn Education"],
            )
            .with_transform(T::EducationSummary),
            Concept::new(
                "education_count",
                &["education", "educations"],
                &["Education Count", "LinkedIn Education Count"],
            )
            .with_transform(T::Count),
            Concept::new(
                "skills",
                &["skills"],
                &["Skills", "Top Skills", "LinkedIn Top Skills"],
            )
            .with_transform(T::Names),
            Concept::new(
                "certifications",
                &["certifications"],
                &["Certifications", "LinkedIn Certifications"],
            )
            .with_transform(T::Names),
            Concept::new(
                "languages",
                &["languages"],
                &["Languages", "LinkedIn Languages"],
            )
            .with_transform(T::Names),
            // Derived quality signals
            Concept::new("data_sources", &[], &["Data Sources", "Sources"])
                .with_derive(D::DataSources),
            Concept::new("completeness_score", &[], &["Completeness Score", "Completeness"])
                .with_derive(D::CompletenessScore),
            Concept::new("data_confidence", &[], &["Data Confidence", "Confidence"])
                .with_derive(D::DataConfidence),
            Concept::new("raw_payload", &[], &["Raw Data", "Raw Payload", "Enrichment Data"])
                .with_derive(D::RawPayload),
        ];
        Self { concepts }
    }
}
