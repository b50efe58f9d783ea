use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A single attribute value, as stored or as observed.
///
/// Integers and floats are kept apart so numeric consensus can round back to
/// the authoritative value's precision. `Null` behaves exactly like a missing
/// field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
        }
    }

    /// Exact-match equality. Integer and float compare by numeric value.
    pub fn same_as(&self, other: &FieldValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Integer(n.into())
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The stored, trusted value set for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthoritativeRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl AuthoritativeRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// One external source's view of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceObservation {
    pub domain: String,
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl SourceObservation {
    pub fn new(domain: impl Into<String>, confidence: f64, observed_at: DateTime<Utc>) -> Self {
        Self {
            domain: domain.into(),
            confidence,
            observed_at,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// One observed value for a field, tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub value: FieldValue,
    pub domain: String,
    pub confidence: f64,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Ordinal seriousness of a discrepancy. Declaration order is severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// One-level upgrade for critical fields. Single-field classification
    /// tops out at `High`.
    pub fn escalate(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
            Self::Critical => Self::Critical,
        }
    }

    /// Confidence penalty contributed by one discrepancy of this severity.
    pub fn weight(self) -> f64 {
        match self {
            Self::Critical => 0.4,
            Self::High => 0.3,
            Self::Medium => 0.15,
            Self::Low => 0.05,
        }
    }

    pub fn qualifier(self) -> &'static str {
        match self {
            Self::Critical | Self::High => "This is a significant discrepancy that requires review.",
            Self::Medium => "This difference should be investigated.",
            Self::Low => "This is a minor discrepancy.",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Ignore,
    Review,
    Update,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignore => write!(f, "ignore"),
            Self::Review => write!(f, "review"),
            Self::Update => write!(f, "update"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discrepancy {
    pub field_name: String,
    pub db_value: FieldValue,
    pub web_value: FieldValue,
    pub severity: Severity,
    pub action: Action,
    pub confidence: f64,
    pub sources: Vec<String>,
    pub reasoning: String,
}

// ---------------------------------------------------------------------------
// Result + Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    DiscrepanciesFound,
    Failed,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified => write!(f, "verified"),
            Self::DiscrepanciesFound => write!(f, "discrepancies_found"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A consulted source as reported back in `sourcesChecked`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
    pub domain: String,
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
}

impl From<&SourceObservation> for SourceSummary {
    fn from(obs: &SourceObservation) -> Self {
        Self {
            domain: obs.domain.clone(),
            confidence: obs.confidence,
            observed_at: obs.observed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub entity_id: String,
    pub entity_name: String,
    pub verified_at: DateTime<Utc>,
    pub status: VerificationStatus,
    pub overall_confidence: f64,
    pub discrepancies: Vec<Discrepancy>,
    pub sources_checked: Vec<SourceSummary>,
    pub processing_time_ms: u64,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total_entities: usize,
    pub verified: usize,
    pub with_discrepancies: usize,
    pub failed: usize,
    pub total_discrepancies: usize,
    pub average_confidence: f64,
    pub average_processing_time_ms: f64,
}
