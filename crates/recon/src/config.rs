use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ReconError;
use crate::model::{Action, Severity};

/// Similarity at or above which two strings are considered the same.
pub const DEFAULT_STRING_THRESHOLD: f64 = 0.8;

pub const DEFAULT_WORKERS: usize = 4;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub actions: ActionPolicy,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub alerts: AlertPolicy,
}

fn default_name() -> String {
    "default".into()
}

// ---------------------------------------------------------------------------
// Field specs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Absolute-delta comparison; consensus is a confidence-weighted mean.
    Numeric,
    /// Levenshtein similarity against a threshold.
    String,
    /// Categorical: identical or not.
    Exact,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric => write!(f, "numeric"),
            Self::String => write!(f, "string"),
            Self::Exact => write!(f, "exact"),
        }
    }
}

/// Per-field comparison policy.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    /// Absolute delta for numeric fields, similarity threshold for string
    /// fields. Unused for exact fields.
    #[serde(default)]
    pub tolerance: Option<f64>,
    #[serde(default)]
    pub critical: bool,
    /// Historical names the field may be recorded under, tried in order
    /// after `name`.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl FieldSpec {
    pub fn numeric(name: impl Into<String>, tolerance: f64) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Numeric,
            tolerance: Some(tolerance),
            critical: false,
            aliases: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::String,
            tolerance: None,
            critical: false,
            aliases: Vec::new(),
        }
    }

    pub fn exact(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Exact,
            tolerance: None,
            critical: false,
            aliases: Vec::new(),
        }
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Tolerance with the kind's default applied.
    pub fn effective_tolerance(&self) -> f64 {
        match (self.kind, self.tolerance) {
            (_, Some(t)) => t,
            (FieldKind::String, None) => DEFAULT_STRING_THRESHOLD,
            (_, None) => 0.0,
        }
    }

    /// Lookup order: the canonical name, then aliases.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(|a| a.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Severity → recommended action. Low is ignored; everything else is reviewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ActionPolicy {
    #[serde(default = "default_ignore")]
    pub low: Action,
    #[serde(default = "default_review")]
    pub medium: Action,
    #[serde(default = "default_review")]
    pub high: Action,
    #[serde(default = "default_review")]
    pub critical: Action,
}

fn default_ignore() -> Action {
    Action::Ignore
}

fn default_review() -> Action {
    Action::Review
}

impl Default for ActionPolicy {
    fn default() -> Self {
        Self {
            low: Action::Ignore,
            medium: Action::Review,
            high: Action::Review,
            critical: Action::Review,
        }
    }
}

impl ActionPolicy {
    pub fn action_for(&self, severity: Severity) -> Action {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
            Severity::Critical => self.critical,
        }
    }
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// When a finished verification should be escalated to a human. Only a
/// flag on the result; nothing is sent.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AlertPolicy {
    /// More high-severity discrepancies than this raises an alert.
    #[serde(default = "default_max_high")]
    pub max_high: usize,
    /// Overall confidence below this raises an alert.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

fn default_max_high() -> usize {
    2
}

fn default_min_confidence() -> f64 {
    0.4
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            max_high: default_max_high(),
            min_confidence: default_min_confidence(),
        }
    }
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Pause a worker takes between two entities. A courtesy to the source
    /// collaborator, not needed for correctness.
    #[serde(default)]
    pub inter_entity_delay_ms: u64,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            inter_entity_delay_ms: 0,
        }
    }
}

impl BatchConfig {
    pub fn inter_entity_delay(&self) -> Duration {
        Duration::from_millis(self.inter_entity_delay_ms)
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl EngineConfig {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            name: default_name(),
            fields,
            actions: ActionPolicy::default(),
            batch: BatchConfig::default(),
            alerts: AlertPolicy::default(),
        }
    }

    /// Broker profile: the field set checked against review sites.
    pub fn broker_profile() -> Self {
        let mut config = Self::new(vec![
            FieldSpec::string("name").critical().with_aliases(&["brokerName"]),
            FieldSpec::numeric("foundingYear", 1.0)
                .critical()
                .with_aliases(&["yearFounded"]),
            FieldSpec::string("headquarters").with_aliases(&["location"]),
            FieldSpec::numeric("minDeposit", 10.0).with_aliases(&["minimumDeposit"]),
        ]);
        config.name = "broker-profile".into();
        config
    }

    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: EngineConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.fields.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one field is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(ReconError::ConfigValidation("field name cannot be empty".into()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate field '{}'",
                    field.name
                )));
            }
            validate_tolerance(field)?;
        }

        let min = self.alerts.min_confidence;
        if !(0.0..=1.0).contains(&min) {
            return Err(ReconError::ConfigValidation(format!(
                "alerts.min_confidence must be in [0, 1], got {min}"
            )));
        }

        if self.batch.workers == 0 {
            return Err(ReconError::ConfigValidation(
                "batch.workers must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

fn validate_tolerance(field: &FieldSpec) -> Result<(), ReconError> {
    let Some(t) = field.tolerance else {
        return Ok(());
    };
    match field.kind {
        FieldKind::Numeric if !t.is_finite() || t < 0.0 => Err(ReconError::ConfigValidation(
            format!("field '{}': numeric tolerance must be finite and >= 0, got {t}", field.name),
        )),
        FieldKind::String if !(0.0..=1.0).contains(&t) => Err(ReconError::ConfigValidation(
            format!("field '{}': similarity threshold must be in [0, 1], got {t}", field.name),
        )),
        FieldKind::Exact => Err(ReconError::ConfigValidation(format!(
            "field '{}': exact fields take no tolerance",
            field.name
        ))),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
