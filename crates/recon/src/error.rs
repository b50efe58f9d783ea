use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconError {
    /// TOML / JSON parse or deserialization error.
    ConfigParse(String),
    /// Config validation error (no fields, bad tolerance, duplicate name, etc.).
    ConfigValidation(String),
    /// The record store has no record for this id.
    EntityNotFound(String),
    /// The source provider could not produce observations for an entity.
    SourceUnavailable { entity_id: String, message: String },
    /// An observation's confidence is outside [0, 1] or not finite.
    InvalidObservation { domain: String, confidence: f64 },
    /// Authoritative and observed values for a field cannot be compared.
    Comparison { field: String, message: String },
    /// Input data could not be decoded.
    InputParse(String),
    /// A collaborator panicked while handling an entity.
    Internal(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::EntityNotFound(id) => write!(f, "entity not found: {id}"),
            Self::SourceUnavailable { entity_id, message } => {
                write!(f, "sources unavailable for '{entity_id}': {message}")
            }
            Self::InvalidObservation { domain, confidence } => {
                write!(f, "source '{domain}': confidence {confidence} is outside [0, 1]")
            }
            Self::Comparison { field, message } => {
                write!(f, "field '{field}': {message}")
            }
            Self::InputParse(msg) => write!(f, "input parse error: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
