//! Collaborator capabilities: where records and observations come from.
//!
//! The engine never fetches anything itself. A host wires in a `RecordStore`
//! (database, API) and a `SourceProvider` (scrapers, search backends). The
//! in-memory implementations here back the CLI's file inputs and the tests.

use std::collections::HashMap;

use crate::error::ReconError;
use crate::model::{AuthoritativeRecord, SourceObservation};

/// Read access to authoritative records by id.
pub trait RecordStore: Send + Sync {
    fn get(&self, id: &str) -> Result<AuthoritativeRecord, ReconError>;
}

/// Produces the already-fetched observations for an entity.
pub trait SourceProvider: Send + Sync {
    fn fetch(&self, record: &AuthoritativeRecord) -> Result<Vec<SourceObservation>, ReconError>;
}

// ---------------------------------------------------------------------------
// In-memory implementations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: HashMap<String, AuthoritativeRecord>,
    order: Vec<String>,
}

impl MemoryRecordStore {
    pub fn new(records: Vec<AuthoritativeRecord>) -> Self {
        let mut store = Self::default();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Insert or replace. Ids keep their first insertion position.
    pub fn insert(&mut self, record: AuthoritativeRecord) {
        if !self.records.contains_key(&record.id) {
            self.order.push(record.id.clone());
        }
        self.records.insert(record.id.clone(), record);
    }

    /// All ids in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Parse a JSON array of records.
    pub fn from_json(input: &str) -> Result<Self, ReconError> {
        let records: Vec<AuthoritativeRecord> = serde_json::from_str(input)
            .map_err(|e| ReconError::InputParse(format!("records: {e}")))?;
        Ok(Self::new(records))
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, id: &str) -> Result<AuthoritativeRecord, ReconError> {
        self.records
            .get(id)
            .cloned()
            .ok_or_else(|| ReconError::EntityNotFound(id.to_string()))
    }
}

/// Serves pre-fetched observations keyed by entity id. Entities with no
/// entry have zero observations.
#[derive(Debug, Clone, Default)]
pub struct FixtureProvider {
    observations: HashMap<String, Vec<SourceObservation>>,
}

impl FixtureProvider {
    pub fn new(observations: HashMap<String, Vec<SourceObservation>>) -> Self {
        Self { observations }
    }

    pub fn with_entity(mut self, entity_id: impl Into<String>, observations: Vec<SourceObservation>) -> Self {
        self.observations.insert(entity_id.into(), observations);
        self
    }

    /// Parse a JSON object mapping entity id to an array of observations.
    pub fn from_json(input: &str) -> Result<Self, ReconError> {
        let observations: HashMap<String, Vec<SourceObservation>> = serde_json::from_str(input)
            .map_err(|e| ReconError::InputParse(format!("observations: {e}")))?;
        Ok(Self::new(observations))
    }
}

impl SourceProvider for FixtureProvider {
    fn fetch(&self, record: &AuthoritativeRecord) -> Result<Vec<SourceObservation>, ReconError> {
        Ok(self.observations.get(&record.id).cloned().unwrap_or_default())
    }
}
