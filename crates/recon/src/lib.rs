//! `crossref-recon`: cross-source data reconciliation engine.
//!
//! Pure engine crate: receives an authoritative record plus already-fetched
//! source observations, returns a verification verdict per entity. Records
//! and observations arrive through the `RecordStore` / `SourceProvider`
//! capabilities; nothing here touches the network or the filesystem.

pub mod aggregate;
pub mod batch;
pub mod classify;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod recommend;
pub mod score;
pub mod store;
pub mod summary;

pub use batch::{cancel_token, CancelToken, Orchestrator};
pub use compare::string_similarity;
pub use config::{AlertPolicy, EngineConfig, FieldKind, FieldSpec};
pub use engine::Verifier;
pub use error::ReconError;
pub use model::{
    Action, AuthoritativeRecord, BatchSummary, Discrepancy, FieldValue, Severity, SourceObservation,
    VerificationResult, VerificationStatus,
};
pub use store::{FixtureProvider, MemoryRecordStore, RecordStore, SourceProvider};
pub use score::needs_alert;
pub use summary::{render_report, summarize, Report};
