use std::time::Instant;

use log::{debug, info, warn};

use crate::aggregate::consensus;
use crate::classify::{build_discrepancy, classify_field};
use crate::compare::{extract_candidates, lookup};
use crate::config::{EngineConfig, FieldSpec};
use crate::error::ReconError;
use crate::model::{
    AuthoritativeRecord, Discrepancy, SourceObservation, SourceSummary, VerificationResult,
    VerificationStatus,
};
use crate::recommend::{recommendations, skipped_field_note, NO_SOURCES};
use crate::score::{overall_confidence, status_for};

/// Lifecycle of one entity's verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Comparing,
    Scoring,
    Done,
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Comparing => write!(f, "comparing"),
            Self::Scoring => write!(f, "scoring"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Everything the comparison stage produces for one entity.
struct FieldOutcome {
    discrepancies: Vec<Discrepancy>,
    skipped: Vec<ReconError>,
}

/// The reconciliation engine. Field specs are fixed at construction.
#[derive(Debug, Clone)]
pub struct Verifier {
    config: EngineConfig,
}

impl Verifier {
    pub fn new(config: EngineConfig) -> Result<Self, ReconError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Verify one entity against its observations. Never fails: errors come
    /// back as a `failed` result.
    pub fn verify_one(
        &self,
        record: &AuthoritativeRecord,
        observations: &[SourceObservation],
    ) -> VerificationResult {
        self.verify_since(record, observations, Instant::now())
    }

    /// Like `verify_one`, with processing time counted from `started`, so a
    /// batch can include record lookup and source fetch.
    pub(crate) fn verify_since(
        &self,
        record: &AuthoritativeRecord,
        observations: &[SourceObservation],
        started: Instant,
    ) -> VerificationResult {
        let mut stage = Stage::Pending;
        debug!("{}: {stage}", record.id);

        match self.run_pipeline(record, observations, &mut stage) {
            Ok(result) => {
                let result = VerificationResult {
                    processing_time_ms: elapsed_ms(started),
                    ..result
                };
                info!(
                    "{} ({}): {}, confidence {:.2}, {} discrepancies",
                    record.id,
                    record.name,
                    result.status,
                    result.overall_confidence,
                    result.discrepancies.len()
                );
                result
            }
            Err(e) => {
                warn!("{}: verification failed while {stage}: {e}", record.id);
                debug!("{}: {}", record.id, Stage::Failed);
                failed_result(&record.id, &record.name, &e, started)
            }
        }
    }

    fn run_pipeline(
        &self,
        record: &AuthoritativeRecord,
        observations: &[SourceObservation],
        stage: &mut Stage,
    ) -> Result<VerificationResult, ReconError> {
        for obs in observations {
            if !obs.confidence.is_finite() || !(0.0..=1.0).contains(&obs.confidence) {
                return Err(ReconError::InvalidObservation {
                    domain: obs.domain.clone(),
                    confidence: obs.confidence,
                });
            }
        }

        *stage = Stage::Comparing;
        debug!(
            "{}: {stage} {} fields against {} sources",
            record.id,
            self.config.fields.len(),
            observations.len()
        );
        let outcome = self.compare_fields(record, observations);

        *stage = Stage::Scoring;
        debug!("{}: {stage}", record.id);
        let overall = overall_confidence(observations, &outcome.discrepancies);
        let status = status_for(&outcome.discrepancies);

        let mut recs = if observations.is_empty() {
            vec![NO_SOURCES.to_string()]
        } else {
            recommendations(&outcome.discrepancies)
        };
        for err in &outcome.skipped {
            if let ReconError::Comparison { field, message } = err {
                recs.push(skipped_field_note(field, message));
            }
        }

        *stage = Stage::Done;
        debug!("{}: {stage}", record.id);

        Ok(VerificationResult {
            entity_id: record.id.clone(),
            entity_name: record.name.clone(),
            verified_at: chrono::Utc::now(),
            status,
            overall_confidence: overall,
            discrepancies: outcome.discrepancies,
            sources_checked: observations.iter().map(SourceSummary::from).collect(),
            processing_time_ms: 0,
            recommendations: recs,
        })
    }

    fn compare_fields(
        &self,
        record: &AuthoritativeRecord,
        observations: &[SourceObservation],
    ) -> FieldOutcome {
        let mut discrepancies = Vec::new();
        let mut skipped = Vec::new();

        for spec in &self.config.fields {
            match self.compare_field(spec, record, observations) {
                Ok(Some(d)) => discrepancies.push(d),
                Ok(None) => {}
                Err(e) => {
                    warn!("{}: {e}; field skipped", record.id);
                    skipped.push(e);
                }
            }
        }

        FieldOutcome { discrepancies, skipped }
    }

    fn compare_field(
        &self,
        spec: &FieldSpec,
        record: &AuthoritativeRecord,
        observations: &[SourceObservation],
    ) -> Result<Option<Discrepancy>, ReconError> {
        let candidates = extract_candidates(spec, observations);
        if candidates.is_empty() {
            debug!("{}: no source reports '{}'", record.id, spec.name);
            return Ok(None);
        }

        let Some(authoritative) = lookup(&record.fields, spec) else {
            debug!("{}: record has no value for '{}'", record.id, spec.name);
            return Ok(None);
        };

        let Some(agreed) = consensus(spec, authoritative, &candidates)? else {
            return Ok(None);
        };

        Ok(classify_field(spec, authoritative, &agreed)?.map(|severity| {
            build_discrepancy(spec, authoritative, &agreed, severity, &candidates, &self.config.actions)
        }))
    }
}

/// A `failed` result: no discrepancies, zero confidence, the error as the
/// only recommendation.
pub fn failed_result(
    entity_id: &str,
    entity_name: &str,
    error: &ReconError,
    started: Instant,
) -> VerificationResult {
    VerificationResult {
        entity_id: entity_id.to_string(),
        entity_name: entity_name.to_string(),
        verified_at: chrono::Utc::now(),
        status: VerificationStatus::Failed,
        overall_confidence: 0.0,
        discrepancies: Vec::new(),
        sources_checked: Vec::new(),
        processing_time_ms: elapsed_ms(started),
        recommendations: vec![format!("Verification failed: {error}")],
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, FieldValue, Severity};
    use chrono::{TimeZone, Utc};

    fn verifier() -> Verifier {
        Verifier::new(EngineConfig::broker_profile()).unwrap()
    }

    fn record() -> AuthoritativeRecord {
        AuthoritativeRecord::new("b1", "Acme Markets")
            .with_field("name", "Acme Markets")
            .with_field("foundingYear", 2009)
            .with_field("headquarters", "London")
            .with_field("minDeposit", 100)
    }

    fn obs(domain: &str, confidence: f64) -> SourceObservation {
        SourceObservation::new(domain, confidence, Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap())
    }

    fn matching(domain: &str, confidence: f64) -> SourceObservation {
        obs(domain, confidence)
            .with_field("name", "Acme Markets")
            .with_field("foundingYear", 2009)
            .with_field("headquarters", "London")
            .with_field("minDeposit", 100)
    }

    #[test]
    fn exact_match_is_verified() {
        let observations = [matching("a.com", 0.9), matching("b.com", 0.7)];
        let result = verifier().verify_one(&record(), &observations);
        assert_eq!(result.status, VerificationStatus::Verified);
        assert!(result.discrepancies.is_empty());
        assert!((result.overall_confidence - 0.8).abs() < 1e-12);
        assert_eq!(result.recommendations, vec![crate::recommend::NO_DISCREPANCIES]);
        assert_eq!(result.sources_checked.len(), 2);
    }

    #[test]
    fn no_sources_is_verified_with_zero_confidence() {
        let result = verifier().verify_one(&record(), &[]);
        assert_eq!(result.status, VerificationStatus::Verified);
        assert_eq!(result.overall_confidence, 0.0);
        assert_eq!(result.recommendations, vec![NO_SOURCES]);
    }

    #[test]
    fn missing_fields_are_never_flagged() {
        let observations = [obs("a.com", 0.9).with_field("name", "Acme Markets")];
        let result = verifier().verify_one(&record(), &observations);
        assert_eq!(result.status, VerificationStatus::Verified);
    }

    #[test]
    fn discrepancy_found_and_scored() {
        let observations = [matching("a.com", 0.9).with_field("minDeposit", 250)];
        let result = verifier().verify_one(&record(), &observations);
        assert_eq!(result.status, VerificationStatus::DiscrepanciesFound);
        assert_eq!(result.discrepancies.len(), 1);

        let d = &result.discrepancies[0];
        assert_eq!(d.field_name, "minDeposit");
        assert_eq!(d.severity, Severity::High);
        assert_eq!(d.action, Action::Review);
        assert_eq!(d.db_value, FieldValue::Integer(100));
        assert_eq!(d.web_value, FieldValue::Integer(250));
        assert_eq!(d.sources, vec!["a.com"]);
        assert!((result.overall_confidence - 0.6).abs() < 1e-12);
        assert_eq!(
            result.recommendations,
            vec!["High Priority: Review 1 high-severity discrepancies"]
        );
    }

    #[test]
    fn discrepancies_follow_field_order() {
        let observations = [matching("a.com", 0.9)
            .with_field("minDeposit", 500)
            .with_field("name", "Zeta Trading")];
        let result = verifier().verify_one(&record(), &observations);
        let fields: Vec<&str> = result.discrepancies.iter().map(|d| d.field_name.as_str()).collect();
        assert_eq!(fields, ["name", "minDeposit"]);
    }

    #[test]
    fn type_mismatch_skips_field_with_note() {
        let observations = [matching("a.com", 0.9).with_field("minDeposit", "contact sales")];
        let result = verifier().verify_one(&record(), &observations);
        assert_eq!(result.status, VerificationStatus::Verified);
        assert_eq!(result.recommendations.len(), 2);
        assert!(result.recommendations[1].starts_with("Warning: skipped field 'minDeposit'"));
    }

    #[test]
    fn invalid_confidence_fails_entity() {
        let observations = [matching("a.com", 1.5)];
        let result = verifier().verify_one(&record(), &observations);
        assert_eq!(result.status, VerificationStatus::Failed);
        assert_eq!(result.overall_confidence, 0.0);
        assert!(result.discrepancies.is_empty());
        assert_eq!(result.recommendations.len(), 1);
        assert!(result.recommendations[0].starts_with("Verification failed:"));
        assert!(result.recommendations[0].contains("a.com"));
    }

    #[test]
    fn idempotent_apart_from_timestamps() {
        let observations = [
            matching("a.com", 0.9).with_field("headquarters", "Limassol"),
            matching("b.com", 0.6).with_field("minDeposit", 140),
        ];
        let v = verifier();
        let r1 = v.verify_one(&record(), &observations);
        let r2 = v.verify_one(&record(), &observations);
        assert_eq!(r1.discrepancies, r2.discrepancies);
        assert_eq!(r1.overall_confidence, r2.overall_confidence);
        assert_eq!(r1.status, r2.status);
        assert_eq!(r1.recommendations, r2.recommendations);
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(Verifier::new(EngineConfig::new(vec![])).is_err());
    }
}
