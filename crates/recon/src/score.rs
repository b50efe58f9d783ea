use crate::config::AlertPolicy;
use crate::model::{Discrepancy, Severity, SourceObservation, VerificationResult, VerificationStatus};

/// Mean confidence over every observation consulted; 0 with no observations.
pub fn source_confidence(observations: &[SourceObservation]) -> f64 {
    if observations.is_empty() {
        return 0.0;
    }
    observations.iter().map(|o| o.confidence).sum::<f64>() / observations.len() as f64
}

/// Sum of severity weights over all discrepancies.
pub fn discrepancy_penalty(discrepancies: &[Discrepancy]) -> f64 {
    discrepancies.iter().map(|d| d.severity.weight()).sum()
}

/// `clamp(sourceConfidence - penalty, 0, 1)`.
pub fn overall_confidence(observations: &[SourceObservation], discrepancies: &[Discrepancy]) -> f64 {
    (source_confidence(observations) - discrepancy_penalty(discrepancies)).clamp(0.0, 1.0)
}

/// Status of a run that completed without error.
pub fn status_for(discrepancies: &[Discrepancy]) -> VerificationStatus {
    if discrepancies.is_empty() {
        VerificationStatus::Verified
    } else {
        VerificationStatus::DiscrepanciesFound
    }
}

/// Whether a finished verification warrants escalation: any critical
/// discrepancy, more than `max_high` high ones, or overall confidence below
/// `min_confidence`. Failed results carry no verdict and never alert.
pub fn needs_alert(result: &VerificationResult, policy: &AlertPolicy) -> bool {
    if result.status == VerificationStatus::Failed {
        return false;
    }
    let count = |severity: Severity| result.discrepancies.iter().filter(|d| d.severity == severity).count();

    count(Severity::Critical) > 0
        || count(Severity::High) > policy.max_high
        || result.overall_confidence < policy.min_confidence
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, FieldValue, Severity};
    use chrono::Utc;

    fn obs(confidence: f64) -> SourceObservation {
        SourceObservation::new("x.com", confidence, Utc::now())
    }

    fn disc(severity: Severity) -> Discrepancy {
        Discrepancy {
            field_name: "f".into(),
            db_value: FieldValue::Integer(1),
            web_value: FieldValue::Integer(2),
            severity,
            action: Action::Review,
            confidence: 0.8,
            sources: vec![],
            reasoning: String::new(),
        }
    }

    #[test]
    fn no_sources_scores_zero() {
        assert_eq!(overall_confidence(&[], &[]), 0.0);
    }

    #[test]
    fn penalty_by_severity() {
        let observations = [obs(0.9), obs(0.7)];
        let discrepancies = [disc(Severity::Low), disc(Severity::Medium)];
        let got = overall_confidence(&observations, &discrepancies);
        assert!((got - (0.8 - 0.05 - 0.15)).abs() < 1e-12);
        assert!((discrepancy_penalty(&[disc(Severity::Critical), disc(Severity::High)]) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn clamps_at_zero() {
        let observations = [obs(0.5)];
        let discrepancies = [disc(Severity::High), disc(Severity::High)];
        assert_eq!(overall_confidence(&observations, &discrepancies), 0.0);
    }

    #[test]
    fn status_follows_discrepancies() {
        assert_eq!(status_for(&[]), VerificationStatus::Verified);
        assert_eq!(status_for(&[disc(Severity::Low)]), VerificationStatus::DiscrepanciesFound);
    }

    #[test]
    fn high_discrepancy_strictly_lowers_unclamped_confidence() {
        let observations = [obs(0.9), obs(0.8)];
        let before = overall_confidence(&observations, &[disc(Severity::Low)]);
        let after = overall_confidence(&observations, &[disc(Severity::Low), disc(Severity::High)]);
        assert!(after < before);
        assert!((before - after - 0.3).abs() < 1e-12);
    }

    fn result(confidence: f64, severities: &[Severity]) -> VerificationResult {
        VerificationResult {
            entity_id: "b1".into(),
            entity_name: "Acme".into(),
            verified_at: Utc::now(),
            status: status_for(&severities.iter().copied().map(disc).collect::<Vec<_>>()),
            overall_confidence: confidence,
            discrepancies: severities.iter().copied().map(disc).collect(),
            sources_checked: vec![],
            processing_time_ms: 0,
            recommendations: vec![],
        }
    }

    #[test]
    fn alert_on_any_critical() {
        let policy = AlertPolicy::default();
        assert!(needs_alert(&result(0.9, &[Severity::Critical]), &policy));
        assert!(!needs_alert(&result(0.9, &[Severity::Medium, Severity::Low]), &policy));
    }

    #[test]
    fn alert_on_too_many_high() {
        let policy = AlertPolicy::default();
        assert!(!needs_alert(&result(0.9, &[Severity::High, Severity::High]), &policy));
        assert!(needs_alert(&result(0.9, &[Severity::High; 3]), &policy));

        let strict = AlertPolicy { max_high: 0, ..policy };
        assert!(needs_alert(&result(0.9, &[Severity::High]), &strict));
    }

    #[test]
    fn alert_on_low_confidence() {
        let policy = AlertPolicy::default();
        assert!(needs_alert(&result(0.39, &[]), &policy));
        assert!(!needs_alert(&result(0.4, &[]), &policy));
    }

    #[test]
    fn failed_results_never_alert() {
        let mut failed = result(0.0, &[]);
        failed.status = VerificationStatus::Failed;
        assert!(!needs_alert(&failed, &AlertPolicy::default()));
    }
}
