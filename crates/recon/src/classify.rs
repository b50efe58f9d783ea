use crate::compare::string_similarity;
use crate::config::{ActionPolicy, FieldKind, FieldSpec};
use crate::error::ReconError;
use crate::model::{Candidate, Discrepancy, FieldValue, Severity};

/// Float noise allowed when comparing a delta against tolerance multiples,
/// in units in the last place of the larger operand.
const NOISE_ULPS: f64 = 4.0;

/// Severity bands for string similarity below the field's threshold.
const SIMILARITY_LOW: f64 = 0.7;
const SIMILARITY_MEDIUM: f64 = 0.5;

/// Classify authoritative vs consensus for one field.
///
/// `Ok(None)` means the values agree within tolerance. Criticality is
/// already applied to the returned severity.
pub fn classify_field(
    spec: &FieldSpec,
    authoritative: &FieldValue,
    consensus: &FieldValue,
) -> Result<Option<Severity>, ReconError> {
    let base = match spec.kind {
        FieldKind::Numeric => classify_numeric(spec, authoritative, consensus)?,
        FieldKind::String => classify_string(spec, authoritative, consensus)?,
        FieldKind::Exact => {
            if authoritative.same_as(consensus) {
                None
            } else {
                Some(Severity::Medium)
            }
        }
    };

    Ok(base.map(|s| if spec.critical { s.escalate() } else { s }))
}

fn classify_numeric(
    spec: &FieldSpec,
    authoritative: &FieldValue,
    consensus: &FieldValue,
) -> Result<Option<Severity>, ReconError> {
    let (Some(a), Some(c)) = (authoritative.as_f64(), consensus.as_f64()) else {
        return Err(mismatch(spec, authoritative, consensus));
    };

    let tolerance = spec.effective_tolerance();
    let delta = (a - c).abs();
    let slack = NOISE_ULPS * f64::EPSILON * a.abs().max(c.abs()).max(1.0);
    let within = |limit: f64| delta <= limit + slack;

    Ok(if within(tolerance) {
        None
    } else if within(2.0 * tolerance) {
        Some(Severity::Low)
    } else if within(3.0 * tolerance) {
        Some(Severity::Medium)
    } else {
        Some(Severity::High)
    })
}

fn classify_string(
    spec: &FieldSpec,
    authoritative: &FieldValue,
    consensus: &FieldValue,
) -> Result<Option<Severity>, ReconError> {
    let (Some(a), Some(c)) = (authoritative.as_text(), consensus.as_text()) else {
        return Err(mismatch(spec, authoritative, consensus));
    };

    let similarity = string_similarity(a, c);
    Ok(severity_for_similarity(similarity, spec.effective_tolerance()))
}

/// Map a similarity onto a severity given the "same value" threshold.
pub fn severity_for_similarity(similarity: f64, threshold: f64) -> Option<Severity> {
    if similarity >= threshold {
        None
    } else if similarity >= SIMILARITY_LOW {
        Some(Severity::Low)
    } else if similarity >= SIMILARITY_MEDIUM {
        Some(Severity::Medium)
    } else {
        Some(Severity::High)
    }
}

fn mismatch(spec: &FieldSpec, authoritative: &FieldValue, consensus: &FieldValue) -> ReconError {
    ReconError::Comparison {
        field: spec.name.clone(),
        message: format!(
            "cannot compare {} record value with {} consensus as {}",
            authoritative.type_name(),
            consensus.type_name(),
            spec.kind
        ),
    }
}

pub fn reasoning(authoritative: &FieldValue, consensus: &FieldValue, severity: Severity) -> String {
    format!(
        "Database shows \"{authoritative}\" but consensus indicates \"{consensus}\". {}",
        severity.qualifier()
    )
}

/// Assemble the discrepancy record for a field that failed classification.
pub fn build_discrepancy(
    spec: &FieldSpec,
    authoritative: &FieldValue,
    consensus: &FieldValue,
    severity: Severity,
    candidates: &[Candidate],
    actions: &ActionPolicy,
) -> Discrepancy {
    let confidence = if candidates.is_empty() {
        0.0
    } else {
        candidates.iter().map(|c| c.confidence).sum::<f64>() / candidates.len() as f64
    };

    Discrepancy {
        field_name: spec.name.clone(),
        db_value: authoritative.clone(),
        web_value: consensus.clone(),
        severity,
        action: actions.action_for(severity),
        confidence,
        sources: candidates.iter().map(|c| c.domain.clone()).collect(),
        reasoning: reasoning(authoritative, consensus, severity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Action;

    fn int(n: i64) -> FieldValue {
        FieldValue::Integer(n)
    }

    #[test]
    fn numeric_tolerance_boundary() {
        let spec = FieldSpec::numeric("minDeposit", 10.0);
        assert_eq!(classify_field(&spec, &int(100), &int(110)).unwrap(), None);
        assert_eq!(
            classify_field(&spec, &int(100), &FieldValue::Float(110.01)).unwrap(),
            Some(Severity::Low)
        );
    }

    #[test]
    fn numeric_boundary_survives_float_noise() {
        let spec = FieldSpec::numeric("spread", 0.1);
        let got = classify_field(&spec, &FieldValue::Float(1.2), &FieldValue::Float(1.3)).unwrap();
        assert_eq!(got, None);
    }

    #[test]
    fn numeric_boundary_holds_for_large_values() {
        let spec = FieldSpec::numeric("aum", 10.0);
        for v in [10_000_000i64, 1_000_000_000] {
            let auth = int(v);
            assert_eq!(classify_field(&spec, &auth, &int(v + 10)).unwrap(), None, "v={v}");
            assert_eq!(
                classify_field(&spec, &auth, &FieldValue::Float(v as f64 + 10.01)).unwrap(),
                Some(Severity::Low),
                "v={v}"
            );
        }
        let got = classify_field(&spec, &int(1_000_000_000), &FieldValue::Float(1_000_000_010.5)).unwrap();
        assert_eq!(got, Some(Severity::Low));
    }

    #[test]
    fn numeric_severity_buckets() {
        let spec = FieldSpec::numeric("minDeposit", 10.0);
        let sev = |observed: i64| classify_field(&spec, &int(100), &int(observed)).unwrap();
        assert_eq!(sev(120), Some(Severity::Low));
        assert_eq!(sev(121), Some(Severity::Medium));
        assert_eq!(sev(130), Some(Severity::Medium));
        assert_eq!(sev(131), Some(Severity::High));
        assert_eq!(sev(69), Some(Severity::High));
    }

    #[test]
    fn zero_tolerance_any_difference_is_high() {
        let spec = FieldSpec::numeric("minDeposit", 0.0);
        assert_eq!(classify_field(&spec, &int(100), &int(100)).unwrap(), None);
        assert_eq!(classify_field(&spec, &int(100), &int(101)).unwrap(), Some(Severity::High));
    }

    #[test]
    fn string_bands() {
        assert_eq!(severity_for_similarity(0.8, 0.8), None);
        assert_eq!(severity_for_similarity(0.75, 0.8), Some(Severity::Low));
        assert_eq!(severity_for_similarity(0.6, 0.8), Some(Severity::Medium));
        assert_eq!(severity_for_similarity(0.49, 0.8), Some(Severity::High));
    }

    #[test]
    fn critical_field_escalates_one_level() {
        // "abcd" vs "abce": similarity 0.75 → low, escalated to medium
        let plain = FieldSpec::string("name");
        let critical = FieldSpec::string("name").critical();
        let a = FieldValue::from("abcd");
        let c = FieldValue::from("abce");
        assert_eq!(classify_field(&plain, &a, &c).unwrap(), Some(Severity::Low));
        assert_eq!(classify_field(&critical, &a, &c).unwrap(), Some(Severity::Medium));

        let numeric = FieldSpec::numeric("foundingYear", 1.0).critical();
        assert_eq!(classify_field(&numeric, &int(2000), &int(2010)).unwrap(), Some(Severity::High));
    }

    #[test]
    fn case_insensitive_match_is_not_a_discrepancy() {
        let spec = FieldSpec::string("headquarters");
        let got = classify_field(&spec, &"LONDON".into(), &"london".into()).unwrap();
        assert_eq!(got, None);
    }

    #[test]
    fn exact_fields() {
        let spec = FieldSpec::exact("regulator");
        assert_eq!(classify_field(&spec, &"FCA".into(), &"FCA".into()).unwrap(), None);
        assert_eq!(
            classify_field(&spec, &"FCA".into(), &"CySEC".into()).unwrap(),
            Some(Severity::Medium)
        );
        assert_eq!(
            classify_field(&spec.clone().critical(), &true.into(), &false.into()).unwrap(),
            Some(Severity::High)
        );
    }

    #[test]
    fn type_mismatch_is_comparison_error() {
        let spec = FieldSpec::numeric("minDeposit", 10.0);
        let err = classify_field(&spec, &"n/a".into(), &int(100)).unwrap_err();
        assert!(matches!(err, ReconError::Comparison { .. }));
    }

    #[test]
    fn reasoning_format() {
        assert_eq!(
            reasoning(&int(100), &int(150), Severity::High),
            "Database shows \"100\" but consensus indicates \"150\". \
             This is a significant discrepancy that requires review."
        );
        assert_eq!(
            reasoning(&"a".into(), &"b".into(), Severity::Medium),
            "Database shows \"a\" but consensus indicates \"b\". This difference should be investigated."
        );
        assert!(reasoning(&int(1), &int(2), Severity::Low).ends_with("This is a minor discrepancy."));
    }

    #[test]
    fn discrepancy_uses_contributing_sources() {
        let spec = FieldSpec::numeric("minDeposit", 10.0);
        let candidates = vec![
            Candidate { value: int(200), domain: "a.com".into(), confidence: 0.9 },
            Candidate { value: int(200), domain: "b.com".into(), confidence: 0.7 },
        ];
        let d = build_discrepancy(
            &spec,
            &int(100),
            &int(200),
            Severity::High,
            &candidates,
            &ActionPolicy::default(),
        );
        assert_eq!(d.sources, vec!["a.com", "b.com"]);
        assert!((d.confidence - 0.8).abs() < 1e-12);
        assert_eq!(d.action, Action::Review);
    }
}
