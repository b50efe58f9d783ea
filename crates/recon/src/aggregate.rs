use crate::config::{FieldKind, FieldSpec};
use crate::error::ReconError;
use crate::model::{Candidate, FieldValue};

/// Reduce a field's candidates to one consensus value.
///
/// Returns `Ok(None)` when there is nothing to aggregate. `authoritative`
/// decides numeric precision: an integer record value rounds the weighted
/// mean to the nearest integer.
pub fn consensus(
    spec: &FieldSpec,
    authoritative: &FieldValue,
    candidates: &[Candidate],
) -> Result<Option<FieldValue>, ReconError> {
    check_kinds(spec, candidates)?;

    match candidates {
        [] => Ok(None),
        [only] => Ok(Some(only.value.clone())),
        _ => match spec.kind {
            FieldKind::Numeric => Ok(Some(weighted_mean(authoritative, candidates))),
            FieldKind::String | FieldKind::Exact => Ok(Some(most_confident(candidates))),
        },
    }
}

fn check_kinds(spec: &FieldSpec, candidates: &[Candidate]) -> Result<(), ReconError> {
    for c in candidates {
        let ok = match spec.kind {
            FieldKind::Numeric => c.value.as_f64().is_some(),
            FieldKind::String => c.value.as_text().is_some(),
            FieldKind::Exact => true,
        };
        if !ok {
            return Err(ReconError::Comparison {
                field: spec.name.clone(),
                message: format!(
                    "source '{}' reported a {} value for a {} field",
                    c.domain,
                    c.value.type_name(),
                    spec.kind
                ),
            });
        }
    }
    Ok(())
}

/// `Σ(v·c) / Σc`, falling back to the first candidate when total weight is zero.
fn weighted_mean(authoritative: &FieldValue, candidates: &[Candidate]) -> FieldValue {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for c in candidates {
        if let Some(v) = c.value.as_f64() {
            weighted_sum += v * c.confidence;
            total_weight += c.confidence;
        }
    }

    if total_weight <= 0.0 {
        return candidates[0].value.clone();
    }

    let mean = weighted_sum / total_weight;
    match authoritative {
        FieldValue::Integer(_) => FieldValue::Integer(mean.round() as i64),
        _ => FieldValue::Float(mean),
    }
}

/// Highest-confidence candidate; the first one seen wins ties.
fn most_confident(candidates: &[Candidate]) -> FieldValue {
    let mut best = &candidates[0];
    for c in &candidates[1..] {
        if c.confidence > best.confidence {
            best = c;
        }
    }
    best.value.clone()
}
