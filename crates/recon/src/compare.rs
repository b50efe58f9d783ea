//! Field comparator: candidate extraction and string similarity.

use crate::config::FieldSpec;
use crate::model::{Candidate, FieldValue, SourceObservation};

/// Value of a field in a field map, honoring aliases. Null counts as absent.
pub fn lookup<'a>(
    fields: &'a std::collections::BTreeMap<String, FieldValue>,
    spec: &FieldSpec,
) -> Option<&'a FieldValue> {
    spec.names()
        .filter_map(|name| fields.get(name))
        .find(|v| !v.is_null())
}

/// One candidate per observation that carries the field, in observation order.
pub fn extract_candidates(spec: &FieldSpec, observations: &[SourceObservation]) -> Vec<Candidate> {
    observations
        .iter()
        .filter_map(|obs| {
            lookup(&obs.fields, spec).map(|value| Candidate {
                value: value.clone(),
                domain: obs.domain.clone(),
                confidence: obs.confidence,
            })
        })
        .collect()
}

/// Unit-cost edit distance (insert, delete, substitute) over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two rolling rows of the DP matrix.
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            let deletion = prev[j + 1] + 1;
            let insertion = curr[j] + 1;
            curr[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Case-insensitive similarity in [0, 1]: `(maxLen - distance) / maxLen`.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = levenshtein(&a, &b);
    ((max_len - distance.min(max_len)) as f64 / max_len as f64).clamp(0.0, 1.0)
}
