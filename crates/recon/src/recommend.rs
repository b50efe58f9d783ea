use crate::model::{Discrepancy, Severity};

pub const NO_DISCREPANCIES: &str = "No significant discrepancies found. Data appears accurate.";
pub const NO_SOURCES: &str = "No sources were checked. Verification is based on no external evidence.";

/// Recommendation lines, most urgent first.
///
/// Low-severity discrepancies get no line of their own: they map to
/// `ignore` under the default policy.
pub fn recommendations(discrepancies: &[Discrepancy]) -> Vec<String> {
    if discrepancies.is_empty() {
        return vec![NO_DISCREPANCIES.to_string()];
    }

    let count = |severity: Severity| discrepancies.iter().filter(|d| d.severity == severity).count();

    let mut out = Vec::new();
    let critical = count(Severity::Critical);
    if critical > 0 {
        out.push(format!("Critical: Address {critical} critical discrepancies immediately"));
    }
    let high = count(Severity::High);
    if high > 0 {
        out.push(format!("High Priority: Review {high} high-severity discrepancies"));
    }
    let medium = count(Severity::Medium);
    if medium > 0 {
        out.push(format!("Medium Priority: Investigate {medium} medium-severity discrepancies"));
    }
    out
}

/// Note appended for a field skipped because its values could not be compared.
pub fn skipped_field_note(field: &str, reason: &str) -> String {
    format!("Warning: skipped field '{field}': {reason}")
}
