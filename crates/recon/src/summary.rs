use std::fmt;

use crate::config::AlertPolicy;
use crate::model::{BatchSummary, Severity, VerificationResult, VerificationStatus};
use crate::score::needs_alert;

/// Compute aggregate counts and means from a batch of results.
pub fn summarize(results: &[VerificationResult]) -> BatchSummary {
    let count = |status: VerificationStatus| results.iter().filter(|r| r.status == status).count();

    let total = results.len();
    let (average_confidence, average_processing_time_ms) = if total == 0 {
        (0.0, 0.0)
    } else {
        let n = total as f64;
        (
            results.iter().map(|r| r.overall_confidence).sum::<f64>() / n,
            results.iter().map(|r| r.processing_time_ms as f64).sum::<f64>() / n,
        )
    };

    BatchSummary {
        total_entities: total,
        verified: count(VerificationStatus::Verified),
        with_discrepancies: count(VerificationStatus::DiscrepanciesFound),
        failed: count(VerificationStatus::Failed),
        total_discrepancies: results.iter().map(|r| r.discrepancies.len()).sum(),
        average_confidence,
        average_processing_time_ms,
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

fn is_urgent(severity: Severity) -> bool {
    severity >= Severity::High
}

/// Plain-text report of a batch for humans.
pub struct Report<'a> {
    results: &'a [VerificationResult],
    alerts: &'a AlertPolicy,
}

impl<'a> Report<'a> {
    pub fn new(results: &'a [VerificationResult], alerts: &'a AlertPolicy) -> Self {
        Self { results, alerts }
    }
}

fn label(r: &VerificationResult) -> &str {
    if r.entity_name.is_empty() {
        &r.entity_id
    } else {
        &r.entity_name
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let results = self.results;
        let s = summarize(results);
        let total = s.total_entities;

        writeln!(f, "CROSS-SOURCE VERIFICATION REPORT")?;
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f)?;

        writeln!(f, "Overall statistics:")?;
        writeln!(f, "  Total entities:       {total}")?;
        writeln!(f, "  Verified:             {} ({:.1}%)", s.verified, percent(s.verified, total))?;
        writeln!(
            f,
            "  With discrepancies:   {} ({:.1}%)",
            s.with_discrepancies,
            percent(s.with_discrepancies, total)
        )?;
        writeln!(f, "  Failed:               {} ({:.1}%)", s.failed, percent(s.failed, total))?;
        writeln!(f)?;

        writeln!(f, "Quality metrics:")?;
        writeln!(f, "  Total discrepancies:  {}", s.total_discrepancies)?;
        writeln!(f, "  Average confidence:   {:.3}", s.average_confidence)?;
        writeln!(f, "  Average time:         {:.0}ms per entity", s.average_processing_time_ms)?;
        writeln!(f)?;

        if !results.is_empty() {
            writeln!(f, "Entities:")?;
            for (i, r) in results.iter().enumerate() {
                writeln!(
                    f,
                    "  {}. {}: {}, confidence {:.3}, {} discrepancies, {}ms",
                    i + 1,
                    label(r),
                    r.status,
                    r.overall_confidence,
                    r.discrepancies.len(),
                    r.processing_time_ms
                )?;
            }
            writeln!(f)?;
        }

        let urgent: Vec<&VerificationResult> = results
            .iter()
            .filter(|r| r.discrepancies.iter().any(|d| is_urgent(d.severity)))
            .collect();
        if urgent.is_empty() {
            writeln!(f, "No high-severity issues found.")?;
        } else {
            writeln!(f, "High-severity issues:")?;
            for r in urgent {
                let flagged: Vec<_> = r.discrepancies.iter().filter(|d| is_urgent(d.severity)).collect();
                writeln!(f, "  - {}: {} high-severity discrepancies", r.entity_id, flagged.len())?;
                for d in flagged {
                    writeln!(f, "      {} [{}]: {}", d.field_name, d.severity, d.reasoning)?;
                }
            }
        }
        writeln!(f)?;

        let alerted: Vec<&VerificationResult> =
            results.iter().filter(|r| needs_alert(r, self.alerts)).collect();
        if !alerted.is_empty() {
            writeln!(f, "Needs escalation:")?;
            for r in alerted {
                writeln!(f, "  - {} ({}): confidence {:.3}", r.entity_id, label(r), r.overall_confidence)?;
            }
            writeln!(f)?;
        }

        let mut steps: Vec<&str> = Vec::new();
        for rec in results.iter().flat_map(|r| r.recommendations.iter()) {
            if !steps.contains(&rec.as_str()) {
                steps.push(rec);
            }
        }
        if !steps.is_empty() {
            writeln!(f, "Next steps:")?;
            for step in steps {
                writeln!(f, "  - {step}")?;
            }
        }
        Ok(())
    }
}

/// Render the plain-text report of a batch.
pub fn render_report(results: &[VerificationResult], alerts: &AlertPolicy) -> String {
    Report::new(results, alerts).to_string()
}
