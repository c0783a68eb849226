//! Batch-level validation summary for operator-facing reporting.

use std::collections::HashMap;

use crate::models::{BatchValidationSummary, IssueFrequency, ValidationResult};

/// How many of the most frequent issue messages to keep.
const TOP_ISSUES: usize = 5;

/// Aggregate per-item results into counts plus the most frequent issues.
pub fn summarize(results: &[ValidationResult]) -> BatchValidationSummary {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut valid = 0usize;
    let mut quarantined = 0usize;

    for result in results {
        if result.valid {
            valid += 1;
        }
        if result.quarantine {
            quarantined += 1;
        }
        for issue in result.errors.iter().chain(&result.warnings) {
            *counts.entry(issue.message.as_str()).or_default() += 1;
        }
    }

    let mut top: Vec<IssueFrequency> = counts
        .into_iter()
        .map(|(message, count)| IssueFrequency {
            message: message.to_string(),
            count,
        })
        .collect();
    // Count descending, message ascending for a stable report.
    top.sort_by(|a, b| b.count.cmp(&a.count).then(a.message.cmp(&b.message)));
    top.truncate(TOP_ISSUES);

    BatchValidationSummary {
        total: results.len(),
        valid,
        invalid: results.len() - valid,
        quarantined,
        top_issues: top,
    }
}
