//! Quality gate: deterministic rule engine over normalized items.
//!
//! A fixed per-field validator table plus cross-field rules. Violations
//! become `Issue`s with severity - never exceptions. Errors and low
//! confidence drive quarantine, not abort. No retries, no external calls.

pub mod summary;

use crate::config::{thresholds, MAX_PLAUSIBLE_BUDGET};
use crate::models::{Issue, IssueCode, NormalizedItem, Severity, ValidationResult};

/// Penalty per error/warning applied to the validation score.
const ERROR_PENALTY: f32 = 0.10;
const WARNING_PENALTY: f32 = 0.05;

/// Budget above which a value is legal but suspicious.
const SUSPICIOUS_BUDGET: f64 = 100_000_000.0;

struct FieldRule {
    check: fn(&NormalizedItem) -> Option<Issue>,
}

/// Per-field validator table. Order is stable so issue output is
/// deterministic.
const FIELD_RULES: &[FieldRule] = &[
    FieldRule { check: check_name_required },
    FieldRule { check: check_name_length },
    FieldRule { check: check_budget_positive },
    FieldRule { check: check_budget_upper_bound },
    FieldRule { check: check_budget_suspicious },
    FieldRule { check: check_owner_plausible },
];

/// Cross-field rules.
const CROSS_RULES: &[FieldRule] = &[
    FieldRule { check: check_date_ordering },
    FieldRule { check: check_completed_needs_end },
];

fn check_name_required(item: &NormalizedItem) -> Option<Issue> {
    if item.name.trim().is_empty() {
        Some(Issue::error(
            "name",
            IssueCode::RequiredFieldMissing,
            "Item has no name",
        ))
    } else {
        None
    }
}

fn check_name_length(item: &NormalizedItem) -> Option<Issue> {
    let len = item.name.trim().len();
    if len > 0 && len < 3 {
        Some(Issue::warning(
            "name",
            IssueCode::SuspiciousValue,
            format!("Name '{}' is suspiciously short", item.name.trim()),
        ))
    } else {
        None
    }
}

fn check_budget_positive(item: &NormalizedItem) -> Option<Issue> {
    let budget = item.budget?;
    if budget <= 0.0 {
        Some(
            Issue::error("budget", IssueCode::OutOfRange, "Budget must be positive")
                .with_values(budget.to_string(), "> 0"),
        )
    } else {
        None
    }
}

fn check_budget_upper_bound(item: &NormalizedItem) -> Option<Issue> {
    let budget = item.budget?;
    if budget >= MAX_PLAUSIBLE_BUDGET {
        Some(
            Issue::error(
                "budget",
                IssueCode::OutOfRange,
                "Budget exceeds the plausible upper bound",
            )
            .with_values(budget.to_string(), format!("< {MAX_PLAUSIBLE_BUDGET}")),
        )
    } else {
        None
    }
}

fn check_budget_suspicious(item: &NormalizedItem) -> Option<Issue> {
    let budget = item.budget?;
    if (SUSPICIOUS_BUDGET..MAX_PLAUSIBLE_BUDGET).contains(&budget) {
        Some(Issue::warning(
            "budget",
            IssueCode::SuspiciousValue,
            format!("Budget {budget} is unusually large - verify the source"),
        ))
    } else {
        None
    }
}

fn check_owner_plausible(item: &NormalizedItem) -> Option<Issue> {
    let owner = item.owner.as_deref()?;
    if owner.trim().len() > 120 {
        Some(Issue::warning(
            "owner",
            IssueCode::SuspiciousValue,
            "Owner field looks like free text, not a person or team",
        ))
    } else {
        None
    }
}

fn check_date_ordering(item: &NormalizedItem) -> Option<Issue> {
    let (start, end) = (item.start_date?, item.end_date?);
    if end < start {
        Some(
            Issue::error(
                "end_date",
                IssueCode::InconsistentData,
                "End date precedes start date",
            )
            .with_values(end.to_string(), format!(">= {start}")),
        )
    } else {
        None
    }
}

fn check_completed_needs_end(item: &NormalizedItem) -> Option<Issue> {
    if item.status == crate::models::ItemStatus::Completed
        && item.start_date.is_some()
        && item.end_date.is_none()
    {
        Some(Issue::warning(
            "end_date",
            IssueCode::InconsistentData,
            "Completed item has a start date but no end date",
        ))
    } else {
        None
    }
}

/// Validate one item. The quarantine invariant is enforced here:
/// `quarantine == (errors non-empty || confidence < threshold)`.
pub fn validate_item(item: &NormalizedItem) -> ValidationResult {
    let mut errors: Vec<Issue> = Vec::new();
    let mut warnings: Vec<Issue> = Vec::new();

    for rule in FIELD_RULES.iter().chain(CROSS_RULES) {
        if let Some(issue) = (rule.check)(item) {
            match issue.severity {
                Severity::Error => errors.push(issue),
                _ => warnings.push(issue),
            }
        }
    }

    let mut quarantine_reasons: Vec<String> = Vec::new();
    for error in &errors {
        quarantine_reasons.push(error.message.clone());
    }
    if item.confidence < thresholds::QUARANTINE {
        quarantine_reasons.push(format!(
            "Confidence {:.2} below quarantine threshold {:.2}",
            item.confidence,
            thresholds::QUARANTINE
        ));
    }

    let score = (item.confidence
        - ERROR_PENALTY * errors.len() as f32
        - WARNING_PENALTY * warnings.len() as f32)
        .clamp(0.0, 1.0);

    ValidationResult {
        valid: errors.is_empty(),
        score,
        quarantine: !quarantine_reasons.is_empty(),
        quarantine_reasons,
        errors,
        warnings,
    }
}

/// Validate a batch; returns per-item results in input order.
pub fn validate_batch(items: &[NormalizedItem]) -> Vec<ValidationResult> {
    items.iter().map(validate_item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfidenceBreakdown, ItemStatus, ItemType, Provenance};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn item(name: &str, confidence: f32) -> NormalizedItem {
        NormalizedItem {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            item_type: ItemType::Product,
            status: ItemStatus::Proposed,
            priority: None,
            category: None,
            subcategory: None,
            tags: vec![],
            budget: None,
            start_date: None,
            end_date: None,
            risk_level: None,
            complexity: None,
            technologies: vec![],
            dependencies: vec![],
            risks: vec![],
            owner: None,
            confidence,
            confidence_breakdown: ConfidenceBreakdown {
                overall: confidence,
                ..ConfidenceBreakdown::default()
            },
            normalization_notes: vec![],
            extraction_metadata: Provenance::default(),
        }
    }

    // ── Required fields ─────────────────────────────────

    #[test]
    fn missing_name_is_error_and_quarantine() {
        let result = validate_item(&item("", 0.8));
        assert!(!result.valid);
        assert!(result.quarantine);
        assert!(result.errors.iter().any(|i| {
            i.field == "name" && i.code == IssueCode::RequiredFieldMissing
        }));
    }

    #[test]
    fn clean_item_passes() {
        let mut it = item("Fleet Telematics", 0.85);
        it.budget = Some(1_500_000.0);
        let result = validate_item(&it);
        assert!(result.valid);
        assert!(!result.quarantine);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    // ── Budget bounds ───────────────────────────────────

    #[test]
    fn parsed_million_budget_is_fine() {
        let mut it = item("Progetto", 0.8);
        it.budget = Some(1_500_000.0);
        let result = validate_item(&it);
        assert!(!result.errors.iter().any(|i| i.field == "budget"));
        assert!(!result.warnings.iter().any(|i| i.field == "budget"));
    }

    #[test]
    fn zero_budget_is_error() {
        let mut it = item("Progetto", 0.8);
        it.budget = Some(0.0);
        let result = validate_item(&it);
        assert!(result
            .errors
            .iter()
            .any(|i| i.field == "budget" && i.code == IssueCode::OutOfRange));
    }

    #[test]
    fn absurd_budget_is_error() {
        let mut it = item("Progetto", 0.8);
        it.budget = Some(2e9);
        let result = validate_item(&it);
        assert!(!result.valid);
        assert!(result.quarantine);
    }

    #[test]
    fn large_but_legal_budget_is_warning() {
        let mut it = item("Progetto", 0.8);
        it.budget = Some(2e8);
        let result = validate_item(&it);
        assert!(result.valid);
        assert!(result
            .warnings
            .iter()
            .any(|i| i.code == IssueCode::SuspiciousValue));
    }

    // ── Cross-field rules ───────────────────────────────

    #[test]
    fn inverted_dates_are_inconsistent() {
        let mut it = item("Progetto", 0.8);
        it.start_date = NaiveDate::from_ymd_opt(2025, 1, 1);
        it.end_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        let result = validate_item(&it);
        assert!(!result.valid);
        assert!(result
            .errors
            .iter()
            .any(|i| i.code == IssueCode::InconsistentData));
    }

    #[test]
    fn ordered_dates_pass() {
        let mut it = item("Progetto", 0.8);
        it.start_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        it.end_date = NaiveDate::from_ymd_opt(2025, 1, 1);
        let result = validate_item(&it);
        assert!(result.valid);
    }

    // ── Quarantine invariant ────────────────────────────

    #[test]
    fn low_confidence_quarantines_without_errors() {
        let result = validate_item(&item("Progetto", 0.2));
        assert!(result.valid, "low confidence alone is not an error");
        assert!(result.quarantine);
        assert!(result
            .quarantine_reasons
            .iter()
            .any(|r| r.contains("quarantine threshold")));
    }

    #[test]
    fn quarantine_invariant_holds_over_grid() {
        for confidence in [0.1, 0.29, 0.3, 0.31, 0.9] {
            for name in ["", "Progetto"] {
                let result = validate_item(&item(name, confidence));
                let expected =
                    !result.errors.is_empty() || confidence < thresholds::QUARANTINE;
                assert_eq!(result.quarantine, expected);
                assert_eq!(result.valid, result.errors.is_empty());
            }
        }
    }

    // ── Score ───────────────────────────────────────────

    #[test]
    fn score_penalizes_issues_and_clamps() {
        let mut it = item("Progetto", 0.5);
        it.budget = Some(0.0); // error
        let result = validate_item(&it);
        assert!((result.score - 0.4).abs() < 1e-6);

        let bad = validate_item(&item("", 0.05));
        assert!(bad.score >= 0.0);
    }
}
