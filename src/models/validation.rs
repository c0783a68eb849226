use serde::{Deserialize, Serialize};

/// Per-item outcome of the quality gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True exactly when `errors` is empty.
    pub valid: bool,
    /// Confidence minus issue penalties, clamped to [0, 1].
    pub score: f32,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    /// True when there is any error or confidence fell below the
    /// quarantine threshold - the item is retained but needs review.
    pub quarantine: bool,
    pub quarantine_reasons: Vec<String>,
}

/// A single rule violation on one field (or field pair).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub field: String,
    pub code: IssueCode,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    RequiredFieldMissing,
    InvalidEnumValue,
    OutOfRange,
    InconsistentData,
    SuspiciousValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Issue {
    pub fn error(field: &str, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            severity: Severity::Error,
            message: message.into(),
            actual_value: None,
            expected_value: None,
        }
    }

    pub fn warning(field: &str, code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            severity: Severity::Warning,
            message: message.into(),
            actual_value: None,
            expected_value: None,
        }
    }

    pub fn with_values(
        mut self,
        actual: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        self.actual_value = Some(actual.into());
        self.expected_value = Some(expected.into());
        self
    }
}

/// Aggregate of a validation pass over one batch, for operator reporting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BatchValidationSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub quarantined: usize,
    /// Most frequent issue messages, descending by count.
    pub top_issues: Vec<IssueFrequency>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueFrequency {
    pub message: String,
    pub count: usize,
}
