//! Mid-session pattern learning from human corrections.
//!
//! When a caller confirms or rejects a previewed field value, the learner
//! records a rule scoped to the current streaming session. Rules apply
//! only to items not yet emitted; nothing is persisted. Rejection always
//! wins over confirmation for the same item.

use serde::{Deserialize, Serialize};

use crate::models::ReviewFeedback;

/// Auto-confirm rule: items whose `field` matches `match_value` skip
/// re-asking (and, for categories, skip the resolver call).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedPattern {
    pub field: String,
    pub match_value: String,
}

/// Auto-reject rule: suppresses confirmation for matching items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedPattern {
    pub field: String,
    pub value: String,
}

/// What the learned patterns say about one field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternDecision {
    /// A confirmed pattern matched and no rejection suppressed it.
    AutoConfirm,
    /// A rejected pattern matched - takes precedence over confirmation.
    Suppressed,
    NoMatch,
}

/// Session-scoped pattern store.
#[derive(Debug, Default, Clone)]
pub struct PatternSet {
    confirmed: Vec<ConfirmedPattern>,
    rejected: Vec<RejectedPattern>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one piece of feedback. Returns false when it was a duplicate.
    pub fn learn(&mut self, feedback: &ReviewFeedback) -> bool {
        match feedback {
            ReviewFeedback::Confirm { field, value } => {
                let pattern = ConfirmedPattern {
                    field: normalize(field),
                    match_value: normalize(value),
                };
                if self.confirmed.contains(&pattern) {
                    return false;
                }
                tracing::debug!(field = %pattern.field, "Confirmed pattern learned");
                self.confirmed.push(pattern);
                true
            }
            ReviewFeedback::Reject { field, value } => {
                let pattern = RejectedPattern {
                    field: normalize(field),
                    value: normalize(value),
                };
                if self.rejected.contains(&pattern) {
                    return false;
                }
                tracing::debug!(field = %pattern.field, "Rejected pattern learned");
                self.rejected.push(pattern);
                true
            }
        }
    }

    /// Assess one field value. Rejection is checked first - it always
    /// takes precedence over a matching confirmation.
    pub fn assess(&self, field: &str, value: &str) -> PatternDecision {
        let field = normalize(field);
        let value = normalize(value);

        if self
            .rejected
            .iter()
            .any(|p| p.field == field && p.value == value)
        {
            return PatternDecision::Suppressed;
        }
        if self
            .confirmed
            .iter()
            .any(|p| p.field == field && p.match_value == value)
        {
            return PatternDecision::AutoConfirm;
        }
        PatternDecision::NoMatch
    }

    pub fn confirmed_count(&self) -> usize {
        self.confirmed.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty() && self.rejected.is_empty()
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}
