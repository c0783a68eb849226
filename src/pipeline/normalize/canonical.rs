//! Field canonicalizers: status/priority alias tables and the derivation
//! rules for risk level and complexity.

use crate::config::complexity_budget;
use crate::models::{Complexity, ItemStatus, Priority, RiskLevel};

struct StatusAliases {
    status: ItemStatus,
    aliases: &'static [&'static str],
}

const STATUS_TABLE: &[StatusAliases] = &[
    StatusAliases {
        status: ItemStatus::Active,
        aliases: &["active", "attivo", "attiva", "in corso", "ongoing", "in progress", "running", "live"],
    },
    StatusAliases {
        status: ItemStatus::Paused,
        aliases: &["paused", "sospeso", "sospesa", "in pausa", "on hold", "bloccato", "frozen"],
    },
    StatusAliases {
        status: ItemStatus::Completed,
        aliases: &["completed", "completato", "concluso", "done", "chiuso", "finished", "delivered", "consegnato"],
    },
    StatusAliases {
        status: ItemStatus::Cancelled,
        aliases: &["cancelled", "canceled", "annullato", "cancellato", "abbandonato", "dropped"],
    },
    StatusAliases {
        status: ItemStatus::Proposed,
        aliases: &["proposed", "proposto", "proposta", "pianificato", "planned", "idea", "backlog", "da approvare", "draft"],
    },
];

struct PriorityAliases {
    priority: Priority,
    aliases: &'static [&'static str],
}

const PRIORITY_TABLE: &[PriorityAliases] = &[
    PriorityAliases {
        priority: Priority::Critical,
        aliases: &["critical", "critica", "critico", "urgente", "urgent", "p0", "blocker"],
    },
    PriorityAliases {
        priority: Priority::High,
        aliases: &["high", "alta", "alto", "p1", "importante", "elevata"],
    },
    PriorityAliases {
        priority: Priority::Medium,
        aliases: &["medium", "media", "medio", "p2", "normale", "normal"],
    },
    PriorityAliases {
        priority: Priority::Low,
        aliases: &["low", "bassa", "basso", "p3", "minore", "minor"],
    },
];

/// Canonicalize a raw status. Exact match first, then partial match in
/// either direction; unmapped values default to `Proposed`.
pub fn canonical_status(raw: Option<&str>) -> (ItemStatus, bool) {
    let Some(raw) = raw else {
        return (ItemStatus::Proposed, false);
    };
    let needle = raw.trim().to_lowercase();
    if needle.is_empty() {
        return (ItemStatus::Proposed, false);
    }

    for entry in STATUS_TABLE {
        if entry.aliases.iter().any(|a| *a == needle) {
            return (entry.status, true);
        }
    }
    for entry in STATUS_TABLE {
        if entry
            .aliases
            .iter()
            .any(|a| needle.contains(a) || (needle.len() >= 4 && a.contains(needle.as_str())))
        {
            return (entry.status, true);
        }
    }
    (ItemStatus::Proposed, false)
}

/// Canonicalize a raw priority. Unmapped values stay `None`.
pub fn canonical_priority(raw: Option<&str>) -> Option<Priority> {
    let needle = raw?.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    for entry in PRIORITY_TABLE {
        if entry.aliases.iter().any(|a| *a == needle) {
            return Some(entry.priority);
        }
    }
    for entry in PRIORITY_TABLE {
        if entry
            .aliases
            .iter()
            .any(|a| needle.contains(a) || (needle.len() >= 4 && a.contains(needle.as_str())))
        {
            return Some(entry.priority);
        }
    }
    None
}

/// Risk level from the number of listed risks.
pub fn derive_risk_level(risk_count: usize) -> RiskLevel {
    match risk_count {
        0 => RiskLevel::Low,
        1..=2 => RiskLevel::Medium,
        _ => RiskLevel::High,
    }
}

/// Complexity from the parsed budget, when one exists.
pub fn derive_complexity(budget: Option<f64>) -> Option<Complexity> {
    let budget = budget?;
    Some(if budget > complexity_budget::HIGH {
        Complexity::High
    } else if budget > complexity_budget::MEDIUM {
        Complexity::Medium
    } else {
        Complexity::Low
    })
}
