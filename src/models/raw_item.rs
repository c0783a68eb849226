use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::enums::SourceKind;

/// One tentative catalog entity before normalization.
///
/// Produced by a format extractor, consumed exactly once by the normalizer.
/// Never mutated after extraction - normalization builds a new object.
/// Deserialization is lenient: any missing field takes its default, so
/// partial capability output still yields an item.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RawItem {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Free-text type hint as it appeared in the source ("servizio", "SaaS", …).
    pub raw_type: Option<String>,
    pub raw_status: Option<String>,
    pub raw_priority: Option<String>,
    /// Unparsed budget exactly as extracted ("€1.500.000", "250k", 42000).
    pub budget: Option<RawBudget>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub technologies: Vec<String>,
    pub dependencies: Vec<String>,
    pub risks: Vec<String>,
    pub owner: Option<String>,
    /// Columns/keys the extractor could not map to a canonical field.
    /// Kept as a sidecar so nothing is silently dropped.
    pub extra: BTreeMap<String, String>,
    pub provenance: Provenance,
}

/// Budget value as it appeared in the source - string or number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawBudget {
    Text(String),
    Number(f64),
}

impl RawBudget {
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        }
    }
}

/// Where in the source document a raw item was found.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Provenance {
    pub source_kind: SourceKind,
    /// Source document name or path, as given by the caller.
    pub source_name: String,
    pub page: Option<usize>,
    pub row: Option<usize>,
    /// Original text span the item was extracted from, when available.
    pub original_text: Option<String>,
}

impl Default for Provenance {
    fn default() -> Self {
        Self {
            source_kind: SourceKind::TextBlock,
            source_name: String::new(),
            page: None,
            row: None,
            original_text: None,
        }
    }
}

impl RawItem {
    /// Concatenated text used by the type classifier and category queries.
    pub fn classification_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        if let Some(n) = &self.name {
            parts.push(n);
        }
        if let Some(d) = &self.description {
            parts.push(d);
        }
        if let Some(t) = &self.raw_type {
            parts.push(t);
        }
        parts.join(" ")
    }

    /// True when the item carries no usable signal at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.raw_type.is_none()
            && self.budget.is_none()
            && self.extra.is_empty()
    }
}
