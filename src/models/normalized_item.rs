use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Complexity, ItemStatus, ItemType, Priority, RiskLevel};
use super::raw_item::Provenance;

/// Canonical, confidence-scored catalog entity.
///
/// Built by the normalizer from exactly one [`RawItem`](super::RawItem).
/// Enrichment stages may add fields or raise confidence afterwards, but
/// never remove a field that was already set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub item_type: ItemType,
    pub status: ItemStatus,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub tags: Vec<String>,
    pub budget: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub risk_level: Option<RiskLevel>,
    pub complexity: Option<Complexity>,
    pub technologies: Vec<String>,
    pub dependencies: Vec<String>,
    pub risks: Vec<String>,
    pub owner: Option<String>,
    /// Always equals `confidence_breakdown.overall`.
    pub confidence: f32,
    pub confidence_breakdown: ConfidenceBreakdown,
    pub normalization_notes: Vec<String>,
    /// Echo of the raw item's provenance.
    pub extraction_metadata: Provenance,
}

/// Full accounting of how an item's confidence was computed.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfidenceBreakdown {
    pub overall: f32,
    pub type_confidence: f32,
    /// Per-field confidence, keyed by canonical field name.
    pub fields: BTreeMap<String, f32>,
    pub quality_indicators: QualityIndicators,
}

/// Coarse quality signals feeding the overall score.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QualityIndicators {
    /// How unambiguous the source location was (tabular row highest).
    pub source_clarity: f32,
    /// Strength of the similarity-search context behind category fields.
    pub rag_match: f32,
    /// How well the item fits the inferred company schema, when known.
    pub schema_fit: Option<f32>,
}

impl NormalizedItem {
    /// Average of the per-field confidences, 0.0 when none were assigned.
    pub fn mean_field_confidence(&self) -> f32 {
        let fields = &self.confidence_breakdown.fields;
        if fields.is_empty() {
            return 0.0;
        }
        fields.values().sum::<f32>() / fields.len() as f32
    }

    /// Append a normalization note, deduplicating exact repeats.
    pub fn push_note(&mut self, note: impl Into<String>) {
        let note = note.into();
        if !self.normalization_notes.contains(&note) {
            self.normalization_notes.push(note);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::SourceKind;

    fn item() -> NormalizedItem {
        NormalizedItem {
            id: Uuid::new_v4(),
            name: "Fleet Telematics".into(),
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
            confidence: 0.0,
            confidence_breakdown: ConfidenceBreakdown::default(),
            normalization_notes: vec![],
            extraction_metadata: Provenance {
                source_kind: SourceKind::TabularRow,
                source_name: "catalog.xlsx".into(),
                page: None,
                row: Some(3),
                original_text: None,
            },
        }
    }

    #[test]
    fn mean_field_confidence_empty_is_zero() {
        assert_eq!(item().mean_field_confidence(), 0.0);
    }

    #[test]
    fn mean_field_confidence_averages() {
        let mut it = item();
        it.confidence_breakdown.fields.insert("name".into(), 0.9);
        it.confidence_breakdown.fields.insert("budget".into(), 0.5);
        assert!((it.mean_field_confidence() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn push_note_deduplicates() {
        let mut it = item();
        it.push_note("category from system scope");
        it.push_note("category from system scope");
        assert_eq!(it.normalization_notes.len(), 1);
    }
}
