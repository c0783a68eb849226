//! Confidence breakdown computation.
//!
//! Per-field confidences come from presence/quality heuristics; the
//! overall score is a weighted combination of type confidence, mean field
//! confidence, source clarity, and similarity-match strength, capped just
//! below certainty.

use std::collections::BTreeMap;

use crate::config::{confidence_weights, thresholds};
use crate::models::{NormalizedItem, QualityIndicators, SourceKind};
use crate::pipeline::resolver::CategorySuggestion;

/// Assign per-field confidences from what normalization managed to fill.
pub fn field_confidences(item: &NormalizedItem, status_mapped: bool) -> BTreeMap<String, f32> {
    let mut fields = BTreeMap::new();

    fields.insert(
        "name".into(),
        if item.name.len() >= 3 { 0.9 } else { 0.5 },
    );

    if let Some(description) = &item.description {
        fields.insert(
            "description".into(),
            if description.len() >= 50 { 0.8 } else { 0.6 },
        );
    }

    if let Some(budget) = item.budget {
        fields.insert("budget".into(), if budget > 0.0 { 0.9 } else { 0.4 });
    }

    if item.start_date.is_some() || item.end_date.is_some() {
        let both = item.start_date.is_some() && item.end_date.is_some();
        fields.insert("dates".into(), if both { 0.85 } else { 0.7 });
    }

    fields.insert("status".into(), if status_mapped { 0.9 } else { 0.5 });

    if item.priority.is_some() {
        fields.insert("priority".into(), 0.85);
    }

    if item.category.is_some() {
        fields.insert("category".into(), 0.8);
    }

    fields
}

/// Source clarity by provenance kind - a tabular row is the least
/// ambiguous location, free text the most.
pub fn source_clarity(kind: SourceKind) -> f32 {
    match kind {
        SourceKind::TabularRow => 0.9,
        SourceKind::DocumentTable => 0.8,
        SourceKind::DocumentText => 0.6,
        SourceKind::TextBlock => 0.5,
    }
}

/// Similarity-match strength from the resolver's supporting context.
///
/// A lookup skipped because the classifier was already confident is
/// neutral, not a penalty; an attempted lookup that returned nothing is.
pub fn rag_match(suggestion: Option<&CategorySuggestion>, lookup_skipped: bool) -> f32 {
    match suggestion {
        None if lookup_skipped => 0.6,
        None => 0.3,
        Some(s) if s.context_text.len() < 200 => 0.6,
        Some(_) => 0.85,
    }
}

/// Combine the components into the overall score.
pub fn overall(type_confidence: f32, fields: &BTreeMap<String, f32>, quality: &QualityIndicators) -> f32 {
    let mean_fields = if fields.is_empty() {
        0.0
    } else {
        fields.values().sum::<f32>() / fields.len() as f32
    };

    let combined = confidence_weights::TYPE * type_confidence
        + confidence_weights::FIELDS * mean_fields
        + confidence_weights::SOURCE_CLARITY * quality.source_clarity
        + confidence_weights::RAG_MATCH * quality.rag_match;

    combined.min(thresholds::CONFIDENCE_CAP)
}
