//! Non-streaming batch orchestrator.
//!
//! Runs the format extractors over a set of sources with bounded
//! parallelism, then one normalization pass, then the quality gate, and
//! returns a single aggregate result. No live events - callers that need
//! incremental feedback use the streaming session instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::capabilities::Capabilities;
use crate::config::{IngestOptions, ResolverConfig};
use crate::models::{BatchValidationSummary, NormalizedItem, RawItem, ValidationResult};
use crate::pipeline::cache::KnowledgeCache;
use crate::pipeline::extraction::{extract_source, IngestSource};
use crate::pipeline::normalize::Normalizer;
use crate::pipeline::patterns::PatternSet;
use crate::pipeline::validate;

/// Everything one batch run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Normalized items (empty when `skip_normalization` was set).
    pub items: Vec<NormalizedItem>,
    /// Raw items as extracted, in source order.
    pub raw_items: Vec<RawItem>,
    /// Per-item quality-gate results, parallel to `items`.
    pub validations: Vec<ValidationResult>,
    pub summary: BatchValidationSummary,
    pub sources: Vec<SourceOutcome>,
    /// Source-level problems, folded into warnings rather than errors.
    pub warnings: Vec<String>,
    pub elapsed_ms: u64,
}

/// Per-source accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceOutcome {
    pub source_name: String,
    pub success: bool,
    pub items_extracted: usize,
    pub confidence: f32,
    pub elapsed_ms: u64,
    pub notes: Vec<String>,
}

/// Run the full batch pipeline over `sources`.
///
/// Sources are extracted with at most `options.max_parallel_files` in
/// flight; results are reassembled in source order before normalization.
/// One corrupt source never fails the batch.
pub async fn ingest_batch(
    caps: &Capabilities,
    cache: Arc<KnowledgeCache>,
    sources: Vec<IngestSource>,
    options: IngestOptions,
) -> AggregateResult {
    let start = Instant::now();

    // Bounded fan-out; slot vector keeps source order stable regardless
    // of completion order.
    let indexed = sources.iter().enumerate().map(|(i, source)| {
        let options = &options;
        async move { (i, extract_source(caps, source, options).await) }
    });
    let completed: Vec<_> = stream::iter(indexed)
        .buffer_unordered(options.max_parallel_files.max(1))
        .collect()
        .await;
    let mut slots = vec![None; sources.len()];
    for (i, outcome) in completed {
        slots[i] = Some(outcome);
    }

    let mut raw_items: Vec<RawItem> = Vec::new();
    let mut source_outcomes: Vec<SourceOutcome> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    for (source, outcome) in sources.iter().zip(slots.into_iter()) {
        let outcome = outcome.unwrap_or_else(|| {
            // Unreachable in practice; keep the batch alive regardless.
            crate::pipeline::extraction::ExtractionOutcome {
                success: false,
                items: vec![],
                confidence: 0.0,
                elapsed_ms: 0,
                notes: vec!["Extraction task vanished".into()],
            }
        });
        if !outcome.success {
            warnings.push(format!(
                "Source '{}' failed: {}",
                source.name,
                outcome.notes.join("; ")
            ));
        }
        source_outcomes.push(SourceOutcome {
            source_name: source.name.clone(),
            success: outcome.success,
            items_extracted: outcome.items.len(),
            confidence: outcome.confidence,
            elapsed_ms: outcome.elapsed_ms,
            notes: outcome.notes,
        });
        raw_items.extend(outcome.items);
    }

    tracing::info!(
        sources = sources.len(),
        raw_items = raw_items.len(),
        warnings = warnings.len(),
        "Batch extraction finished"
    );

    if options.skip_normalization {
        return AggregateResult {
            items: vec![],
            raw_items,
            validations: vec![],
            summary: BatchValidationSummary::default(),
            sources: source_outcomes,
            warnings,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
    }

    let normalizer = Normalizer::new(
        caps.clone(),
        ResolverConfig::default(),
        cache,
        options.tenant_scope.clone(),
    );
    let mut items = normalizer
        .normalize_batch(raw_items.clone(), &PatternSet::new())
        .await;

    mark_duplicates(&mut items);

    let validations = validate::validate_batch(&items);
    let summary = validate::summary::summarize(&validations);

    AggregateResult {
        items,
        raw_items,
        validations,
        summary,
        sources: source_outcomes,
        warnings,
        elapsed_ms: start.elapsed().as_millis() as u64,
    }
}

/// Advisory duplicate detection within one run: same normalized name and
/// type. Later occurrences are annotated, never dropped.
fn mark_duplicates(items: &mut [NormalizedItem]) {
    let mut seen: HashMap<(String, &'static str), uuid::Uuid> = HashMap::new();
    for item in items.iter_mut() {
        if item.name.is_empty() {
            continue;
        }
        let key = (item.name.trim().to_lowercase(), item.item_type.as_str());
        match seen.get(&key).copied() {
            Some(first) => {
                item.push_note(format!("duplicate_of:{first}"));
            }
            None => {
                seen.insert(key, item.id);
            }
        }
    }
}
