//! Session controller: the state machine driving a streaming session.
//!
//! Per chunk: progress → fast raw preview (no resolver) → full
//! normalization running concurrently → buffered batch flush. Queued
//! human feedback is folded into the pattern learner at the chunk
//! boundary, so learned patterns affect the upcoming chunk and everything
//! after it - never items already emitted.
//!
//! Event sends rendezvous with the consumer through a bounded channel;
//! when the consumer disappears the controller returns without starting
//! new work. Per-source and per-chunk failures emit recoverable errors
//! and processing continues; only internal task failures are terminal.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};

use crate::capabilities::Capabilities;
use crate::config::{IngestOptions, ResolverConfig};
use crate::models::{
    NormalizedItem, PreviewItem, RawItem, ReviewFeedback, SessionPhase, StreamingEvent,
};
use crate::pipeline::cache::KnowledgeCache;
use crate::pipeline::classify::classify;
use crate::pipeline::extraction::{self, IngestSource};
use crate::pipeline::normalize::{category_hint, Normalizer};
use crate::pipeline::patterns::{PatternDecision, PatternSet};

pub(super) async fn run(
    caps: Capabilities,
    cache: Arc<KnowledgeCache>,
    sources: Vec<IngestSource>,
    options: IngestOptions,
    events: mpsc::Sender<StreamingEvent>,
    mut feedback: mpsc::Receiver<ReviewFeedback>,
    cancel: watch::Receiver<bool>,
) {
    let started = Instant::now();
    let normalizer = Arc::new(Normalizer::new(
        caps.clone(),
        ResolverConfig::default(),
        cache,
        options.tenant_scope.clone(),
    ));
    let batch_size = options.batch_size.max(1);
    let mut patterns = PatternSet::new();

    let mut total_items = 0usize;
    let mut items_previewed = 0usize;
    let mut buffer: Vec<NormalizedItem> = Vec::new();
    let mut batch_index = 0usize;
    let total_sources = sources.len().max(1);

    tracing::info!(sources = sources.len(), "Streaming session started");

    'sources: for (source_index, source) in sources.iter().enumerate() {
        if *cancel.borrow() {
            break;
        }

        let source_percent = (source_index * 100 / total_sources) as u8;
        if !send(
            &events,
            StreamingEvent::Progress {
                phase: SessionPhase::Collecting,
                message: format!("Reading source '{}'", source.name),
                percent: source_percent,
                current_source: Some(source.name.clone()),
            },
        )
        .await
        {
            return;
        }

        let plan = extraction::plan_source(&caps, source, &options).await;
        if !plan.success {
            if !send(
                &events,
                StreamingEvent::Error {
                    message: format!(
                        "Source '{}' skipped: {}",
                        source.name,
                        plan.notes.join("; ")
                    ),
                    recoverable: true,
                },
            )
            .await
            {
                return;
            }
            continue;
        }

        let total_chunks = plan.chunks.len();
        for (chunk_index, chunk) in plan.chunks.iter().enumerate() {
            if *cancel.borrow() {
                break 'sources;
            }

            // The progress send rendezvouses with the consumer; by the
            // time it completes, feedback on the previous preview is
            // already queued and gets folded in before this chunk runs.
            if !send(
                &events,
                StreamingEvent::Progress {
                    phase: SessionPhase::Extracting,
                    message: format!(
                        "Extracting {} ({}/{})",
                        chunk.label(),
                        chunk_index + 1,
                        total_chunks
                    ),
                    percent: chunk_percent(source_index, total_sources, chunk_index, total_chunks),
                    current_source: Some(source.name.clone()),
                },
            )
            .await
            {
                return;
            }

            let newly_learned = drain_feedback(&mut feedback, &mut patterns);
            if newly_learned > 0 {
                if !send(
                    &events,
                    StreamingEvent::PatternLearned {
                        message: format!("Learned {newly_learned} pattern(s) from feedback"),
                        confirmed_count: patterns.confirmed_count(),
                        rejected_count: patterns.rejected_count(),
                        affected_future_chunks: true,
                    },
                )
                .await
                {
                    return;
                }
            }

            let outcome = extraction::extract_chunk(&caps, source, chunk, options.language).await;
            if !outcome.success {
                if !send(
                    &events,
                    StreamingEvent::Error {
                        message: format!(
                            "Chunk {} of '{}' failed: {}",
                            chunk_index,
                            source.name,
                            outcome.notes.join("; ")
                        ),
                        recoverable: true,
                    },
                )
                .await
                {
                    return;
                }
                continue;
            }
            let raw_items = outcome.items;

            // Full normalization runs concurrently with the preview
            // emission below; the two meet again at the batch flush.
            let normalize_task = if options.skip_normalization || raw_items.is_empty() {
                None
            } else {
                let normalizer = Arc::clone(&normalizer);
                let snapshot = patterns.clone();
                let chunk_items = raw_items.clone();
                Some(tokio::spawn(async move {
                    normalizer.normalize_batch(chunk_items, &snapshot).await
                }))
            };

            items_previewed += raw_items.len();
            let (previews, categories_detected) = build_previews(&raw_items, &patterns);
            if !send(
                &events,
                StreamingEvent::Preview {
                    items: previews,
                    chunk_index,
                    total_chunks,
                    items_so_far: items_previewed,
                    items_in_chunk: raw_items.len(),
                    categories_detected,
                    is_raw: true,
                    notes: outcome.notes,
                },
            )
            .await
            {
                return;
            }

            if options.skip_normalization {
                total_items += raw_items.len();
            }

            if let Some(task) = normalize_task {
                match task.await {
                    Ok(normalized) => {
                        total_items += normalized.len();
                        buffer.extend(normalized);
                        if buffer.len() >= batch_size {
                            let items = std::mem::take(&mut buffer);
                            if !send(&events, StreamingEvent::Batch { items, batch_index }).await {
                                return;
                            }
                            batch_index += 1;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Normalization task panicked");
                        let _ = events
                            .send(StreamingEvent::Error {
                                message: format!("Internal normalization failure: {e}"),
                                recoverable: false,
                            })
                            .await;
                        return;
                    }
                }
            }
        }
    }

    if !buffer.is_empty() {
        let items = std::mem::take(&mut buffer);
        if !send(&events, StreamingEvent::Batch { items, batch_index }).await {
            return;
        }
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    tracing::info!(total_items, elapsed_ms, "Streaming session complete");
    let _ = events
        .send(StreamingEvent::Complete {
            total_items,
            elapsed_ms,
        })
        .await;
}

/// Send one event; false means the consumer is gone and the session
/// should stop without starting new work.
async fn send(events: &mpsc::Sender<StreamingEvent>, event: StreamingEvent) -> bool {
    events.send(event).await.is_ok()
}

fn chunk_percent(
    source_index: usize,
    total_sources: usize,
    chunk_index: usize,
    total_chunks: usize,
) -> u8 {
    let per_source = 100.0 / total_sources as f32;
    let within = chunk_index as f32 / total_chunks.max(1) as f32;
    ((source_index as f32 + within) * per_source).min(100.0) as u8
}

fn drain_feedback(
    feedback: &mut mpsc::Receiver<ReviewFeedback>,
    patterns: &mut PatternSet,
) -> usize {
    let mut learned = 0usize;
    while let Ok(fb) = feedback.try_recv() {
        if patterns.learn(&fb) {
            learned += 1;
        }
    }
    learned
}

/// Cheap raw preview: classifier only, no resolver calls.
fn build_previews(
    raw_items: &[RawItem],
    patterns: &PatternSet,
) -> (Vec<PreviewItem>, Vec<String>) {
    let mut previews = Vec::with_capacity(raw_items.len());
    let mut categories: Vec<String> = Vec::new();

    for raw in raw_items {
        let verdict = classify(raw, None);
        let hint = category_hint(raw);
        if let Some(hint) = &hint {
            if !categories.contains(hint) {
                categories.push(hint.clone());
            }
        }

        let mut auto = false;
        let mut suppressed = false;
        for (field, value) in preview_pattern_fields(raw, hint.as_deref()) {
            match patterns.assess(&field, &value) {
                PatternDecision::AutoConfirm => auto = true,
                PatternDecision::Suppressed => suppressed = true,
                PatternDecision::NoMatch => {}
            }
        }

        previews.push(PreviewItem {
            raw: raw.clone(),
            guessed_type: verdict.item_type,
            type_confidence: verdict.confidence,
            category_hint: hint,
            auto_confirmed: auto && !suppressed,
        });
    }
    (previews, categories)
}

fn preview_pattern_fields(raw: &RawItem, hint: Option<&str>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    if let Some(hint) = hint {
        out.push(("category".to_string(), hint.to_string()));
    }
    if let Some(status) = &raw.raw_status {
        out.push(("status".to_string(), status.clone()));
    }
    out
}
