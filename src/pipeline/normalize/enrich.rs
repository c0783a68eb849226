//! Optional enrichment stages, run after base normalization.
//!
//! Both stages are additive-only strict merges: they may fill fields that
//! are still empty and raise confidence, never overwrite or lower. A
//! missing strategic-context capability skips schema inference entirely
//! without error.

use crate::capabilities::{Capabilities, CompanyProfile};
use crate::config::{self, thresholds};
use crate::models::NormalizedItem;
use crate::pipeline::cache::{KnowledgeCache, KnowledgeEntry};
use crate::pipeline::resolver::CategorySuggestion;

/// Confidence bump for an item whose category matches the inferred
/// company schema.
const SCHEMA_FIT_BONUS: f32 = 0.03;

pub async fn enrich_batch(
    items: &mut [NormalizedItem],
    suggestions: &[Option<CategorySuggestion>],
    caps: &Capabilities,
    cache: &KnowledgeCache,
    tenant_scope: &str,
) {
    apply_knowledge_cache(items, suggestions, cache);

    if let Some(context) = &caps.context {
        let profile = tokio::time::timeout(
            config::timeouts::CONTEXT_LOOKUP,
            context.latest_profile(tenant_scope),
        )
        .await;
        match profile {
            Ok(Ok(Some(profile))) => apply_schema_inference(items, &profile),
            Ok(Ok(None)) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Strategic context lookup failed - schema inference skipped");
            }
            Err(_) => {
                tracing::warn!("Strategic context lookup timed out - schema inference skipped");
            }
        }
    }
}

/// Fill category gaps from cached product knowledge, and feed fresh
/// resolver results back into the cache (last write wins).
fn apply_knowledge_cache(
    items: &mut [NormalizedItem],
    suggestions: &[Option<CategorySuggestion>],
    cache: &KnowledgeCache,
) {
    for (item, suggestion) in items.iter_mut().zip(suggestions) {
        if item.name.is_empty() {
            continue;
        }
        let vendor = item.owner.clone().unwrap_or_default();

        if let Some(suggestion) = suggestion {
            if suggestion.category.is_some() {
                cache.put(
                    &vendor,
                    &item.name,
                    KnowledgeEntry {
                        metadata: crate::capabilities::SearchHitMetadata {
                            category: suggestion.category.clone(),
                            subcategory: suggestion.subcategory.clone(),
                            tags: suggestion.tags.clone(),
                        },
                        context: suggestion.context_text.clone(),
                    },
                );
            }
            continue;
        }

        if item.category.is_some() {
            continue;
        }
        if let Some(entry) = cache.get(&vendor, &item.name) {
            // Strict merge: only fill what is still empty.
            item.category = entry.metadata.category.clone();
            if item.subcategory.is_none() {
                item.subcategory = entry.metadata.subcategory.clone();
            }
            for tag in entry.metadata.tags {
                if !item.tags.contains(&tag) {
                    item.tags.push(tag);
                }
            }
            item.push_note("Category filled from knowledge cache");
        }
    }
}

/// Schema inference from the company-context profile: score how items fit
/// the known category set, fill the default owner, never remove anything.
fn apply_schema_inference(items: &mut [NormalizedItem], profile: &CompanyProfile) {
    for item in items.iter_mut() {
        if let Some(category) = &item.category {
            let fits = profile
                .known_categories
                .iter()
                .any(|known| known.eq_ignore_ascii_case(category));
            item.confidence_breakdown.quality_indicators.schema_fit =
                Some(if fits { 0.9 } else { 0.5 });
            if fits {
                raise_confidence(item, SCHEMA_FIT_BONUS);
                item.push_note("Category matches company schema");
            }
        }

        if item.owner.is_none() {
            if let Some(owner) = &profile.default_owner {
                item.owner = Some(owner.clone());
                item.push_note("Owner defaulted from company profile");
            }
        }
    }
}

/// Raise confidence keeping the breakdown invariant intact. Never lowers.
fn raise_confidence(item: &mut NormalizedItem, bonus: f32) {
    let raised = (item.confidence + bonus).min(thresholds::CONFIDENCE_CAP);
    if raised > item.confidence {
        item.confidence = raised;
        item.confidence_breakdown.overall = raised;
    }
}
