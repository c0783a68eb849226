//! Normalizer: raw items in, canonical confidence-scored items out.
//!
//! Orchestrates the type classifier (always), the category resolver
//! (only when the classifier is unsure), the field canonicalizers, and
//! the confidence breakdown. Capability failures degrade to conservative
//! defaults recorded in `normalization_notes` - normalization itself
//! never fails an item.

pub mod canonical;
pub mod confidence;
pub mod enrich;

use std::sync::Arc;

use uuid::Uuid;

use crate::capabilities::Capabilities;
use crate::config::{thresholds, ResolverConfig};
use crate::models::{
    ConfidenceBreakdown, NormalizedItem, QualityIndicators, RawItem,
};
use crate::pipeline::cache::KnowledgeCache;
use crate::pipeline::classify::{classify, TypeVerdict};
use crate::pipeline::dates::parse_date;
use crate::pipeline::money::parse_budget;
use crate::pipeline::patterns::{PatternDecision, PatternSet};
use crate::pipeline::resolver::{CategoryQuery, CategoryResolver, CategorySuggestion};

use canonical::{canonical_priority, canonical_status, derive_complexity, derive_risk_level};

pub struct Normalizer {
    caps: Capabilities,
    resolver: CategoryResolver,
    cache: Arc<KnowledgeCache>,
    tenant_scope: String,
}

impl Normalizer {
    pub fn new(
        caps: Capabilities,
        resolver_config: ResolverConfig,
        cache: Arc<KnowledgeCache>,
        tenant_scope: impl Into<String>,
    ) -> Self {
        let resolver = CategoryResolver::new(Arc::clone(&caps.search), resolver_config);
        Self {
            caps,
            resolver,
            cache,
            tenant_scope: tenant_scope.into(),
        }
    }

    /// Normalize one extraction batch. Output order matches input order.
    pub async fn normalize_batch(
        &self,
        raw_items: Vec<RawItem>,
        patterns: &PatternSet,
    ) -> Vec<NormalizedItem> {
        if raw_items.is_empty() {
            return vec![];
        }

        // Cheap pass: classify everything without context.
        let verdicts: Vec<TypeVerdict> =
            raw_items.iter().map(|raw| classify(raw, None)).collect();

        // Plan resolver lookups. Skipped when the classifier is already
        // confident, or when a confirmed pattern covers the item's own
        // category hint.
        let mut query_indices: Vec<usize> = Vec::new();
        let mut queries: Vec<CategoryQuery> = Vec::new();
        for (i, raw) in raw_items.iter().enumerate() {
            if let Some(hint) = category_hint(raw) {
                if patterns.assess("category", &hint) == PatternDecision::AutoConfirm {
                    continue;
                }
            }
            if verdicts[i].confidence >= thresholds::NO_LOOKUP_NEEDED {
                continue;
            }
            let Some(name) = raw.name.clone() else {
                continue; // Nothing to query with.
            };
            query_indices.push(i);
            queries.push(CategoryQuery {
                name,
                description: raw.description.clone(),
            });
        }

        let resolved = self
            .resolver
            .resolve_ordered(&self.tenant_scope, &queries)
            .await;
        let mut suggestions: Vec<Option<CategorySuggestion>> = vec![None; raw_items.len()];
        for (slot, suggestion) in query_indices.into_iter().zip(resolved) {
            suggestions[slot] = suggestion;
        }

        let mut items: Vec<NormalizedItem> = raw_items
            .into_iter()
            .zip(suggestions.iter())
            .map(|(raw, suggestion)| normalize_one(raw, suggestion.as_ref(), patterns))
            .collect();

        enrich::enrich_batch(
            &mut items,
            &suggestions,
            &self.caps,
            &self.cache,
            &self.tenant_scope,
        )
        .await;

        items
    }
}

/// Category hint carried by the source itself (unmapped "category" column).
pub(crate) fn category_hint(raw: &RawItem) -> Option<String> {
    raw.extra.iter().find_map(|(key, value)| {
        let key = key.to_lowercase();
        if key == "category" || key == "categoria" {
            Some(value.clone())
        } else {
            None
        }
    })
}

fn normalize_one(
    raw: RawItem,
    suggestion: Option<&CategorySuggestion>,
    patterns: &PatternSet,
) -> NormalizedItem {
    let mut notes: Vec<String> = Vec::new();

    // Re-classify with resolver context when we have it - the context
    // boost can flip weakly-signaled items.
    let verdict = match suggestion {
        Some(s) => classify(&raw, Some(&s.context_text)),
        None => classify(&raw, None),
    };

    let name = match &raw.name {
        Some(n) => n.trim().to_string(),
        None => {
            notes.push("Name missing from source".into());
            String::new()
        }
    };

    let budget = match &raw.budget {
        Some(b) => {
            let parsed = parse_budget(b);
            if parsed.is_none() {
                notes.push(format!("Unparseable budget '{}'", b.as_text()));
            }
            parsed
        }
        None => None,
    };

    let start_date = raw.start_date.as_deref().and_then(|d| {
        let parsed = parse_date(d);
        if parsed.is_none() {
            notes.push(format!("Unparseable start date '{d}'"));
        }
        parsed
    });
    let end_date = raw.end_date.as_deref().and_then(|d| {
        let parsed = parse_date(d);
        if parsed.is_none() {
            notes.push(format!("Unparseable end date '{d}'"));
        }
        parsed
    });

    let (status, status_mapped) = canonical_status(raw.raw_status.as_deref());
    if !status_mapped && raw.raw_status.is_some() {
        notes.push(format!(
            "Status '{}' not recognized - defaulted to proposed",
            raw.raw_status.as_deref().unwrap_or_default()
        ));
    }
    let priority = canonical_priority(raw.raw_priority.as_deref());
    if priority.is_none() {
        if let Some(p) = &raw.raw_priority {
            notes.push(format!("Priority '{p}' not recognized"));
        }
    }

    // Category: explicit source hint wins, resolver fills the gaps.
    let hint = category_hint(&raw);
    let (category, subcategory, tags) = match (&hint, suggestion) {
        (Some(hint), _) => (Some(hint.clone()), None, vec![]),
        (None, Some(s)) => {
            if s.from_system_scope {
                notes.push("Category resolved from system catalog scope".into());
            }
            (s.category.clone(), s.subcategory.clone(), s.tags.clone())
        }
        (None, None) => (None, None, vec![]),
    };

    let risk_level = Some(derive_risk_level(raw.risks.len()));
    let complexity = derive_complexity(budget);

    let mut item = NormalizedItem {
        id: Uuid::new_v4(),
        name,
        description: raw.description.clone(),
        item_type: verdict.item_type,
        status,
        priority,
        category,
        subcategory,
        tags,
        budget,
        start_date,
        end_date,
        risk_level,
        complexity,
        technologies: raw.technologies.clone(),
        dependencies: raw.dependencies.clone(),
        risks: raw.risks.clone(),
        owner: raw.owner.clone(),
        confidence: 0.0,
        confidence_breakdown: ConfidenceBreakdown::default(),
        normalization_notes: notes,
        extraction_metadata: raw.provenance.clone(),
    };

    // Learned-pattern bookkeeping on the final values. Rejection always
    // wins over confirmation.
    for (field, value) in pattern_fields(&item) {
        match patterns.assess(&field, &value) {
            PatternDecision::AutoConfirm => {
                item.push_note(format!("auto_confirmed:{field}"));
            }
            PatternDecision::Suppressed => {
                item.push_note(format!("confirmation_suppressed:{field}"));
            }
            PatternDecision::NoMatch => {}
        }
    }

    let lookup_skipped =
        suggestion.is_none() && verdict.confidence >= thresholds::NO_LOOKUP_NEEDED;
    let fields = confidence::field_confidences(&item, status_mapped);
    let quality = QualityIndicators {
        source_clarity: confidence::source_clarity(item.extraction_metadata.source_kind),
        rag_match: confidence::rag_match(suggestion, lookup_skipped || hint.is_some()),
        schema_fit: None,
    };
    let overall = confidence::overall(verdict.confidence, &fields, &quality);

    item.confidence_breakdown = ConfidenceBreakdown {
        overall,
        type_confidence: verdict.confidence,
        fields,
        quality_indicators: quality,
    };
    item.confidence = overall;
    item
}

fn pattern_fields(item: &NormalizedItem) -> Vec<(String, String)> {
    let mut out = vec![
        ("type".to_string(), item.item_type.as_str().to_string()),
        ("status".to_string(), item.status.as_str().to_string()),
    ];
    if let Some(category) = &item.category {
        out.push(("category".to_string(), category.clone()));
    }
    if let Some(priority) = item.priority {
        out.push(("priority".to_string(), priority.as_str().to_string()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::models::{ItemStatus, ItemType, Provenance, RawBudget, ReviewFeedback, SourceKind};
    use crate::test_support::{fake_caps, hit, FakeCapsBuilder};

    fn normalizer_from(builder: &FakeCapsBuilder) -> Normalizer {
        Normalizer::new(
            builder.build(),
            ResolverConfig::default(),
            Arc::new(KnowledgeCache::new(CacheConfig::default())),
            "tenant-a",
        )
    }

    fn raw(name: &str) -> RawItem {
        RawItem {
            name: Some(name.into()),
            provenance: Provenance {
                source_kind: SourceKind::TabularRow,
                source_name: "catalog.xlsx".into(),
                page: None,
                row: Some(1),
                original_text: None,
            },
            ..RawItem::default()
        }
    }

    // ── Canonicalization ────────────────────────────────

    #[tokio::test]
    async fn full_item_normalizes_with_breakdown() {
        let builder = fake_caps();
        let normalizer = normalizer_from(&builder);

        let mut item = raw("Managed Security Service");
        item.description = Some("24/7 SOC monitoring with SLA".into());
        item.raw_type = Some("servizio".into());
        item.raw_status = Some("attivo".into());
        item.raw_priority = Some("alta".into());
        item.budget = Some(RawBudget::Text("€1.500.000".into()));
        item.start_date = Some("2025-01-01".into());
        item.end_date = Some("2025-12-31".into());
        item.risks = vec!["churn".into()];

        let out = normalizer
            .normalize_batch(vec![item], &PatternSet::new())
            .await;
        let item = &out[0];

        assert_eq!(item.item_type, ItemType::Service);
        assert_eq!(item.status, ItemStatus::Active);
        assert_eq!(item.priority, Some(crate::models::Priority::High));
        assert_eq!(item.budget, Some(1_500_000.0));
        assert_eq!(item.risk_level, Some(crate::models::RiskLevel::Medium));
        assert_eq!(item.complexity, Some(crate::models::Complexity::High));
        assert!(item.confidence >= 0.8);
        assert_eq!(item.confidence, item.confidence_breakdown.overall);
    }

    #[tokio::test]
    async fn confident_items_skip_resolver() {
        let builder = fake_caps();
        let normalizer = normalizer_from(&builder);

        let mut item = raw("Managed Security Service");
        item.description = Some("24/7 SOC monitoring with SLA".into());
        item.raw_type = Some("servizio".into());

        normalizer
            .normalize_batch(vec![item], &PatternSet::new())
            .await;
        assert_eq!(builder.search_call_count(), 0);
    }

    #[tokio::test]
    async fn unsure_items_get_resolver_category() {
        let builder = fake_caps().with_search_hits(
            "tenant-a",
            vec![hit("fleet catalog entry context text", "Automotive", 0.8)],
        );
        let normalizer = normalizer_from(&builder);

        let out = normalizer
            .normalize_batch(vec![raw("Archimede")], &PatternSet::new())
            .await;
        assert_eq!(out[0].category.as_deref(), Some("Automotive"));
        assert!(builder.search_call_count() >= 1);
    }

    #[tokio::test]
    async fn search_failure_degrades_to_no_category() {
        let builder = fake_caps().with_failing_search();
        let normalizer = normalizer_from(&builder);

        let out = normalizer
            .normalize_batch(vec![raw("Archimede")], &PatternSet::new())
            .await;
        assert!(out[0].category.is_none());
        // Degraded, not failed: the item still came through scored.
        assert!(out[0].confidence > 0.0);
    }

    #[tokio::test]
    async fn missing_name_noted_not_fatal() {
        let builder = fake_caps();
        let normalizer = normalizer_from(&builder);

        let item = RawItem {
            description: Some("mystery row".into()),
            ..RawItem::default()
        };
        let out = normalizer
            .normalize_batch(vec![item], &PatternSet::new())
            .await;
        assert!(out[0].name.is_empty());
        assert!(out[0]
            .normalization_notes
            .iter()
            .any(|n| n.contains("Name missing")));
    }

    #[tokio::test]
    async fn invalid_dates_noted_and_dropped() {
        let builder = fake_caps();
        let normalizer = normalizer_from(&builder);

        let mut item = raw("Progetto X");
        item.start_date = Some("1850-01-01".into());
        let out = normalizer
            .normalize_batch(vec![item], &PatternSet::new())
            .await;
        assert!(out[0].start_date.is_none());
        assert!(out[0]
            .normalization_notes
            .iter()
            .any(|n| n.contains("Unparseable start date")));
    }

    // ── Pattern interplay ───────────────────────────────

    #[tokio::test]
    async fn confirmed_category_hint_skips_resolver() {
        let builder = fake_caps().with_search_hits(
            "tenant-a",
            vec![hit("would be used otherwise", "Industrial", 0.9)],
        );
        let normalizer = normalizer_from(&builder);

        let mut patterns = PatternSet::new();
        patterns.learn(&ReviewFeedback::Confirm {
            field: "category".into(),
            value: "Automotive".into(),
        });

        let mut item = raw("Telemetria flotte");
        item.extra.insert("Categoria".into(), "Automotive".into());

        let out = normalizer.normalize_batch(vec![item], &patterns).await;
        assert_eq!(out[0].category.as_deref(), Some("Automotive"));
        assert!(out[0]
            .normalization_notes
            .iter()
            .any(|n| n == "auto_confirmed:category"));
        assert_eq!(builder.search_call_count(), 0);
    }

    #[tokio::test]
    async fn rejection_suppresses_confirmation() {
        let builder = fake_caps();
        let normalizer = normalizer_from(&builder);

        let mut patterns = PatternSet::new();
        patterns.learn(&ReviewFeedback::Confirm {
            field: "category".into(),
            value: "Automotive".into(),
        });
        patterns.learn(&ReviewFeedback::Reject {
            field: "category".into(),
            value: "Automotive".into(),
        });

        let mut item = raw("Telemetria flotte");
        item.extra.insert("category".into(), "Automotive".into());

        let out = normalizer.normalize_batch(vec![item], &patterns).await;
        assert!(out[0]
            .normalization_notes
            .iter()
            .any(|n| n == "confirmation_suppressed:category"));
        assert!(!out[0]
            .normalization_notes
            .iter()
            .any(|n| n == "auto_confirmed:category"));
    }

    // ── Determinism ─────────────────────────────────────

    #[tokio::test]
    async fn repeated_runs_identical_scores() {
        let builder = fake_caps().with_search_hits(
            "tenant-a",
            vec![hit("stable context", "Automotive", 0.8)],
        );
        let normalizer = normalizer_from(&builder);

        let make = || {
            let mut item = raw("Archimede");
            item.description = Some("gestione flotte".into());
            item
        };
        let a = normalizer
            .normalize_batch(vec![make()], &PatternSet::new())
            .await;
        let b = normalizer
            .normalize_batch(vec![make()], &PatternSet::new())
            .await;

        assert_eq!(a[0].item_type, b[0].item_type);
        assert_eq!(a[0].confidence, b[0].confidence);
        assert_eq!(
            a[0].confidence_breakdown.type_confidence,
            b[0].confidence_breakdown.type_confidence
        );
        assert_eq!(
            a[0].confidence_breakdown.fields,
            b[0].confidence_breakdown.fields
        );
    }
}
