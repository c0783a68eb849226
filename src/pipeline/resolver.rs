//! Category resolver: bounded-concurrency batch client over the
//! similarity-search capability.
//!
//! Queries are grouped into fixed-size batches; up to `max_in_flight`
//! batches run concurrently. Results are written into a pre-sized slot
//! vector indexed by original position - never appended - so the output
//! order matches the input order regardless of completion order.
//!
//! A tenant-scoped search that returns nothing falls back to the shared
//! "system" catalog scope. Timeouts and backend errors degrade to "no
//! suggestion" for the affected query only.

use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::capabilities::{SearchOptions, SimilaritySearch};
use crate::config::ResolverConfig;

/// Fallback scope shared by all tenants.
pub const SYSTEM_SCOPE: &str = "system";

/// One category lookup request.
#[derive(Debug, Clone)]
pub struct CategoryQuery {
    pub name: String,
    pub description: Option<String>,
}

impl CategoryQuery {
    fn query_text(&self) -> String {
        match &self.description {
            Some(d) => format!("{} - {}", self.name, d),
            None => self.name.clone(),
        }
    }
}

/// Best-effort suggestion for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySuggestion {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub tags: Vec<String>,
    /// Concatenated content of the supporting hits; feeds the classifier
    /// context boost and the rag-match quality indicator.
    pub context_text: String,
    /// Similarity score of the best supporting hit.
    pub strength: f32,
    /// True when the tenant scope was empty and the system scope answered.
    pub from_system_scope: bool,
}

/// Bounded-concurrency, order-preserving category resolver.
pub struct CategoryResolver {
    search: Arc<dyn SimilaritySearch>,
    config: ResolverConfig,
}

impl CategoryResolver {
    pub fn new(search: Arc<dyn SimilaritySearch>, config: ResolverConfig) -> Self {
        Self { search, config }
    }

    /// Resolve a batch of queries, preserving input order.
    ///
    /// Slot `i` of the returned vector always corresponds to query `i`.
    pub async fn resolve_ordered(
        &self,
        tenant_scope: &str,
        queries: &[CategoryQuery],
    ) -> Vec<Option<CategorySuggestion>> {
        if queries.is_empty() {
            return vec![];
        }

        let batch_size = self.config.batch_size.max(1);
        let batches: Vec<_> = queries
            .chunks(batch_size)
            .enumerate()
            .map(|(batch_index, chunk)| self.resolve_batch(tenant_scope, batch_index, chunk))
            .collect();

        let completed: Vec<(usize, Vec<Option<CategorySuggestion>>)> = stream::iter(batches)
            .buffer_unordered(self.config.max_in_flight.max(1))
            .collect()
            .await;

        // Pre-sized slot vector: position is authoritative, arrival order
        // is not.
        let mut slots: Vec<Option<CategorySuggestion>> = vec![None; queries.len()];
        for (batch_index, results) in completed {
            for (offset, suggestion) in results.into_iter().enumerate() {
                slots[batch_index * batch_size + offset] = suggestion;
            }
        }
        slots
    }

    async fn resolve_batch(
        &self,
        tenant_scope: &str,
        batch_index: usize,
        chunk: &[CategoryQuery],
    ) -> (usize, Vec<Option<CategorySuggestion>>) {
        let mut results = Vec::with_capacity(chunk.len());
        for query in chunk {
            results.push(self.resolve_one(tenant_scope, query).await);
        }
        (batch_index, results)
    }

    async fn resolve_one(
        &self,
        tenant_scope: &str,
        query: &CategoryQuery,
    ) -> Option<CategorySuggestion> {
        let text = query.query_text();

        match self.scoped_search(tenant_scope, &text).await {
            Some(suggestion) => Some(suggestion),
            None if tenant_scope != SYSTEM_SCOPE => {
                let fallback = self.scoped_search(SYSTEM_SCOPE, &text).await;
                fallback.map(|mut s| {
                    s.from_system_scope = true;
                    s
                })
            }
            None => None,
        }
    }

    async fn scoped_search(&self, scope: &str, query_text: &str) -> Option<CategorySuggestion> {
        let opts = SearchOptions {
            source_kinds: vec!["catalog".into()],
            limit: self.config.search_limit,
            threshold: self.config.similarity_threshold,
        };

        let outcome = tokio::time::timeout(
            self.config.timeout,
            self.search.search(scope, query_text, &opts),
        )
        .await;

        let hits = match outcome {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                tracing::warn!(scope, error = %e, "Similarity search failed");
                return None;
            }
            Err(_) => {
                tracing::warn!(scope, "Similarity search timed out");
                return None;
            }
        };

        let mut relevant: Vec<_> = hits
            .into_iter()
            .filter(|h| h.score >= self.config.similarity_threshold)
            .collect();
        if relevant.is_empty() {
            return None;
        }
        relevant.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let best = &relevant[0];
        let context_text = relevant
            .iter()
            .map(|h| h.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Some(CategorySuggestion {
            category: best.metadata.category.clone(),
            subcategory: best.metadata.subcategory.clone(),
            tags: best.metadata.tags.clone(),
            context_text,
            strength: best.score,
            from_system_scope: false,
        })
    }
}
