//! Abstract capability interfaces consumed by the pipeline.
//!
//! The concrete document-understanding, similarity-search, and strategic
//! context backends live outside this crate; the pipeline only requires
//! these contracts. Every call site wraps the call in a bounded timeout and
//! degrades to a conservative fallback on failure - a capability error is
//! data, never a fatal error.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Language, RawItem};

#[derive(Error, Debug, Clone)]
pub enum CapabilityError {
    #[error("Capability timed out")]
    Timeout,

    #[error("Capability backend error: {0}")]
    Backend(String),

    #[error("Capability unavailable: {0}")]
    Unavailable(String),
}

/// Text-to-entities extraction, backed by any document-understanding
/// service. Must return a best-effort list and never fail on well-formed
/// text.
#[async_trait]
pub trait EntityExtraction: Send + Sync {
    async fn extract_entities(
        &self,
        text: &str,
        context_hint: Option<&str>,
        language: Language,
    ) -> Result<Vec<RawItem>, CapabilityError>;
}

/// One hit returned by the similarity-search capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    pub metadata: SearchHitMetadata,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchHitMetadata {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub tags: Vec<String>,
}

/// Search options forwarded to the similarity-search capability.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub source_kinds: Vec<String>,
    pub limit: usize,
    pub threshold: f32,
}

/// Similarity search over a catalog corpus, used for category resolution.
/// Callers fall back to the `system` scope when a tenant-scoped search
/// returns nothing.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    async fn search(
        &self,
        tenant_scope: &str,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<Vec<SearchHit>, CapabilityError>;
}

/// Company-context profile used by schema-inference enrichment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CompanyProfile {
    pub industry: Option<String>,
    /// Categories this tenant's catalog is expected to use.
    pub known_categories: Vec<String>,
    pub default_owner: Option<String>,
}

/// Strategic-context lookup. Optional: a `None` profile skips
/// schema-inference enrichment entirely, without error.
#[async_trait]
pub trait StrategicContext: Send + Sync {
    async fn latest_profile(
        &self,
        tenant_scope: &str,
    ) -> Result<Option<CompanyProfile>, CapabilityError>;
}

/// One table detected in a spreadsheet sheet: rows of cell strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetData {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

/// Tabular extraction from a binary blob (xlsx/ods/csv - backend's choice).
#[async_trait]
pub trait TabularReader: Send + Sync {
    async fn read_sheets(
        &self,
        blob: &[u8],
        target_sheet: Option<&str>,
    ) -> Result<Vec<SheetData>, CapabilityError>;
}

/// Flat-text extraction from a binary document blob (PDF and friends).
#[async_trait]
pub trait DocumentReader: Send + Sync {
    async fn read_text(&self, blob: &[u8]) -> Result<String, CapabilityError>;
}

/// Bundle of capability handles passed into a pipeline run.
///
/// `context` is optional by contract; the others are required to construct
/// the bundle but individual calls still degrade gracefully on failure.
#[derive(Clone)]
pub struct Capabilities {
    pub entities: Arc<dyn EntityExtraction>,
    pub search: Arc<dyn SimilaritySearch>,
    pub context: Option<Arc<dyn StrategicContext>>,
    pub tabular: Arc<dyn TabularReader>,
    pub document: Arc<dyn DocumentReader>,
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("context", &self.context.is_some())
            .finish_non_exhaustive()
    }
}
