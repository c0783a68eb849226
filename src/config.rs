//! Pipeline configuration: thresholds, tunables, and per-run options.
//!
//! The classifier boost values and the confidence weighting are tunables,
//! not business rules - tests assert ordering behavior and bounds, never
//! the exact constants.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::Language;

/// Crate version, echoed in telemetry.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Confidence thresholds gating pipeline decisions.
pub mod thresholds {
    /// Below this overall confidence an item is quarantined.
    pub const QUARANTINE: f32 = 0.30;

    /// At or above this type-classifier confidence the category resolver
    /// call is skipped entirely.
    pub const NO_LOOKUP_NEEDED: f32 = 0.60;

    /// Similarity score below which a search hit yields no suggestion.
    pub const SIMILARITY: f32 = 0.50;

    /// Overall confidence is capped here - never report certainty.
    pub const CONFIDENCE_CAP: f32 = 0.99;
}

/// Type-classifier tunables. The `+1` denominator smoothing keeps a single
/// weak keyword hit from producing artificial high confidence.
pub mod classifier {
    /// Added to a side when `raw_type` contains one of its strong synonyms.
    pub const RAW_TYPE_BOOST: f32 = 1.2;

    /// Added to the side the resolver context text lexically matches.
    pub const CONTEXT_BOOST: f32 = 0.8;

    /// Weight of secondary cue groups (contract/subscription/license…).
    pub const CUE_WEIGHT: f32 = 0.6;

    /// Confidence cap and no-signal floor.
    pub const CONFIDENCE_CAP: f32 = 0.95;
    pub const NO_SIGNAL_FLOOR: f32 = 0.30;
}

/// Weights combining the confidence breakdown into the overall score.
pub mod confidence_weights {
    pub const TYPE: f32 = 0.35;
    pub const FIELDS: f32 = 0.40;
    pub const SOURCE_CLARITY: f32 = 0.15;
    pub const RAG_MATCH: f32 = 0.10;
}

/// Per-capability call timeouts. A timeout degrades the sub-step to its
/// conservative fallback; it never aborts the item.
pub mod timeouts {
    use std::time::Duration;

    pub const ENTITY_EXTRACTION: Duration = Duration::from_secs(60);
    pub const SIMILARITY_SEARCH: Duration = Duration::from_secs(15);
    pub const CONTEXT_LOOKUP: Duration = Duration::from_secs(10);
    pub const TABULAR_READ: Duration = Duration::from_secs(30);
    pub const DOCUMENT_READ: Duration = Duration::from_secs(60);
}

/// Budget thresholds deriving `Complexity`.
pub mod complexity_budget {
    pub const HIGH: f64 = 500_000.0;
    pub const MEDIUM: f64 = 100_000.0;
}

/// Upper bound on a plausible budget. Values at or above are rejected.
pub const MAX_PLAUSIBLE_BUDGET: f64 = 1e9;

/// Accepted year range for lenient date parsing.
pub const DATE_YEAR_MIN: i32 = 1990;
pub const DATE_YEAR_MAX: i32 = 2050;

/// Target characters per document chunk, sized so a chunk plus prompt
/// template stays inside the extraction capability's context budget.
pub const CHUNK_TARGET_CHARS: usize = 6_000;

/// Document text shorter than this is extracted in a single call.
pub const SHORT_DOCUMENT_CHARS: usize = 8_000;

/// Share of columns that must match known aliases before the tabular
/// extractor trusts its own header mapping.
pub const MIN_ALIAS_MATCH_RATIO: f32 = 0.30;

/// Options for one ingestion run (batch or streaming).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOptions {
    /// Bounded parallelism across source files (batch mode only -
    /// streaming processes sources sequentially).
    pub max_parallel_files: usize,
    /// Normalized items buffered before a `Batch` event is flushed.
    pub batch_size: usize,
    /// Stop after extraction; items are returned raw.
    pub skip_normalization: bool,
    pub language: Language,
    /// Restrict tabular extraction to one named sheet.
    pub target_sheet: Option<String>,
    /// Tenant scope for category resolution.
    pub tenant_scope: String,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_parallel_files: 5,
            batch_size: 20,
            skip_normalization: false,
            language: Language::Auto,
            target_sheet: None,
            tenant_scope: "system".into(),
        }
    }
}

/// Category-resolver fan-out configuration.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Queries grouped per worker task.
    pub batch_size: usize,
    /// Worker tasks allowed in flight concurrently.
    pub max_in_flight: usize,
    pub similarity_threshold: f32,
    pub search_limit: usize,
    pub timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_in_flight: 8,
            similarity_threshold: thresholds::SIMILARITY,
            search_limit: 3,
            timeout: timeouts::SIMILARITY_SEARCH,
        }
    }
}

/// Knowledge-cache sizing. Advisory only - safe to lose.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 512,
            ttl: Duration::from_secs(15 * 60),
        }
    }
}
