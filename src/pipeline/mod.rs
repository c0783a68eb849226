//! Ingestion pipeline: extraction → normalization → quality gate, with
//! batch and streaming front doors.

pub mod batch;
pub mod cache;
pub mod classify;
pub mod dates;
pub mod extraction;
pub mod lenient_json;
pub mod money;
pub mod normalize;
pub mod patterns;
pub mod resolver;
pub mod sanitize;
pub mod session;
pub mod validate;

use std::sync::Arc;

use crate::capabilities::Capabilities;
use crate::config::{CacheConfig, IngestOptions};

use batch::AggregateResult;
use cache::KnowledgeCache;
use extraction::IngestSource;
use session::StreamingSession;

/// Front door to the pipeline. Owns the capability bundle and the shared
/// knowledge cache; each run gets its own options.
pub struct Ingestor {
    caps: Capabilities,
    cache: Arc<KnowledgeCache>,
}

impl Ingestor {
    pub fn new(caps: Capabilities) -> Self {
        Self::with_cache(caps, Arc::new(KnowledgeCache::new(CacheConfig::default())))
    }

    /// Inject a cache instance - tests pass a fresh one per run.
    pub fn with_cache(caps: Capabilities, cache: Arc<KnowledgeCache>) -> Self {
        Self { caps, cache }
    }

    /// Non-streaming entry point: extract all sources with bounded
    /// parallelism, normalize, validate, return one aggregate result.
    pub async fn ingest_batch(
        &self,
        sources: Vec<IngestSource>,
        options: IngestOptions,
    ) -> AggregateResult {
        batch::ingest_batch(&self.caps, Arc::clone(&self.cache), sources, options).await
    }

    /// Streaming entry point: sources processed sequentially, events
    /// emitted in order, previews ahead of normalized batches.
    pub fn ingest_streaming(
        &self,
        sources: Vec<IngestSource>,
        options: IngestOptions,
    ) -> StreamingSession {
        session::start_session(
            self.caps.clone(),
            Arc::clone(&self.cache),
            sources,
            options,
        )
    }
}
