//! Listino - ingestion-normalization-validation core.
//!
//! Turns heterogeneous business documents (spreadsheets, binary documents,
//! free text) into a canonical, confidence-scored catalog of typed items.
//! Concrete document parsing, similarity search, and strategic context are
//! consumed through the capability traits in [`capabilities`]; persistence
//! and transport surfaces live outside this crate.

pub mod capabilities;
pub mod config;
pub mod models;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_support;

pub use capabilities::Capabilities;
pub use config::IngestOptions;
pub use models::{NormalizedItem, RawItem, ReviewFeedback, StreamingEvent, ValidationResult};
pub use pipeline::batch::AggregateResult;
pub use pipeline::extraction::{IngestSource, SourceFormat};
pub use pipeline::session::{SessionHandle, StreamingSession};
pub use pipeline::Ingestor;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for binaries and integration tests embedding the
/// crate. Library code only emits events; installing a subscriber is the
/// host's decision.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}
