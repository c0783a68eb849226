//! Plain-text planning: one sanitized block, single-shot extraction.

use crate::models::SourceKind;

use super::{PlannedChunk, SourcePlan};
use crate::pipeline::sanitize::sanitize_source_text;

/// Build the (single-chunk) plan for a free-text source.
pub fn plan_text(source_name: &str, bytes: &[u8]) -> SourcePlan {
    let text = String::from_utf8_lossy(bytes);
    let text = sanitize_source_text(&text);
    if text.trim().is_empty() {
        return SourcePlan::failed(source_name, "Text source was empty");
    }
    SourcePlan {
        source_name: source_name.to_string(),
        success: true,
        chunks: vec![PlannedChunk::Text {
            index: 0,
            text,
            kind: SourceKind::TextBlock,
        }],
        notes: vec![],
    }
}
