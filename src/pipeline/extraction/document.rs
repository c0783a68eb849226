//! Document-with-text planning: flat text via the document-reader
//! capability, then either a single extraction call (short text) or
//! paragraph-boundary chunks for progressive streaming.

use crate::capabilities::{CapabilityError, Capabilities};
use crate::config::{self, SHORT_DOCUMENT_CHARS};
use crate::models::SourceKind;

use super::chunker::chunk_default;
use super::{PlannedChunk, SourcePlan};
use crate::pipeline::sanitize::sanitize_source_text;

/// Build the chunk plan for a binary document source.
pub async fn plan_document(
    caps: &Capabilities,
    source_name: &str,
    blob: &[u8],
) -> SourcePlan {
    let text = match read_text(caps, blob).await {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(source = source_name, error = %e, "Document read failed");
            return SourcePlan::failed(
                source_name,
                format!("Document read failed: {e}"),
            );
        }
    };

    let text = sanitize_source_text(&text);
    if text.trim().is_empty() {
        return SourcePlan::failed(source_name, "Document contained no extractable text");
    }

    let chunks = if text.len() <= SHORT_DOCUMENT_CHARS {
        vec![PlannedChunk::Text {
            index: 0,
            text,
            kind: SourceKind::DocumentText,
        }]
    } else {
        chunk_default(&text)
            .into_iter()
            .map(|c| PlannedChunk::Text {
                index: c.index,
                text: c.text,
                kind: SourceKind::DocumentText,
            })
            .collect()
    };

    SourcePlan {
        source_name: source_name.to_string(),
        success: true,
        chunks,
        notes: vec![],
    }
}

async fn read_text(caps: &Capabilities, blob: &[u8]) -> Result<String, CapabilityError> {
    tokio::time::timeout(config::timeouts::DOCUMENT_READ, caps.document.read_text(blob))
        .await
        .map_err(|_| CapabilityError::Timeout)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fake_caps;

    #[tokio::test]
    async fn short_document_is_single_chunk() {
        let caps = fake_caps().with_document_text("Offerta: CRM cloud.\n\nBudget €120.000.");
        let plan = plan_document(&caps.build(), "offerta.pdf", b"%PDF").await;
        assert!(plan.success);
        assert_eq!(plan.chunks.len(), 1);
    }

    #[tokio::test]
    async fn long_document_chunks() {
        let long = vec!["Paragrafo con contenuto.".repeat(20); 40].join("\n\n");
        let caps = fake_caps().with_document_text(&long);
        let plan = plan_document(&caps.build(), "catalogo.pdf", b"%PDF").await;
        assert!(plan.success);
        assert!(plan.chunks.len() > 1);
    }

    #[tokio::test]
    async fn reader_failure_is_recoverable() {
        let caps = fake_caps().with_failing_document_reader();
        let plan = plan_document(&caps.build(), "broken.pdf", b"%PDF").await;
        assert!(!plan.success);
        assert!(plan.chunks.is_empty());
        assert!(!plan.notes.is_empty());
    }

    #[tokio::test]
    async fn empty_text_is_recoverable() {
        let caps = fake_caps().with_document_text("   ");
        let plan = plan_document(&caps.build(), "blank.pdf", b"%PDF").await;
        assert!(!plan.success);
    }
}
