use serde::{Deserialize, Serialize};

use super::normalized_item::NormalizedItem;
use super::raw_item::RawItem;

/// Events emitted by a streaming ingestion session, in order.
///
/// `Preview` carries raw, fast classifications so the caller gets feedback
/// before the slower normalization pass finishes; `Batch` carries the
/// normalized result for a flushed buffer. A recoverable `Error` reports a
/// failed source without ending the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamingEvent {
    Progress {
        phase: SessionPhase,
        message: String,
        percent: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_source: Option<String>,
    },
    Preview {
        items: Vec<PreviewItem>,
        chunk_index: usize,
        total_chunks: usize,
        items_so_far: usize,
        items_in_chunk: usize,
        categories_detected: Vec<String>,
        is_raw: bool,
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        notes: Vec<String>,
    },
    PatternLearned {
        message: String,
        confirmed_count: usize,
        rejected_count: usize,
        affected_future_chunks: bool,
    },
    Batch {
        items: Vec<NormalizedItem>,
        batch_index: usize,
    },
    Complete {
        total_items: usize,
        elapsed_ms: u64,
    },
    Error {
        message: String,
        recoverable: bool,
    },
}

/// Session state machine phases, also used in `Progress` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Collecting,
    Extracting,
    Previewing,
    Learning,
    Normalizing,
    Batching,
    Completed,
    Failed,
}

/// A raw item plus the cheap classification shown in previews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewItem {
    pub raw: RawItem,
    pub guessed_type: super::enums::ItemType,
    pub type_confidence: f32,
    /// Category hint from the source itself, when one was present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_hint: Option<String>,
    /// Set when a confirmed pattern matched this item.
    pub auto_confirmed: bool,
}

/// Human feedback on a previewed item, fed back into the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReviewFeedback {
    Confirm { field: String, value: String },
    Reject { field: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_tag_is_snake_case() {
        let event = StreamingEvent::Complete {
            total_items: 3,
            elapsed_ms: 120,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"complete\""));
    }

    #[test]
    fn feedback_round_trips() {
        let fb = ReviewFeedback::Confirm {
            field: "category".into(),
            value: "Automotive".into(),
        };
        let json = serde_json::to_string(&fb).unwrap();
        let back: ReviewFeedback = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, ReviewFeedback::Confirm { ref value, .. } if value == "Automotive"));
    }
}
