//! Streaming ingestion session: public handle types.
//!
//! A session is a producer task emitting [`StreamingEvent`]s into a
//! bounded channel. The consumer pulls events at its own pace; the
//! producer suspends between events, so walking away from the receiver
//! stops the session without unbounded background work. Feedback flows
//! the other way and is folded into the pattern learner between chunks.

pub mod controller;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::capabilities::Capabilities;
use crate::config::IngestOptions;
use crate::models::{ReviewFeedback, StreamingEvent};
use crate::pipeline::cache::KnowledgeCache;
use crate::pipeline::extraction::IngestSource;

/// Event channel capacity 1: each send rendezvouses with the consumer,
/// so the producer suspends between events instead of running ahead, and
/// feedback sent against a preview is visible at the next chunk boundary.
const EVENT_CHANNEL_CAPACITY: usize = 1;
const FEEDBACK_CHANNEL_CAPACITY: usize = 64;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Feedback channel full or closed")]
    FeedbackRejected,
}

/// A live streaming session: event receiver plus control handle.
pub struct StreamingSession {
    events: mpsc::Receiver<StreamingEvent>,
    handle: SessionHandle,
}

/// Cloneable control surface for a running session.
#[derive(Clone)]
pub struct SessionHandle {
    feedback_tx: mpsc::Sender<ReviewFeedback>,
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl SessionHandle {
    /// Send confirm/reject feedback on a previewed item. Applied from the
    /// next chunk onward.
    pub fn feedback(&self, feedback: ReviewFeedback) -> Result<(), SessionError> {
        self.feedback_tx
            .try_send(feedback)
            .map_err(|_| SessionError::FeedbackRejected)
    }

    /// Signal cancellation: no new chunk extraction starts afterwards.
    /// In-flight work for already-committed chunks may finish.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }
}

impl StreamingSession {
    /// Next event, or `None` when the session has finished.
    pub async fn next_event(&mut self) -> Option<StreamingEvent> {
        self.events.recv().await
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn feedback(&self, feedback: ReviewFeedback) -> Result<(), SessionError> {
        self.handle.feedback(feedback)
    }

    pub fn cancel(&self) {
        self.handle.cancel()
    }
}

/// Start a streaming session over `sources`. Sources are processed
/// sequentially; events arrive in order per source.
pub fn start_session(
    caps: Capabilities,
    cache: Arc<KnowledgeCache>,
    sources: Vec<IngestSource>,
    options: IngestOptions,
) -> StreamingSession {
    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (feedback_tx, feedback_rx) = mpsc::channel(FEEDBACK_CHANNEL_CAPACITY);
    let (cancel_tx, cancel_rx) = watch::channel(false);

    tokio::spawn(controller::run(
        caps, cache, sources, options, events_tx, feedback_rx, cancel_rx,
    ));

    StreamingSession {
        events: events_rx,
        handle: SessionHandle {
            feedback_tx,
            cancel_tx: Arc::new(cancel_tx),
        },
    }
}
