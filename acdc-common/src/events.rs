//! Batch event types and the broadcast event bus
//!
//! Progress of a batch run is published as [`BatchEvent`]s. Any number of
//! subscribers (the CLI progress logger, SSE clients) can listen; emitting
//! never blocks the batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted during a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BatchEvent {
    /// Publish accepted, work is starting
    BatchStarted {
        run_id: Uuid,
        files: usize,
        statements_per_file: usize,
        timestamp: DateTime<Utc>,
    },

    /// Operation counter advanced
    BatchProgress {
        run_id: Uuid,
        completed: usize,
        total: usize,
        percentage: f64,
        timestamp: DateTime<Utc>,
    },

    /// All operations for one file are done
    EntityCompleted {
        run_id: Uuid,
        title: String,
        entity_id: Option<String>,
        writes: usize,
        timestamp: DateTime<Utc>,
    },

    /// Every file was processed
    BatchCompleted {
        run_id: Uuid,
        files_processed: usize,
        writes: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// User requested stop was honored before the next write
    BatchStopped {
        run_id: Uuid,
        files_processed: usize,
        writes: usize,
        timestamp: DateTime<Utc>,
    },

    /// The batch aborted on a load or write error
    BatchFailed {
        run_id: Uuid,
        error: String,
        files_processed: usize,
        writes: usize,
        timestamp: DateTime<Utc>,
    },
}

impl BatchEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            BatchEvent::BatchStarted { .. } => "BatchStarted",
            BatchEvent::BatchProgress { .. } => "BatchProgress",
            BatchEvent::EntityCompleted { .. } => "EntityCompleted",
            BatchEvent::BatchCompleted { .. } => "BatchCompleted",
            BatchEvent::BatchStopped { .. } => "BatchStopped",
            BatchEvent::BatchFailed { .. } => "BatchFailed",
        }
    }

    pub fn run_id(&self) -> Uuid {
        match self {
            BatchEvent::BatchStarted { run_id, .. }
            | BatchEvent::BatchProgress { run_id, .. }
            | BatchEvent::EntityCompleted { run_id, .. }
            | BatchEvent::BatchCompleted { run_id, .. }
            | BatchEvent::BatchStopped { run_id, .. }
            | BatchEvent::BatchFailed { run_id, .. } => *run_id,
        }
    }

    /// Completed, stopped or failed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchEvent::BatchCompleted { .. }
                | BatchEvent::BatchStopped { .. }
                | BatchEvent::BatchFailed { .. }
        )
    }
}

/// Broadcast bus for [`BatchEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BatchEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` events are
    /// buffered.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: BatchEvent,
    ) -> Result<usize, broadcast::error::SendError<BatchEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: BatchEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
