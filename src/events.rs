//! Audit event types and event bus
//!
//! Host applications subscribe to stream run progress (e.g. over SSE). Events
//! are best-effort notifications: emitting with no subscribers is not an
//! error, and slow subscribers may miss events on a full channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{AuditPhase, AuditSummary};

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuditEvent {
    /// Audit run started
    AuditStarted {
        run_id: Uuid,
        total_citations: usize,
        timestamp: DateTime<Utc>,
    },

    /// Progress update (after each fetch batch and each classified record)
    AuditProgress {
        run_id: Uuid,
        phase: AuditPhase,
        /// Overall percentage, 0-100, non-decreasing within a run
        percent: u8,
        current_operation: String,
        elapsed_seconds: u64,
        timestamp: DateTime<Utc>,
    },

    /// Audit run finished; the result list covers every audited record.
    /// `error` is set when the registry was unreachable for the whole run
    /// and the report degraded to resolution-only classifications.
    AuditCompleted {
        run_id: Uuid,
        summary: AuditSummary,
        error: Option<String>,
        duration_seconds: u64,
        timestamp: DateTime<Utc>,
    },

    /// Audit run cancelled; results computed so far remain valid
    AuditCancelled {
        run_id: Uuid,
        results_completed: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for audit events.
///
/// Wraps `tokio::sync::broadcast`: multiple subscribers, no subscribers
/// required, oldest events dropped when a subscriber lags past capacity.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AuditEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring whether anyone is listening
    pub fn emit_lossy(&self, event: AuditEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
