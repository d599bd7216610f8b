//! Rendezvous queue used as a single-slot pairing mechanism.
//!
//! The contract mirrors a hosted message queue: receive returns at most one
//! visible message and hides it for a visibility timeout, messages can be
//! published with an initial delay, and consumers delete by receipt handle.
//! Delivery is at least once.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use derive_getters::Getters;
use derive_more::{Display, Error};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Queue error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Queue error: {} at {}:{}", message, file, line)]
pub struct QueueError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl QueueError {
    /// Creates a new queue error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// A received message and the handle needed to delete it.
#[derive(Debug, Clone, PartialEq, Eq, Getters, derive_new::new)]
pub struct Token {
    body: String,
    receipt: String,
}

/// At-least-once queue with visibility leases.
#[async_trait]
pub trait RendezvousQueue: Send + Sync + std::fmt::Debug {
    /// Receives at most one visible message, hiding it for `visibility`.
    async fn receive(&self, visibility: Duration) -> Result<Option<Token>, QueueError>;

    /// Publishes `body`, visible to receivers after `delay`.
    async fn publish(&self, body: &str, delay: Duration) -> Result<(), QueueError>;

    /// Deletes the message currently leased under `receipt`.
    ///
    /// An expired or unknown receipt is ignored.
    async fn delete(&self, receipt: &str) -> Result<(), QueueError>;
}

#[derive(Debug)]
struct Entry {
    body: String,
    visible_at: Instant,
    receipt: Option<String>,
}

/// In-process queue following hosted-queue lease semantics.
///
/// Uses `tokio::time`, so tests can drive visibility with a paused clock.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    entries: Mutex<VecDeque<Entry>>,
}

impl MemoryQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages stored, visible or not.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the queue holds no messages.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl RendezvousQueue for MemoryQueue {
    #[instrument(skip(self))]
    async fn receive(&self, visibility: Duration) -> Result<Option<Token>, QueueError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let stored = entries.len();
        let Some(entry) = entries.iter_mut().find(|e| e.visible_at <= now) else {
            debug!(stored, "No visible message");
            return Ok(None);
        };

        // A fresh receipt per delivery; an earlier holder can no longer delete.
        let receipt = Uuid::new_v4().to_string();
        entry.visible_at = now + visibility;
        entry.receipt = Some(receipt.clone());
        debug!(body = %entry.body, "Message leased");

        Ok(Some(Token {
            body: entry.body.clone(),
            receipt,
        }))
    }

    #[instrument(skip(self))]
    async fn publish(&self, body: &str, delay: Duration) -> Result<(), QueueError> {
        self.entries.lock().await.push_back(Entry {
            body: body.to_string(),
            visible_at: Instant::now() + delay,
            receipt: None,
        });
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, receipt: &str) -> Result<(), QueueError> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|e| e.receipt.as_deref() != Some(receipt));
        if entries.len() == before {
            debug!("Receipt matched no message");
        }
        Ok(())
    }
}
