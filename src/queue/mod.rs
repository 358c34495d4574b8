//! Message queue collaborator seam
//!
//! The durable work and heartbeat queues are external collaborators with
//! at-least-once delivery: a message may be delivered more than once but is
//! never silently dropped, and a consumer acknowledges by deleting the
//! message after processing. This module defines the trait the rest of the
//! system programs against, plus an in-memory implementation with a
//! visibility timeout used by tests and the local run mode.

mod memory;

pub use memory::InMemoryQueue;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue send failed: {0}")]
    Send(String),

    #[error("Queue receive failed: {0}")]
    Receive(String),

    #[error("Unknown receipt handle: {0}")]
    UnknownReceipt(String),
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// A delivered message together with the receipt needed to delete it
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// Raw message body (JSON text)
    pub body: String,

    /// Opaque handle identifying this delivery for `delete`
    pub receipt: String,
}

/// At-least-once message queue
///
/// Bodies are opaque strings; callers serialize their own wire types.
/// Consumers must delete a message only once processing has reached success
/// or definitive failure; an undeleted message becomes visible again after
/// the queue's visibility timeout and will be redelivered.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueues a message body
    async fn send(&self, body: &str) -> QueueResult<()>;

    /// Long-poll receive of up to `max` messages, waiting at most `wait`
    ///
    /// Returns an empty vec when the wait elapses with nothing available.
    async fn receive(&self, max: usize, wait: Duration) -> QueueResult<Vec<ReceivedMessage>>;

    /// Acknowledges a delivery, removing the message permanently
    async fn delete(&self, receipt: &str) -> QueueResult<()>;

    /// Returns `(ready, in_flight)` message counts
    async fn depth(&self) -> QueueResult<(usize, usize)>;
}
