//! In-memory queue implementation for tests and the local run mode
//!
//! Models the external queue's delivery contract faithfully enough to
//! exercise consumers: received messages become invisible until deleted, and
//! reappear for redelivery once the visibility timeout passes without an
//! acknowledgement.

use crate::queue::{MessageQueue, QueueError, QueueResult, ReceivedMessage};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

const DEFAULT_VISIBILITY: Duration = Duration::from_secs(30);

/// Granularity of the receive polling loop; bounds how late a visibility
/// expiry or a concurrent send can be observed
const POLL_SLICE: Duration = Duration::from_millis(50);

struct InFlight {
    body: String,
    taken_at: Instant,
}

struct Inner {
    ready: VecDeque<String>,
    in_flight: HashMap<String, InFlight>,
    next_receipt: u64,
}

/// In-memory at-least-once queue with a visibility timeout
pub struct InMemoryQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    visibility: Duration,
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::with_visibility(DEFAULT_VISIBILITY)
    }

    /// Creates a queue with a custom visibility timeout (tests shorten it to
    /// observe redelivery without waiting)
    pub fn with_visibility(visibility: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                ready: VecDeque::new(),
                in_flight: HashMap::new(),
                next_receipt: 0,
            }),
            notify: Notify::new(),
            visibility,
        }
    }

    /// Moves expired in-flight deliveries back to the ready queue
    fn reap_expired(inner: &mut Inner, visibility: Duration, now: Instant) {
        let expired: Vec<String> = inner
            .in_flight
            .iter()
            .filter(|(_, f)| now.duration_since(f.taken_at) >= visibility)
            .map(|(receipt, _)| receipt.clone())
            .collect();

        for receipt in expired {
            if let Some(flight) = inner.in_flight.remove(&receipt) {
                inner.ready.push_back(flight.body);
            }
        }
    }

    fn try_take(&self, max: usize) -> Vec<ReceivedMessage> {
        let mut inner = self.inner.lock().unwrap();
        Self::reap_expired(&mut inner, self.visibility, Instant::now());

        let mut taken = Vec::new();
        while taken.len() < max {
            let Some(body) = inner.ready.pop_front() else {
                break;
            };
            inner.next_receipt += 1;
            let receipt = format!("r-{}", inner.next_receipt);
            inner.in_flight.insert(
                receipt.clone(),
                InFlight {
                    body: body.clone(),
                    taken_at: Instant::now(),
                },
            );
            taken.push(ReceivedMessage { body, receipt });
        }
        taken
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn send(&self, body: &str) -> QueueResult<()> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.ready.push_back(body.to_string());
        }
        self.notify.notify_one();
        Ok(())
    }

    async fn receive(&self, max: usize, wait: Duration) -> QueueResult<Vec<ReceivedMessage>> {
        let deadline = Instant::now() + wait;

        loop {
            let taken = self.try_take(max);
            if !taken.is_empty() {
                return Ok(taken);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Vec::new());
            }

            let _ = tokio::time::timeout(remaining.min(POLL_SLICE), self.notify.notified()).await;
        }
    }

    async fn delete(&self, receipt: &str) -> QueueResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .in_flight
            .remove(receipt)
            .map(|_| ())
            .ok_or_else(|| QueueError::UnknownReceipt(receipt.to_string()))
    }

    async fn depth(&self) -> QueueResult<(usize, usize)> {
        let mut inner = self.inner.lock().unwrap();
        Self::reap_expired(&mut inner, self.visibility, Instant::now());
        Ok((inner.ready.len(), inner.in_flight.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_receive_delete() {
        let queue = InMemoryQueue::new();
        queue.send("hello").await.unwrap();

        let messages = queue.receive(10, Duration::from_millis(100)).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, "hello");

        queue.delete(&messages[0].receipt).await.unwrap();
        assert_eq!(queue.depth().await.unwrap(), (0, 0));
    }

    #[tokio::test]
    async fn test_receive_empty_after_wait() {
        let queue = InMemoryQueue::new();
        let messages = queue.receive(10, Duration::from_millis(50)).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_undeleted_message_is_redelivered() {
        let queue = InMemoryQueue::with_visibility(Duration::from_millis(50));
        queue.send("work").await.unwrap();

        let first = queue.receive(1, Duration::from_millis(100)).await.unwrap();
        assert_eq!(first.len(), 1);

        // Not deleted; wait out the visibility timeout
        tokio::time::sleep(Duration::from_millis(80)).await;

        let second = queue.receive(1, Duration::from_millis(200)).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].body, "work");
        assert_ne!(second[0].receipt, first[0].receipt);
    }

    #[tokio::test]
    async fn test_deleted_message_is_not_redelivered() {
        let queue = InMemoryQueue::with_visibility(Duration::from_millis(50));
        queue.send("work").await.unwrap();

        let first = queue.receive(1, Duration::from_millis(100)).await.unwrap();
        queue.delete(&first[0].receipt).await.unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        let second = queue.receive(1, Duration::from_millis(50)).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_receipt() {
        let queue = InMemoryQueue::new();
        let result = queue.delete("r-999").await;
        assert!(matches!(result, Err(QueueError::UnknownReceipt(_))));
    }

    #[tokio::test]
    async fn test_depth_counts_ready_and_in_flight() {
        let queue = InMemoryQueue::new();
        queue.send("a").await.unwrap();
        queue.send("b").await.unwrap();
        assert_eq!(queue.depth().await.unwrap(), (2, 0));

        let taken = queue.receive(1, Duration::from_millis(50)).await.unwrap();
        assert_eq!(taken.len(), 1);
        assert_eq!(queue.depth().await.unwrap(), (1, 1));
    }

    #[tokio::test]
    async fn test_receive_preserves_fifo_order() {
        let queue = InMemoryQueue::new();
        queue.send("first").await.unwrap();
        queue.send("second").await.unwrap();

        let messages = queue.receive(10, Duration::from_millis(50)).await.unwrap();
        let bodies: Vec<&str> = messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
    }
}
