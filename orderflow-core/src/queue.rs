//! The abstract FIFO byte queue the dispatcher pops events from, and the
//! one the engine pushes activity messages onto. Any transport (NATS,
//! Redis streams, an in-process channel) can implement `EventQueue`; this
//! crate does not specify the transport itself, only the contract.

use async_trait::async_trait;
use tokio::sync::mpsc;

/// A FIFO byte queue with a blocking pop that can be woken early by
/// cancellation.
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// Pushes a raw (already-serialized) record onto the queue.
    async fn push(&self, bytes: Vec<u8>);

    /// Pops the next record, or `None` if the queue was cancelled while
    /// waiting (the caller should stop polling).
    async fn pop(&self) -> Option<Vec<u8>>;
}

/// A bounded in-memory reference implementation, suitable for tests and for
/// wiring the dispatcher to an external transport via a small bridging task
/// that forwards bytes in.
pub struct InMemoryEventQueue {
    sender: mpsc::Sender<Vec<u8>>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<Vec<u8>>>,
}

impl InMemoryEventQueue {
    pub fn new(capacity: usize) -> (std::sync::Arc<Self>, mpsc::Sender<Vec<u8>>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let queue = std::sync::Arc::new(Self {
            sender: sender.clone(),
            receiver: tokio::sync::Mutex::new(receiver),
        });
        (queue, sender)
    }
}

#[async_trait]
impl EventQueue for InMemoryEventQueue {
    async fn push(&self, bytes: Vec<u8>) {
        // A full queue applies backpressure to the producer rather than
        // dropping; callers that need a non-blocking push should use
        // `try_send` on the sender returned by `new`.
        let _ = self.sender.send(bytes).await;
    }

    async fn pop(&self) -> Option<Vec<u8>> {
        self.receiver.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pop_returns_none_once_all_senders_drop() {
        let (queue, sender) = InMemoryEventQueue::new(4);
        queue.push(b"a".to_vec()).await;
        drop(sender);
        assert_eq!(queue.pop().await, Some(b"a".to_vec()));
        assert_eq!(queue.pop().await, None);
    }

    #[tokio::test]
    async fn preserves_fifo_order() {
        let (queue, _sender) = InMemoryEventQueue::new(4);
        queue.push(b"1".to_vec()).await;
        queue.push(b"2".to_vec()).await;
        assert_eq!(queue.pop().await, Some(b"1".to_vec()));
        assert_eq!(queue.pop().await, Some(b"2".to_vec()));
    }
}
