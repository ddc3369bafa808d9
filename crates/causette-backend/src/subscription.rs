//! Cancellation handle for realtime message subscriptions.

use causette_shared::Message;
use tokio::sync::mpsc;

/// A live subscription to one conversation's message set.
///
/// Snapshots are consumed with [`next`](Self::next). Calling
/// [`cancel`](Self::cancel) (or dropping the handle) detaches the
/// subscription at the store and guarantees that `next` never yields again,
/// including for snapshots already in flight.
pub struct MessageSubscription {
    receiver: mpsc::UnboundedReceiver<Vec<Message>>,
    detach: Option<Box<dyn FnOnce() + Send>>,
    cancelled: bool,
}

impl MessageSubscription {
    /// Build a subscription from a snapshot channel and a detach closure
    /// that unregisters the sender at the store.
    pub fn new(
        receiver: mpsc::UnboundedReceiver<Vec<Message>>,
        detach: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            detach: Some(Box::new(detach)),
            cancelled: false,
        }
    }

    /// Next full-sequence snapshot, or `None` once the subscription is
    /// cancelled or the store side has gone away.
    pub async fn next(&mut self) -> Option<Vec<Message>> {
        if self.cancelled {
            return None;
        }
        self.receiver.recv().await
    }

    /// Detach from the store. Idempotent; buffered snapshots are discarded.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.receiver.close();
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for MessageSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causette_shared::{ConversationId, UserId};
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn message(id: &str) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: ConversationId::between(&UserId::from("a"), &UserId::from("b")),
            sender_id: UserId::from("a"),
            text: "hi".into(),
            created_at: Utc::now(),
            read: false,
        }
    }

    #[tokio::test]
    async fn delivers_snapshots_in_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sub = MessageSubscription::new(rx, || {});

        tx.send(vec![message("m1")]).unwrap();
        tx.send(vec![message("m1"), message("m2")]).unwrap();

        assert_eq!(sub.next().await.unwrap().len(), 1);
        assert_eq!(sub.next().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cancel_stops_delivery_and_detaches() {
        let (tx, rx) = mpsc::unbounded_channel();
        let detached = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&detached);
        let mut sub = MessageSubscription::new(rx, move || flag.store(true, Ordering::SeqCst));

        // Buffered before cancel: must still not be observable after.
        tx.send(vec![message("m1")]).unwrap();
        sub.cancel();

        assert!(detached.load(Ordering::SeqCst));
        assert!(sub.next().await.is_none());

        // Cancel is idempotent.
        sub.cancel();
        assert!(sub.next().await.is_none());
    }
}
