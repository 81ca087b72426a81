//! Live-connection table
//!
//! Maps a `ConnectionId` to the outbound mailbox of that connection. Each
//! mailbox is drained by a single writer task, so frames from concurrent
//! senders reach a socket one whole frame at a time.

use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};

use crate::protocol::ServerEnvelope;
use crate::registry::ConnectionId;

pub type Mailbox = mpsc::Sender<ServerEnvelope>;

pub struct PeerTable {
    mailboxes: RwLock<HashMap<ConnectionId, Mailbox>>,
    next_id: AtomicU64,
    delivery_timeout: Duration,
}

impl PeerTable {
    /// `delivery_timeout` bounds how long a sender waits on a full mailbox
    pub fn new(delivery_timeout: Duration) -> Self {
        Self {
            mailboxes: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            delivery_timeout,
        }
    }

    /// Allocates an id and mailbox for a new connection
    pub async fn attach(
        &self,
        capacity: usize,
    ) -> (ConnectionId, Mailbox, mpsc::Receiver<ServerEnvelope>) {
        let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(capacity);
        self.mailboxes.write().await.insert(id, sender.clone());
        (id, sender, receiver)
    }

    pub async fn detach(&self, id: ConnectionId) {
        self.mailboxes.write().await.remove(&id);
    }

    /// Queues `envelope` for connection `id`; false if it is gone or stalled
    pub async fn deliver(&self, id: ConnectionId, envelope: ServerEnvelope) -> bool {
        let mailbox = match self.mailboxes.read().await.get(&id) {
            Some(mailbox) => mailbox.clone(),
            None => return false,
        };

        match mailbox.send_timeout(envelope, self.delivery_timeout).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Delivery to {} failed: {}", id, e);
                false
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.mailboxes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deliver_reaches_attached_mailbox() {
        let peers = PeerTable::new(Duration::from_millis(50));
        let (id, _sender, mut receiver) = peers.attach(4).await;

        assert!(peers.deliver(id, ServerEnvelope::incoming("a", "hi")).await);
        assert_eq!(receiver.recv().await, Some(ServerEnvelope::incoming("a", "hi")));
    }

    #[tokio::test]
    async fn detached_connection_is_unreachable() {
        let peers = PeerTable::new(Duration::from_millis(50));
        let (id, _sender, _receiver) = peers.attach(4).await;
        peers.detach(id).await;

        assert!(peers.is_empty().await);
        assert!(!peers.deliver(id, ServerEnvelope::ok()).await);
    }

    #[tokio::test]
    async fn full_mailbox_times_out() {
        let peers = PeerTable::new(Duration::from_millis(20));
        let (id, _sender, _receiver) = peers.attach(1).await;

        assert!(peers.deliver(id, ServerEnvelope::ok()).await);
        assert!(!peers.deliver(id, ServerEnvelope::ok()).await);
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let peers = PeerTable::new(Duration::from_millis(20));
        let (a, _, _ra) = peers.attach(1).await;
        let (b, _, _rb) = peers.attach(1).await;
        assert_ne!(a, b);
        assert_eq!(peers.len().await, 2);
    }
}
