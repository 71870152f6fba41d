//! Client connection representation.
//!
//! This module defines the structure of individual client connections,
//! tracking their address and the bounded queue feeding their socket writer.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::tungstenite::Message;
use tracing::warn;

/// Represents an individual client connection to the server.
///
/// # Fields
///
/// * `remote_addr` - The network address of the connected client
/// * `outbound` - Bounded queue drained by the connection's writer task
/// * `overflow` - Signalled once the queue is full and the client must go
#[derive(Debug)]
pub struct ClientConnection {
    /// The remote network address of the client
    pub remote_addr: SocketAddr,

    outbound: mpsc::Sender<Message>,

    overflow: Arc<Notify>,
}

impl ClientConnection {
    /// Creates a new client connection.
    ///
    /// # Arguments
    ///
    /// * `remote_addr` - The network address of the connecting client
    /// * `outbound` - Sender half of the connection's outbound queue
    /// * `overflow` - Notified when a frame is refused because the queue is full
    pub fn new(
        remote_addr: SocketAddr,
        outbound: mpsc::Sender<Message>,
        overflow: Arc<Notify>,
    ) -> Self {
        Self {
            remote_addr,
            outbound,
            overflow,
        }
    }

    /// Queues a frame for the writer task without waiting.
    ///
    /// Returns `false` if the writer has gone away or the queue is full. A full
    /// queue also fires the overflow signal so the connection gets dropped.
    pub fn send(&self, message: Message) -> bool {
        match self.outbound.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("🐢 Outbound queue full for {}, dropping client", self.remote_addr);
                self.overflow.notify_one();
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_full_queue_signals_overflow() {
        let (tx, mut rx) = mpsc::channel(2);
        let overflow = Arc::new(Notify::new());
        let connection =
            ClientConnection::new(SocketAddr::from(([10, 0, 0, 1], 1)), tx, overflow.clone());

        assert!(connection.send(Message::Text("one".to_string().into())));
        assert!(connection.send(Message::Text("two".to_string().into())));
        assert!(!connection.send(Message::Text("three".to_string().into())));

        // The permit is stored even though nobody was waiting yet.
        tokio::time::timeout(Duration::from_secs(1), overflow.notified())
            .await
            .expect("overflow should have been signalled");

        // Frames already queued are kept in order.
        assert_eq!(rx.recv().await, Some(Message::Text("one".to_string().into())));
        assert_eq!(rx.recv().await, Some(Message::Text("two".to_string().into())));
    }

    #[tokio::test]
    async fn test_send_after_writer_gone() {
        let (tx, rx) = mpsc::channel(2);
        let overflow = Arc::new(Notify::new());
        let connection =
            ClientConnection::new(SocketAddr::from(([10, 0, 0, 1], 1)), tx, overflow.clone());
        drop(rx);

        assert!(!connection.send(Message::Text("late".to_string().into())));
        let signalled = tokio::time::timeout(Duration::from_millis(50), overflow.notified()).await;
        assert!(signalled.is_err());
    }
}
