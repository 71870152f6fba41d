//! Connection manager for tracking and managing client connections.
//!
//! This module provides the central registry of live connections. It hands
//! out connection ids, enforces the admission ceilings and routes lobby events
//! to the right outbound queue.

use super::client::ClientConnection;
use crate::messaging::encode_event;
use crate::security::{AdmissionError, AdmissionLimits};
use noughts_core::{ConnectionId, Outbox, ServerEvent};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Central manager for all client connections.
///
/// # Architecture
///
/// * Uses `RwLock<HashMap>` for async-safe connection storage
/// * Generates ids from an atomic counter, only for admitted connections
/// * Each connection owns a bounded outbound queue; delivery never blocks
///   on a slow socket, and a client whose queue fills up is dropped
#[derive(Debug)]
pub struct ConnectionManager {
    /// Map of connection ID to client connection information
    connections: Arc<RwLock<HashMap<ConnectionId, ClientConnection>>>,

    /// Atomic counter for generating unique connection IDs
    next_id: Arc<AtomicUsize>,
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionManager {
    /// Creates a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicUsize::new(1)),
        }
    }

    /// Admits a connection if both ceilings allow it.
    ///
    /// The count check and the insert happen under one write lock, so two
    /// simultaneous arrivals can never both take the last slot.
    ///
    /// # Arguments
    ///
    /// * `connection` - The connecting client and its outbound queue
    /// * `limits` - Global and per-IP ceilings
    ///
    /// # Returns
    ///
    /// The new `ConnectionId`, or the [`AdmissionError`] explaining the refusal.
    pub async fn try_add_connection(
        &self,
        connection: ClientConnection,
        limits: &AdmissionLimits,
    ) -> Result<ConnectionId, AdmissionError> {
        let remote_addr = connection.remote_addr;
        let mut connections = self.connections.write().await;

        if connections.len() >= limits.max_connections {
            warn!("🚫 Refusing {}: server full ({} connections)", remote_addr, connections.len());
            return Err(AdmissionError::ServerFull(limits.max_connections));
        }
        let ip = remote_addr.ip();
        let from_ip = connections.values().filter(|c| c.remote_addr.ip() == ip).count();
        if from_ip >= limits.max_connections_per_ip {
            warn!("🚫 Refusing {}: {} connections from this IP", remote_addr, from_ip);
            return Err(AdmissionError::TooManyConnections(ip));
        }

        let connection_id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        connections.insert(connection_id, connection);
        info!("🔗 Connection {} from {}", connection_id, remote_addr);
        Ok(connection_id)
    }

    /// Removes a connection, dropping its outbound queue.
    pub async fn remove_connection(&self, connection_id: ConnectionId) -> Option<ClientConnection> {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(&connection_id);
        if let Some(connection) = &removed {
            info!(
                "❌ Connection {} from {} disconnected",
                connection_id, connection.remote_addr
            );
        }
        removed
    }

    /// Queues one event for one connection.
    ///
    /// # Returns
    ///
    /// `true` if the event was queued, `false` if the connection is gone, its
    /// queue is full or the event could not be encoded.
    pub async fn send_to_connection(
        &self,
        connection_id: ConnectionId,
        event: &ServerEvent,
    ) -> bool {
        let Some(message) = encode_event(event) else {
            return false;
        };
        let connections = self.connections.read().await;
        connections
            .get(&connection_id)
            .is_some_and(|connection| connection.send(message))
    }

    /// Queues a raw frame (pong, close) for one connection.
    pub async fn send_frame(&self, connection_id: ConnectionId, message: Message) -> bool {
        let connections = self.connections.read().await;
        connections
            .get(&connection_id)
            .is_some_and(|connection| connection.send(message))
    }

    /// Delivers every envelope of a lobby outbox, in order.
    ///
    /// Envelopes for connections that have already gone are skipped.
    ///
    /// # Returns
    ///
    /// The number of envelopes actually queued.
    pub async fn deliver(&self, outbox: Outbox) -> usize {
        if outbox.is_empty() {
            return 0;
        }
        let connections = self.connections.read().await;
        let mut delivered = 0;
        for envelope in outbox {
            let Some(connection) = connections.get(&envelope.to) else {
                debug!(
                    "Dropping {} for departed connection {}",
                    envelope.event.name(),
                    envelope.to
                );
                continue;
            };
            if let Some(message) = encode_event(&envelope.event) {
                if connection.send(message) {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Sends a close frame to every live connection.
    ///
    /// # Returns
    ///
    /// The number of connections asked to close.
    pub async fn close_all(&self, reason: &str) -> usize {
        let connections = self.connections.read().await;
        let closed = connections
            .values()
            .filter(|connection| connection.send(close_frame(reason)))
            .count();
        debug!("📡 Asked {} connections to close", closed);
        closed
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

fn close_frame(reason: &str) -> Message {
    Message::Close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: reason.to_string().into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::sync::{mpsc, Notify};

    fn client(
        ip: [u8; 4],
        port: u16,
        capacity: usize,
    ) -> (ClientConnection, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity);
        let connection =
            ClientConnection::new(SocketAddr::from((ip, port)), tx, Arc::new(Notify::new()));
        (connection, rx)
    }

    fn limits(max_connections: usize, max_connections_per_ip: usize) -> AdmissionLimits {
        AdmissionLimits {
            max_connections,
            max_connections_per_ip,
        }
    }

    #[tokio::test]
    async fn test_admission_respects_global_ceiling() {
        let manager = ConnectionManager::new();
        let limits = limits(2, 10);

        let first = manager.try_add_connection(client([10, 0, 0, 1], 1, 8).0, &limits).await;
        let second = manager.try_add_connection(client([10, 0, 0, 2], 1, 8).0, &limits).await;
        let third = manager.try_add_connection(client([10, 0, 0, 3], 1, 8).0, &limits).await;

        assert!(first.is_ok() && second.is_ok());
        assert_ne!(first, second);
        assert_eq!(third, Err(AdmissionError::ServerFull(2)));
        assert_eq!(manager.connection_count().await, 2);

        manager.remove_connection(first.unwrap()).await;
        let retry = manager.try_add_connection(client([10, 0, 0, 3], 1, 8).0, &limits).await;
        assert!(retry.is_ok());
    }

    #[tokio::test]
    async fn test_admission_respects_per_ip_ceiling() {
        let manager = ConnectionManager::new();
        let limits = limits(10, 1);
        let crowded = SocketAddr::from(([10, 0, 0, 1], 0)).ip();

        let first = manager.try_add_connection(client([10, 0, 0, 1], 1, 8).0, &limits).await;
        assert!(first.is_ok());
        let again = manager.try_add_connection(client([10, 0, 0, 1], 2, 8).0, &limits).await;
        assert_eq!(again, Err(AdmissionError::TooManyConnections(crowded)));
        let other = manager.try_add_connection(client([10, 0, 0, 2], 1, 8).0, &limits).await;
        assert!(other.is_ok());
        assert_eq!(manager.connection_count().await, 2);
    }

    #[tokio::test]
    async fn test_deliver_routes_by_connection() {
        let manager = ConnectionManager::new();
        let limits = limits(10, 10);
        let (conn_a, mut rx_a) = client([10, 0, 0, 1], 1, 8);
        let (conn_b, mut rx_b) = client([10, 0, 0, 1], 2, 8);
        let a = manager.try_add_connection(conn_a, &limits).await.unwrap();
        let b = manager.try_add_connection(conn_b, &limits).await.unwrap();

        let mut outbox = Outbox::new();
        outbox.push(a, ServerEvent::Pong);
        outbox.push(b, ServerEvent::OpponentLeft);
        outbox.push(ConnectionId(999), ServerEvent::Pong);
        assert_eq!(manager.deliver(outbox).await, 2);

        let Some(Message::Text(text)) = rx_a.recv().await else {
            panic!("expected a text frame for a");
        };
        assert!(text.contains("pong"));
        let Some(Message::Text(text)) = rx_b.recv().await else {
            panic!("expected a text frame for b");
        };
        assert!(text.contains("opponent_left"));
    }

    #[tokio::test]
    async fn test_stalled_reader_does_not_block_others() {
        let manager = ConnectionManager::new();
        let limits = limits(10, 10);
        let (stalled, _stalled_rx) = client([10, 0, 0, 1], 1, 2);
        let (healthy, mut healthy_rx) = client([10, 0, 0, 2], 1, 16);
        let stalled = manager.try_add_connection(stalled, &limits).await.unwrap();
        let healthy = manager.try_add_connection(healthy, &limits).await.unwrap();

        let mut outbox = Outbox::new();
        for _ in 0..5 {
            outbox.push(stalled, ServerEvent::Pong);
            outbox.push(healthy, ServerEvent::Pong);
        }

        // Only the stalled client's overflow is dropped.
        assert_eq!(manager.deliver(outbox).await, 7);
        for _ in 0..5 {
            assert!(matches!(healthy_rx.recv().await, Some(Message::Text(_))));
        }
    }
}
