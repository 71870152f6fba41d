//! Core game server implementation.
//!
//! This module contains the main `GameServer` struct: it owns the lobby, the
//! connection manager and the shutdown channel, runs the accept loop and
//! exposes the administrative surface.

use crate::{
    config::ServerConfig,
    connection::ConnectionManager,
    error::ServerError,
    server::handlers::handle_connection,
};
use noughts_core::{Lobby, LobbyStats, Outbox};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info};

/// State shared by the accept loop and every connection task.
///
/// The lobby sits behind a single async mutex: a handler locks it, runs one
/// synchronous lobby operation, delivers the outbox and unlocks. The
/// connection manager is only ever locked after the lobby, never before.
#[derive(Debug, Clone)]
pub struct ServerContext {
    pub config: Arc<ServerConfig>,
    pub lobby: Arc<Mutex<Lobby>>,
    pub connections: Arc<ConnectionManager>,
}

/// Snapshot of server load for health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStats {
    pub connections: usize,
    pub lobby: LobbyStats,
}

/// The core game server structure.
///
/// # Architecture
///
/// * **Lobby**: sessions, rooms and matches from `noughts_core`
/// * **Connection Management**: admission, outbound queues, event delivery
/// * **Shutdown**: broadcast channel observed by the accept loop
pub struct GameServer {
    context: ServerContext,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,
}

impl GameServer {
    /// Creates a new game server with the specified configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration parameters for server behavior
    pub fn new(config: ServerConfig) -> Self {
        let lobby = Lobby::new(config.lobby.clone());
        let (shutdown_sender, _) = broadcast::channel(1);

        Self {
            context: ServerContext {
                config: Arc::new(config),
                lobby: Arc::new(Mutex::new(lobby)),
                connections: Arc::new(ConnectionManager::new()),
            },
            shutdown_sender,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Binds the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        TcpListener::bind(self.context.config.bind_address)
            .await
            .map_err(|e| {
                ServerError::Network(format!(
                    "Failed to bind {}: {e}",
                    self.context.config.bind_address
                ))
            })
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn start(&self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Runs the accept loop on an already bound listener.
    ///
    /// Each accepted socket gets its own task running [`handle_connection`].
    /// The loop ends when [`GameServer::shutdown`] is called or the listener
    /// fails.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let local_addr: Option<SocketAddr> = listener.local_addr().ok();
        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        info!(
            "🚀 Game server listening on {}",
            local_addr.map_or_else(|| "<unknown>".to_string(), |addr| addr.to_string())
        );

        let accept_loop = async {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let context = self.context.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, addr, context).await {
                                error!("Connection error: {:?}", e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        break Err::<(), _>(ServerError::Network(e.to_string()));
                    }
                }
            }
        };

        let result = tokio::select! {
            result = accept_loop => result,
            _ = shutdown_receiver.recv() => {
                info!("🛑 Accept loop stopping - shutdown initiated");
                Ok(())
            }
        };

        info!("🧹 Closing {} connection(s)...", self.context.connections.connection_count().await);
        self.context.connections.close_all("server shutting down").await;
        info!("✅ Server stopped");
        result
    }

    /// Initiates server shutdown.
    ///
    /// Signals the accept loop to stop; open connections are then asked to
    /// close.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        info!("🛑 Shutting down server...");
        let _ = self.shutdown_sender.send(());
        Ok(())
    }

    /// Drops every room, match and rematch vote.
    ///
    /// Seated players receive `room_closed`. Returns the number of rooms
    /// removed.
    pub async fn clear_lobby(&self) -> usize {
        let mut lobby = self.context.lobby.lock().await;
        let mut outbox = Outbox::new();
        let rooms = lobby.clear(&mut outbox);
        self.context.connections.deliver(outbox).await;
        rooms
    }

    pub async fn stats(&self) -> ServerStats {
        let lobby = self.context.lobby.lock().await.stats();
        ServerStats {
            connections: self.context.connections.connection_count().await,
            lobby,
        }
    }

    /// Shared state handle, for embedding and tests.
    pub fn context(&self) -> ServerContext {
        self.context.clone()
    }
}
