//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and default values
//! used to initialize the gateway: where to listen, how many connections to
//! admit, how long a new connection may take to say hello, and the limits
//! applied to every inbound frame.

use noughts_core::LobbyConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration structure for the game server.
///
/// Contains all necessary parameters to configure server behavior including
/// network settings, admission limits and lobby options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,

    /// Maximum concurrent connections from one IP address
    pub max_connections_per_ip: usize,

    /// Seconds a new connection has to complete the hello handshake
    pub connection_timeout: u64,

    /// Token required by the `admin/clear` intent; `None` disables it
    pub admin_token: Option<String>,

    /// Room and match behaviour
    pub lobby: LobbyConfig,

    /// Inbound message limits
    pub security: SecurityConfig,
}

/// Limits applied to every inbound frame before it is parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Maximum message size in bytes
    pub max_message_size: usize,

    /// Maximum allowed nesting depth for JSON messages
    pub max_json_depth: usize,

    /// Maximum allowed string length in JSON
    pub max_string_length: usize,

    /// Maximum allowed array/object size
    pub max_collection_size: usize,

    /// Frames that may wait for one connection's socket writer; a client
    /// that falls further behind is disconnected
    pub max_outbound_queue: usize,
}

impl ServerConfig {
    pub fn hello_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 1000,
            max_connections_per_ip: 10,
            connection_timeout: 60,
            admin_token: None,
            lobby: LobbyConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_message_size: 16 * 1024, // 16KB
            max_json_depth: 10,
            max_string_length: 1024,
            max_collection_size: 100,
            max_outbound_queue: 256,
        }
    }
}
