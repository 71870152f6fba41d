//! # Game Server - WebSocket Gateway
//!
//! The network boundary for two-player tic-tac-toe. This crate accepts
//! WebSocket connections, turns client frames into typed intents, runs them
//! against the [`noughts_core::Lobby`] and pushes the resulting events back to
//! the right connections. All game rules live in `noughts_core`; this crate
//! contains none.
//!
//! ## Architecture Overview
//!
//! ### Core Components
//!
//! * **Connection Manager** - admission control, per-connection outbound queues
//! * **Security** - connection ceilings and inbound frame validation
//! * **Messaging** - envelope parsing, intent routing, reply building
//! * **Server** - accept loop, connection lifecycle, administrative surface
//!
//! ### Message Flow
//!
//! 1. Client sends `{namespace, event, data, request_id}` as a text frame
//! 2. The frame is size/shape-validated and parsed into an [`messaging::Intent`]
//! 3. The router locks the lobby and runs the intent's handler
//! 4. Events produced by the lobby, then the caller's `reply`, are queued
//! 5. Each connection's writer task drains its queue onto the socket
//!
//! ### Connection Lifecycle
//!
//! Handshake, admission (`SERVER_FULL` / `TOO_MANY_CONNECTIONS`), a mandatory
//! `session/hello` within `connection_timeout`, then the message loop. On close
//! the session is disconnected from the lobby, which notifies any opponent.
//!
//! ## Error Handling
//!
//! The server uses structured error types ([`ServerError`]) to categorize failures:
//!
//! * **Network errors** - binding, handshake and socket failures
//! * **Protocol errors** - frames that fail validation or name no intent
//!
//! No client error closes the connection except a failed hello, or a client
//! that stops reading until its bounded outbound queue fills up.

// Re-export core types and functions for easy access
pub use config::{SecurityConfig, ServerConfig};
pub use error::ServerError;
pub use server::{GameServer, ServerStats};
pub use utils::{create_server, create_server_with_config};

// Public module declarations
pub mod config;
pub mod error;
pub mod messaging;
pub mod security;
pub mod server;
pub mod utils;

// Internal modules (not part of public API)
mod connection;
