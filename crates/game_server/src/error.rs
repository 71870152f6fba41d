//! Error types and handling for the game server.
//!
//! This module defines the error types that can occur during server operations.
//! None of them are fatal to the process; a failing connection is logged and
//! dropped while the accept loop keeps running.

/// Enumeration of possible server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Binding, handshake and socket I/O failures
    #[error("Network error: {0}")]
    Network(String),

    /// A client frame that could not be understood
    #[error("Protocol error: {0}")]
    Protocol(String),
}
