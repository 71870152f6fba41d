//! Connection management for client connections.
//!
//! This module handles the lifecycle of client connections: admission,
//! per-connection outbound queues and delivery of lobby events.

pub mod client;
pub mod manager;

pub use client::ClientConnection;
pub use manager::ConnectionManager;
