//! Admission control and inbound message validation.
//!
//! Admission decides whether a freshly handshaken socket may stay open at all;
//! validation screens every text frame before it reaches the router.

use crate::config::ServerConfig;
use noughts_core::Status;
use std::net::IpAddr;

pub mod input_validation;

pub use input_validation::validate_json_message;

/// Connection ceilings checked at admission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionLimits {
    pub max_connections: usize,
    pub max_connections_per_ip: usize,
}

impl From<&ServerConfig> for AdmissionLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            max_connections_per_ip: config.max_connections_per_ip,
        }
    }
}

/// Why a connection was refused at the door.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    #[error("Server is full ({0} connections)")]
    ServerFull(usize),

    #[error("Too many connections from IP {0}")]
    TooManyConnections(IpAddr),
}

impl AdmissionError {
    pub fn status(&self) -> Status {
        match self {
            AdmissionError::ServerFull(_) => Status::ServerFull,
            AdmissionError::TooManyConnections(_) => Status::TooManyConnections,
        }
    }
}

/// Frame-level validation failures. Always answered with `BAD_REQUEST`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Message too large: {0} bytes")]
    MessageTooLarge(usize),

    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    #[error("String contains a NUL byte")]
    EmbeddedNul,
}
