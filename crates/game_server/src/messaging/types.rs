//! Message type definitions for client-server communication.
//!
//! Inbound frames share one envelope, [`ClientMessage`]. Outbound frames are
//! [`ServerEvent`]s encoded as JSON text.

use noughts_core::{ServerEvent, Status};
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::Message;
use tracing::error;

/// A message sent from a client to the server.
///
/// # Fields
///
/// * `namespace` - Intent group (`session`, `lobby`, `match`, `chat`, `system`, `admin`)
/// * `event` - The specific intent within the namespace
/// * `data` - Intent payload
/// * `request_id` - Echoed back in the matching `reply`
///
/// # Example
///
/// ```json
/// {
///   "namespace": "match",
///   "event": "move",
///   "data": { "room_id": "den", "row": 1, "col": 2 },
///   "request_id": 7
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientMessage {
    pub namespace: String,

    pub event: String,

    #[serde(default)]
    pub data: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

/// Body of a `reply` event before the request id is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: Status,
    pub message: String,
    pub payload: serde_json::Value,
}

impl Reply {
    pub fn ok(message: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            status: Status::Ok,
            message: message.into(),
            payload,
        }
    }

    pub fn error(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            payload: serde_json::Value::Null,
        }
    }

    /// Attaches the request id, producing the wire event.
    pub fn into_event(self, request_id: Option<u64>) -> ServerEvent {
        ServerEvent::Reply {
            request_id,
            status: self.status,
            message: self.message,
            payload: self.payload,
        }
    }
}

/// Encodes an event as a text frame. Failures are logged and yield `None`.
pub fn encode_event(event: &ServerEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            error!("Failed to serialize {} event: {}", event.name(), e);
            None
        }
    }
}
