//! Message handling and routing for client-server communication.
//!
//! This module provides the infrastructure for parsing inbound frames into
//! typed intents, dispatching them to the lobby, and encoding outbound events.

pub mod intent;
pub mod router;
pub mod types;

pub use intent::Intent;
pub use router::{parse_frame, route_client_message, ParsedFrame};
pub use types::{encode_event, ClientMessage, Reply};
