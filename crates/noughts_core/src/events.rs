//! Outbound events and the outbox that collects them.
//!
//! Core operations never talk to sockets. Instead they append addressed
//! [`Envelope`]s to an [`Outbox`]; the gateway drains it in order once the
//! operation returns, so every push for a room leaves in the order the state
//! changed.
//!
//! On the wire an event is `{"event": "<name>", "data": {...}}`.

use crate::engine::Snapshot;
use crate::error::Status;
use crate::types::{ConnectionId, DisplayName, RoomId};
use serde::{Deserialize, Serialize};

/// Everything the server can push to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Hello handshake accepted.
    Welcome {
        connection_id: ConnectionId,
        display_name: DisplayName,
    },
    /// Connection refused; the socket closes right after.
    Rejected { status: Status, message: String },
    /// Answer to exactly one client request.
    Reply {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<u64>,
        status: Status,
        message: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
    OpponentJoined { display_name: DisplayName },
    OpponentLeft,
    MatchStarted(Snapshot),
    MoveMade(Snapshot),
    /// Sent only to the player whose move was refused.
    InvalidMove { status: Status, message: String },
    RematchRequested { display_name: DisplayName },
    ChatMessage {
        content: String,
        display_name: DisplayName,
    },
    /// Room dropped by an administrative clear.
    RoomClosed { room_id: RoomId },
    Pong,
}

impl ServerEvent {
    /// Wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Welcome { .. } => "welcome",
            ServerEvent::Rejected { .. } => "rejected",
            ServerEvent::Reply { .. } => "reply",
            ServerEvent::OpponentJoined { .. } => "opponent_joined",
            ServerEvent::OpponentLeft => "opponent_left",
            ServerEvent::MatchStarted(_) => "match_started",
            ServerEvent::MoveMade(_) => "move_made",
            ServerEvent::InvalidMove { .. } => "invalid_move",
            ServerEvent::RematchRequested { .. } => "rematch_requested",
            ServerEvent::ChatMessage { .. } => "chat_message",
            ServerEvent::RoomClosed { .. } => "room_closed",
            ServerEvent::Pong => "pong",
        }
    }
}

/// An event addressed to one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub to: ConnectionId,
    pub event: ServerEvent,
}

/// Ordered queue of pending pushes produced by one lobby operation.
#[derive(Debug, Default)]
pub struct Outbox {
    envelopes: Vec<Envelope>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `event` for a single connection.
    pub fn push(&mut self, to: ConnectionId, event: ServerEvent) {
        self.envelopes.push(Envelope { to, event });
    }

    /// Queues a copy of `event` for every connection in `members`.
    pub fn broadcast<I>(&mut self, members: I, event: ServerEvent)
    where
        I: IntoIterator<Item = ConnectionId>,
    {
        for to in members {
            self.push(to, event.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    /// Borrowing view, mostly for tests.
    pub fn envelopes(&self) -> &[Envelope] {
        &self.envelopes
    }

    /// Envelopes addressed to `to`, in queue order.
    pub fn events_for(&self, to: ConnectionId) -> impl Iterator<Item = &ServerEvent> {
        self.envelopes
            .iter()
            .filter(move |envelope| envelope.to == to)
            .map(|envelope| &envelope.event)
    }
}

impl IntoIterator for Outbox {
    type Item = Envelope;
    type IntoIter = std::vec::IntoIter<Envelope>;

    fn into_iter(self) -> Self::IntoIter {
        self.envelopes.into_iter()
    }
}
