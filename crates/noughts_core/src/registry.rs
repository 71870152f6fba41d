//! Room registry: which rooms exist and who sits in them.
//!
//! Rooms are created implicitly by the first join and destroyed when the last
//! member leaves. The registry knows nothing about matches; callers tear down
//! match state when [`LeaveOutcome::RoomDestroyed`] or
//! [`LeaveOutcome::OpponentRemains`] comes back.

use crate::error::LobbyError;
use crate::events::{Outbox, ServerEvent};
use crate::types::{ConnectionId, DisplayName, RoomId, Symbol};
use std::collections::BTreeMap;

/// Seats per room.
pub const ROOM_CAPACITY: usize = 2;

/// One seated player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub connection: ConnectionId,
    pub symbol: Symbol,
    pub display_name: DisplayName,
}

/// A named room with up to [`ROOM_CAPACITY`] members.
#[derive(Debug, Clone, Default)]
pub struct Room {
    members: Vec<Member>,
}

impl Room {
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Open rooms accept another joiner.
    pub fn is_open(&self) -> bool {
        self.members.len() < ROOM_CAPACITY
    }

    pub fn member(&self, connection: ConnectionId) -> Option<&Member> {
        self.members.iter().find(|m| m.connection == connection)
    }

    /// The other seated member, if any.
    pub fn opponent_of(&self, connection: ConnectionId) -> Option<&Member> {
        self.members.iter().find(|m| m.connection != connection)
    }

    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.members.iter().map(|m| m.connection)
    }

    fn free_symbol(&self) -> Option<Symbol> {
        Symbol::ALL
            .into_iter()
            .find(|symbol| self.members.iter().all(|m| m.symbol != *symbol))
    }
}

/// What happened to a room after a member left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The leaver was the last member; the room no longer exists.
    RoomDestroyed,
    /// One member is still seated and has been told its opponent left.
    OpponentRemains(ConnectionId),
    /// The connection was not seated in that room. Nothing changed.
    NotMember,
}

/// Owns every room, keyed by id.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: BTreeMap<RoomId, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of rooms with fewer than two members, in name order.
    pub fn open_rooms(&self) -> Vec<RoomId> {
        self.rooms
            .iter()
            .filter(|(_, room)| room.is_open())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Seats `connection` in `room_id`, creating the room if needed.
    ///
    /// The joiner gets the first symbol not already taken in the room. If
    /// someone was already seated they receive an `opponent_joined` push
    /// carrying the joiner's display name.
    ///
    /// # Errors
    ///
    /// [`LobbyError::RoomFull`] when both seats are taken. Callers enforce the
    /// one-room-per-session rule before calling.
    pub fn join(
        &mut self,
        room_id: &RoomId,
        connection: ConnectionId,
        display_name: DisplayName,
        outbox: &mut Outbox,
    ) -> Result<Symbol, LobbyError> {
        let room = self.rooms.entry(room_id.clone()).or_default();
        let Some(symbol) = room.free_symbol().filter(|_| room.is_open()) else {
            return Err(LobbyError::RoomFull(room_id.to_string()));
        };

        outbox.broadcast(
            room.connections(),
            ServerEvent::OpponentJoined {
                display_name: display_name.clone(),
            },
        );
        room.members.push(Member {
            connection,
            symbol,
            display_name,
        });
        Ok(symbol)
    }

    /// Removes `connection` from `room_id`.
    ///
    /// Destroys the room when it empties; otherwise pushes `opponent_left` to
    /// the remaining member.
    pub fn leave(
        &mut self,
        room_id: &RoomId,
        connection: ConnectionId,
        outbox: &mut Outbox,
    ) -> LeaveOutcome {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return LeaveOutcome::NotMember;
        };
        let before = room.members.len();
        room.members.retain(|m| m.connection != connection);
        if room.members.len() == before {
            return LeaveOutcome::NotMember;
        }

        match room.members.first() {
            Some(remaining) => {
                let remaining = remaining.connection;
                outbox.push(remaining, ServerEvent::OpponentLeft);
                LeaveOutcome::OpponentRemains(remaining)
            }
            None => {
                self.rooms.remove(room_id);
                LeaveOutcome::RoomDestroyed
            }
        }
    }

    pub fn get(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    /// Seated connections of a room; empty if the room does not exist.
    pub fn members_of(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room_id)
            .map(|room| room.connections().collect())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn open_room_count(&self) -> usize {
        self.rooms.values().filter(|room| room.is_open()).count()
    }

    /// Drops every room, returning what was removed so callers can notify.
    pub fn clear(&mut self) -> Vec<(RoomId, Room)> {
        std::mem::take(&mut self.rooms).into_iter().collect()
    }
}
