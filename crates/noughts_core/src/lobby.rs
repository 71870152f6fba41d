//! The lobby aggregate.
//!
//! [`Lobby`] owns the session manager, room registry and match coordinator and
//! is the only way to mutate them. Each public method corresponds to one client
//! intent, validates everything up front and then mutates synchronously, so a
//! caller holding the lobby for the duration of a call never observes a
//! half-applied transition. Pushes produced along the way land in the caller's
//! [`Outbox`].

use crate::coordinator::{MatchCoordinator, RematchOutcome};
use crate::engine::{MoveOutcome, Snapshot};
use crate::error::LobbyError;
use crate::events::{Outbox, ServerEvent};
use crate::registry::{LeaveOutcome, RoomRegistry, ROOM_CAPACITY};
use crate::session::{Session, SessionManager};
use crate::types::{ConnectionId, DisplayName, RoomId, Symbol};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Lobby behaviour switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Start the match as soon as the second player joins.
    #[serde(default)]
    pub auto_start: bool,
}

/// Confirmation returned to a successful joiner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReceipt {
    pub room_id: RoomId,
    pub symbol: Symbol,
    pub display_name: DisplayName,
}

/// Who is in the caller's room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub room_id: RoomId,
    #[serde(rename = "self")]
    pub self_name: DisplayName,
    pub self_symbol: Symbol,
    pub opponent: Option<DisplayName>,
}

/// Counters for the periodic health log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyStats {
    pub sessions: usize,
    pub rooms: usize,
    pub open_rooms: usize,
    pub active_matches: usize,
}

/// Seat details resolved for a room-scoped intent.
struct Seated {
    room: RoomId,
    symbol: Symbol,
    display_name: DisplayName,
}

#[derive(Debug, Default)]
pub struct Lobby {
    config: LobbyConfig,
    sessions: SessionManager,
    registry: RoomRegistry,
    coordinator: MatchCoordinator,
}

impl Lobby {
    pub fn new(config: LobbyConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Registers a session for a connection that completed the hello.
    pub fn connect(
        &mut self,
        connection: ConnectionId,
        raw_name: &str,
    ) -> Result<DisplayName, LobbyError> {
        let session = self.sessions.register(connection, raw_name)?;
        info!("👤 Session {} registered as '{}'", connection, session.display_name);
        Ok(session.display_name.clone())
    }

    pub fn session(&self, connection: ConnectionId) -> Result<&Session, LobbyError> {
        self.sessions.get(connection)
    }

    pub fn list_open_rooms(&self) -> Vec<RoomId> {
        self.registry.open_rooms()
    }

    /// Seats the caller in `raw_room`.
    ///
    /// An optional `raw_name` replaces the session's display name before the
    /// symbol is assigned. Nothing changes if any check fails.
    ///
    /// # Errors
    ///
    /// `UNKNOWN_SESSION`, `ALREADY_IN_ROOM`, `INVALID_ROOM`, `INVALID_NAME`,
    /// `ROOM_FULL`.
    pub fn join_room(
        &mut self,
        connection: ConnectionId,
        raw_room: &str,
        raw_name: Option<&str>,
        outbox: &mut Outbox,
    ) -> Result<JoinReceipt, LobbyError> {
        let session = self.sessions.get(connection)?;
        if let Some(current) = session.room() {
            return Err(LobbyError::AlreadyInRoom(current.to_string()));
        }
        let room = RoomId::parse(raw_room)?;
        let display_name = match raw_name {
            Some(raw) => DisplayName::parse(raw)?,
            None => session.display_name.clone(),
        };

        let symbol = self
            .registry
            .join(&room, connection, display_name.clone(), outbox)?;
        self.sessions.rename(connection, display_name.clone())?;
        self.sessions.bind(connection, room.clone(), symbol)?;
        info!("🚪 '{}' joined room {} as {}", display_name, room, symbol);

        if self.config.auto_start {
            let members = self.registry.members_of(&room);
            if members.len() == ROOM_CAPACITY {
                if let Err(err) = self.coordinator.start_match(&room, &members, outbox) {
                    debug!("Auto-start skipped for room {}: {}", room, err);
                }
            }
        }

        Ok(JoinReceipt {
            room_id: room,
            symbol,
            display_name,
        })
    }

    /// Vacates the caller's room without closing the connection.
    ///
    /// The match (if any) is torn down and the remaining player is told their
    /// opponent left. Returns the room that was left.
    pub fn leave_room(
        &mut self,
        connection: ConnectionId,
        outbox: &mut Outbox,
    ) -> Result<RoomId, LobbyError> {
        self.sessions.get(connection)?;
        let room = self
            .sessions
            .unbind(connection)
            .ok_or_else(|| LobbyError::NotInRoom("any room".to_string()))?;
        self.vacate(&room, connection, outbox);
        Ok(room)
    }

    /// The caller's room, if seated.
    pub fn current_room(&self, connection: ConnectionId) -> Result<Option<RoomId>, LobbyError> {
        Ok(self.sessions.resolve_room(connection)?.cloned())
    }

    pub fn room_info(&self, connection: ConnectionId) -> Result<RoomInfo, LobbyError> {
        let session = self.sessions.get(connection)?;
        let seat = session
            .seat()
            .ok_or_else(|| LobbyError::NotInRoom("any room".to_string()))?;
        let opponent = self
            .registry
            .get(&seat.room)
            .and_then(|room| room.opponent_of(connection))
            .map(|member| member.display_name.clone());

        Ok(RoomInfo {
            room_id: seat.room.clone(),
            self_name: session.display_name.clone(),
            self_symbol: seat.symbol,
            opponent,
        })
    }

    /// Current snapshot of the caller's match, or `None` before the first start.
    pub fn game_info(
        &self,
        connection: ConnectionId,
        raw_room: &str,
    ) -> Result<Option<Snapshot>, LobbyError> {
        let seated = self.seated(connection, raw_room)?;
        Ok(self.coordinator.snapshot(&seated.room))
    }

    pub fn start_match(
        &mut self,
        connection: ConnectionId,
        raw_room: &str,
        outbox: &mut Outbox,
    ) -> Result<Snapshot, LobbyError> {
        let seated = self.seated(connection, raw_room)?;
        let members = self.registry.members_of(&seated.room);
        self.coordinator.start_match(&seated.room, &members, outbox)
    }

    /// Plays the caller's symbol at (`row`, `col`).
    ///
    /// A refused move also pushes `invalid_move` to the caller alone.
    pub fn submit_move(
        &mut self,
        connection: ConnectionId,
        raw_room: &str,
        row: i64,
        col: i64,
        outbox: &mut Outbox,
    ) -> Result<MoveOutcome, LobbyError> {
        let seated = self.seated(connection, raw_room)?;
        let members = self.registry.members_of(&seated.room);
        let result = self
            .coordinator
            .submit_move(&seated.room, seated.symbol, row, col, &members, outbox);

        match &result {
            Ok(outcome) => debug!(
                "♟️ {} played ({}, {}) in room {}: {:?}",
                seated.symbol, row, col, seated.room, outcome
            ),
            Err(err) if is_refused_move(err) => outbox.push(
                connection,
                ServerEvent::InvalidMove {
                    status: err.status(),
                    message: err.to_string(),
                },
            ),
            Err(_) => {}
        }
        result
    }

    pub fn request_rematch(
        &mut self,
        connection: ConnectionId,
        raw_room: &str,
        outbox: &mut Outbox,
    ) -> Result<RematchOutcome, LobbyError> {
        let seated = self.seated(connection, raw_room)?;
        let members = self.registry.members_of(&seated.room);
        self.coordinator.request_rematch(
            &seated.room,
            connection,
            &seated.display_name,
            &members,
            outbox,
        )
    }

    /// Relays a chat line to the caller's room.
    ///
    /// Blank text is dropped silently; returns whether anything was sent.
    pub fn send_chat(
        &mut self,
        connection: ConnectionId,
        text: &str,
        outbox: &mut Outbox,
    ) -> Result<bool, LobbyError> {
        let session = self.sessions.get(connection)?;
        let room = session
            .room()
            .ok_or_else(|| LobbyError::NotInRoom("any room".to_string()))?;
        let content = text.trim();
        if content.is_empty() {
            return Ok(false);
        }

        outbox.broadcast(
            self.registry.members_of(room),
            ServerEvent::ChatMessage {
                content: content.to_string(),
                display_name: session.display_name.clone(),
            },
        );
        Ok(true)
    }

    /// Tears down everything owned by `connection`.
    ///
    /// Safe to call more than once; only the first call has any effect.
    pub fn disconnect(&mut self, connection: ConnectionId, outbox: &mut Outbox) -> Option<Session> {
        let session = self.sessions.teardown(connection)?;
        if let Some(room) = session.room() {
            self.vacate(room, connection, outbox);
        }
        info!("👋 Session {} ('{}') disconnected", connection, session.display_name);
        Some(session)
    }

    fn vacate(&mut self, room: &RoomId, connection: ConnectionId, outbox: &mut Outbox) {
        match self.registry.leave(room, connection, outbox) {
            LeaveOutcome::RoomDestroyed => {
                self.coordinator.remove(room);
                debug!("🧹 Room {} destroyed", room);
            }
            LeaveOutcome::OpponentRemains(remaining) => {
                self.coordinator.remove(room);
                debug!("Room {} now waiting on {} alone", room, remaining);
            }
            LeaveOutcome::NotMember => {}
        }
    }

    /// Drops all rooms, matches and votes.
    ///
    /// Sessions survive but are unseated, and each one that held a seat
    /// receives `room_closed`. Returns the number of rooms removed.
    pub fn clear(&mut self, outbox: &mut Outbox) -> usize {
        let rooms = self.registry.clear();
        for (room_id, room) in &rooms {
            for connection in room.connections() {
                self.sessions.unbind(connection);
                outbox.push(
                    connection,
                    ServerEvent::RoomClosed {
                        room_id: room_id.clone(),
                    },
                );
            }
        }
        self.coordinator.clear();
        info!("🧽 Lobby cleared: {} rooms dropped", rooms.len());
        rooms.len()
    }

    pub fn stats(&self) -> LobbyStats {
        LobbyStats {
            sessions: self.sessions.len(),
            rooms: self.registry.room_count(),
            open_rooms: self.registry.open_room_count(),
            active_matches: self.coordinator.active_count(),
        }
    }

    /// Resolves the caller's seat and checks it matches the room they named.
    fn seated(&self, connection: ConnectionId, raw_room: &str) -> Result<Seated, LobbyError> {
        let session = self.sessions.get(connection)?;
        let room = RoomId::parse(raw_room)?;
        match session.seat() {
            Some(seat) if seat.room == room => Ok(Seated {
                room,
                symbol: seat.symbol,
                display_name: session.display_name.clone(),
            }),
            _ => Err(LobbyError::NotInRoom(room.to_string())),
        }
    }
}

/// Engine refusals, as opposed to lobby-state errors.
fn is_refused_move(err: &LobbyError) -> bool {
    matches!(
        err,
        LobbyError::WrongTurn | LobbyError::InvalidCell { .. } | LobbyError::GameOver
    )
}
