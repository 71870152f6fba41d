//! Connection-scoped player identity.
//!
//! A [`Session`] exists from a successful hello until the connection closes.
//! Its display name may be replaced by a join request, but once the session is
//! seated the name, symbol and room stay fixed until it leaves.

use crate::error::LobbyError;
use crate::types::{ConnectionId, DisplayName, RoomId, Symbol};
use std::collections::HashMap;

/// Server-side state for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub display_name: DisplayName,
    seat: Option<Seat>,
}

/// Room and symbol, assigned together at join time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub room: RoomId,
    pub symbol: Symbol,
}

impl Session {
    pub fn room(&self) -> Option<&RoomId> {
        self.seat.as_ref().map(|seat| &seat.room)
    }

    pub fn symbol(&self) -> Option<Symbol> {
        self.seat.as_ref().map(|seat| seat.symbol)
    }

    pub fn seat(&self) -> Option<&Seat> {
        self.seat.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: HashMap<ConnectionId, Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the session for `connection` after validating `raw_name`.
    ///
    /// Registering the same connection twice replaces the display name of an
    /// unseated session and leaves a seated one untouched.
    pub fn register(
        &mut self,
        connection: ConnectionId,
        raw_name: &str,
    ) -> Result<&Session, LobbyError> {
        let display_name = DisplayName::parse(raw_name)?;
        let session = self
            .sessions
            .entry(connection)
            .or_insert_with(|| Session {
                connection_id: connection,
                display_name: display_name.clone(),
                seat: None,
            });
        if session.seat.is_none() {
            session.display_name = display_name;
        }
        Ok(session)
    }

    pub fn get(&self, connection: ConnectionId) -> Result<&Session, LobbyError> {
        self.sessions.get(&connection).ok_or(LobbyError::UnknownSession)
    }

    /// The room the session occupies, if any.
    pub fn resolve_room(&self, connection: ConnectionId) -> Result<Option<&RoomId>, LobbyError> {
        Ok(self.get(connection)?.room())
    }

    /// Swaps in a new display name. Only valid while unseated.
    pub fn rename(
        &mut self,
        connection: ConnectionId,
        name: DisplayName,
    ) -> Result<(), LobbyError> {
        let session = self
            .sessions
            .get_mut(&connection)
            .ok_or(LobbyError::UnknownSession)?;
        if let Some(seat) = &session.seat {
            return Err(LobbyError::AlreadyInRoom(seat.room.to_string()));
        }
        session.display_name = name;
        Ok(())
    }

    pub fn bind(
        &mut self,
        connection: ConnectionId,
        room: RoomId,
        symbol: Symbol,
    ) -> Result<(), LobbyError> {
        let session = self
            .sessions
            .get_mut(&connection)
            .ok_or(LobbyError::UnknownSession)?;
        session.seat = Some(Seat { room, symbol });
        Ok(())
    }

    /// Clears the seat; returns the room it held.
    pub fn unbind(&mut self, connection: ConnectionId) -> Option<RoomId> {
        self.sessions
            .get_mut(&connection)
            .and_then(|session| session.seat.take())
            .map(|seat| seat.room)
    }

    /// Discards the session. Returns `None` when it was already gone, which
    /// makes repeated disconnects harmless.
    pub fn teardown(&mut self, connection: ConnectionId) -> Option<Session> {
        self.sessions.remove(&connection)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_trims_and_rejects_blank() {
        let mut sessions = SessionManager::new();
        let session = sessions.register(ConnectionId(7), "  ann ").unwrap();
        assert_eq!(session.display_name.as_str(), "ann");
        assert_eq!(session.room(), None);

        let err = sessions.register(ConnectionId(8), "   ").unwrap_err();
        assert!(matches!(err, LobbyError::InvalidName(_)));
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn bind_then_resolve() {
        let mut sessions = SessionManager::new();
        sessions.register(ConnectionId(1), "ann").unwrap();
        let room = RoomId::parse("r1").unwrap();
        sessions.bind(ConnectionId(1), room.clone(), Symbol::X).unwrap();

        assert_eq!(sessions.resolve_room(ConnectionId(1)).unwrap(), Some(&room));
        assert_eq!(sessions.get(ConnectionId(1)).unwrap().symbol(), Some(Symbol::X));
        assert!(matches!(
            sessions.rename(ConnectionId(1), DisplayName::parse("zed").unwrap()),
            Err(LobbyError::AlreadyInRoom(_))
        ));
        assert_eq!(sessions.unbind(ConnectionId(1)), Some(room));
        assert_eq!(sessions.unbind(ConnectionId(1)), None);
    }

    #[test]
    fn teardown_is_idempotent() {
        let mut sessions = SessionManager::new();
        sessions.register(ConnectionId(1), "ann").unwrap();
        assert!(sessions.teardown(ConnectionId(1)).is_some());
        assert!(sessions.teardown(ConnectionId(1)).is_none());
        assert_eq!(sessions.get(ConnectionId(1)), Err(LobbyError::UnknownSession));
    }
}
