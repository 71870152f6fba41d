//! Error types for lobby operations.
//!
//! Every failure a client can trigger is a [`LobbyError`]. Each variant maps to
//! a machine-distinguishable [`Status`] code that travels on the wire next to
//! the human-readable message, so clients can branch without parsing text.
//! None of these errors are fatal to a connection.

use serde::{Deserialize, Serialize};

/// Machine-readable status carried in every reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    InvalidName,
    InvalidRoom,
    InvalidCell,
    WrongTurn,
    GameOver,
    RoomFull,
    AlreadyInRoom,
    NotInRoom,
    NoActiveMatch,
    AlreadyStarted,
    RoomNotReady,
    UnknownSession,
    ServerFull,
    TooManyConnections,
    BadRequest,
    Unauthorized,
}

impl Status {
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

/// Failures raised by the session manager, room registry and match coordinator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    /// Display name empty after trimming, or too long
    #[error("Invalid display name: {0}")]
    InvalidName(String),

    /// Room name empty after trimming, or too long
    #[error("Invalid room name: {0}")]
    InvalidRoom(String),

    /// Cell out of range or already occupied
    #[error("Invalid cell ({row}, {col})")]
    InvalidCell { row: i64, col: i64 },

    /// Move submitted by the player whose turn it is not
    #[error("It is not your turn")]
    WrongTurn,

    /// The match already has a winner or a full board
    #[error("The match is over; request a rematch to play again")]
    GameOver,

    /// Room already has two members
    #[error("Room {0} is full")]
    RoomFull(String),

    /// Session is already seated in a room
    #[error("Already in room {0}")]
    AlreadyInRoom(String),

    /// Session is not in the room the request names (or in any room)
    #[error("Not in room {0}")]
    NotInRoom(String),

    /// No match is bound to the room
    #[error("No active match in room {0}")]
    NoActiveMatch(String),

    /// A non-terminal match already exists for the room
    #[error("A match is already in progress in room {0}")]
    AlreadyStarted(String),

    /// Fewer than two members are seated
    #[error("Room {0} is waiting for a second player")]
    RoomNotReady(String),

    /// Connection never completed the hello handshake, or already left
    #[error("Unknown session")]
    UnknownSession,
}

impl LobbyError {
    /// The wire status code for this error.
    pub fn status(&self) -> Status {
        match self {
            LobbyError::InvalidName(_) => Status::InvalidName,
            LobbyError::InvalidRoom(_) => Status::InvalidRoom,
            LobbyError::InvalidCell { .. } => Status::InvalidCell,
            LobbyError::WrongTurn => Status::WrongTurn,
            LobbyError::GameOver => Status::GameOver,
            LobbyError::RoomFull(_) => Status::RoomFull,
            LobbyError::AlreadyInRoom(_) => Status::AlreadyInRoom,
            LobbyError::NotInRoom(_) => Status::NotInRoom,
            LobbyError::NoActiveMatch(_) => Status::NoActiveMatch,
            LobbyError::AlreadyStarted(_) => Status::AlreadyStarted,
            LobbyError::RoomNotReady(_) => Status::RoomNotReady,
            LobbyError::UnknownSession => Status::UnknownSession,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_serialize_screaming() {
        assert_eq!(serde_json::to_string(&Status::RoomFull).unwrap(), "\"ROOM_FULL\"");
        assert_eq!(serde_json::to_string(&Status::Ok).unwrap(), "\"OK\"");
        assert_eq!(
            serde_json::to_string(&Status::NoActiveMatch).unwrap(),
            "\"NO_ACTIVE_MATCH\""
        );
    }

    #[test]
    fn errors_map_to_status() {
        assert_eq!(LobbyError::WrongTurn.status(), Status::WrongTurn);
        assert_eq!(LobbyError::InvalidCell { row: 3, col: 0 }.status(), Status::InvalidCell);
        assert_eq!(LobbyError::RoomFull("a".into()).status(), Status::RoomFull);
        assert!(!LobbyError::UnknownSession.status().is_ok());
    }
}
