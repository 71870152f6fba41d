//! Core identifier and value types shared by every lobby component.
//!
//! These are lightweight newtypes: connection identifiers handed out by the
//! gateway, validated room and display names parsed from client text, and the
//! player symbol. Validation happens once at construction so the rest of the
//! crate can rely on the invariants.

use crate::error::LobbyError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a room identifier after trimming.
pub const MAX_ROOM_ID_LEN: usize = 64;

/// Maximum length of a display name after trimming.
pub const MAX_DISPLAY_NAME_LEN: usize = 32;

/// Opaque identifier for one live connection.
///
/// Assigned by the gateway from a monotonically increasing counter, so two
/// connections never share an id for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub usize);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A player's mark. `X` always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    /// Both symbols in seat-assignment order.
    pub const ALL: [Symbol; 2] = [Symbol::X, Symbol::O];

    /// The opposing symbol.
    pub fn other(self) -> Symbol {
        match self {
            Symbol::X => Symbol::O,
            Symbol::O => Symbol::X,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::X => f.write_str("X"),
            Symbol::O => f.write_str("O"),
        }
    }
}

/// Human-chosen room name, trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Parses a room id from client input.
    ///
    /// Surrounding whitespace is dropped. Fails with [`LobbyError::InvalidRoom`]
    /// when nothing is left or the name exceeds [`MAX_ROOM_ID_LEN`] characters.
    pub fn parse(raw: &str) -> Result<Self, LobbyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LobbyError::InvalidRoom("room name cannot be empty".to_string()));
        }
        if trimmed.chars().count() > MAX_ROOM_ID_LEN {
            return Err(LobbyError::InvalidRoom(format!(
                "room name longer than {MAX_ROOM_ID_LEN} characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A player's display name, trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    /// Parses a display name from client input.
    ///
    /// Fails with [`LobbyError::InvalidName`] if the name is empty after
    /// trimming or longer than [`MAX_DISPLAY_NAME_LEN`] characters.
    pub fn parse(raw: &str) -> Result<Self, LobbyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LobbyError::InvalidName("display name cannot be empty".to_string()));
        }
        if trimmed.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(LobbyError::InvalidName(format!(
                "display name longer than {MAX_DISPLAY_NAME_LEN} characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_id_is_trimmed() {
        let room = RoomId::parse("  lobby-1 ").unwrap();
        assert_eq!(room.as_str(), "lobby-1");
    }

    #[test]
    fn blank_room_id_is_rejected() {
        assert!(matches!(RoomId::parse("   "), Err(LobbyError::InvalidRoom(_))));
        assert!(matches!(RoomId::parse(""), Err(LobbyError::InvalidRoom(_))));
    }

    #[test]
    fn overlong_room_id_is_rejected() {
        let raw = "r".repeat(MAX_ROOM_ID_LEN + 1);
        assert!(matches!(RoomId::parse(&raw), Err(LobbyError::InvalidRoom(_))));
        assert!(RoomId::parse(&"r".repeat(MAX_ROOM_ID_LEN)).is_ok());
    }

    #[test]
    fn display_name_validation() {
        assert_eq!(DisplayName::parse(" alice ").unwrap().as_str(), "alice");
        assert!(matches!(DisplayName::parse("\t \n"), Err(LobbyError::InvalidName(_))));
        let raw = "n".repeat(MAX_DISPLAY_NAME_LEN + 1);
        assert!(matches!(DisplayName::parse(&raw), Err(LobbyError::InvalidName(_))));
    }

    #[test]
    fn symbol_other_flips() {
        assert_eq!(Symbol::X.other(), Symbol::O);
        assert_eq!(Symbol::O.other(), Symbol::X);
        assert_eq!(serde_json::to_string(&Symbol::X).unwrap(), "\"X\"");
    }
}
