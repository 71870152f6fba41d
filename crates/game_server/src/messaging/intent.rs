//! Typed client intents.
//!
//! Every supported `(namespace, event)` pair maps to exactly one [`Intent`]
//! variant with a typed payload. Anything else is a protocol error answered
//! with `BAD_REQUEST`.

use super::types::ClientMessage;
use crate::error::ServerError;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// One parsed client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Hello { display_name: String },
    ListRooms,
    JoinRoom {
        room_id: String,
        display_name: Option<String>,
    },
    CheckRoom,
    RoomInfo,
    LeaveRoom,
    GameInfo { room_id: String },
    StartMatch { room_id: String },
    Move { room_id: String, row: i64, col: i64 },
    Rematch { room_id: String },
    SendChat { text: String },
    Ping,
    AdminClear { token: String },
}

#[derive(Deserialize)]
struct HelloData {
    display_name: String,
}

#[derive(Deserialize)]
struct JoinData {
    room_id: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct RoomData {
    room_id: String,
}

#[derive(Deserialize)]
struct MoveData {
    room_id: String,
    row: i64,
    col: i64,
}

#[derive(Deserialize)]
struct ChatData {
    text: String,
}

#[derive(Deserialize)]
struct AdminData {
    token: String,
}

impl Intent {
    /// Resolves a client envelope into a typed intent.
    pub fn parse(message: &ClientMessage) -> Result<Self, ServerError> {
        let intent = match (message.namespace.as_str(), message.event.as_str()) {
            ("session", "hello") => {
                let data: HelloData = payload(message)?;
                Intent::Hello {
                    display_name: data.display_name,
                }
            }
            ("lobby", "list_rooms") => Intent::ListRooms,
            ("lobby", "join_room") => {
                let data: JoinData = payload(message)?;
                Intent::JoinRoom {
                    room_id: data.room_id,
                    display_name: data.display_name,
                }
            }
            ("lobby", "check_room") => Intent::CheckRoom,
            ("lobby", "room_info") => Intent::RoomInfo,
            ("lobby", "leave_room") => Intent::LeaveRoom,
            ("match", "game_info") => Intent::GameInfo {
                room_id: payload::<RoomData>(message)?.room_id,
            },
            ("match", "start") => Intent::StartMatch {
                room_id: payload::<RoomData>(message)?.room_id,
            },
            ("match", "move") => {
                let data: MoveData = payload(message)?;
                Intent::Move {
                    room_id: data.room_id,
                    row: data.row,
                    col: data.col,
                }
            }
            ("match", "rematch") => Intent::Rematch {
                room_id: payload::<RoomData>(message)?.room_id,
            },
            ("chat", "send") => Intent::SendChat {
                text: payload::<ChatData>(message)?.text,
            },
            ("system", "ping") => Intent::Ping,
            ("admin", "clear") => Intent::AdminClear {
                token: payload::<AdminData>(message)?.token,
            },
            (namespace, event) => {
                return Err(ServerError::Protocol(format!(
                    "Unknown intent {namespace}/{event}"
                )));
            }
        };
        Ok(intent)
    }

    /// `namespace/event` label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Intent::Hello { .. } => "session/hello",
            Intent::ListRooms => "lobby/list_rooms",
            Intent::JoinRoom { .. } => "lobby/join_room",
            Intent::CheckRoom => "lobby/check_room",
            Intent::RoomInfo => "lobby/room_info",
            Intent::LeaveRoom => "lobby/leave_room",
            Intent::GameInfo { .. } => "match/game_info",
            Intent::StartMatch { .. } => "match/start",
            Intent::Move { .. } => "match/move",
            Intent::Rematch { .. } => "match/rematch",
            Intent::SendChat { .. } => "chat/send",
            Intent::Ping => "system/ping",
            Intent::AdminClear { .. } => "admin/clear",
        }
    }
}

fn payload<T: DeserializeOwned>(message: &ClientMessage) -> Result<T, ServerError> {
    serde_json::from_value(message.data.clone()).map_err(|e| {
        ServerError::Protocol(format!(
            "Invalid data for {}/{}: {}",
            message.namespace, message.event, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(namespace: &str, event: &str, data: serde_json::Value) -> ClientMessage {
        ClientMessage {
            namespace: namespace.to_string(),
            event: event.to_string(),
            data,
            request_id: None,
        }
    }

    #[test]
    fn test_parse_move() {
        let data = json!({"room_id": "den", "row": 2, "col": -1});
        let intent = Intent::parse(&message("match", "move", data));
        assert_eq!(
            intent.unwrap(),
            Intent::Move {
                room_id: "den".into(),
                row: 2,
                col: -1
            }
        );
    }

    #[test]
    fn test_join_name_is_optional() {
        let data = json!({"room_id": "den"});
        let intent = Intent::parse(&message("lobby", "join_room", data)).unwrap();
        assert_eq!(
            intent,
            Intent::JoinRoom {
                room_id: "den".into(),
                display_name: None
            }
        );
    }

    #[test]
    fn test_dataless_intents_ignore_payload() {
        let frame = message("lobby", "list_rooms", serde_json::Value::Null);
        let intent = Intent::parse(&frame).unwrap();
        assert_eq!(intent, Intent::ListRooms);
        assert_eq!(intent.label(), "lobby/list_rooms");
    }

    #[test]
    fn test_rejects_unknown_and_malformed() {
        assert!(matches!(
            Intent::parse(&message("movement", "jump", json!({}))),
            Err(ServerError::Protocol(_))
        ));
        assert!(matches!(
            Intent::parse(&message("match", "move", json!({"room_id": "den", "row": "a"}))),
            Err(ServerError::Protocol(_))
        ));
    }
}
