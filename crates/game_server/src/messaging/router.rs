//! Message routing logic for dispatching client intents to the lobby.
//!
//! Each intent has one handler function below. Handlers run with the lobby
//! lock held and never await, so every intent is validated and applied as a
//! single step. The resulting outbox, with the caller's `reply` appended last,
//! is delivered before the lock is released.

use super::intent::Intent;
use super::types::{ClientMessage, Reply};
use crate::config::{SecurityConfig, ServerConfig};
use crate::error::ServerError;
use crate::security::validate_json_message;
use crate::server::ServerContext;
use noughts_core::{ConnectionId, Lobby, LobbyError, Outbox, RematchOutcome, ServerEvent, Status};
use serde_json::json;
use tracing::{debug, trace, warn};

/// A frame that passed validation and resolved to an intent.
#[derive(Debug)]
pub struct ParsedFrame {
    pub request_id: Option<u64>,
    pub intent: Intent,
}

/// Validates and parses one text frame.
///
/// On failure the request id is still returned when it could be read, so the
/// `BAD_REQUEST` reply can echo it.
pub fn parse_frame(
    text: &str,
    limits: &SecurityConfig,
) -> Result<ParsedFrame, (Option<u64>, ServerError)> {
    let value = validate_json_message(text.as_bytes(), limits)
        .map_err(|e| (None, ServerError::Protocol(e.to_string())))?;
    let request_id = value.get("request_id").and_then(serde_json::Value::as_u64);

    let message: ClientMessage = serde_json::from_value(value)
        .map_err(|e| (request_id, ServerError::Protocol(format!("Malformed envelope: {e}"))))?;
    let intent = Intent::parse(&message).map_err(|e| (request_id, e))?;

    Ok(ParsedFrame { request_id, intent })
}

/// Routes a raw client message to the matching intent handler.
///
/// # Arguments
///
/// * `text` - The raw message text from the client (expected to be JSON)
/// * `connection_id` - The connection that sent it
/// * `context` - Shared server state
///
/// # Returns
///
/// `Ok(())` once a reply has been queued. Frames that fail validation are
/// answered with `BAD_REQUEST` and reported as a `ServerError::Protocol`;
/// the connection stays open either way.
pub async fn route_client_message(
    text: &str,
    connection_id: ConnectionId,
    context: &ServerContext,
) -> Result<(), ServerError> {
    let ParsedFrame { request_id, intent } = match parse_frame(text, &context.config.security) {
        Ok(frame) => frame,
        Err((request_id, e)) => {
            let reply = Reply::error(Status::BadRequest, e.to_string());
            context
                .connections
                .send_to_connection(connection_id, &reply.into_event(request_id))
                .await;
            return Err(e);
        }
    };

    debug!("📨 {} from connection {}", intent.label(), connection_id);

    let mut lobby = context.lobby.lock().await;
    let mut outbox = Outbox::new();
    let reply = dispatch(intent, connection_id, &mut lobby, &mut outbox, &context.config);
    if !reply.status.is_ok() {
        trace!("Connection {} refused: {:?} {}", connection_id, reply.status, reply.message);
    }
    outbox.push(connection_id, reply.into_event(request_id));
    context.connections.deliver(outbox).await;
    Ok(())
}

/// Runs one intent against the lobby and builds the caller's reply.
pub fn dispatch(
    intent: Intent,
    connection_id: ConnectionId,
    lobby: &mut Lobby,
    outbox: &mut Outbox,
    config: &ServerConfig,
) -> Reply {
    let result = match intent {
        Intent::Hello { .. } => {
            return Reply::error(Status::BadRequest, "Hello already completed");
        }
        Intent::AdminClear { token } => return handle_admin_clear(&token, lobby, outbox, config),
        Intent::Ping => Ok(handle_ping(connection_id, outbox)),
        Intent::ListRooms => Ok(handle_list_rooms(lobby)),
        Intent::JoinRoom {
            room_id,
            display_name,
        } => handle_join_room(lobby, connection_id, &room_id, display_name.as_deref(), outbox),
        Intent::CheckRoom => handle_check_room(lobby, connection_id),
        Intent::RoomInfo => handle_room_info(lobby, connection_id),
        Intent::LeaveRoom => handle_leave_room(lobby, connection_id, outbox),
        Intent::GameInfo { room_id } => handle_game_info(lobby, connection_id, &room_id),
        Intent::StartMatch { room_id } => handle_start(lobby, connection_id, &room_id, outbox),
        Intent::Move { room_id, row, col } => {
            handle_move(lobby, connection_id, &room_id, row, col, outbox)
        }
        Intent::Rematch { room_id } => handle_rematch(lobby, connection_id, &room_id, outbox),
        Intent::SendChat { text } => handle_chat(lobby, connection_id, &text, outbox),
    };

    result.unwrap_or_else(|err| Reply::error(err.status(), err.to_string()))
}

fn handle_ping(connection_id: ConnectionId, outbox: &mut Outbox) -> Reply {
    outbox.push(connection_id, ServerEvent::Pong);
    Reply::ok("pong", serde_json::Value::Null)
}

fn handle_list_rooms(lobby: &Lobby) -> Reply {
    let rooms = lobby.list_open_rooms();
    Reply::ok(format!("{} open room(s)", rooms.len()), json!(rooms))
}

fn handle_join_room(
    lobby: &mut Lobby,
    connection_id: ConnectionId,
    room_id: &str,
    display_name: Option<&str>,
    outbox: &mut Outbox,
) -> Result<Reply, LobbyError> {
    let receipt = lobby.join_room(connection_id, room_id, display_name, outbox)?;
    Ok(Reply::ok(
        format!("Joined room {} as {}", receipt.room_id, receipt.symbol),
        json!(receipt),
    ))
}

fn handle_check_room(lobby: &Lobby, connection_id: ConnectionId) -> Result<Reply, LobbyError> {
    let room = lobby.current_room(connection_id)?;
    let message = match &room {
        Some(room) => format!("In room {room}"),
        None => "Not in a room".to_string(),
    };
    Ok(Reply::ok(message, json!(room)))
}

fn handle_room_info(lobby: &Lobby, connection_id: ConnectionId) -> Result<Reply, LobbyError> {
    let info = lobby.room_info(connection_id)?;
    Ok(Reply::ok(format!("Room {}", info.room_id), json!(info)))
}

fn handle_leave_room(
    lobby: &mut Lobby,
    connection_id: ConnectionId,
    outbox: &mut Outbox,
) -> Result<Reply, LobbyError> {
    let room = lobby.leave_room(connection_id, outbox)?;
    Ok(Reply::ok(format!("Left room {room}"), json!({ "room_id": room })))
}

fn handle_game_info(
    lobby: &Lobby,
    connection_id: ConnectionId,
    room_id: &str,
) -> Result<Reply, LobbyError> {
    let snapshot = lobby.game_info(connection_id, room_id)?;
    let message = if snapshot.is_some() {
        "Current match state"
    } else {
        "No match yet"
    };
    Ok(Reply::ok(message, json!(snapshot)))
}

fn handle_start(
    lobby: &mut Lobby,
    connection_id: ConnectionId,
    room_id: &str,
    outbox: &mut Outbox,
) -> Result<Reply, LobbyError> {
    let snapshot = lobby.start_match(connection_id, room_id, outbox)?;
    Ok(Reply::ok("Match started", json!(snapshot)))
}

fn handle_move(
    lobby: &mut Lobby,
    connection_id: ConnectionId,
    room_id: &str,
    row: i64,
    col: i64,
    outbox: &mut Outbox,
) -> Result<Reply, LobbyError> {
    let outcome = lobby.submit_move(connection_id, room_id, row, col, outbox)?;
    Ok(Reply::ok("Move accepted", json!({ "outcome": outcome })))
}

fn handle_rematch(
    lobby: &mut Lobby,
    connection_id: ConnectionId,
    room_id: &str,
    outbox: &mut Outbox,
) -> Result<Reply, LobbyError> {
    let reply = match lobby.request_rematch(connection_id, room_id, outbox)? {
        RematchOutcome::Pending => {
            Reply::ok("Rematch requested", json!({ "restarted": false }))
        }
        RematchOutcome::Restarted(_) => {
            Reply::ok("Rematch starting", json!({ "restarted": true }))
        }
    };
    Ok(reply)
}

fn handle_chat(
    lobby: &mut Lobby,
    connection_id: ConnectionId,
    text: &str,
    outbox: &mut Outbox,
) -> Result<Reply, LobbyError> {
    let delivered = lobby.send_chat(connection_id, text, outbox)?;
    let message = if delivered { "Sent" } else { "Empty message ignored" };
    Ok(Reply::ok(message, json!({ "delivered": delivered })))
}

fn handle_admin_clear(
    token: &str,
    lobby: &mut Lobby,
    outbox: &mut Outbox,
    config: &ServerConfig,
) -> Reply {
    match config.admin_token.as_deref() {
        Some(expected) if expected == token => {
            let rooms = lobby.clear(outbox);
            Reply::ok(format!("Cleared {rooms} room(s)"), json!({ "rooms_cleared": rooms }))
        }
        Some(_) => {
            warn!("🔐 Rejected admin/clear with a wrong token");
            Reply::error(Status::Unauthorized, "Invalid admin token")
        }
        None => Reply::error(Status::Unauthorized, "Administrative intents are disabled"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby_with(names: &[(usize, &str)]) -> Lobby {
        let mut lobby = Lobby::default();
        for (id, name) in names {
            lobby.connect(ConnectionId(*id), name).unwrap();
        }
        lobby
    }

    #[test]
    fn test_parse_frame_keeps_request_id_on_error() {
        let limits = SecurityConfig::default();
        let frame = r#"{"namespace": "nope", "event": "x", "request_id": 9}"#;
        let err = parse_frame(frame, &limits).unwrap_err();
        assert_eq!(err.0, Some(9));
        let err = parse_frame("{", &limits).unwrap_err();
        assert_eq!(err.0, None);
    }

    #[test]
    fn test_dispatch_join_then_check() {
        let mut lobby = lobby_with(&[(1, "ann")]);
        let config = ServerConfig::default();
        let mut outbox = Outbox::new();

        let reply = dispatch(
            Intent::JoinRoom {
                room_id: "den".into(),
                display_name: None,
            },
            ConnectionId(1),
            &mut lobby,
            &mut outbox,
            &config,
        );
        assert_eq!(reply.status, Status::Ok);
        assert_eq!(reply.payload["symbol"], "X");

        let reply = dispatch(Intent::CheckRoom, ConnectionId(1), &mut lobby, &mut outbox, &config);
        assert_eq!(reply.payload, json!("den"));
    }

    #[test]
    fn test_dispatch_maps_lobby_errors() {
        let mut lobby = lobby_with(&[(1, "ann")]);
        let config = ServerConfig::default();
        let mut outbox = Outbox::new();
        let reply = dispatch(
            Intent::Move {
                room_id: "den".into(),
                row: 0,
                col: 0,
            },
            ConnectionId(1),
            &mut lobby,
            &mut outbox,
            &config,
        );
        assert_eq!(reply.status, Status::NotInRoom);
        assert_eq!(reply.payload, serde_json::Value::Null);
    }

    #[test]
    fn test_admin_clear_requires_token() {
        let mut lobby = lobby_with(&[(1, "ann")]);
        let mut outbox = Outbox::new();
        let clear = || Intent::AdminClear { token: "secret".into() };

        let disabled = ServerConfig::default();
        let reply = dispatch(clear(), ConnectionId(1), &mut lobby, &mut outbox, &disabled);
        assert_eq!(reply.status, Status::Unauthorized);

        let enabled = ServerConfig {
            admin_token: Some("secret".into()),
            ..ServerConfig::default()
        };
        let reply = dispatch(clear(), ConnectionId(1), &mut lobby, &mut outbox, &enabled);
        assert_eq!(reply.status, Status::Ok);
        assert_eq!(reply.payload["rooms_cleared"], 0);
    }

    #[test]
    fn test_second_hello_is_bad_request() {
        let mut lobby = lobby_with(&[(1, "ann")]);
        let mut outbox = Outbox::new();
        let reply = dispatch(
            Intent::Hello {
                display_name: "ann".into(),
            },
            ConnectionId(1),
            &mut lobby,
            &mut outbox,
            &ServerConfig::default(),
        );
        assert_eq!(reply.status, Status::BadRequest);
    }
}
