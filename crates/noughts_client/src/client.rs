//! Request/response wrapper over one WebSocket connection.

use anyhow::{anyhow, bail, Context, Result};
use futures::{SinkExt, StreamExt};
use noughts_core::{ConnectionId, DisplayName, JoinReceipt, ServerEvent, Snapshot, Status};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long a single read may wait before the client gives up.
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of one request, as carried by the server's `reply` event.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: Status,
    pub message: String,
    pub payload: Value,
}

impl Response {
    /// Fails with the server's message unless the status is `OK`.
    pub fn ok(self) -> Result<Self> {
        if self.status.is_ok() {
            Ok(self)
        } else {
            Err(anyhow!("{:?}: {}", self.status, self.message))
        }
    }
}

/// A connected player.
///
/// Events that arrive while a request is in flight are kept in order and
/// handed out later by [`GameClient::next_event`].
pub struct GameClient {
    socket: Socket,
    next_request_id: u64,
    pending: VecDeque<ServerEvent>,
    connection_id: Option<ConnectionId>,
    display_name: Option<DisplayName>,
}

impl GameClient {
    /// Opens the WebSocket. Call [`GameClient::hello`] next.
    pub async fn connect(url: &str) -> Result<Self> {
        let (socket, _) = connect_async(url)
            .await
            .with_context(|| format!("connecting to {url}"))?;
        debug!("🔗 Connected to {}", url);
        Ok(Self {
            socket,
            next_request_id: 1,
            pending: VecDeque::new(),
            connection_id: None,
            display_name: None,
        })
    }

    /// Performs the mandatory handshake.
    pub async fn hello(&mut self, display_name: &str) -> Result<DisplayName> {
        self.send(json!({
            "namespace": "session",
            "event": "hello",
            "data": { "display_name": display_name },
        }))
        .await?;

        match self.read_event().await? {
            Some(ServerEvent::Welcome {
                connection_id,
                display_name,
            }) => {
                self.connection_id = Some(connection_id);
                self.display_name = Some(display_name.clone());
                Ok(display_name)
            }
            Some(ServerEvent::Rejected { status, message }) => {
                bail!("hello rejected with {status:?}: {message}")
            }
            Some(other) => bail!("expected welcome, got {}", other.name()),
            None => bail!("connection closed during hello"),
        }
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection_id
    }

    pub fn display_name(&self) -> Option<&DisplayName> {
        self.display_name.as_ref()
    }

    /// Sends one intent and waits for its reply.
    ///
    /// Pushes received in the meantime are queued for [`GameClient::next_event`].
    pub async fn request(&mut self, namespace: &str, event: &str, data: Value) -> Result<Response> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        self.send(json!({
            "namespace": namespace,
            "event": event,
            "data": data,
            "request_id": request_id,
        }))
        .await?;

        loop {
            match self.read_event().await? {
                Some(ServerEvent::Reply {
                    request_id: Some(id),
                    status,
                    message,
                    payload,
                }) if id == request_id => {
                    trace!("↩️ {}/{} -> {:?}", namespace, event, status);
                    return Ok(Response {
                        status,
                        message,
                        payload,
                    });
                }
                Some(other) => self.pending.push_back(other),
                None => bail!("connection closed awaiting reply to {namespace}/{event}"),
            }
        }
    }

    /// Next server push, queued ones first. `None` once the server closed.
    pub async fn next_event(&mut self) -> Result<Option<ServerEvent>> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }
        self.read_event().await
    }

    /// Skips events until `pick` accepts one.
    pub async fn wait_for<T>(
        &mut self,
        mut pick: impl FnMut(ServerEvent) -> Option<T>,
    ) -> Result<T> {
        loop {
            let event = self
                .next_event()
                .await?
                .ok_or_else(|| anyhow!("connection closed while waiting for an event"))?;
            if let Some(found) = pick(event) {
                return Ok(found);
            }
        }
    }

    /// Waits for the next `match_started` or `move_made` snapshot.
    pub async fn next_snapshot(&mut self) -> Result<Snapshot> {
        self.wait_for(|event| match event {
            ServerEvent::MatchStarted(snapshot) | ServerEvent::MoveMade(snapshot) => Some(snapshot),
            _ => None,
        })
        .await
    }

    pub async fn list_rooms(&mut self) -> Result<Vec<String>> {
        let response = self.request("lobby", "list_rooms", Value::Null).await?.ok()?;
        Ok(serde_json::from_value(response.payload)?)
    }

    pub async fn join_room(&mut self, room_id: &str) -> Result<JoinReceipt> {
        let response = self
            .request("lobby", "join_room", json!({ "room_id": room_id }))
            .await?
            .ok()?;
        Ok(serde_json::from_value(response.payload)?)
    }

    pub async fn start_match(&mut self, room_id: &str) -> Result<Snapshot> {
        let response = self
            .request("match", "start", json!({ "room_id": room_id }))
            .await?
            .ok()?;
        Ok(serde_json::from_value(response.payload)?)
    }

    /// Submits a move; refusals come back as a non-`OK` [`Response`], not an error.
    pub async fn make_move(&mut self, room_id: &str, row: usize, col: usize) -> Result<Response> {
        self.request(
            "match",
            "move",
            json!({ "room_id": room_id, "row": row, "col": col }),
        )
        .await
    }

    /// Votes for a rematch. Returns whether this vote restarted the match.
    pub async fn rematch(&mut self, room_id: &str) -> Result<bool> {
        let response = self
            .request("match", "rematch", json!({ "room_id": room_id }))
            .await?
            .ok()?;
        Ok(response.payload["restarted"].as_bool().unwrap_or(false))
    }

    pub async fn chat(&mut self, text: &str) -> Result<Response> {
        self.request("chat", "send", json!({ "text": text })).await
    }

    /// Sends a close frame and drops the connection.
    pub async fn close(mut self) -> Result<()> {
        self.socket.close(None).await?;
        Ok(())
    }

    async fn send(&mut self, frame: Value) -> Result<()> {
        self.socket
            .send(Message::Text(frame.to_string().into()))
            .await
            .context("sending frame")
    }

    async fn read_event(&mut self) -> Result<Option<ServerEvent>> {
        loop {
            let frame = tokio::time::timeout(READ_TIMEOUT, self.socket.next())
                .await
                .map_err(|_| anyhow!("no server frame within {}s", READ_TIMEOUT.as_secs()))?;
            match frame {
                Some(Ok(Message::Text(text))) => {
                    let event: ServerEvent = serde_json::from_str(&text)
                        .with_context(|| format!("undecodable server event: {}", text.as_str()))?;
                    return Ok(Some(event));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }
}
