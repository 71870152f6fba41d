//! Connection handling logic for WebSocket clients.
//!
//! This module manages the lifecycle of individual client connections:
//! WebSocket handshake, admission, the hello exchange, the message loop and
//! cleanup.

use crate::{
    connection::ClientConnection,
    error::ServerError,
    messaging::{encode_event, parse_frame, route_client_message, Intent, ParsedFrame, Reply},
    security::AdmissionLimits,
    server::ServerContext,
};
use futures::{SinkExt, StreamExt};
use futures_util::stream::{SplitSink, SplitStream};
use noughts_core::{ConnectionId, DisplayName, Outbox, ServerEvent, Status};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

type WsSender = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsReceiver = SplitStream<WebSocketStream<TcpStream>>;

/// Reason a connection is turned away before it gets a session.
type Refusal = (Status, String);

/// Handles a single client connection from establishment to cleanup.
///
/// # Connection Flow
///
/// 1. Perform WebSocket handshake
/// 2. Admit the connection or send `rejected` and close
/// 3. Wait for `session/hello` within the configured timeout
/// 4. Register the session and send `welcome`
/// 5. Run the incoming and outgoing tasks until either ends, or until the
///    outbound queue overflows because the client stopped reading
/// 6. Disconnect the session from the lobby and drop the connection
///
/// # Arguments
///
/// * `stream` - The TCP stream for the client connection
/// * `addr` - The remote address of the client
/// * `context` - Shared server state
///
/// # Returns
///
/// `Ok(())` once the connection has been cleaned up, or a `ServerError` if the
/// WebSocket handshake failed.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    context: ServerContext,
) -> Result<(), ServerError> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| ServerError::Network(format!("WebSocket handshake failed: {e}")))?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let capacity = context.config.security.max_outbound_queue.max(1);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(capacity);
    let overflow = Arc::new(Notify::new());
    let connection = ClientConnection::new(addr, outbound_tx, overflow.clone());

    let limits = AdmissionLimits::from(context.config.as_ref());
    let connection_id = match context
        .connections
        .try_add_connection(connection, &limits)
        .await
    {
        Ok(id) => id,
        Err(e) => {
            reject(&mut ws_sender, (e.status(), e.to_string())).await;
            return Ok(());
        }
    };

    let display_name = match greet(&mut ws_receiver, connection_id, &context).await {
        Ok(name) => name,
        Err(refusal) => {
            debug!("Connection {} refused at hello: {}", connection_id, refusal.1);
            context.connections.remove_connection(connection_id).await;
            reject(&mut ws_sender, refusal).await;
            return Ok(());
        }
    };

    context
        .connections
        .send_to_connection(
            connection_id,
            &ServerEvent::Welcome {
                connection_id,
                display_name,
            },
        )
        .await;

    let incoming_task = async {
        while let Some(frame) = ws_receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    if let Err(e) = route_client_message(&text, connection_id, &context).await {
                        trace!("❌ Message routing error: {}", e);
                    }
                }
                Ok(Message::Binary(_)) => {
                    let reply = Reply::error(Status::BadRequest, "Binary frames are not supported");
                    context
                        .connections
                        .send_to_connection(connection_id, &reply.into_event(None))
                        .await;
                }
                Ok(Message::Ping(data)) => {
                    context
                        .connections
                        .send_frame(connection_id, Message::Pong(data))
                        .await;
                }
                Ok(Message::Close(_)) => {
                    debug!("🔌 Client {} requested close", connection_id);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("WebSocket error for connection {}: {}", connection_id, e);
                    break;
                }
            }
        }
    };

    let outgoing_task = async {
        while let Some(message) = outbound_rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if let Err(e) = ws_sender.send(message).await {
                error!("Failed to send message to connection {}: {}", connection_id, e);
                break;
            }
            if closing {
                break;
            }
        }
    };

    tokio::select! {
        _ = incoming_task => {},
        _ = outgoing_task => {},
        _ = overflow.notified() => {
            warn!("🐢 Connection {} fell {} frames behind, closing", connection_id, capacity);
        },
    }

    {
        let mut lobby = context.lobby.lock().await;
        let mut outbox = Outbox::new();
        lobby.disconnect(connection_id, &mut outbox);
        context.connections.deliver(outbox).await;
    }
    context.connections.remove_connection(connection_id).await;
    Ok(())
}

/// Waits for the hello frame and registers the session.
async fn greet(
    receiver: &mut WsReceiver,
    connection_id: ConnectionId,
    context: &ServerContext,
) -> Result<DisplayName, Refusal> {
    let timeout = context.config.hello_timeout();
    let raw_name = tokio::time::timeout(timeout, read_hello(receiver, context))
        .await
        .map_err(|_| {
            (
                Status::BadRequest,
                format!("No hello received within {}s", timeout.as_secs()),
            )
        })??;

    let mut lobby = context.lobby.lock().await;
    let name = lobby
        .connect(connection_id, &raw_name)
        .map_err(|e| (e.status(), e.to_string()))?;
    info!("👋 Connection {} is '{}'", connection_id, name);
    Ok(name)
}

/// Reads frames until the first text frame, which must be `session/hello`.
async fn read_hello(receiver: &mut WsReceiver, context: &ServerContext) -> Result<String, Refusal> {
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                return match parse_frame(&text, &context.config.security) {
                    Ok(ParsedFrame {
                        intent: Intent::Hello { display_name },
                        ..
                    }) => Ok(display_name),
                    Ok(frame) => Err((
                        Status::BadRequest,
                        format!("Expected session/hello, got {}", frame.intent.label()),
                    )),
                    Err((_, e)) => Err((Status::BadRequest, e.to_string())),
                };
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                return Err((Status::BadRequest, format!("WebSocket error before hello: {e}")));
            }
        }
    }
    Err((Status::BadRequest, "Connection closed before hello".to_string()))
}

/// Sends `rejected` followed by a close frame straight to the socket.
async fn reject(sender: &mut WsSender, (status, message): Refusal) {
    info!("🚫 Rejecting connection: {}", message);
    if let Some(frame) = encode_event(&ServerEvent::Rejected { status, message }) {
        let _ = sender.send(frame).await;
    }
    let _ = sender.send(Message::Close(None)).await;
}
