//! WebSocket connection handling
//!
//! Each accepted socket gets its own [`ConnectionId`] and an outbound channel.
//! A writer task drains that channel into the socket while this task reads
//! frames and routes them. However the socket ends, the connection's session
//! is torn down exactly once.

use crate::error::{ClientRequestError, SignalingError};
use crate::router::route;
use crate::state::{ConnectionId, ServerState};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::str::FromStr;
use strangers_protocol::{ClientMessage, ServerMessage};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

/// Interpret one frame from the socket.
///
/// `Ok(None)` means a control frame that needs no routing.
pub fn parse_request(
    frame: Option<Result<Message, tungstenite::Error>>,
) -> Result<Option<ClientMessage>, ClientRequestError> {
    match frame {
        None => Err(ClientRequestError::Close),
        Some(Err(err)) => Err(ClientRequestError::WebSocket(err)),
        Some(Ok(Message::Text(text))) => Ok(Some(ClientMessage::from_str(text.as_str())?)),
        Some(Ok(Message::Binary(_))) => Err(ClientRequestError::UnsupportedType),
        Some(Ok(Message::Close(_))) => Err(ClientRequestError::Close),
        Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => Ok(None),
    }
}

/// Serve one client socket until it closes
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: ServerState,
) -> Result<(), SignalingError> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let connection = ConnectionId::new_v4();
    info!(%addr, %connection, "connection opened");

    let (mut ws_sender, mut ws_receiver) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if ws_sender.send(Message::text(message.to_string())).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    loop {
        tokio::select! {
            frame = ws_receiver.next() => match parse_request(frame) {
                Ok(Some(message)) => route(&state, connection, &tx, message),
                Ok(None) => {}
                Err(ClientRequestError::Close) => break,
                Err(ClientRequestError::WebSocket(err)) => {
                    warn!(%connection, %err, "websocket error");
                    break;
                }
                Err(err) => warn!(%connection, %err, "dropping malformed message"),
            },
            _ = &mut send_task => {
                debug!(%connection, "writer finished");
                break;
            }
        }
    }

    state.disconnect(connection);
    send_task.abort();
    info!(%addr, %connection, "connection closed");
    Ok(())
}
