//! Matchmaking and WebRTC signaling relay for anonymous one-on-one video calls
//!
//! Participants connect over WebSocket and ask to be matched. Waiting
//! participants are paired in join order; the earlier one is told to start
//! the offer/answer exchange, and the server relays offers, answers and ICE
//! candidates between the two by session id. Media never passes through the
//! server, and SDP/ICE payloads are forwarded without inspection.
//!
//! # Lifecycle
//!
//! - `new-user` registers a session and queues it (once per connection)
//! - the matchmaker pairs the two oldest waiting sessions into a room and
//!   sends `send-offer` to the first
//! - `next` dissolves the room, destroys both sessions and sends
//!   `other-did-next` to the partner; both must send `new-user` again
//! - a closed connection or `delete-user` dissolves the room, sends
//!   `partner-disconnected` to the partner and puts the partner back at the
//!   tail of the queue
//!
//! See [`strangers_protocol`] for the message formats.
//!
//! # Example
//!
//! ```bash
//! STRANGERS_ADDR=127.0.0.1:8080 RUST_LOG=debug strangers-signaling
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handler;
pub mod matchmaker;
pub mod router;
pub mod state;

pub use config::ServerConfig;
pub use error::SignalingError;
pub use handler::handle_connection;
pub use state::{ConnectionId, RelayOutcome, Room, RoomId, ServerState};

use std::future::Future;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Bind the configured address and serve until Ctrl-C
pub async fn run(config: ServerConfig) -> Result<(), SignalingError> {
    let listener = TcpListener::bind(config.addr).await?;
    serve(
        listener,
        ServerState::new(),
        config.match_interval(),
        shutdown_signal(),
    )
    .await
}

/// Accept connections on `listener` until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: ServerState,
    match_interval: Duration,
    shutdown: impl Future<Output = ()>,
) -> Result<(), SignalingError> {
    let addr = listener.local_addr()?;
    info!("Signaling server listening on ws://{}", addr);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let matchmaker = tokio::spawn(matchmaker::run(state.clone(), match_interval, async move {
        let _ = stop_rx.await;
    }));

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let state = state.clone();
                    tokio::spawn(async move {
                        if let Err(err) = handle_connection(stream, peer, state).await {
                            warn!(%peer, %err, "connection failed");
                        }
                    });
                }
                Err(err) => error!(%err, "failed to accept connection"),
            },
        }
    }

    info!("Signaling server shutting down");
    let _ = stop_tx.send(());
    let _ = matchmaker.await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
