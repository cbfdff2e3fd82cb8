//! Dispatch of inbound client messages
//!
//! Lifecycle requests go to the coordinator in [`ServerState`]. Signaling
//! requests are relayed to the session named in `otherside` under a renamed
//! type, with `otherside` rewritten to the sender's id.

use crate::state::{ConnectionId, PeerSender, RelayOutcome, ServerState};
use serde_json::Value;
use strangers_protocol::{ClientMessage, ServerMessage, SessionId};
use tracing::{debug, warn};

/// Signaling payloads the server forwards without looking inside
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Offer(Value),
    Answer(Value),
    IceCandidate(Value),
}

impl Signal {
    /// Envelope the recipient sees, addressed back to `from`
    pub fn into_envelope(self, from: SessionId) -> ServerMessage {
        match self {
            Signal::Offer(sdp) => ServerMessage::SendAnswer {
                otherside: from,
                sdp,
            },
            Signal::Answer(sdp) => ServerMessage::OtherSideAnswer {
                otherside: from,
                sdp,
            },
            Signal::IceCandidate(iceconnections) => ServerMessage::IceConnection {
                otherside: from,
                iceconnections,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Signal::Offer(_) => "offer",
            Signal::Answer(_) => "answer",
            Signal::IceCandidate(_) => "onice-connection",
        }
    }
}

/// Apply one parsed message from `connection`. `reply` reaches the same connection.
pub fn route(state: &ServerState, connection: ConnectionId, reply: &PeerSender, message: ClientMessage) {
    match message {
        ClientMessage::NewUser => {
            state.join(connection, reply);
        }
        ClientMessage::DeleteUser => {
            state.leave(connection, reply);
        }
        ClientMessage::Next => {
            state.skip(connection);
        }
        ClientMessage::Offer { otherside, sdp } => {
            relay(state, connection, otherside, Signal::Offer(sdp));
        }
        ClientMessage::Answer { otherside, sdp } => {
            relay(state, connection, otherside, Signal::Answer(sdp));
        }
        ClientMessage::OniceConnection {
            otherside,
            iceconnections,
        } => {
            relay(state, connection, otherside, Signal::IceCandidate(iceconnections));
        }
        ClientMessage::Unknown => {
            debug!(%connection, "ignoring message of unknown type");
        }
    }
}

fn relay(state: &ServerState, connection: ConnectionId, to: SessionId, signal: Signal) -> RelayOutcome {
    let kind = signal.kind();
    let outcome = state.relay(connection, to, |from| signal.into_envelope(from));
    match outcome {
        RelayOutcome::Delivered => debug!(%connection, %to, kind, "relayed"),
        RelayOutcome::UnregisteredSender => {
            warn!(%connection, kind, "dropping signal from connection without a session")
        }
        RelayOutcome::UnknownRecipient | RelayOutcome::RecipientClosed => {
            debug!(%connection, %to, kind, ?outcome, "dropping signal")
        }
    }
    outcome
}
