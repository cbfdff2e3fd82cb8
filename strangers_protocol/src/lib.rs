//! Wire messages for the strangers matchmaking server
//!
//! Every frame is a UTF-8 JSON object carrying a mandatory `type` tag.
//! SDP and ICE payloads are opaque to the server and travel as raw JSON
//! values.
//!
//! # Client → server
//!
//! - `{"type": "new-user"}` - join the waiting queue
//! - `{"type": "delete-user"}` - leave without closing the connection
//! - `{"type": "next"}` - skip the current partner
//! - `{"type": "offer", "otherside": "<uuid>", "sdp": ...}`
//! - `{"type": "answer", "otherside": "<uuid>", "sdp": ...}`
//! - `{"type": "onice-connection", "otherside": "<uuid>", "iceconnections": ...}`
//!
//! # Server → client
//!
//! - `{"type": "user-added", "id": "<uuid>"}`
//! - `{"type": "user-deleted", "id": "<uuid>"}`
//! - `{"type": "send-offer", "otherside": "<uuid>"}`
//! - `{"type": "send-answer", "otherside": "<uuid>", "sdp": ...}`
//! - `{"type": "other-side-answer", "otherside": "<uuid>", "sdp": ...}`
//! - `{"type": "ice-connection", "otherside": "<uuid>", "iceconnections": ...}`
//! - `{"type": "other-did-next"}`
//! - `{"type": "partner-disconnected"}`

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Identity of one matchmaking session, valid for a single connection's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Messages sent by a participant to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    NewUser,
    DeleteUser,
    Next,
    Offer {
        otherside: SessionId,
        #[serde(default)]
        sdp: Value,
    },
    Answer {
        otherside: SessionId,
        #[serde(default)]
        sdp: Value,
    },
    OniceConnection {
        otherside: SessionId,
        #[serde(default)]
        iceconnections: Value,
    },
    /// Any `type` this server does not know about
    #[serde(other)]
    Unknown,
}

/// Messages sent by the server to a participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    UserAdded {
        id: SessionId,
    },
    UserDeleted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<SessionId>,
    },
    /// The receiver is the initiator of a fresh pairing and should create an offer
    SendOffer {
        otherside: SessionId,
    },
    /// An offer forwarded from `otherside`
    SendAnswer {
        otherside: SessionId,
        sdp: Value,
    },
    /// An answer forwarded from `otherside`
    OtherSideAnswer {
        otherside: SessionId,
        sdp: Value,
    },
    /// An ICE candidate forwarded from `otherside`
    IceConnection {
        otherside: SessionId,
        iceconnections: Value,
    },
    OtherDidNext,
    PartnerDisconnected,
}

impl FromStr for ClientMessage {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl FromStr for ServerMessage {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_unit_requests() {
        assert_eq!(
            ClientMessage::from_str(r#"{"type":"new-user"}"#).unwrap(),
            ClientMessage::NewUser
        );
        assert_eq!(
            ClientMessage::from_str(r#"{"type":"delete-user"}"#).unwrap(),
            ClientMessage::DeleteUser
        );
        assert_eq!(
            ClientMessage::from_str(r#"{"type":"next","extra":true}"#).unwrap(),
            ClientMessage::Next
        );
    }

    #[test]
    fn parses_ice_candidate_with_opaque_payload() {
        let id = SessionId::new_v4();
        let text = json!({
            "type": "onice-connection",
            "otherside": id,
            "iceconnections": { "candidate": "candidate:1 1 udp 2122260223 10.0.0.1 5000 typ host", "sdpMLineIndex": 0 }
        })
        .to_string();

        match ClientMessage::from_str(&text).unwrap() {
            ClientMessage::OniceConnection {
                otherside,
                iceconnections,
            } => {
                assert_eq!(otherside, id);
                assert_eq!(iceconnections["sdpMLineIndex"], 0);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn missing_sdp_becomes_null() {
        let id = SessionId::new_v4();
        let text = json!({ "type": "offer", "otherside": id }).to_string();
        assert_eq!(
            ClientMessage::from_str(&text).unwrap(),
            ClientMessage::Offer {
                otherside: id,
                sdp: Value::Null
            }
        );
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        assert_eq!(
            ClientMessage::from_str(r#"{"type":"typing-indicator","on":true}"#).unwrap(),
            ClientMessage::Unknown
        );
    }

    #[test]
    fn malformed_requests_are_errors() {
        assert!(ClientMessage::from_str("not json").is_err());
        assert!(ClientMessage::from_str(r#"{"otherside":"x"}"#).is_err());
        assert!(ClientMessage::from_str(r#"{"type":"offer","sdp":{}}"#).is_err());
        assert!(ClientMessage::from_str(r#"{"type":"answer","otherside":"not-a-uuid"}"#).is_err());
    }

    #[test]
    fn server_messages_use_kebab_case_tags() {
        let id = SessionId::new_v4();
        let value: Value = serde_json::from_str(
            &ServerMessage::OtherSideAnswer {
                otherside: id,
                sdp: json!({"type": "answer", "sdp": "v=0"}),
            }
            .to_string(),
        )
        .unwrap();
        assert_eq!(value["type"], "other-side-answer");
        assert_eq!(value["otherside"], id.to_string());
        assert_eq!(value["sdp"]["sdp"], "v=0");

        assert_eq!(
            ServerMessage::OtherDidNext.to_string(),
            r#"{"type":"other-did-next"}"#
        );
        assert_eq!(
            ServerMessage::PartnerDisconnected.to_string(),
            r#"{"type":"partner-disconnected"}"#
        );
    }

    #[test]
    fn user_deleted_omits_missing_id() {
        assert_eq!(
            ServerMessage::UserDeleted { id: None }.to_string(),
            r#"{"type":"user-deleted"}"#
        );
        let id = SessionId::new_v4();
        assert_eq!(
            ServerMessage::UserDeleted { id: Some(id) }.to_string(),
            format!(r#"{{"type":"user-deleted","id":"{id}"}}"#)
        );
    }
}
