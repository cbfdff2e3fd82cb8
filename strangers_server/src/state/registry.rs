//! Connection registry: the single owner of live sessions

use super::rooms::RoomId;
use std::collections::HashMap;
use std::fmt;
use strangers_protocol::{ServerMessage, SessionId};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Outbound half of a connection's message channel
pub type PeerSender = mpsc::UnboundedSender<ServerMessage>;

/// Identity of one transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One waiting-or-paired participant
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub connection: ConnectionId,
    pub room: Option<RoomId>,
    sender: PeerSender,
}

impl Session {
    /// Whether the owning connection is still accepting messages
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Best-effort delivery; returns `false` if the connection has gone away
    pub fn send(&self, message: ServerMessage) -> bool {
        self.sender.send(message).is_ok()
    }
}

/// Live sessions keyed by id, with a back-reference index from connections
#[derive(Debug, Default)]
pub struct Registry {
    sessions: HashMap<SessionId, Session>,
    by_connection: HashMap<ConnectionId, SessionId>,
}

impl Registry {
    /// Bind a new session to `connection`, or return the one it already has.
    ///
    /// The flag is `true` only when a session was created.
    pub fn register(&mut self, connection: ConnectionId, sender: PeerSender) -> (SessionId, bool) {
        if let Some(id) = self.by_connection.get(&connection) {
            return (*id, false);
        }

        let id = SessionId::new_v4();
        self.sessions.insert(
            id,
            Session {
                id,
                connection,
                room: None,
                sender,
            },
        );
        self.by_connection.insert(connection, id);
        (id, true)
    }

    pub fn lookup(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn lookup_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    /// Session currently bound to `connection`, if any
    pub fn session_for(&self, connection: &ConnectionId) -> Option<SessionId> {
        self.by_connection.get(connection).copied()
    }

    /// Drop a session from the live set. Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        let session = self.sessions.remove(id)?;
        self.by_connection.remove(&session.connection);
        Some(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent_per_connection() {
        let mut registry = Registry::default();
        let connection = ConnectionId::new_v4();
        let (tx, _rx) = mpsc::unbounded_channel();

        let (first, created) = registry.register(connection, tx.clone());
        assert!(created);
        let (second, created) = registry.register(connection, tx);
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.session_for(&connection), Some(first));
    }

    #[test]
    fn remove_clears_connection_index() {
        let mut registry = Registry::default();
        let connection = ConnectionId::new_v4();
        let (tx, _rx) = mpsc::unbounded_channel();
        let (id, _) = registry.register(connection, tx.clone());

        assert!(registry.remove(&id).is_some());
        assert!(registry.lookup(&id).is_none());
        assert!(registry.session_for(&connection).is_none());
        assert!(registry.remove(&id).is_none());

        // the same connection may join again with a fresh identity
        let (again, created) = registry.register(connection, tx);
        assert!(created);
        assert_ne!(again, id);
    }

    #[test]
    fn closed_receiver_marks_session_closed() {
        let mut registry = Registry::default();
        let (tx, rx) = mpsc::unbounded_channel();
        let (id, _) = registry.register(ConnectionId::new_v4(), tx);
        let session = registry.lookup(&id).unwrap();
        assert!(session.is_open());

        drop(rx);
        assert!(!session.is_open());
        assert!(!session.send(ServerMessage::OtherDidNext));
    }
}
