//! Server state management for the signaling server
//!
//! This module owns the connection registry, the waiting queue and the room
//! table. They are only reachable through [`ServerState`], which runs every
//! operation under a single lock. Outbound messages go into unbounded
//! channels, so nothing awaits network I/O while the lock is held.

mod queue;
mod registry;
mod rooms;

pub use queue::WaitingQueue;
pub use registry::{ConnectionId, PeerSender, Registry, Session};
pub use rooms::{Room, RoomId, RoomTable};

use crate::error::SignalingError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use strangers_protocol::{ServerMessage, SessionId};
use tokio::sync::Notify;
use tracing::{debug, error, info};

/// What happened to a relayed signaling message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered,
    /// The sending connection never joined, or already left
    UnregisteredSender,
    UnknownRecipient,
    RecipientClosed,
}

/// Snapshot of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub connection: ConnectionId,
    pub room: Option<RoomId>,
    pub waiting: bool,
}

#[derive(Debug, Default)]
struct InnerState {
    registry: Registry,
    queue: WaitingQueue,
    rooms: RoomTable,
}

impl InnerState {
    /// Queue a live, unpaired session
    fn enqueue(&mut self, id: SessionId) -> bool {
        match self.registry.lookup(&id) {
            Some(session) if session.room.is_none() => self.queue.enqueue(id),
            _ => false,
        }
    }

    fn pair(&mut self, initiator: SessionId, responder: SessionId) -> Result<Room, SignalingError> {
        for id in [initiator, responder] {
            let session = self
                .registry
                .lookup(&id)
                .ok_or(SignalingError::UnknownSession)?;
            if session.room.is_some() {
                return Err(SignalingError::AlreadyPaired(id));
            }
        }

        let room = self.rooms.create(initiator, responder);
        for id in &room.members {
            if let Some(session) = self.registry.lookup_mut(id) {
                session.room = Some(room.id);
            }
        }
        Ok(room)
    }

    fn dissolve(&mut self, id: &RoomId) -> Option<Room> {
        let room = self.rooms.dissolve(id)?;
        for member in &room.members {
            if let Some(session) = self.registry.lookup_mut(member) {
                session.room = None;
            }
        }
        info!(room = %room.id, "room dissolved");
        Some(room)
    }

    /// Destroy a session, dissolving its room if it had one
    fn remove_session(&mut self, id: &SessionId) -> Option<(Session, Option<Room>)> {
        self.queue.remove(id);
        let room_id = self.registry.lookup(id)?.room;
        let room = room_id.and_then(|room_id| self.dissolve(&room_id));
        let session = self.registry.remove(id)?;
        Some((session, room))
    }

    /// Tear down a departing session and send its partner back to the queue
    fn depart(&mut self, id: &SessionId) -> Option<Session> {
        let (session, room) = self.remove_session(id)?;

        if let Some(partner) = room.and_then(|room| room.other(id)) {
            if let Some(survivor) = self.registry.lookup(&partner) {
                survivor.send(ServerMessage::PartnerDisconnected);
            }
            if self.enqueue(partner) {
                info!(session = %partner, "partner requeued");
            }
        }
        Some(session)
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        for id in self.queue.iter() {
            let session = self.registry.lookup(id).expect("queued session is live");
            assert!(session.room.is_none(), "queued session {id} is in a room");
        }
        for room in self.rooms.iter() {
            for member in &room.members {
                let session = self.registry.lookup(member).expect("room member is live");
                assert_eq!(session.room, Some(room.id));
                assert!(!self.queue.contains(member), "paired session {member} is queued");
            }
        }
        for session in self.registry.iter() {
            if let Some(room_id) = session.room {
                assert!(self.rooms.get(&room_id).is_some_and(|room| room.contains(&session.id)));
            }
        }
    }
}

/// Shared handle to the matchmaking tables
#[derive(Debug, Default, Clone)]
pub struct ServerState {
    inner: Arc<Mutex<InnerState>>,
    matchable: Arc<Notify>,
}

impl ServerState {
    /// Create a new server state handle
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, InnerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wake_matchmaker_if_ready(&self, state: &InnerState) {
        if state.queue.len() >= 2 {
            self.matchable.notify_one();
        }
    }

    /// Resolves once at least two sessions have been waiting since the last wake
    pub async fn matchable(&self) {
        self.matchable.notified().await;
    }

    /// Register the connection and queue it for matching.
    ///
    /// A connection that already has a session keeps it; only the first join
    /// is answered with `user-added`.
    pub fn join(&self, connection: ConnectionId, sender: &PeerSender) -> SessionId {
        let mut state = self.lock();
        let (id, created) = state.registry.register(connection, sender.clone());
        if !created {
            debug!(session = %id, %connection, "duplicate join ignored");
            return id;
        }

        let _ = sender.send(ServerMessage::UserAdded { id });
        state.enqueue(id);
        info!(session = %id, %connection, waiting = state.queue.len(), "session joined");
        self.wake_matchmaker_if_ready(&state);
        id
    }

    /// Explicit leave: same teardown as a disconnect, but the transport stays open
    pub fn leave(&self, connection: ConnectionId, reply: &PeerSender) -> Option<SessionId> {
        let mut state = self.lock();
        let id = state.registry.session_for(&connection);
        if let Some(id) = id {
            state.depart(&id);
            info!(session = %id, %connection, "session left");
            self.wake_matchmaker_if_ready(&state);
        }
        let _ = reply.send(ServerMessage::UserDeleted { id });
        id
    }

    /// Skip the current partner.
    ///
    /// Both sessions are destroyed rather than requeued, and only the partner
    /// is told. Either side must send `new-user` again to be matched.
    pub fn skip(&self, connection: ConnectionId) -> Option<Room> {
        let mut state = self.lock();
        let Some(id) = state.registry.session_for(&connection) else {
            debug!(%connection, "skip from unregistered connection ignored");
            return None;
        };
        let Some(room_id) = state.registry.lookup(&id).and_then(|session| session.room) else {
            debug!(session = %id, "skip while not paired ignored");
            return None;
        };

        let room = state.dissolve(&room_id)?;
        let mut removed = Vec::with_capacity(2);
        for member in &room.members {
            if let Some((session, _)) = state.remove_session(member) {
                removed.push(session);
            }
        }
        if let Some(partner) = removed.iter().find(|session| session.id != id) {
            partner.send(ServerMessage::OtherDidNext);
        }
        info!(session = %id, room = %room.id, "skipped partner");
        Some(room)
    }

    /// Connection closed: drop its session and requeue the partner, if any
    pub fn disconnect(&self, connection: ConnectionId) -> Option<SessionId> {
        let mut state = self.lock();
        let id = state.registry.session_for(&connection)?;
        state.depart(&id);
        info!(session = %id, %connection, "session disconnected");
        self.wake_matchmaker_if_ready(&state);
        Some(id)
    }

    /// Pair waiting sessions two at a time, oldest first.
    ///
    /// The head of each pair becomes the initiator and is the only member
    /// told about the new room.
    pub fn match_waiting(&self) -> Vec<Room> {
        let mut state = self.lock();
        let mut formed = Vec::new();

        while let Some((initiator, responder)) = state.queue.dequeue_pair() {
            match state.pair(initiator, responder) {
                Ok(room) => {
                    if let Some(session) = state.registry.lookup(&initiator) {
                        session.send(ServerMessage::SendOffer {
                            otherside: responder,
                        });
                    }
                    info!(room = %room.id, %initiator, %responder, "room created");
                    formed.push(room);
                }
                Err(err) => error!(%err, %initiator, %responder, "refusing to pair"),
            }
        }
        formed
    }

    /// Forward a signaling message from `from` to the session `to`.
    ///
    /// `envelope` receives the sender's session id so the recipient knows whom
    /// to answer. Failures are reported, never raised.
    pub fn relay(
        &self,
        from: ConnectionId,
        to: SessionId,
        envelope: impl FnOnce(SessionId) -> ServerMessage,
    ) -> RelayOutcome {
        let state = self.lock();
        let Some(sender) = state.registry.session_for(&from) else {
            return RelayOutcome::UnregisteredSender;
        };
        let Some(recipient) = state.registry.lookup(&to) else {
            return RelayOutcome::UnknownRecipient;
        };
        if !recipient.is_open() || !recipient.send(envelope(sender)) {
            return RelayOutcome::RecipientClosed;
        }
        RelayOutcome::Delivered
    }

    pub fn lookup(&self, id: &SessionId) -> Option<SessionInfo> {
        let state = self.lock();
        state.registry.lookup(id).map(|session| SessionInfo {
            id: session.id,
            connection: session.connection,
            room: session.room,
            waiting: state.queue.contains(id),
        })
    }

    pub fn session_for(&self, connection: &ConnectionId) -> Option<SessionId> {
        self.lock().registry.session_for(connection)
    }

    pub fn room_of(&self, id: &SessionId) -> Option<Room> {
        let state = self.lock();
        let room_id = state.registry.lookup(id)?.room?;
        state.rooms.get(&room_id).copied()
    }

    /// Waiting sessions, head first
    pub fn waiting(&self) -> Vec<SessionId> {
        self.lock().queue.iter().copied().collect()
    }

    pub fn session_count(&self) -> usize {
        self.lock().registry.len()
    }

    pub fn room_count(&self) -> usize {
        self.lock().rooms.len()
    }
}
