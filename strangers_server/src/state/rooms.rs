//! Room table: realized pairings

use std::collections::HashMap;
use std::fmt;
use strangers_protocol::SessionId;

/// Room identifier, never reused within a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Two sessions bound together. Member 0 initiates the offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub members: [SessionId; 2],
}

impl Room {
    pub fn initiator(&self) -> SessionId {
        self.members[0]
    }

    pub fn responder(&self) -> SessionId {
        self.members[1]
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.members.contains(id)
    }

    /// The member that is not `id`
    pub fn other(&self, id: &SessionId) -> Option<SessionId> {
        match self.members {
            [a, b] if a == *id => Some(b),
            [a, b] if b == *id => Some(a),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct RoomTable {
    rooms: HashMap<RoomId, Room>,
    next_id: u64,
}

impl Default for RoomTable {
    fn default() -> Self {
        Self {
            rooms: HashMap::new(),
            next_id: 1,
        }
    }
}

impl RoomTable {
    /// Store a new pairing under a fresh id. Callers stamp the members' sessions.
    pub fn create(&mut self, initiator: SessionId, responder: SessionId) -> Room {
        let id = RoomId(self.next_id);
        self.next_id += 1;
        let room = Room {
            id,
            members: [initiator, responder],
        };
        self.rooms.insert(id, room);
        room
    }

    /// Remove a room, handing back its members. Dissolving twice is a no-op.
    pub fn dissolve(&mut self, id: &RoomId) -> Option<Room> {
        self.rooms.remove(id)
    }

    pub fn get(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_and_are_not_reused() {
        let mut table = RoomTable::default();
        let first = table.create(SessionId::new_v4(), SessionId::new_v4());
        assert_eq!(first.id, RoomId(1));
        assert!(table.dissolve(&first.id).is_some());

        let second = table.create(SessionId::new_v4(), SessionId::new_v4());
        assert_eq!(second.id, RoomId(2));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn dissolve_is_idempotent() {
        let mut table = RoomTable::default();
        let (a, b) = (SessionId::new_v4(), SessionId::new_v4());
        let room = table.create(a, b);

        assert_eq!(table.dissolve(&room.id), Some(room));
        assert_eq!(table.dissolve(&room.id), None);
        assert!(table.is_empty());
    }

    #[test]
    fn member_order_is_kept() {
        let (a, b) = (SessionId::new_v4(), SessionId::new_v4());
        let room = RoomTable::default().create(a, b);
        assert_eq!(room.initiator(), a);
        assert_eq!(room.responder(), b);
        assert_eq!(room.other(&a), Some(b));
        assert_eq!(room.other(&b), Some(a));
        assert_eq!(room.other(&SessionId::new_v4()), None);
    }
}
