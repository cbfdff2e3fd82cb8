//! Strict FIFO of sessions waiting for a partner

use std::collections::{HashSet, VecDeque};
use strangers_protocol::SessionId;

#[derive(Debug, Default)]
pub struct WaitingQueue {
    order: VecDeque<SessionId>,
    members: HashSet<SessionId>,
}

impl WaitingQueue {
    /// Append to the tail. Returns `false` if the session is already waiting.
    pub fn enqueue(&mut self, id: SessionId) -> bool {
        if !self.members.insert(id) {
            return false;
        }
        self.order.push_back(id);
        true
    }

    /// Take the two oldest entries, head first, or nothing if fewer than two wait
    pub fn dequeue_pair(&mut self) -> Option<(SessionId, SessionId)> {
        if self.order.len() < 2 {
            return None;
        }
        let first = self.order.pop_front()?;
        let second = self.order.pop_front()?;
        self.members.remove(&first);
        self.members.remove(&second);
        Some((first, second))
    }

    pub fn remove(&mut self, id: &SessionId) -> bool {
        if !self.members.remove(id) {
            return false;
        }
        self.order.retain(|queued| queued != id);
        true
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionId> {
        self.order.iter()
    }
}
