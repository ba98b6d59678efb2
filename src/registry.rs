//! Session registry and per-session ring buffers.
//!
//! Each connected client owns a fixed-capacity ring of outbound frames.
//! Insertion into a full ring fails without evicting — this is the
//! slow-client policy: a client that cannot keep up loses its newest
//! frames rather than stalling the broadcast for everyone else. This is the
//! opposite of a byte-capacity scrollback buffer that evicts the oldest
//! bytes to make room; conflating the two policies would silently change
//! which frames a slow client never sees.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub type SessionId = u64;

/// A bounded ring of outbound frames for one session. Frames are payload
/// bytes only — there is no scratch-prefix layout here, because the
/// WebSocket crate this bridge builds on takes an owned frame and handles
/// its own wire framing internally; this ring just buffers *what* to send,
/// not *how* it's laid out on the wire.
pub struct Ring {
    frames: VecDeque<Vec<u8>>,
    capacity: usize,
}

impl Ring {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be > 0");
        Ring {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Attempts to enqueue a frame. Returns `false` (and drops `frame`)
    /// without blocking or evicting if the ring is already full.
    fn push(&mut self, frame: Vec<u8>) -> bool {
        if self.frames.len() >= self.capacity {
            return false;
        }
        self.frames.push_back(frame);
        true
    }

    pub fn pop_front(&mut self) -> Option<Vec<u8>> {
        self.frames.pop_front()
    }

    pub fn peek_front(&self) -> Option<&[u8]> {
        self.frames.front().map(Vec::as_slice)
    }

    pub fn has_pending(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

struct Session {
    ring: Ring,
}

/// The mutable set of connected client sessions, protected by a single
/// mutex held for the duration of any membership mutation or broadcast
/// walk. The event loop is single-threaded, so nothing else ever contends
/// for this lock in practice, but it is taken anyway to keep the
/// registry's invariants robust under future refactoring (e.g. a second
/// thread ever touching sessions) rather than relying on "only one thread
/// calls this" as an unstated assumption.
pub struct Registry {
    sessions: Mutex<HashMap<SessionId, Session>>,
    ring_capacity: usize,
}

pub const DEFAULT_RING_CAPACITY: usize = 64;

impl Registry {
    pub fn new(ring_capacity: usize) -> Self {
        Registry {
            sessions: Mutex::new(HashMap::new()),
            ring_capacity,
        }
    }

    pub fn insert(&self, id: SessionId) {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.insert(
            id,
            Session {
                ring: Ring::new(self.ring_capacity),
            },
        );
    }

    pub fn remove(&self, id: SessionId) {
        self.sessions.lock().unwrap().remove(&id);
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.lock().unwrap().contains_key(&id)
    }

    /// Fans `payload` out to every registered session's ring. Broadcasts to
    /// *all* sessions, including the one that just sent the payload (when
    /// called from the receive path) — this mirrors the bridge's observed
    /// contract: there is no sender-exclusion mode. Returns the number of
    /// sessions that accepted the frame; sessions whose ring was full
    /// simply drop it.
    pub fn broadcast(&self, payload: &[u8]) -> usize {
        let mut sessions = self.sessions.lock().unwrap();
        let mut delivered = 0;
        for session in sessions.values_mut() {
            if session.ring.push(payload.to_vec()) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Pops the next pending frame for `id`, if any. Used by the writable
    /// callback to drive one write per ready session per loop turn.
    pub fn pop_next_frame(&self, id: SessionId) -> Option<Vec<u8>> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.get_mut(&id).and_then(|s| s.ring.pop_front())
    }

    pub fn has_pending(&self, id: SessionId) -> bool {
        let sessions = self.sessions.lock().unwrap();
        sessions.get(&id).is_some_and(|s| s.ring.has_pending())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_fanout_to_all_live_sessions() {
        let registry = Registry::new(4);
        registry.insert(1);
        registry.insert(2);
        registry.insert(3);

        let delivered = registry.broadcast(b"hello");
        assert_eq!(delivered, 3);
        for id in [1, 2, 3] {
            assert_eq!(registry.pop_next_frame(id), Some(b"hello".to_vec()));
        }
    }

    #[test]
    fn test_broadcast_slow_client_drops_without_affecting_others() {
        let registry = Registry::new(1);
        registry.insert(1); // will be "slow": fill its ring first
        registry.insert(2);

        assert_eq!(registry.broadcast(b"first"), 2);
        // Session 1's ring (capacity 1) is now full; session 2's is also
        // full but has not yet been drained.
        let delivered = registry.broadcast(b"second");
        assert_eq!(delivered, 0, "both rings are already full");

        assert_eq!(registry.pop_next_frame(1), Some(b"first".to_vec()));
        assert_eq!(registry.pop_next_frame(2), Some(b"first".to_vec()));
        assert_eq!(registry.pop_next_frame(1), None);
        assert_eq!(registry.pop_next_frame(2), None);
    }

    #[test]
    fn test_broadcast_one_full_one_available() {
        let registry = Registry::new(1);
        registry.insert(1);
        registry.broadcast(b"fills ring 1"); // ring for 1 is now full
        registry.insert(2); // fresh, empty ring

        let delivered = registry.broadcast(b"second");
        assert_eq!(delivered, 1, "exactly one session has room");
        assert_eq!(registry.pop_next_frame(2), Some(b"second".to_vec()));
    }

    #[test]
    fn test_remove_drops_ring_and_pending_frames() {
        let registry = Registry::new(4);
        registry.insert(1);
        registry.broadcast(b"queued");
        assert!(registry.contains(1));
        registry.remove(1);
        assert!(!registry.contains(1));
        assert_eq!(registry.session_count(), 0);
    }

    #[test]
    fn test_ring_push_fails_without_evicting_when_full() {
        let mut ring = Ring::new(2);
        assert!(ring.push(vec![1]));
        assert!(ring.push(vec![2]));
        assert!(!ring.push(vec![3]), "ring must refuse rather than evict");
        assert_eq!(ring.pop_front(), Some(vec![1]));
        assert_eq!(ring.pop_front(), Some(vec![2]));
        assert_eq!(ring.pop_front(), None);
    }
}
