//! Bounded, thread-safe FIFO of opaque byte payloads.
//!
//! Two condvars, not one: pushers wait on `not_full`, poppers never wait at
//! all (`try_pop` is non-blocking by design — see module docs on the
//! asymmetry below), and `close()` wakes everyone blocked on `not_full` in
//! one shot. A single condvar would work but would wake pushers on every
//! pop and vice versa; splitting them avoids that.
//!
//! Push blocks while the queue is full so that a slow consumer applies
//! backpressure to whoever is producing messages. Pop never blocks, because
//! the event loop that drains these queues must stay responsive to socket
//! I/O. The asymmetry is deliberate and applies to both the inbound and the
//! outbound queue.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

struct Inner {
    items: VecDeque<Vec<u8>>,
    capacity: usize,
    closed: bool,
}

pub struct BoundedQueue {
    inner: Mutex<Inner>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl BoundedQueue {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be > 0");
        BoundedQueue {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity.min(256)),
                capacity,
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Blocks until there is room or the queue is closed. Returns `true` if
    /// the payload was accepted, `false` if the queue was (or became)
    /// closed. An empty payload is rejected as a caller error.
    pub fn push(&self, payload: Vec<u8>) -> bool {
        if payload.is_empty() {
            return false;
        }
        let mut guard = self.inner.lock().unwrap();
        while !guard.closed && guard.items.len() >= guard.capacity {
            guard = self.not_full.wait(guard).unwrap();
        }
        if guard.closed {
            return false;
        }
        guard.items.push_back(payload);
        self.not_empty.notify_one();
        true
    }

    /// Never blocks. Returns `None` if the queue is currently empty,
    /// whether or not it is closed.
    pub fn try_pop(&self) -> Option<Vec<u8>> {
        let mut guard = self.inner.lock().unwrap();
        let item = guard.items.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Marks the queue closed and wakes every waiter. Idempotent.
    pub fn close(&self) {
        let mut guard = self.inner.lock().unwrap();
        guard.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_mq_fifo() {
        let q = BoundedQueue::new(8);
        for i in 0u8..5 {
            assert!(q.push(vec![i]));
        }
        for i in 0u8..5 {
            assert_eq!(q.try_pop(), Some(vec![i]));
        }
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn test_mq_bound_never_exceeded() {
        let q = Arc::new(BoundedQueue::new(4));
        for i in 0u8..4 {
            assert!(q.push(vec![i]));
            assert!(q.len() <= q.capacity());
        }

        // The queue is full; pushing from another thread must block until a
        // pop frees a slot, never silently exceeding capacity.
        let q2 = Arc::clone(&q);
        let pusher = thread::spawn(move || {
            q2.push(vec![99]);
        });

        thread::sleep(Duration::from_millis(50));
        assert_eq!(q.len(), 4, "queue should still be at capacity");

        assert_eq!(q.try_pop(), Some(vec![0]));
        pusher.join().unwrap();
        assert!(q.len() <= q.capacity());
    }

    #[test]
    fn test_mq_close_rejects_pushes_and_empties() {
        let q = BoundedQueue::new(4);
        assert!(q.push(vec![1]));
        q.close();
        assert!(!q.push(vec![2]), "push after close must fail");
        assert_eq!(q.try_pop(), Some(vec![1]), "pre-close item still drains");
        assert_eq!(q.try_pop(), None, "closed-and-empty pop is None, not an error");
    }

    #[test]
    fn test_mq_close_wakes_blocked_pusher() {
        let q = Arc::new(BoundedQueue::new(1));
        assert!(q.push(vec![1]));

        let q2 = Arc::clone(&q);
        let pusher = thread::spawn(move || q2.push(vec![2]));

        thread::sleep(Duration::from_millis(50));
        q.close();

        let accepted = pusher.join().unwrap();
        assert!(!accepted, "a push unblocked by close() must report rejection");
    }

    #[test]
    fn test_mq_no_leak_on_drop() {
        let q = BoundedQueue::new(4);
        q.push(vec![1, 2, 3]);
        q.push(vec![4, 5]);
        assert_eq!(q.len(), 2);
        drop(q);
        // Ownership-based: nothing to assert beyond compilation and the
        // absence of a panic — Vec<u8>'s Drop runs for every residual item
        // when the VecDeque (and thus the queue) is dropped.
    }

    #[test]
    fn test_push_rejects_empty_payload() {
        let q = BoundedQueue::new(4);
        assert!(!q.push(Vec::new()));
        assert_eq!(q.len(), 0);
    }
}
