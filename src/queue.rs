//! Bounded FIFO work queue handing parsed datagrams from the receiver thread to the
//! worker pool: a `VecDeque` behind one mutex and two condition variables
//! (not-empty, not-full), using `parking_lot` for both, consistent with the rest of
//! the cache layer.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

pub const CAPACITY: usize = 10_000;

/// Ownership of a single inbound datagram as it moves from the receiver to a worker:
/// created by the receiver, exclusively owned by the queue until a worker dequeues
/// it, then exclusively owned by that worker until the reply is sent (or the request
/// is dropped).
pub struct RequestDescriptor {
    pub client_addr: SocketAddr,
    pub bytes: Vec<u8>,
}

struct Inner {
    items: VecDeque<RequestDescriptor>,
}

pub struct WorkQueue {
    inner: Mutex<Inner>,
    not_empty: Condvar,
    not_full: Condvar,
    depth: AtomicU32,
}

impl WorkQueue {
    pub fn new() -> Arc<WorkQueue> {
        Arc::new(WorkQueue {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(CAPACITY),
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            depth: AtomicU32::new(0),
        })
    }

    /// Blocks while the queue is full, then pushes `item` to the back.
    pub fn enqueue(&self, item: RequestDescriptor) {
        let mut inner = self.inner.lock();
        while inner.items.len() >= CAPACITY {
            self.not_full.wait(&mut inner);
        }
        inner.items.push_back(item);
        self.depth.fetch_add(1, Ordering::AcqRel);
        self.not_empty.notify_one();
    }

    /// Blocks while the queue is empty, then pops the front item.
    pub fn dequeue(&self) -> RequestDescriptor {
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.items.pop_front() {
                self.depth.fetch_sub(1, Ordering::AcqRel);
                self.not_full.notify_one();
                return item;
            }
            self.not_empty.wait(&mut inner);
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth.load(Ordering::Acquire)
    }
}
