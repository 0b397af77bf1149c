//! Single-producer FIFO ordering, and `enqueue` blocking at exactly the
//! 10,000-item bound.

use std::net::SocketAddr;
use std::thread;
use std::time::Duration;

use shieldns::queue::{RequestDescriptor, WorkQueue, CAPACITY};

fn descriptor(tag: u8) -> RequestDescriptor {
    RequestDescriptor {
        client_addr: "127.0.0.1:9999".parse::<SocketAddr>().unwrap(),
        bytes: vec![tag],
    }
}

#[test]
fn single_producer_dequeue_order_matches_enqueue_order() {
    let queue = WorkQueue::new();
    for i in 0..200u8 {
        queue.enqueue(descriptor(i));
    }
    for i in 0..200u8 {
        let item = queue.dequeue();
        assert_eq!(item.bytes, vec![i]);
    }
}

#[test]
fn depth_tracks_enqueue_and_dequeue() {
    let queue = WorkQueue::new();
    assert_eq!(queue.depth(), 0);
    queue.enqueue(descriptor(1));
    queue.enqueue(descriptor(2));
    assert_eq!(queue.depth(), 2);
    queue.dequeue();
    assert_eq!(queue.depth(), 1);
}

/// `enqueue` blocks once the queue holds `CAPACITY` items, and unblocks as soon
/// as a consumer frees a slot.
#[test]
fn enqueue_blocks_exactly_at_capacity() {
    let queue = WorkQueue::new();
    for i in 0..CAPACITY {
        queue.enqueue(descriptor((i % 256) as u8));
    }
    assert_eq!(queue.depth() as usize, CAPACITY);

    let producer_queue = queue.clone();
    let producer = thread::spawn(move || {
        producer_queue.enqueue(descriptor(0xFF));
    });

    // Give the producer a chance to run; it must still be blocked.
    thread::sleep(Duration::from_millis(100));
    assert!(!producer.is_finished());

    queue.dequeue();
    producer.join().unwrap();
    assert_eq!(queue.depth() as usize, CAPACITY);
}
