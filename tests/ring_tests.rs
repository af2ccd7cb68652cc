//! Integration tests for the overwrite-oldest ring buffers.

use std::collections::VecDeque;

use rust_cw_keyboard::ring::{RingBuffer, SharedRing};

#[test]
fn test_fifo_order() {
    let mut ring = RingBuffer::<u8, 4>::new(0);
    for c in b"cq" {
        ring.push(*c);
    }
    assert_eq!(ring.len(), 2);
    assert_eq!(ring.pop(), Some(b'c'));
    assert_eq!(ring.pop(), Some(b'q'));
    assert_eq!(ring.pop(), None, "Empty ring should pop None");
}

#[test]
fn test_overflow_evicts_oldest() {
    let mut ring = RingBuffer::<u8, 4>::new(0);
    for c in 0..5 {
        ring.push(c);
    }

    assert!(ring.is_full());
    assert_eq!(ring.len(), 4, "Length is capped at capacity");
    assert_eq!(ring.peek(), Some(1), "Element 0 should have been evicted");

    let rest: Vec<u8> = std::iter::from_fn(|| ring.pop()).collect();
    assert_eq!(rest, [1, 2, 3, 4]);
}

#[test]
fn test_pop_on_empty_leaves_indices() {
    let mut ring = RingBuffer::<u8, 3>::new(0);
    ring.push(1);
    ring.pop();
    let before = ring.indices();
    assert_eq!(ring.pop(), None);
    assert_eq!(ring.indices(), before);
}

#[test]
fn test_clear() {
    let mut ring = RingBuffer::<u8, 3>::new(0);
    ring.push(1);
    ring.push(2);
    ring.clear();
    assert!(ring.is_empty());
    assert_eq!(ring.peek(), None);
    ring.push(7);
    assert_eq!(ring.pop(), Some(7));
}

#[test]
fn test_non_power_of_two_capacity() {
    let mut ring = RingBuffer::<u16, 5>::new(0);
    assert_eq!(ring.capacity(), 5);
    for round in 0..3u16 {
        for i in 0..5 {
            ring.push(round * 10 + i);
        }
        for i in 0..5 {
            assert_eq!(ring.pop(), Some(round * 10 + i));
        }
    }
}

#[test]
fn test_shared_ring_across_threads() {
    static RING: SharedRing<u32, 64> = SharedRing::new(0);

    let producer = std::thread::spawn(|| {
        for i in 0..32 {
            RING.push(i);
        }
    });
    producer.join().unwrap();

    let got: Vec<u32> = std::iter::from_fn(|| RING.pop()).collect();
    assert_eq!(got, (0..32).collect::<Vec<_>>());
}

#[test]
fn test_shared_ring_snapshot_is_a_copy() {
    let ring = SharedRing::<u8, 4>::new(0);
    ring.push(9);
    let mut snap = ring.snapshot();
    assert_eq!(snap.pop(), Some(9));
    assert_eq!(ring.len(), 1, "Snapshot must not drain the shared ring");
}

proptest::proptest! {
    /// Any push/pop sequence behaves like a deque that drops its front when full.
    #[test]
    fn ring_matches_bounded_deque(
        ops in proptest::collection::vec(proptest::option::of(0u8..=255), 0..200)
    ) {
        let mut ring = RingBuffer::<u8, 7>::new(0);
        let mut model: VecDeque<u8> = VecDeque::new();

        for op in ops {
            match op {
                Some(v) => {
                    ring.push(v);
                    if model.len() == 7 {
                        model.pop_front();
                    }
                    model.push_back(v);
                }
                None => {
                    assert_eq!(ring.pop(), model.pop_front());
                }
            }
            assert_eq!(ring.len(), model.len());
            assert_eq!(ring.peek(), model.front().copied());
        }
    }

    /// Length never exceeds capacity.
    #[test]
    fn len_bounded_by_capacity(n in 0usize..100) {
        let mut ring = RingBuffer::<u8, 16>::new(0);
        for i in 0..n {
            ring.push(i as u8);
        }
        assert_eq!(ring.len(), n.min(16));
    }
}
