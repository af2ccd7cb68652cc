//! Fixed-capacity ring buffers shared between interrupt and main contexts.
//!
//! [`RingBuffer`] is the plain queue. [`SharedRing`] wraps it in a
//! `critical_section::Mutex` so every operation is a single indivisible step
//! with respect to the tick and paddle interrupts.
//!
//! # Overflow policy
//!
//! Pushing into a full buffer overwrites the oldest unread element. Producers
//! never block and never see backpressure.

use core::cell::RefCell;

use critical_section::Mutex;

/// Fixed-size FIFO, overwrite-oldest on overflow.
///
/// Capacity does not need to be a power of two.
#[derive(Clone, Copy)]
pub struct RingBuffer<T: Copy, const N: usize> {
    buf: [T; N],
    /// Next slot to write.
    write: usize,
    /// Oldest unread slot.
    read: usize,
    /// Number of unread elements, `0..=N`.
    count: usize,
}

impl<T: Copy, const N: usize> RingBuffer<T, N> {
    /// Create an empty buffer. `fill` only initialises the backing array.
    pub const fn new(fill: T) -> Self {
        const { assert!(N > 0, "ring capacity must be non-zero") };

        Self {
            buf: [fill; N],
            write: 0,
            read: 0,
            count: 0,
        }
    }

    /// Push a value, evicting the oldest element when full.
    #[inline]
    pub fn push(&mut self, value: T) {
        self.buf[self.write] = value;
        self.write = Self::advance(self.write);

        if self.count == N {
            self.read = Self::advance(self.read);
        } else {
            self.count += 1;
        }
    }

    /// Remove and return the oldest element.
    ///
    /// Returns `None` (indices untouched) when empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }

        let value = self.buf[self.read];
        self.read = Self::advance(self.read);
        self.count -= 1;
        Some(value)
    }

    /// Oldest element without removing it.
    #[inline]
    pub fn peek(&self) -> Option<T> {
        if self.count == 0 {
            None
        } else {
            Some(self.buf[self.read])
        }
    }

    /// Drop every unread element.
    #[inline]
    pub fn clear(&mut self) {
        self.read = self.write;
        self.count = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == N
    }

    /// Fixed capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Raw `(read, write)` indices, for diagnostics.
    #[inline]
    pub fn indices(&self) -> (usize, usize) {
        (self.read, self.write)
    }

    #[inline]
    const fn advance(idx: usize) -> usize {
        let next = idx + 1;
        if next == N { 0 } else { next }
    }
}

/// A [`RingBuffer`] guarded by a critical section.
///
/// One producer context and one consumer context per instance. All methods
/// take `&self` so the ring can live in a `static`.
pub struct SharedRing<T: Copy, const N: usize> {
    inner: Mutex<RefCell<RingBuffer<T, N>>>,
}

impl<T: Copy, const N: usize> SharedRing<T, N> {
    pub const fn new(fill: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(RingBuffer::new(fill))),
        }
    }

    #[inline]
    pub fn push(&self, value: T) {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).push(value));
    }

    #[inline]
    pub fn pop(&self) -> Option<T> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).pop())
    }

    #[inline]
    pub fn peek(&self) -> Option<T> {
        critical_section::with(|cs| self.inner.borrow_ref(cs).peek())
    }

    #[inline]
    pub fn clear(&self) {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).clear());
    }

    #[inline]
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).is_full())
    }

    /// Copy of the whole ring taken inside one critical section.
    pub fn snapshot(&self) -> RingBuffer<T, N> {
        critical_section::with(|cs| *self.inner.borrow_ref(cs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_order() {
        let mut ring: RingBuffer<u8, 4> = RingBuffer::new(0);

        ring.push(1);
        ring.push(2);
        ring.push(3);

        assert_eq!(ring.len(), 3);
        assert_eq!(ring.pop(), Some(1));
        assert_eq!(ring.pop(), Some(2));
        assert_eq!(ring.pop(), Some(3));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut ring: RingBuffer<u8, 2> = RingBuffer::new(0);
        assert_eq!(ring.peek(), None);

        ring.push(7);
        assert_eq!(ring.peek(), Some(7));
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.pop(), Some(7));
    }

    #[test]
    fn test_overflow_keeps_count_at_capacity() {
        let mut ring: RingBuffer<u8, 3> = RingBuffer::new(0);
        for v in 0..10 {
            ring.push(v);
            assert!(ring.len() <= 3);
        }
        assert!(ring.is_full());
        assert_eq!(ring.pop(), Some(7));
        assert_eq!(ring.pop(), Some(8));
        assert_eq!(ring.pop(), Some(9));
    }

    #[test]
    fn test_shared_ring_clear() {
        let ring: SharedRing<u8, 8> = SharedRing::new(0);
        ring.push(1);
        ring.push(2);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.pop(), None);
    }
}
