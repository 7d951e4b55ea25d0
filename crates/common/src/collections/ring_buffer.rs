#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

//! A fixed-capacity circular buffer with overwrite-on-full semantics.
//!
//! A [`RingBuffer`] keeps at most `capacity` items. Once full, every
//! [`push`](RingBuffer::push) overwrites the oldest slot in place, so the
//! backing storage is allocated once and reused for the life of the buffer.
//! [`clear`](RingBuffer::clear) forgets the contents but keeps the
//! allocation, which is what lets rolling-window buckets be recycled instead
//! of reallocated.
//!
//! # Complexity
//! - `push`, `len`, `is_empty`, `is_full`, `capacity` and `clear` are
//!   **O(1)**; `iter` is **O(n)** over the stored items.
//!
//! # Panic Safety
//! - Public methods avoid panicking; there are no `unwrap`/`expect` calls in
//!   the implementation.

/// A fixed-capacity circular buffer storing elements in insertion order.
///
/// # Examples
///
/// ```rust
/// use bulwark_common::collections::RingBuffer;
///
/// let mut buffer = RingBuffer::new(3);
/// buffer.push(1);
/// buffer.push(2);
/// buffer.push(3);
/// buffer.push(4); // overwrites the oldest item (`1`)
///
/// assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingBuffer<T> {
    buf: Vec<T>,
    capacity: usize,
    /// Slot the next push writes to once the buffer is full.
    head: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Creates a new buffer with the provided capacity.
    ///
    /// A capacity of zero is clamped to `1`, ensuring at least one slot without
    /// panicking.
    #[inline]
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { buf: Vec::with_capacity(capacity), capacity, head: 0, len: 0 }
    }

    /// Pushes an item to the buffer, overwriting the oldest item when full.
    pub fn push(&mut self, item: T) {
        if self.len < self.capacity {
            // Slots beyond `buf.len()` have never been written (or were
            // truncated by `clear`), so append.
            if self.len < self.buf.len() {
                if let Some(slot) = self.buf.get_mut(self.len) {
                    *slot = item;
                }
            } else {
                self.buf.push(item);
            }
            self.len += 1;
            return;
        }

        if let Some(slot) = self.buf.get_mut(self.head) {
            *slot = item;
        }
        self.head = (self.head + 1) % self.capacity;
    }

    /// Returns the number of items currently stored.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the buffer has no items.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` when the buffer reached its capacity.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// Returns the maximum number of items the buffer can hold.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Forgets all elements while keeping the allocated storage.
    #[inline]
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Returns an iterator visiting elements from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let stored = &self.buf[..self.len.min(self.buf.len())];
        let split = if self.is_full() { self.head } else { 0 };
        let (newer, older) = stored.split_at(split.min(stored.len()));
        older.iter().chain(newer.iter())
    }
}

impl<T> Default for RingBuffer<T> {
    /// Creates a single-slot buffer that overwrites on every push after the
    /// first.
    #[inline]
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for collections::ring_buffer.
    use super::RingBuffer;

    /// Validates insertion order is preserved and the oldest item is
    /// overwritten once the buffer is full.
    #[test]
    fn fifo_with_overwrite() {
        let mut buffer = RingBuffer::new(3);
        buffer.push(1);
        buffer.push(2);
        buffer.push(3);
        buffer.push(4);

        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn iter_preserves_order_after_wraparound() {
        let mut buffer = RingBuffer::new(3);
        for value in 0..8 {
            buffer.push(value);
        }

        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![5, 6, 7]);
    }

    #[test]
    fn capacity_one_edge_case() {
        let mut buffer = RingBuffer::new(1);
        buffer.push('a');
        buffer.push('b');

        assert_eq!(buffer.len(), 1);
        assert!(buffer.is_full());
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec!['b']);
    }

    /// Validates `clear` resets contents but keeps capacity, and that the
    /// buffer refills correctly after a wraparound.
    #[test]
    fn clear_resets_length_but_retains_capacity() {
        let mut buffer = RingBuffer::new(2);
        buffer.push(10);
        buffer.push(20);
        buffer.push(30);
        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer.capacity(), 2);
        assert_eq!(buffer.iter().count(), 0);

        buffer.push(40);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![40]);
        buffer.push(50);
        buffer.push(60);
        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![50, 60]);
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut buffer = RingBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);

        buffer.push(42);
        buffer.push(43);

        assert_eq!(buffer.iter().copied().collect::<Vec<_>>(), vec![43]);
    }
}
