//! Fixed-capacity circular (ring) buffer for `f32` audio samples.
//!
//! When the buffer is full, new samples **overwrite** the oldest data so that
//! the most-recent `capacity` samples are always available.  The capture
//! session keeps two of these: one holding audio the orchestrator has not
//! consumed yet, and one holding the analyser window.
//!
//! # Example
//!
//! ```rust
//! use handsfree_voice::audio::RingBuffer;
//!
//! let mut buf = RingBuffer::new(4);
//! buf.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]); // 5 items → capacity 4 → oldest dropped
//! assert_eq!(buf.latest(2), vec![4.0, 5.0]);
//! let data = buf.drain();
//! assert_eq!(data, vec![2.0, 3.0, 4.0, 5.0]);
//! ```

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity circular buffer.
///
/// ## Overflow behaviour
///
/// When [`push_slice`](Self::push_slice) would exceed `capacity`, the oldest
/// samples are silently overwritten.  The buffer never allocates beyond its
/// initial capacity.
pub struct RingBuffer<T> {
    buf: Vec<T>,
    capacity: usize,
    /// Index of the *next* write position (wraps around `capacity`).
    write_pos: usize,
    /// Number of valid samples currently stored (≤ `capacity`).
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create a new ring buffer with the given `capacity`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            buf: vec![T::default(); capacity],
            capacity,
            write_pos: 0,
            len: 0,
        }
    }

    /// Append `data`, overwriting the oldest samples once full.
    pub fn push_slice(&mut self, data: &[T]) {
        for &item in data {
            self.buf[self.write_pos] = item;
            self.write_pos = (self.write_pos + 1) % self.capacity;
            if self.len < self.capacity {
                self.len += 1;
            }
        }
    }

    /// Copy the newest `n` samples (or fewer, if fewer are stored) in
    /// chronological order without consuming them.
    pub fn latest(&self, n: usize) -> Vec<T> {
        let n = n.min(self.len);
        // The newest sample sits just before `write_pos`.
        let start = (self.write_pos + self.capacity - n) % self.capacity;
        (0..n)
            .map(|i| self.buf[(start + i) % self.capacity])
            .collect()
    }

    /// Drain all stored samples in chronological order and reset the buffer.
    pub fn drain(&mut self) -> Vec<T> {
        let result = self.latest(self.len);
        self.clear();
        result
    }

    /// Discard all samples and reset the write position.
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }

    /// Number of valid samples currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the buffer contains no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of samples the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` when the next push would overwrite the oldest sample.
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Basic push / drain ------------------------------------------------

    #[test]
    fn push_and_drain_within_capacity() {
        let mut buf = RingBuffer::new(8);
        buf.push_slice(&[1.0_f32, 2.0, 3.0]);
        assert_eq!(buf.len(), 3);
        assert!(!buf.is_full());

        assert_eq!(buf.drain(), vec![1.0, 2.0, 3.0]);
        assert!(buf.is_empty());
    }

    #[test]
    fn overflow_keeps_newest_in_order() {
        let mut buf = RingBuffer::new(3);
        buf.push_slice(&[1.0_f32, 2.0, 3.0]);
        buf.push_slice(&[4.0, 5.0]);

        assert!(buf.is_full());
        assert_eq!(buf.drain(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn drain_empty_returns_empty_vec() {
        let mut buf: RingBuffer<f32> = RingBuffer::new(4);
        assert_eq!(buf.drain(), Vec::<f32>::new());
    }

    #[test]
    fn reuse_after_clear() {
        let mut buf = RingBuffer::new(4);
        buf.push_slice(&[1.0_f32, 2.0, 3.0, 4.0, 5.0]);
        buf.clear();
        assert!(buf.is_empty());

        buf.push_slice(&[9.0_f32]);
        assert_eq!(buf.drain(), vec![9.0]);
    }

    // ---- latest ------------------------------------------------------------

    #[test]
    fn latest_does_not_consume() {
        let mut buf = RingBuffer::new(8);
        buf.push_slice(&[1.0_f32, 2.0, 3.0]);

        assert_eq!(buf.latest(2), vec![2.0, 3.0]);
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn latest_wraps_around() {
        let mut buf = RingBuffer::new(4);
        buf.push_slice(&[1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0]);

        assert_eq!(buf.latest(3), vec![4.0, 5.0, 6.0]);
        assert_eq!(buf.latest(10), vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn latest_on_empty_buffer() {
        let buf: RingBuffer<f32> = RingBuffer::new(4);
        assert!(buf.latest(4).is_empty());
    }

    #[test]
    fn capacity_reported_correctly() {
        let buf: RingBuffer<f32> = RingBuffer::new(1024);
        assert_eq!(buf.capacity(), 1024);
    }

    #[test]
    #[should_panic(expected = "RingBuffer capacity must be > 0")]
    fn zero_capacity_panics() {
        let _buf: RingBuffer<f32> = RingBuffer::new(0);
    }
}
