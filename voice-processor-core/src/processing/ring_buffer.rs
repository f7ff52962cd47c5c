/// Fixed-capacity circular buffer for audio samples.
///
/// Used by push-style backends to turn device callbacks into the pull-style
/// `read` the capture worker expects. Wrap in
/// `Arc<parking_lot::Mutex<RingBuffer<_>>>` for cross-thread access.
///
/// Overflow behavior: drops oldest samples.
#[derive(Debug)]
pub struct RingBuffer<T> {
    buffer: Vec<T>,
    write_index: usize,
    read_index: usize,
    available: usize,
    capacity: usize,
    dropped: u64,
}

impl<T: Copy + Default> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: vec![T::default(); capacity],
            write_index: 0,
            read_index: 0,
            available: 0,
            capacity,
            dropped: 0,
        }
    }

    /// Write samples into the ring buffer.
    ///
    /// If the buffer overflows, the oldest samples are dropped.
    /// If `samples` is larger than capacity, only the last `capacity` samples are kept.
    pub fn write(&mut self, samples: &[T]) {
        if samples.is_empty() {
            return;
        }

        let samples = if samples.len() > self.capacity {
            self.dropped += (samples.len() - self.capacity) as u64;
            &samples[samples.len() - self.capacity..]
        } else {
            samples
        };

        let overflow = (self.available + samples.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % self.capacity;
            self.available -= overflow;
            self.dropped += overflow as u64;
        }

        for &sample in samples {
            self.buffer[self.write_index] = sample;
            self.write_index = (self.write_index + 1) % self.capacity;
        }
        self.available += samples.len();
    }

    /// Copy exactly `out.len()` samples into `out` and remove them.
    ///
    /// Returns false, leaving the buffer untouched, if fewer are available.
    pub fn read_exact(&mut self, out: &mut [T]) -> bool {
        if out.len() > self.available {
            return false;
        }
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.buffer[(self.read_index + i) % self.capacity];
        }
        self.read_index = (self.read_index + out.len()) % self.capacity;
        self.available -= out.len();
        true
    }

    /// Number of samples currently available for reading.
    pub fn count(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    /// Samples discarded by overflow since creation or the last reset.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn reset(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
        self.available = 0;
        self.dropped = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(buf: &mut RingBuffer<i16>) -> Vec<i16> {
        let mut out = vec![0; buf.count()];
        assert!(buf.read_exact(&mut out));
        out
    }

    #[test]
    fn basic_write_read() {
        let mut buf = RingBuffer::new(10);
        buf.write(&[1i16, 2, 3]);

        assert_eq!(buf.count(), 3);
        assert_eq!(read_all(&mut buf), vec![1, 2, 3]);
        assert!(buf.is_empty());
    }

    #[test]
    fn read_exact_refuses_partial() {
        let mut buf = RingBuffer::new(10);
        buf.write(&[1i16, 2, 3]);

        let mut out = [0i16; 4];
        assert!(!buf.read_exact(&mut out));
        assert_eq!(buf.count(), 3); // untouched

        let mut out = [0i16; 2];
        assert!(buf.read_exact(&mut out));
        assert_eq!(out, [1, 2]);
        assert_eq!(buf.count(), 1);
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut buf = RingBuffer::new(4);
        buf.write(&[1i16, 2, 3, 4]);
        buf.write(&[5, 6]); // drops 1, 2

        assert_eq!(buf.count(), 4);
        assert_eq!(buf.dropped(), 2);
        assert_eq!(read_all(&mut buf), vec![3, 4, 5, 6]);
    }

    #[test]
    fn write_larger_than_capacity() {
        let mut buf = RingBuffer::new(3);
        buf.write(&[1i16, 2, 3, 4, 5]);

        assert_eq!(buf.count(), 3);
        assert_eq!(buf.dropped(), 2);
        assert_eq!(read_all(&mut buf), vec![3, 4, 5]);
    }

    #[test]
    fn wraparound() {
        let mut buf = RingBuffer::new(4);

        buf.write(&[1i16, 2, 3]);
        let mut head = [0i16; 2];
        assert!(buf.read_exact(&mut head));

        buf.write(&[4, 5, 6]); // wraps around

        assert_eq!(buf.count(), 4);
        assert_eq!(read_all(&mut buf), vec![3, 4, 5, 6]);
    }

    #[test]
    fn reset_clears_buffer() {
        let mut buf = RingBuffer::new(10);
        buf.write(&[1i16, 2, 3]);
        buf.reset();

        assert!(buf.is_empty());
        assert_eq!(buf.dropped(), 0);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let buf = RingBuffer::<i16>::new(0);
        assert_eq!(buf.capacity(), 1);
    }
}
