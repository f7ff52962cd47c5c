use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use voice_processor_core::{CaptureError, RingBuffer};

struct QueueState {
    samples: RingBuffer<i16>,
    /// First stream error reported by the audio callback thread.
    error: Option<String>,
}

/// Hand-off between a push-style audio callback and the pull-style capture
/// worker.
///
/// The callback side never blocks on the reader beyond the mutex; overflow
/// drops the oldest samples.
pub struct FrameQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl FrameQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                samples: RingBuffer::new(capacity),
                error: None,
            }),
            ready: Condvar::new(),
        }
    }

    /// Called from the audio callback.
    pub fn push(&self, samples: &[i16]) {
        self.state.lock().samples.write(samples);
        self.ready.notify_one();
    }

    /// Record a stream failure. Later errors are ignored.
    pub fn fail(&self, message: String) {
        let mut state = self.state.lock();
        if state.error.is_none() {
            state.error = Some(message);
        }
        drop(state);
        self.ready.notify_one();
    }

    /// Wait up to `timeout` for `out.len()` samples.
    ///
    /// Returns `out.len()` on a full frame and 0 when the wait timed out.
    /// A recorded stream error is returned once enough buffered samples have
    /// been drained.
    pub fn pop_frame(&self, out: &mut [i16], timeout: Duration) -> Result<usize, CaptureError> {
        let mut state = self.state.lock();
        if state.samples.count() < out.len() && state.error.is_none() {
            self.ready
                .wait_while_for(&mut state, |s| s.samples.count() < out.len() && s.error.is_none(), timeout);
        }

        if state.samples.read_exact(out) {
            return Ok(out.len());
        }
        match &state.error {
            Some(message) => Err(CaptureError::DeviceUnavailable(message.clone())),
            None => Ok(0),
        }
    }

    /// Samples lost to overflow so far.
    pub fn dropped(&self) -> u64 {
        self.state.lock().samples.dropped()
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.samples.reset();
        state.error = None;
    }
}
