//! Scripted backend and permission provider for session tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::CaptureError;
use crate::traits::capture_backend::{CaptureBackend, CaptureDevice, DeviceParams};
use crate::traits::permission_provider::{PermissionProvider, PermissionRequest, PermissionStatus};

#[derive(Debug, Clone)]
pub struct MockScript {
    pub min_buffer_size: usize,
    pub fail_open: Option<String>,
    /// Number of complete frames delivered before every read fails.
    pub fail_read_after: Option<u64>,
    /// Every n-th read call comes back one sample short.
    pub short_read_every: Option<u64>,
    /// Reads never fill the buffer.
    pub never_fill: bool,
    pub panic_on_read: bool,
    pub read_delay: Duration,
}

impl Default for MockScript {
    fn default() -> Self {
        Self {
            min_buffer_size: 1024,
            fail_open: None,
            fail_read_after: None,
            short_read_every: None,
            never_fill: false,
            panic_on_read: false,
            read_delay: Duration::from_millis(1),
        }
    }
}

#[derive(Debug, Default)]
pub struct MockStats {
    pub opened: AtomicUsize,
    pub open_now: AtomicUsize,
    pub max_open: AtomicUsize,
    pub started: AtomicUsize,
    pub stopped: AtomicUsize,
    pub released: AtomicUsize,
    pub promoted: AtomicUsize,
    pub last_params: Mutex<Option<DeviceParams>>,
}

impl MockStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn max_open(&self) -> usize {
        self.max_open.load(Ordering::SeqCst)
    }
}

pub struct MockBackend {
    script: Mutex<MockScript>,
    pub stats: Arc<MockStats>,
}

impl MockBackend {
    pub fn new(script: MockScript) -> Self {
        Self {
            script: Mutex::new(script),
            stats: Arc::new(MockStats::default()),
        }
    }
}

impl CaptureBackend for MockBackend {
    type Device = MockDevice;

    fn min_buffer_size(&self, _sample_rate: u32) -> Result<usize, CaptureError> {
        Ok(self.script.lock().min_buffer_size)
    }

    fn open(&self, params: &DeviceParams) -> Result<MockDevice, CaptureError> {
        let script = self.script.lock().clone();
        *self.stats.last_params.lock() = Some(*params);
        if let Some(reason) = script.fail_open {
            return Err(CaptureError::DeviceUnavailable(reason));
        }

        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        let now = self.stats.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_open.fetch_max(now, Ordering::SeqCst);

        Ok(MockDevice {
            script,
            stats: Arc::clone(&self.stats),
            reads: 0,
            full_frames: 0,
        })
    }

    fn promote_current_thread(&self) -> Result<(), CaptureError> {
        self.stats.promoted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockDevice {
    script: MockScript,
    stats: Arc<MockStats>,
    reads: u64,
    full_frames: u64,
}

impl CaptureDevice for MockDevice {
    fn start(&mut self) -> Result<(), CaptureError> {
        self.stats.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read(&mut self, buffer: &mut [i16]) -> Result<usize, CaptureError> {
        thread::sleep(self.script.read_delay);
        self.reads += 1;

        if self.script.panic_on_read {
            panic!("driver crashed");
        }
        if let Some(limit) = self.script.fail_read_after {
            if self.full_frames >= limit {
                return Err(CaptureError::DeviceUnavailable("read failed".into()));
            }
        }
        if self.script.never_fill {
            return Ok(0);
        }
        if let Some(every) = self.script.short_read_every {
            if self.reads % every == 0 {
                let short = buffer.len().saturating_sub(1);
                buffer[..short].fill(-1);
                return Ok(short);
            }
        }

        buffer.fill(self.full_frames as i16);
        self.full_frames += 1;
        Ok(buffer.len())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.stats.stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&mut self) {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        self.stats.open_now.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MockPermissions {
    status: Mutex<PermissionStatus>,
    requests: AtomicUsize,
    answer: Option<bool>,
}

impl MockPermissions {
    pub fn new(status: PermissionStatus) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(status),
            requests: AtomicUsize::new(0),
            answer: None,
        })
    }

    /// A provider that is never granted up front but answers every prompt
    /// immediately with `granted`.
    pub fn answering(granted: bool) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(PermissionStatus::Undetermined),
            requests: AtomicUsize::new(0),
            answer: Some(granted),
        })
    }

    pub fn set_status(&self, status: PermissionStatus) {
        *self.status.lock() = status;
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl PermissionProvider for MockPermissions {
    fn check(&self) -> PermissionStatus {
        *self.status.lock()
    }

    fn request(&self, request: PermissionRequest) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(granted) = self.answer {
            request.respond(granted);
        }
    }
}
