use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::delivery::{DeliveryContext, EventLoop};
use crate::models::config::{CaptureConfig, SessionOptions};
use crate::models::error::CaptureError;
use crate::models::frame::Frame;
use crate::models::state::SessionState;
use crate::session::listeners::{Listeners, Subscription};
use crate::session::pending::{self, PendingResult};
use crate::session::permission::PermissionGate;
use crate::session::worker::spawn_realtime_worker;
use crate::traits::capture_backend::{CaptureBackend, CaptureDevice, DeviceParams};
use crate::traits::capture_observer::CaptureObserver;
use crate::traits::permission_provider::PermissionProvider;

/// Mutable session state, protected by `parking_lot::Mutex`.
struct Inner {
    state: SessionState,
    /// Incremented for every worker spawned.
    generation: u64,
    stop_flag: Option<Arc<AtomicBool>>,
    pending_start: Option<PendingResult<bool>>,
    pending_stops: Vec<PendingResult<bool>>,
    worker: Option<(u64, JoinHandle<()>)>,
}

struct Shared {
    inner: Mutex<Inner>,
    /// Signalled when a worker hands the session back to `Idle`.
    idle: Condvar,
}

/// Lifecycle of one microphone capture stream.
///
/// At most one capture worker exists at a time. The worker opens the device,
/// reads `frame_length` samples at a time and posts every complete frame to
/// the registered frame consumer until a stop is requested:
/// ```text
/// [CaptureBackend] → read loop (capture worker) → DeliveryContext → FrameConsumer
///                                             └──→ CaptureObserver (errors, state)
/// ```
pub struct AudioCaptureSession<B: CaptureBackend> {
    backend: Arc<B>,
    options: SessionOptions,
    shared: Arc<Shared>,
    listeners: Listeners,
    delivery: Arc<dyn DeliveryContext>,
    permissions: Arc<PermissionGate>,
}

impl<B: CaptureBackend> AudioCaptureSession<B> {
    pub fn new(backend: B, permissions: Arc<dyn PermissionProvider>) -> Result<Self, CaptureError> {
        Self::with_options(backend, permissions, SessionOptions::default())
    }

    /// Build a session that delivers callbacks on its own event loop thread.
    pub fn with_options(
        backend: B,
        permissions: Arc<dyn PermissionProvider>,
        options: SessionOptions,
    ) -> Result<Self, CaptureError> {
        options.validate()?;
        let delivery = Arc::new(EventLoop::spawn(&options.delivery_thread_name)?);
        Ok(Self::with_delivery(backend, permissions, options, delivery))
    }

    /// Build a session that delivers callbacks on a caller-supplied context,
    /// e.g. the host application's UI loop.
    pub fn with_delivery(
        backend: B,
        permissions: Arc<dyn PermissionProvider>,
        options: SessionOptions,
        delivery: Arc<dyn DeliveryContext>,
    ) -> Self {
        let permissions = PermissionGate::new(
            permissions,
            options.permission_request_code,
            options.denial_policy,
            Arc::clone(&delivery),
        );
        Self {
            backend: Arc::new(backend),
            options,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: SessionState::Idle,
                    generation: 0,
                    stop_flag: None,
                    pending_start: None,
                    pending_stops: Vec::new(),
                    worker: None,
                }),
                idle: Condvar::new(),
            }),
            listeners: Listeners::new(),
            delivery,
            permissions,
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Install the frame consumer, replacing any previous one.
    pub fn register_frame_consumer<F>(&self, consumer: F) -> Subscription
    where
        F: Fn(Frame) + Send + Sync + 'static,
    {
        self.listeners.frames.register(Arc::new(consumer))
    }

    /// Install the error/lifecycle observer, replacing any previous one.
    pub fn register_observer(&self, observer: Arc<dyn CaptureObserver>) -> Subscription {
        self.listeners.observer.register(observer)
    }

    /// Start capturing and block until the first frame has been read or the
    /// device has failed.
    ///
    /// Must not be called from the delivery context: the result is resolved
    /// there.
    pub fn start(&self, config: CaptureConfig) -> Result<bool, CaptureError> {
        let (result, rx) = PendingResult::channel();
        self.start_with(config, result);
        pending::wait(rx)
    }

    /// Start capturing; `result` resolves `true` once the first complete frame
    /// has been read, or with the device error if the worker fails first.
    ///
    /// While a worker exists (any state but `Idle`) this resolves `true`
    /// immediately and leaves the running capture untouched.
    pub fn start_with(&self, config: CaptureConfig, result: PendingResult<bool>) {
        if let Err(e) = config.validate() {
            result.resolve(Err(e));
            return;
        }

        let mut inner = self.shared.inner.lock();
        if inner.state.has_worker() {
            log::debug!("Start ignored, session is already {}", inner.state);
            drop(inner);
            result.resolve(Ok(true));
            return;
        }

        let generation = inner.generation + 1;
        let stop_flag = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            backend: Arc::clone(&self.backend),
            config,
            stop_flag: Arc::clone(&stop_flag),
            shared: Arc::clone(&self.shared),
            listeners: self.listeners.clone(),
            delivery: Arc::clone(&self.delivery),
        };
        let promote = self.options.realtime_priority.then(|| {
            let backend = Arc::clone(&self.backend);
            move || backend.promote_current_thread()
        });

        // The worker blocks on `inner` until this function has recorded it.
        match spawn_realtime_worker(&self.options.worker_thread_name, promote, move || worker.run()) {
            Ok(handle) => {
                log::info!(
                    "Starting capture: frame_length={} sample_rate={}",
                    config.frame_length,
                    config.sample_rate
                );
                inner.generation = generation;
                inner.state = SessionState::Starting;
                inner.stop_flag = Some(stop_flag);
                inner.pending_start = Some(result);
                inner.worker = Some((generation, handle));
                notify_state(&self.delivery, &self.listeners, SessionState::Starting);
            }
            Err(e) => {
                drop(inner);
                log::error!("Failed to start capture worker: {}", e);
                result.resolve(Err(e));
            }
        }
    }

    /// Stop capturing and block until the worker has released the device.
    ///
    /// Returns immediately when already idle. A device read that never
    /// returns blocks this call indefinitely.
    pub fn stop(&self) -> Result<bool, CaptureError> {
        let Some(generation) = self.request_stop(PendingResult::detached()) else {
            return Ok(true);
        };

        let mut inner = self.shared.inner.lock();
        while inner.generation == generation && inner.state.has_worker() {
            self.shared.idle.wait(&mut inner);
        }
        let handle = match inner.worker.take() {
            Some((g, handle)) if g == generation => Some(handle),
            other => {
                inner.worker = other;
                None
            }
        };
        drop(inner);

        if let Some(handle) = handle {
            let _ = handle.join();
        }
        Ok(true)
    }

    /// Ask the worker to stop without waiting. `result` resolves `true` on
    /// the delivery context once the device has been released.
    pub fn stop_with(&self, result: PendingResult<bool>) {
        self.request_stop(result);
    }

    /// Returns the generation of the worker being stopped, or `None` if the
    /// session was idle and `result` has already been resolved.
    fn request_stop(&self, result: PendingResult<bool>) -> Option<u64> {
        let mut inner = self.shared.inner.lock();
        if inner.state.is_idle() {
            drop(inner);
            result.resolve(Ok(true));
            return None;
        }

        inner.pending_stops.push(result);
        if inner.state.accepts_stop() {
            log::info!("Stopping capture");
            if let Some(flag) = &inner.stop_flag {
                flag.store(true, Ordering::SeqCst);
            }
            inner.state = SessionState::Stopping;
            notify_state(&self.delivery, &self.listeners, SessionState::Stopping);
        }
        Some(inner.generation)
    }

    /// Resolve `result` with whether recording is permitted, prompting the
    /// user first if needed.
    pub fn has_capture_permission(&self, result: PendingResult<bool>) {
        self.permissions.has_capture_permission(result);
    }

    /// OS permission callback. Returns whether the request code was ours.
    pub fn on_permission_result(&self, request_code: i32, granted: bool) -> bool {
        self.permissions.on_permission_result(request_code, granted)
    }

    /// Signal the worker to stop and fail any outstanding permission prompt.
    pub fn close(&self) {
        self.request_stop(PendingResult::detached());
        self.permissions.cancel_pending();
    }
}

impl<B: CaptureBackend> Drop for AudioCaptureSession<B> {
    fn drop(&mut self) {
        self.close();
        let worker = self.shared.inner.lock().worker.take();
        if let Some((_, handle)) = worker {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

fn notify_state(delivery: &Arc<dyn DeliveryContext>, listeners: &Listeners, state: SessionState) {
    let observer = Arc::clone(&listeners.observer);
    delivery.post(Box::new(move || {
        if let Some(observer) = observer.get() {
            observer.on_state_changed(state);
        }
    }));
}

/// Releases the device exactly once, however the read loop exits.
struct DeviceGuard<D: CaptureDevice> {
    device: D,
}

impl<D: CaptureDevice> Deref for DeviceGuard<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.device
    }
}

impl<D: CaptureDevice> DerefMut for DeviceGuard<D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

impl<D: CaptureDevice> Drop for DeviceGuard<D> {
    fn drop(&mut self) {
        self.device.release();
        log::debug!("Capture device released");
    }
}

/// Everything the capture thread owns.
struct Worker<B: CaptureBackend> {
    backend: Arc<B>,
    config: CaptureConfig,
    stop_flag: Arc<AtomicBool>,
    shared: Arc<Shared>,
    listeners: Listeners,
    delivery: Arc<dyn DeliveryContext>,
}

impl<B: CaptureBackend> Worker<B> {
    fn run(self) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.capture())).unwrap_or_else(|_| {
            Err(CaptureError::DeviceUnavailable(
                "capture worker panicked".into(),
            ))
        });
        self.finish(outcome);
    }

    /// Open the device and run the read loop until stopped or failed.
    fn capture(&self) -> Result<(), CaptureError> {
        let sample_rate = self.config.sample_rate;
        let min_buffer = self.backend.min_buffer_size(sample_rate)?;
        let params = DeviceParams::mono_pcm16(
            sample_rate,
            self.config.frame_length,
            self.config.device_buffer_size(min_buffer),
        );
        log::debug!(
            "Opening capture device: sample_rate={} buffer_size={} bytes",
            sample_rate,
            params.buffer_size_bytes
        );

        let mut device = DeviceGuard {
            device: self.backend.open(&params)?,
        };
        device.start()?;

        let mut buffer = vec![0i16; self.config.frame_length];
        let mut sequence: u64 = 0;
        while !self.stop_flag.load(Ordering::SeqCst) {
            let read = device.read(&mut buffer)?;
            if read != buffer.len() {
                log::trace!("Short read ({} of {} samples), retrying", read, buffer.len());
                continue;
            }

            if sequence == 0 {
                self.mark_capturing();
            }
            self.deliver(Frame::new(sequence, buffer.as_slice()));
            sequence += 1;
        }

        device.stop()?;
        log::info!("Capture stopped after {} frames", sequence);
        Ok(())
    }

    /// First complete frame: the session is now capturing and the pending
    /// start caller learns it succeeded.
    fn mark_capturing(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.state == SessionState::Starting {
            inner.state = SessionState::Capturing;
            notify_state(&self.delivery, &self.listeners, SessionState::Capturing);
        }
        if let Some(result) = inner.pending_start.take() {
            self.delivery.post(Box::new(move || result.resolve(Ok(true))));
        }
    }

    fn deliver(&self, frame: Frame) {
        let frames = Arc::clone(&self.listeners.frames);
        self.delivery.post(Box::new(move || {
            if let Some(consumer) = frames.get() {
                consumer(frame);
            }
        }));
    }

    /// Hand the session back to `Idle` and report how the worker ended.
    ///
    /// Runs after the device guard has been dropped. Everything is taken and
    /// posted under the session lock, so a `start` racing with this cleanup
    /// can never have its own pending result resolved here.
    fn finish(&self, outcome: Result<(), CaptureError>) {
        let mut inner = self.shared.inner.lock();
        inner.state = SessionState::Idle;
        inner.stop_flag = None;
        let pending_start = inner.pending_start.take();
        let pending_stops = std::mem::take(&mut inner.pending_stops);

        let observer = Arc::clone(&self.listeners.observer);
        self.delivery.post(Box::new(move || {
            match outcome {
                Err(e) => {
                    log::error!("Capture failed: {}", e);
                    if let Some(result) = pending_start {
                        result.resolve(Err(e));
                    } else if let Some(observer) = observer.get() {
                        observer.on_error(&e);
                    } else {
                        log::warn!("No observer registered; dropping capture error");
                    }
                }
                // Stopped before a single frame was read.
                Ok(()) => {
                    if let Some(result) = pending_start {
                        result.resolve(Ok(false));
                    }
                }
            }

            for result in pending_stops {
                result.resolve(Ok(true));
            }

            if let Some(observer) = observer.get() {
                observer.on_state_changed(SessionState::Idle);
            }
        }));

        drop(inner);
        self.shared.idle.notify_all();
    }
}
