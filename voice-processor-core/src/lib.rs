//! # voice-processor-core
//!
//! Platform-agnostic microphone capture for the voice processor plugin.
//!
//! An [`AudioCaptureSession`] owns one capture worker at a time. The worker
//! reads fixed-length PCM16 frames from a [`CaptureBackend`] device and posts
//! them, in order, to a single frame consumer on the session's
//! [`DeliveryContext`]. Platform backends (cpal, Windows WASAPI) implement
//! `CaptureBackend` and `PermissionProvider` and plug into the generic session.
//!
//! ## Architecture
//!
//! ```text
//! voice-processor-core (this crate)
//! ├── traits/       ← CaptureBackend, CaptureDevice, CaptureObserver, PermissionProvider
//! ├── models/       ← CaptureError, CaptureConfig, SessionOptions, SessionState, Frame
//! ├── processing/   ← RingBuffer
//! ├── session/      ← AudioCaptureSession, capture worker, permission gate, listeners
//! ├── delivery      ← DeliveryContext, EventLoop
//! └── bridge/       ← method/event channel handler
//! ```

pub mod bridge;
pub mod delivery;
pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use bridge::{EventSink, MethodCall, MethodResponse, VoiceProcessorHandler};
pub use delivery::{DeliveryContext, EventLoop};
pub use models::config::{CaptureConfig, DenialPolicy, SessionOptions};
pub use models::error::CaptureError;
pub use models::frame::Frame;
pub use models::state::SessionState;
pub use processing::ring_buffer::RingBuffer;
pub use session::capture::AudioCaptureSession;
pub use session::listeners::Subscription;
pub use session::pending::PendingResult;
pub use traits::capture_backend::{CaptureBackend, CaptureDevice, DeviceParams};
pub use traits::capture_observer::{CaptureObserver, FrameConsumer};
pub use traits::permission_provider::{PermissionProvider, PermissionRequest, PermissionStatus};
