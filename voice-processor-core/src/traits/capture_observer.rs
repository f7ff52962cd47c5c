use std::sync::Arc;

use crate::models::error::CaptureError;
use crate::models::frame::Frame;
use crate::models::state::SessionState;

/// Callback receiving every complete frame, in capture order.
///
/// Runs on the session's delivery context, never on the capture worker.
pub type FrameConsumer = Arc<dyn Fn(Frame) + Send + Sync + 'static>;

/// Error and lifecycle notifications for a capture session.
///
/// All methods are called from the session's delivery context, one at a time
/// and in the order the events happened.
pub trait CaptureObserver: Send + Sync {
    /// A device fault that could not be reported to a pending `start` caller.
    fn on_error(&self, error: &CaptureError);

    /// Called after every session state transition.
    fn on_state_changed(&self, _state: SessionState) {}
}

impl<F> CaptureObserver for F
where
    F: Fn(&CaptureError) + Send + Sync,
{
    fn on_error(&self, error: &CaptureError) {
        self(error)
    }
}
