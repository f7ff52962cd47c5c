use std::thread::{self, JoinHandle};

use crate::models::error::CaptureError;

/// Spawn the capture worker.
///
/// The thread first runs `promote` to raise itself to urgent-audio priority,
/// then `body`. A refused promotion is logged and capture continues at normal
/// priority.
pub fn spawn_realtime_worker<P, F>(
    name: &str,
    promote: Option<P>,
    body: F,
) -> Result<JoinHandle<()>, CaptureError>
where
    P: FnOnce() -> Result<(), CaptureError> + Send + 'static,
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            if let Some(promote) = promote {
                match promote() {
                    Ok(()) => log::debug!("Capture worker running at urgent audio priority"),
                    Err(e) => log::warn!("Could not raise capture worker priority: {}", e),
                }
            }
            body();
        })
        .map_err(|e| CaptureError::Unknown(format!("failed to spawn capture thread: {}", e)))
}
