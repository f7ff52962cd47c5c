use crossbeam_channel::{bounded, Receiver};

use crate::models::error::CaptureError;

/// Completion handle for an in-flight request, resolved exactly once.
///
/// Consuming `resolve` makes double resolution impossible. A handle dropped
/// without being resolved logs a warning.
pub struct PendingResult<T> {
    callback: Option<Box<dyn FnOnce(Result<T, CaptureError>) + Send + 'static>>,
}

impl<T: Send + 'static> PendingResult<T> {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(Result<T, CaptureError>) + Send + 'static,
    {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    /// A handle whose outcome is read from the returned receiver. Used by the
    /// blocking `start`.
    pub fn channel() -> (Self, Receiver<Result<T, CaptureError>>) {
        let (tx, rx) = bounded(1);
        let pending = Self::new(move |result| {
            let _ = tx.send(result);
        });
        (pending, rx)
    }

    /// A handle nobody waits on.
    pub fn detached() -> Self {
        Self::new(|_| {})
    }

    pub fn resolve(mut self, result: Result<T, CaptureError>) {
        if let Some(callback) = self.callback.take() {
            callback(result);
        }
    }
}

impl<T> Drop for PendingResult<T> {
    fn drop(&mut self) {
        if self.callback.is_some() {
            log::warn!("Pending result dropped without being resolved");
        }
    }
}

impl<T> std::fmt::Debug for PendingResult<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingResult")
            .field("resolved", &self.callback.is_none())
            .finish()
    }
}

/// Waits for a pending result created by [`PendingResult::channel`].
pub(crate) fn wait<T>(rx: Receiver<Result<T, CaptureError>>) -> Result<T, CaptureError> {
    rx.recv().unwrap_or_else(|_| {
        Err(CaptureError::Unknown(
            "request was dropped before it completed".into(),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_delivers_result() {
        let (pending, rx) = PendingResult::<bool>::channel();
        pending.resolve(Ok(true));
        assert_eq!(wait(rx), Ok(true));
    }

    #[test]
    fn dropped_handle_reports_unknown() {
        let (pending, rx) = PendingResult::<bool>::channel();
        drop(pending);
        assert!(matches!(wait(rx), Err(CaptureError::Unknown(_))));
    }
}
