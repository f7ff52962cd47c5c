use std::sync::Weak;

use crate::session::permission::PermissionGate;

/// Result of asking the OS whether the app may record audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The user has not been asked yet.
    Undetermined,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// OS permission subsystem for microphone access.
pub trait PermissionProvider: Send + Sync {
    /// Current record-audio permission, without prompting.
    fn check(&self) -> PermissionStatus;

    /// Prompt the user. The answer must be delivered through
    /// `request.respond(..)` (from any thread, at any later time) or through
    /// the session's `on_permission_result` with the same request code.
    fn request(&self, request: PermissionRequest);
}

/// An outstanding OS permission prompt.
pub struct PermissionRequest {
    code: i32,
    gate: Weak<PermissionGate>,
}

impl PermissionRequest {
    pub(crate) fn new(code: i32, gate: Weak<PermissionGate>) -> Self {
        Self { code, gate }
    }

    /// Request code the OS callback is keyed by.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Deliver the user's answer. Returns false if the session is gone or the
    /// request was already answered.
    pub fn respond(self, granted: bool) -> bool {
        match self.gate.upgrade() {
            Some(gate) => gate.on_permission_result(self.code, granted),
            None => false,
        }
    }
}
