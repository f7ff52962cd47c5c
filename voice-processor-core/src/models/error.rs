use thiserror::Error;

/// Wire code for rejected `start` arguments.
pub const INVALID_ARGUMENT_CODE: &str = "PV_INVALID_ARGUMENT";

/// Wire code for denied microphone access (explicit-error denial policy only).
pub const PERMISSION_DENIED_CODE: &str = "PV_PERMISSION_DENIED";

/// Wire code for any fault raised by the audio device layer.
pub const AUDIO_RECORDER_ERROR_CODE: &str = "PV_AUDIO_RECORDER_ERROR";

/// Errors that can occur during audio capture operations.
///
/// "Already running" and "already stopped" are not errors: `start` and `stop`
/// resolve those as successful no-ops.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("record audio permission denied")]
    PermissionDenied,

    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// String error code used in bridge error envelopes and error events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => INVALID_ARGUMENT_CODE,
            Self::PermissionDenied => PERMISSION_DENIED_CODE,
            Self::DeviceUnavailable(_) | Self::Unknown(_) => AUDIO_RECORDER_ERROR_CODE,
        }
    }

    /// Payload for the error event stream: `"<ERROR_CODE>: <details>"`.
    pub fn event_message(&self) -> String {
        format!("{}: {}", self.code(), self)
    }
}
