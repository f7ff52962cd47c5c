use serde::Deserialize;

use super::error::CaptureError;

/// Request code used to key the OS permission callback when none is configured.
pub const DEFAULT_PERMISSION_REQUEST_CODE: i32 = 0x5650;

/// Parameters for one capture run.
///
/// Validated when `start` is called and immutable for the lifetime of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConfig {
    /// Number of samples in every delivered frame.
    pub frame_length: usize,

    /// Capture rate in Hz.
    pub sample_rate: u32,
}

impl CaptureConfig {
    /// Build and validate a configuration.
    pub fn new(frame_length: usize, sample_rate: u32) -> Result<Self, CaptureError> {
        let config = Self {
            frame_length,
            sample_rate,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.frame_length == 0 {
            return Err(CaptureError::InvalidArgument(
                "frame length must be positive".into(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(CaptureError::InvalidArgument(
                "sample rate must be positive".into(),
            ));
        }
        // Both values travel over the bridge as 32-bit signed integers.
        if self.frame_length > i32::MAX as usize {
            return Err(CaptureError::InvalidArgument(format!(
                "frame length out of range: {}",
                self.frame_length
            )));
        }
        if self.sample_rate > i32::MAX as u32 {
            return Err(CaptureError::InvalidArgument(format!(
                "sample rate out of range: {}",
                self.sample_rate
            )));
        }
        Ok(())
    }

    /// Device buffer size in bytes: `sample_rate / 2` (a quarter second of
    /// 16-bit mono), or the device minimum if that is larger.
    pub fn device_buffer_size(&self, min_device_buffer: usize) -> usize {
        (self.sample_rate as usize / 2).max(min_device_buffer)
    }
}

/// How a denied permission request is reported to the waiting caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DenialPolicy {
    /// Resolve the pending result with `Ok(false)`.
    #[default]
    ResolveFalse,
    /// Resolve the pending result with `Err(CaptureError::PermissionDenied)`.
    Error,
}

/// Session-wide settings, fixed when the session is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionOptions {
    /// Name given to the capture worker thread.
    pub worker_thread_name: String,

    /// Name given to the delivery thread of the default event loop.
    pub delivery_thread_name: String,

    /// Ask the backend to raise the worker to urgent-audio priority.
    pub realtime_priority: bool,

    /// Code attached to OS permission requests issued by this session.
    pub permission_request_code: i32,

    pub denial_policy: DenialPolicy,
}

impl SessionOptions {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.worker_thread_name.is_empty() || self.delivery_thread_name.is_empty() {
            return Err(CaptureError::InvalidArgument(
                "thread names must not be empty".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            worker_thread_name: "voice-processor-capture".into(),
            delivery_thread_name: "voice-processor-events".into(),
            realtime_priority: true,
            permission_request_code: DEFAULT_PERMISSION_REQUEST_CODE,
            denial_policy: DenialPolicy::ResolveFalse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_values() {
        assert!(matches!(
            CaptureConfig::new(0, 16000),
            Err(CaptureError::InvalidArgument(_))
        ));
        assert!(matches!(
            CaptureConfig::new(512, 0),
            Err(CaptureError::InvalidArgument(_))
        ));
    }

    #[test]
    fn rejects_values_outside_i32() {
        assert!(CaptureConfig::new(512, i32::MAX as u32 + 1).is_err());
        assert!(CaptureConfig::new(512, i32::MAX as u32).is_ok());
    }

    #[test]
    fn buffer_size_oversizes_to_half_second() {
        let config = CaptureConfig::new(512, 16000).unwrap();
        assert_eq!(config.device_buffer_size(1280), 8000);
        assert_eq!(config.device_buffer_size(12000), 12000);
    }

    #[test]
    fn deserializes_bridge_field_names() {
        let config: CaptureConfig =
            serde_json::from_str(r#"{"frameLength": 512, "sampleRate": 16000}"#).unwrap();
        assert_eq!(config, CaptureConfig::new(512, 16000).unwrap());
    }

    #[test]
    fn options_fill_missing_fields_with_defaults() {
        let options: SessionOptions =
            serde_json::from_str(r#"{"realtimePriority": false, "denialPolicy": "error"}"#)
                .unwrap();
        assert!(!options.realtime_priority);
        assert_eq!(options.denial_policy, DenialPolicy::Error);
        assert_eq!(options.worker_thread_name, "voice-processor-capture");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn options_reject_empty_thread_names() {
        let options = SessionOptions {
            worker_thread_name: String::new(),
            ..SessionOptions::default()
        };
        assert!(options.validate().is_err());
    }
}
