use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::error::CaptureError;

pub const METHOD_CHANNEL: &str = "flutter_voice_processor_methods";
pub const FRAME_EVENT_CHANNEL: &str = "flutter_voice_processor_events";
pub const ERROR_EVENT_CHANNEL: &str = "flutter_voice_processor_error_events";

pub const START_METHOD: &str = "start";
pub const STOP_METHOD: &str = "stop";
pub const PERMISSION_METHOD: &str = "hasRecordAudioPermission";

/// An inbound call on the method channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// Result envelope sent back for a method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MethodResponse {
    Success {
        result: Value,
    },
    Error {
        code: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
    NotImplemented,
}

impl MethodResponse {
    pub fn success(result: impl Into<Value>) -> Self {
        Self::Success {
            result: result.into(),
        }
    }

    pub fn error(code: &str, message: impl Into<String>, details: Option<Value>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
            details,
        }
    }

    /// Envelope for a capture error, keeping its wire code.
    pub fn from_error(error: &CaptureError, message: impl Into<String>) -> Self {
        Self::error(error.code(), message, None)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Completion callback for one method call, invoked exactly once.
pub type Responder = Box<dyn FnOnce(MethodResponse) + Send + 'static>;

/// Outbound end of an event channel.
pub trait EventSink: Send + Sync {
    fn send(&self, event: Value);
}

/// Event stream selected by the listen/cancel argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventStream {
    /// Audio frames, sent as arrays of int16.
    Buffer,
    /// Error strings, `"<ERROR_CODE>: <details>"`.
    Error,
}

impl EventStream {
    pub fn from_argument(argument: &Value) -> Option<Self> {
        match argument.as_str()? {
            "buffer" | "frame" => Some(Self::Buffer),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn error_envelope_serializes_with_code() {
        let response = MethodResponse::error("PV_INVALID_ARGUMENT", "bad", None);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"status": "error", "code": "PV_INVALID_ARGUMENT", "message": "bad"})
        );
    }

    #[test]
    fn method_call_arguments_default_to_null() {
        let call: MethodCall = serde_json::from_str(r#"{"method": "stop"}"#).unwrap();
        assert_eq!(call, MethodCall::new("stop", Value::Null));
    }

    #[test]
    fn stream_names() {
        assert_eq!(EventStream::from_argument(&json!("buffer")), Some(EventStream::Buffer));
        assert_eq!(EventStream::from_argument(&json!("frame")), Some(EventStream::Buffer));
        assert_eq!(EventStream::from_argument(&json!("error")), Some(EventStream::Error));
        assert_eq!(EventStream::from_argument(&json!("levels")), None);
        assert_eq!(EventStream::from_argument(&Value::Null), None);
    }
}
