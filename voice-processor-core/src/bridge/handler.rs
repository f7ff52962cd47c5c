use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::codec::{
    EventSink, EventStream, MethodCall, MethodResponse, Responder, PERMISSION_METHOD,
    START_METHOD, STOP_METHOD,
};
use crate::models::config::CaptureConfig;
use crate::models::error::{CaptureError, INVALID_ARGUMENT_CODE};
use crate::session::capture::AudioCaptureSession;
use crate::session::listeners::Subscription;
use crate::session::pending::PendingResult;
use crate::traits::capture_backend::CaptureBackend;
use crate::traits::capture_observer::CaptureObserver;

const INVALID_START_MESSAGE: &str = "Invalid argument provided to VoiceProcessor.start";

#[derive(Default)]
struct Streams {
    buffer: Option<Subscription>,
    error: Option<Subscription>,
}

/// Routes bridge traffic to an [`AudioCaptureSession`].
///
/// Method calls arrive through [`on_method_call`], event stream subscriptions
/// through [`on_listen`]/[`on_cancel`], and OS permission answers through
/// [`on_request_permissions_result`].
///
/// [`on_method_call`]: VoiceProcessorHandler::on_method_call
/// [`on_listen`]: VoiceProcessorHandler::on_listen
/// [`on_cancel`]: VoiceProcessorHandler::on_cancel
/// [`on_request_permissions_result`]: VoiceProcessorHandler::on_request_permissions_result
pub struct VoiceProcessorHandler<B: CaptureBackend> {
    session: Arc<AudioCaptureSession<B>>,
    streams: Mutex<Streams>,
}

impl<B: CaptureBackend> VoiceProcessorHandler<B> {
    pub fn new(session: Arc<AudioCaptureSession<B>>) -> Self {
        Self {
            session,
            streams: Mutex::new(Streams::default()),
        }
    }

    pub fn session(&self) -> &Arc<AudioCaptureSession<B>> {
        &self.session
    }

    pub fn on_method_call(&self, call: MethodCall, responder: Responder) {
        match call.method.as_str() {
            START_METHOD => self.start(&call.arguments, responder),
            STOP_METHOD => {
                self.session.stop_with(PendingResult::new(move |result| {
                    responder(bool_response(result, "Unable to stop audio engine"))
                }));
            }
            PERMISSION_METHOD => {
                self.session.has_capture_permission(PendingResult::new(move |result| {
                    responder(bool_response(result, "Unable to check record audio permission"))
                }));
            }
            other => {
                log::debug!("Unhandled method call: {}", other);
                responder(MethodResponse::NotImplemented);
            }
        }
    }

    fn start(&self, arguments: &Value, responder: Responder) {
        let config = match parse_start_arguments(arguments) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Rejected start arguments: {}", e);
                responder(MethodResponse::error(
                    INVALID_ARGUMENT_CODE,
                    INVALID_START_MESSAGE,
                    Some(Value::String(e.to_string())),
                ));
                return;
            }
        };

        let result = PendingResult::new(move |result| {
            let response = match result {
                Ok(started) => MethodResponse::success(started),
                Err(e @ CaptureError::InvalidArgument(_)) => MethodResponse::error(
                    INVALID_ARGUMENT_CODE,
                    INVALID_START_MESSAGE,
                    Some(Value::String(e.to_string())),
                ),
                Err(e) => {
                    MethodResponse::from_error(&e, format!("Unable to start audio engine: {}", e))
                }
            };
            responder(response);
        });
        self.session.start_with(config, result);
    }

    /// Subscribe `sink` to the stream named by `argument` (`"buffer"` or
    /// `"error"`). Unknown arguments are ignored.
    pub fn on_listen(&self, argument: &Value, sink: Arc<dyn EventSink>) {
        let Some(stream) = EventStream::from_argument(argument) else {
            log::debug!("Ignoring listen for unknown stream {}", argument);
            return;
        };

        let mut streams = self.streams.lock();
        match stream {
            EventStream::Buffer => {
                let subscription = self.session.register_frame_consumer(move |frame| {
                    sink.send(Value::from(frame.samples()));
                });
                streams.buffer = Some(subscription);
            }
            EventStream::Error => {
                let subscription = self
                    .session
                    .register_observer(Arc::new(ErrorStream { sink }));
                streams.error = Some(subscription);
            }
        }
    }

    pub fn on_cancel(&self, argument: &Value) {
        let Some(stream) = EventStream::from_argument(argument) else {
            return;
        };

        let subscription = {
            let mut streams = self.streams.lock();
            match stream {
                EventStream::Buffer => streams.buffer.take(),
                EventStream::Error => streams.error.take(),
            }
        };
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }

    /// OS answer to a permission prompt; the first grant entry decides.
    /// Returns whether the request code belonged to this handler.
    pub fn on_request_permissions_result(&self, request_code: i32, grant_results: &[bool]) -> bool {
        let granted = grant_results.first().copied().unwrap_or(false);
        self.session.on_permission_result(request_code, granted)
    }

    /// Detach from the host: stop capture and drop both event streams.
    pub fn close(&self) {
        self.session.close();
        let streams = std::mem::take(&mut *self.streams.lock());
        for subscription in [streams.buffer, streams.error].into_iter().flatten() {
            subscription.cancel();
        }
    }
}

/// Forwards session errors to the error event channel.
struct ErrorStream {
    sink: Arc<dyn EventSink>,
}

impl CaptureObserver for ErrorStream {
    fn on_error(&self, error: &CaptureError) {
        self.sink.send(Value::String(error.event_message()));
    }
}

fn bool_response(result: Result<bool, CaptureError>, context: &str) -> MethodResponse {
    match result {
        Ok(value) => MethodResponse::success(value),
        Err(CaptureError::PermissionDenied) => MethodResponse::from_error(
            &CaptureError::PermissionDenied,
            "Record audio permission denied",
        ),
        Err(e) => MethodResponse::from_error(&e, format!("{}: {}", context, e)),
    }
}

/// Parse `{frameLength: int, sampleRate: int}`. Floats, strings and values
/// outside a 32-bit signed integer are rejected.
pub fn parse_start_arguments(arguments: &Value) -> Result<CaptureConfig, CaptureError> {
    let frame_length = integer_argument(arguments, "frameLength")?;
    let sample_rate = integer_argument(arguments, "sampleRate")?;

    let frame_length = usize::try_from(frame_length).map_err(|_| {
        CaptureError::InvalidArgument(format!("frameLength must be positive, got {}", frame_length))
    })?;
    let sample_rate = u32::try_from(sample_rate).map_err(|_| {
        CaptureError::InvalidArgument(format!("sampleRate must be positive, got {}", sample_rate))
    })?;
    CaptureConfig::new(frame_length, sample_rate)
}

fn integer_argument(arguments: &Value, name: &str) -> Result<i32, CaptureError> {
    let value = arguments
        .get(name)
        .ok_or_else(|| CaptureError::InvalidArgument(format!("missing {}", name)))?;
    value
        .as_i64()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| CaptureError::InvalidArgument(format!("{} must be an integer, got {}", name, value)))
}
