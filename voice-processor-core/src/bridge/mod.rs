pub mod codec;
pub mod handler;

pub use codec::{EventSink, EventStream, MethodCall, MethodResponse, Responder};
pub use handler::VoiceProcessorHandler;
