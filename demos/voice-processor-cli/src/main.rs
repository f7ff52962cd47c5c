//! voice-processor - capture microphone frames through the bridge handler.
//!
//! Drives `VoiceProcessorHandler` the way a host application would: checks the
//! record permission, subscribes to the buffer and error streams, calls
//! `start`, waits, then calls `stop`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;
use voice_processor_core::bridge::codec::{PERMISSION_METHOD, START_METHOD, STOP_METHOD};
use voice_processor_core::{
    AudioCaptureSession, EventSink, MethodCall, MethodResponse, SessionOptions, VoiceProcessorHandler,
};
use voice_processor_cpal::{CpalBackend, CpalPermissions};

/// Capture 16-bit mono microphone frames and print one line per frame
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Samples per delivered frame
    #[arg(long, default_value_t = 512)]
    frame_length: i64,

    /// Capture sample rate in Hz
    #[arg(long, default_value_t = 16000)]
    sample_rate: i64,

    /// How long to capture before stopping
    #[arg(long, default_value_t = 5)]
    seconds: u64,

    /// Input device name (default input device if omitted)
    #[arg(long, env = "VOICE_PROCESSOR_DEVICE")]
    device: Option<String>,

    /// JSON file with session options (thread names, priority, denial policy)
    #[arg(long)]
    options: Option<PathBuf>,

    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,
}

/// Prints a summary line for every frame event.
struct FramePrinter {
    frames: AtomicU64,
}

impl EventSink for FramePrinter {
    fn send(&self, event: Value) {
        let index = self.frames.fetch_add(1, Ordering::Relaxed);
        let samples = event.as_array().map(Vec::as_slice).unwrap_or_default();
        let peak = samples
            .iter()
            .filter_map(Value::as_i64)
            .map(i64::abs)
            .max()
            .unwrap_or(0);
        println!("frame {:>5}  {} samples  peak {:>5}", index, samples.len(), peak);
    }
}

struct ErrorPrinter;

impl EventSink for ErrorPrinter {
    fn send(&self, event: Value) {
        eprintln!("capture error: {}", event.as_str().unwrap_or_default());
    }
}

/// Issue a method call and block until it is answered.
fn call(
    handler: &VoiceProcessorHandler<CpalBackend>,
    method: &str,
    arguments: Value,
) -> Result<MethodResponse> {
    let (tx, rx) = bounded(1);
    handler.on_method_call(
        MethodCall::new(method, arguments),
        Box::new(move |response| {
            let _ = tx.send(response);
        }),
    );
    rx.recv_timeout(Duration::from_secs(10))
        .with_context(|| format!("no response to '{}'", method))
}

fn load_options(path: Option<&PathBuf>) -> Result<SessionOptions> {
    let Some(path) = path else {
        return Ok(SessionOptions::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid session options in {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if args.list_devices {
        for name in CpalBackend::list_devices() {
            println!("{}", name);
        }
        return Ok(());
    }

    let backend = match &args.device {
        Some(name) => CpalBackend::with_device(name),
        None => CpalBackend::default(),
    };
    let options = load_options(args.options.as_ref())?;
    let session = AudioCaptureSession::with_options(backend, Arc::new(CpalPermissions), options)?;
    let handler = VoiceProcessorHandler::new(Arc::new(session));

    match call(&handler, PERMISSION_METHOD, Value::Null)? {
        MethodResponse::Success { result } if result == json!(true) => {}
        other => bail!("record audio permission not granted: {:?}", other),
    }

    handler.on_listen(
        &json!("buffer"),
        Arc::new(FramePrinter {
            frames: AtomicU64::new(0),
        }),
    );
    handler.on_listen(&json!("error"), Arc::new(ErrorPrinter));

    let arguments = json!({"frameLength": args.frame_length, "sampleRate": args.sample_rate});
    match call(&handler, START_METHOD, arguments)? {
        MethodResponse::Success { result } => log::info!("start -> {}", result),
        MethodResponse::Error { code, message, .. } => bail!("{}: {}", code, message),
        MethodResponse::NotImplemented => bail!("start not implemented"),
    }

    std::thread::sleep(Duration::from_secs(args.seconds));

    let stopped = call(&handler, STOP_METHOD, Value::Null)?;
    log::info!("stop -> {:?}", stopped);

    handler.on_cancel(&json!("buffer"));
    handler.on_cancel(&json!("error"));
    handler.close();
    Ok(())
}
