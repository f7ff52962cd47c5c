//! # voice-processor-cpal
//!
//! Cross-platform microphone backend for voice-processor, built on `cpal`.
//!
//! Provides:
//! - `CpalBackend` / `CpalDevice`: 16-bit mono capture at the requested rate.
//!   cpal pushes samples from its audio callback into a `FrameQueue`; the
//!   session's capture worker pulls whole frames out of it.
//! - `CpalPermissions`: microphone availability probe.
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use voice_processor_core::{AudioCaptureSession, CaptureConfig};
//! use voice_processor_cpal::{CpalBackend, CpalPermissions};
//!
//! let session = AudioCaptureSession::new(CpalBackend::default(), Arc::new(CpalPermissions::default()))?;
//! session.register_frame_consumer(|frame| println!("{} samples", frame.len()));
//! session.start(CaptureConfig::new(512, 16000)?)?;
//! ```

pub mod backend;
pub mod convert;
pub mod permissions;
pub mod priority;
pub mod queue;

pub use backend::{CpalBackend, CpalDevice};
pub use permissions::CpalPermissions;
pub use queue::FrameQueue;
