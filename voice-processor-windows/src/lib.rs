//! # voice-processor-windows
//!
//! Windows WASAPI backend for voice-processor.
//!
//! Provides:
//! - `WasapiBackend` / `WasapiDevice`: shared-mode microphone capture, with
//!   the audio engine converting to 16-bit mono at the requested rate
//! - `WindowsMicPermissions`: microphone privacy check
//! - `format`: PCM format and buffer-duration arithmetic
//!
//! ## Platform Requirements
//! - Windows 10 1703+ for `AUTOCONVERTPCM` sample-rate conversion
//! - Visual Studio Build Tools 2022 + Windows SDK for linking
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use voice_processor_core::AudioCaptureSession;
//! use voice_processor_windows::{WasapiBackend, WindowsMicPermissions};
//!
//! let session = AudioCaptureSession::new(WasapiBackend::default(), Arc::new(WindowsMicPermissions))?;
//! ```

pub mod format;
#[cfg(target_os = "windows")]
pub mod permissions;
#[cfg(target_os = "windows")]
pub mod wasapi_mic;

#[cfg(target_os = "windows")]
pub use permissions::WindowsMicPermissions;
#[cfg(target_os = "windows")]
pub use wasapi_mic::{WasapiBackend, WasapiDevice};
