//! WASAPI microphone capture backend.
//!
//! Opens the capture endpoint in shared mode and asks the audio engine to
//! convert to 16-bit mono at the requested rate, so packets can be copied
//! straight into session frames.

use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use windows::core::*;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;
use windows::Win32::System::Threading::*;

use voice_processor_core::{CaptureBackend, CaptureDevice, CaptureError, DeviceParams};

use crate::format::{buffer_bytes_for, buffer_duration_hns, PcmFormat};

/// Poll interval while waiting for the engine to fill a packet.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Longest a single `read` polls before returning a partial read.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// WASAPI microphone backend.
///
/// Every COM call happens on the capture worker thread; the backend itself
/// only holds the endpoint id.
#[derive(Debug, Clone, Default)]
pub struct WasapiBackend {
    /// Endpoint id; `None` selects the default console capture endpoint.
    device_id: Option<String>,
}

impl WasapiBackend {
    /// Capture from a specific endpoint by MMDevice id.
    pub fn with_device(id: impl Into<String>) -> Self {
        Self {
            device_id: Some(id.into()),
        }
    }

    unsafe fn endpoint(&self) -> Result<IMMDevice, CaptureError> {
        let enumerator: IMMDeviceEnumerator = CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
            .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to create enumerator: {}", e)))?;

        match &self.device_id {
            Some(id) => {
                let wide_id: Vec<u16> = id.encode_utf16().chain(std::iter::once(0)).collect();
                enumerator
                    .GetDevice(PCWSTR(wide_id.as_ptr()))
                    .map_err(|e| CaptureError::DeviceUnavailable(format!("capture endpoint '{}': {}", id, e)))
            }
            None => enumerator
                .GetDefaultAudioEndpoint(eCapture, eConsole)
                .map_err(|e| CaptureError::DeviceUnavailable(format!("no default capture endpoint: {}", e))),
        }
    }

    unsafe fn audio_client(&self) -> Result<IAudioClient, CaptureError> {
        self.endpoint()?
            .Activate(CLSCTX_ALL, None)
            .map_err(|e| CaptureError::DeviceUnavailable(format!("Activate failed: {}", e)))
    }
}

impl CaptureBackend for WasapiBackend {
    type Device = WasapiDevice;

    fn min_buffer_size(&self, sample_rate: u32) -> Result<usize, CaptureError> {
        unsafe {
            let _com = ComGuard::init()?;
            let client = self.audio_client()?;

            let mut min_period: i64 = 0;
            client
                .GetDevicePeriod(None, Some(&mut min_period))
                .map_err(|e| CaptureError::DeviceUnavailable(format!("GetDevicePeriod failed: {}", e)))?;
            Ok(buffer_bytes_for(min_period, sample_rate))
        }
    }

    /// Sequence:
    /// 1. CoInitializeEx (MTA)
    /// 2. Get capture endpoint (default or by id)
    /// 3. Activate IAudioClient
    /// 4. Initialize in shared mode with a 16-bit mono format
    /// 5. Get IAudioCaptureClient service
    fn open(&self, params: &DeviceParams) -> Result<WasapiDevice, CaptureError> {
        unsafe {
            let com = ComGuard::init()?;
            let audio_client = self.audio_client()?;

            let pcm = PcmFormat::mono16(params.sample_rate);
            let format = WAVEFORMATEX {
                wFormatTag: WAVE_FORMAT_PCM as u16,
                nChannels: pcm.channels,
                nSamplesPerSec: pcm.sample_rate,
                nAvgBytesPerSec: pcm.avg_bytes_per_sec,
                nBlockAlign: pcm.block_align,
                wBitsPerSample: pcm.bits_per_sample,
                cbSize: 0,
            };

            audio_client
                .Initialize(
                    AUDCLNT_SHAREMODE_SHARED,
                    AUDCLNT_STREAMFLAGS_AUTOCONVERTPCM
                        | AUDCLNT_STREAMFLAGS_SRC_DEFAULT_QUALITY
                        | AUDCLNT_STREAMFLAGS_NOPERSIST,
                    buffer_duration_hns(params.buffer_size_bytes, params.sample_rate),
                    0,
                    &format,
                    None,
                )
                .map_err(|e| {
                    CaptureError::DeviceUnavailable(format!("IAudioClient::Initialize failed: {}", e))
                })?;

            let capture_client: IAudioCaptureClient = audio_client
                .GetService()
                .map_err(|e| CaptureError::DeviceUnavailable(format!("GetService failed: {}", e)))?;

            log::info!(
                "Opened WASAPI capture endpoint: {} Hz mono, {} byte buffer",
                params.sample_rate,
                params.buffer_size_bytes
            );

            Ok(WasapiDevice {
                audio_client: Some(audio_client),
                capture_client: Some(capture_client),
                pending: VecDeque::with_capacity(params.buffer_size_samples()),
                _com: com,
            })
        }
    }

    /// Register the calling thread with MMCSS under the "Pro Audio" task.
    fn promote_current_thread(&self) -> Result<(), CaptureError> {
        let mut task_index: u32 = 0;
        unsafe {
            AvSetMmThreadCharacteristicsW(w!("Pro Audio"), &mut task_index)
                .map_err(|e| CaptureError::Unknown(format!("AvSetMmThreadCharacteristicsW failed: {}", e)))?;
        }
        Ok(())
    }
}

/// An open shared-mode capture stream.
pub struct WasapiDevice {
    audio_client: Option<IAudioClient>,
    capture_client: Option<IAudioCaptureClient>,
    /// Samples read from the engine but not yet handed to the session.
    pending: VecDeque<i16>,
    /// Dropped last so COM outlives the interfaces above.
    _com: ComGuard,
}

impl WasapiDevice {
    fn audio_client(&self) -> Result<&IAudioClient, CaptureError> {
        self.audio_client
            .as_ref()
            .ok_or_else(|| CaptureError::DeviceUnavailable("capture client already released".into()))
    }

    /// Move every packet the engine has ready into `pending`.
    unsafe fn drain_packets(&mut self) -> Result<(), CaptureError> {
        let Some(capture_client) = self.capture_client.as_ref() else {
            return Err(CaptureError::DeviceUnavailable("capture client already released".into()));
        };

        loop {
            let packet_length = capture_client
                .GetNextPacketSize()
                .map_err(|e| CaptureError::DeviceUnavailable(format!("GetNextPacketSize failed: {}", e)))?;
            if packet_length == 0 {
                return Ok(());
            }

            let mut buffer_ptr: *mut u8 = std::ptr::null_mut();
            let mut num_frames: u32 = 0;
            let mut flags: u32 = 0;
            capture_client
                .GetBuffer(&mut buffer_ptr, &mut num_frames, &mut flags, None, None)
                .map_err(|e| CaptureError::DeviceUnavailable(format!("GetBuffer failed: {}", e)))?;

            let frames = num_frames as usize;
            if flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0 || buffer_ptr.is_null() {
                self.pending.extend(std::iter::repeat(0).take(frames));
            } else {
                // Mono 16-bit: one sample per frame.
                let samples = std::slice::from_raw_parts(buffer_ptr as *const i16, frames);
                self.pending.extend(samples.iter().copied());
            }

            capture_client
                .ReleaseBuffer(num_frames)
                .map_err(|e| CaptureError::DeviceUnavailable(format!("ReleaseBuffer failed: {}", e)))?;
        }
    }
}

impl CaptureDevice for WasapiDevice {
    fn start(&mut self) -> Result<(), CaptureError> {
        self.pending.clear();
        unsafe {
            self.audio_client()?
                .Start()
                .map_err(|e| CaptureError::DeviceUnavailable(format!("IAudioClient::Start failed: {}", e)))
        }
    }

    fn read(&mut self, buffer: &mut [i16]) -> Result<usize, CaptureError> {
        let deadline = Instant::now() + READ_TIMEOUT;
        while self.pending.len() < buffer.len() {
            unsafe { self.drain_packets()? };
            if self.pending.len() >= buffer.len() || Instant::now() >= deadline {
                break;
            }
            thread::sleep(POLL_INTERVAL);
        }

        if self.pending.len() < buffer.len() {
            return Ok(0);
        }
        for (slot, sample) in buffer.iter_mut().zip(self.pending.drain(..buffer.len())) {
            *slot = sample;
        }
        Ok(buffer.len())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        unsafe {
            self.audio_client()?
                .Stop()
                .map_err(|e| CaptureError::DeviceUnavailable(format!("IAudioClient::Stop failed: {}", e)))
        }
    }

    fn release(&mut self) {
        self.capture_client.take();
        self.audio_client.take();
        self.pending.clear();
    }
}

/// Balances a successful `CoInitializeEx` on drop.
struct ComGuard;

impl ComGuard {
    unsafe fn init() -> Result<Self, CaptureError> {
        CoInitializeEx(None, COINIT_MULTITHREADED)
            .ok()
            .map_err(|e| CaptureError::Unknown(format!("CoInitializeEx failed: {}", e)))?;
        Ok(Self)
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        unsafe {
            CoUninitialize();
        }
    }
}
