//! cpal capture backend.
//!
//! cpal delivers audio on its own callback thread, so the device converts
//! each callback buffer to mono PCM16 and pushes it into a [`FrameQueue`].
//! The capture worker pulls whole frames out with [`CaptureDevice::read`].

use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig, SupportedBufferSize, SupportedStreamConfigRange};
use voice_processor_core::{CaptureBackend, CaptureDevice, CaptureError, DeviceParams};

use crate::convert::{downmix_into, f32_to_i16};
use crate::priority;
use crate::queue::FrameQueue;

/// Longest a single `read` waits for a full frame before returning a
/// partial read, so the worker can observe stop requests.
const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// Capture backend on the default cpal host.
#[derive(Debug, Clone, Default)]
pub struct CpalBackend {
    /// Input device name; `None` selects the host's default input.
    device_name: Option<String>,
}

impl CpalBackend {
    /// Capture from a specific input device by name.
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }

    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    /// Names of the host's input devices.
    pub fn list_devices() -> Vec<String> {
        cpal::default_host()
            .input_devices()
            .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
            .unwrap_or_default()
    }

    fn input_device(&self) -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        match &self.device_name {
            None => host
                .default_input_device()
                .ok_or_else(|| CaptureError::DeviceUnavailable("no default input device".into())),
            Some(name) => host
                .input_devices()
                .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to list input devices: {}", e)))?
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                .ok_or_else(|| CaptureError::DeviceUnavailable(format!("input device '{}' not found", name))),
        }
    }
}

/// Pick the input config closest to mono PCM16 at `sample_rate`.
///
/// Only configs covering the rate in an i16 or f32 format qualify; fewer
/// channels win, then i16 over f32.
fn select_config(
    configs: impl Iterator<Item = SupportedStreamConfigRange>,
    sample_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .filter(|c| c.min_sample_rate().0 <= sample_rate && c.max_sample_rate().0 >= sample_rate)
        .filter(|c| matches!(c.sample_format(), SampleFormat::I16 | SampleFormat::F32))
        .min_by_key(|c| (c.channels(), c.sample_format() != SampleFormat::I16))
}

fn supported_config(device: &cpal::Device, sample_rate: u32) -> Result<SupportedStreamConfigRange, CaptureError> {
    let configs = device
        .supported_input_configs()
        .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to query input configs: {}", e)))?;
    select_config(configs, sample_rate).ok_or_else(|| {
        CaptureError::DeviceUnavailable(format!("no 16-bit or float input config at {} Hz", sample_rate))
    })
}

/// Samples the frame queue holds: at least one second of audio and two whole
/// frames, so a frame of any length can complete before overflow drops it.
fn queue_capacity(params: &DeviceParams) -> usize {
    params
        .buffer_size_samples()
        .max(params.sample_rate as usize)
        .max(params.frame_length.saturating_mul(2))
}

impl CaptureBackend for CpalBackend {
    type Device = CpalDevice;

    fn min_buffer_size(&self, sample_rate: u32) -> Result<usize, CaptureError> {
        let device = self.input_device()?;
        let config = supported_config(&device, sample_rate)?;
        Ok(match config.buffer_size() {
            SupportedBufferSize::Range { min, .. } => *min as usize * std::mem::size_of::<i16>(),
            SupportedBufferSize::Unknown => 0,
        })
    }

    fn open(&self, params: &DeviceParams) -> Result<CpalDevice, CaptureError> {
        let device = self.input_device()?;
        let supported = supported_config(&device, params.sample_rate)?;
        let format = supported.sample_format();
        let channels = supported.channels() as usize;
        let config = StreamConfig {
            channels: supported.channels(),
            sample_rate: SampleRate(params.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let capacity = queue_capacity(params);
        let queue = Arc::new(FrameQueue::new(capacity));

        let error_queue = Arc::clone(&queue);
        let on_error = move |err: cpal::StreamError| {
            log::error!("cpal input stream error: {}", err);
            error_queue.fail(err.to_string());
        };

        let stream_queue = Arc::clone(&queue);
        let mut scratch: Vec<i16> = Vec::with_capacity(capacity);
        let stream = match format {
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    downmix_into(data, channels, &mut scratch, |s| s);
                    stream_queue.push(&scratch);
                },
                on_error,
                None,
            ),
            _ => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    downmix_into(data, channels, &mut scratch, f32_to_i16);
                    stream_queue.push(&scratch);
                },
                on_error,
                None,
            ),
        }
        .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to build input stream: {}", e)))?;

        log::info!(
            "Opened cpal input '{}': {} Hz, {} channel(s), {:?}",
            device.name().unwrap_or_else(|_| "unknown".into()),
            params.sample_rate,
            channels,
            format
        );

        Ok(CpalDevice {
            stream: Some(stream),
            queue,
        })
    }

    fn promote_current_thread(&self) -> Result<(), CaptureError> {
        priority::promote_current_thread()
    }
}

/// An open cpal input stream.
pub struct CpalDevice {
    stream: Option<cpal::Stream>,
    queue: Arc<FrameQueue>,
}

impl CpalDevice {
    fn stream(&self) -> Result<&cpal::Stream, CaptureError> {
        self.stream
            .as_ref()
            .ok_or_else(|| CaptureError::DeviceUnavailable("input stream already released".into()))
    }
}

impl CaptureDevice for CpalDevice {
    fn start(&mut self) -> Result<(), CaptureError> {
        self.queue.clear();
        self.stream()?
            .play()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to start input stream: {}", e)))
    }

    fn read(&mut self, buffer: &mut [i16]) -> Result<usize, CaptureError> {
        self.queue.pop_frame(buffer, READ_TIMEOUT)
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.stream()?
            .pause()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to pause input stream: {}", e)))
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            let dropped = self.queue.dropped();
            if dropped > 0 {
                log::warn!("Input overflowed; {} samples dropped", dropped);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(channels: u16, min: u32, max: u32, format: SampleFormat) -> SupportedStreamConfigRange {
        SupportedStreamConfigRange::new(
            channels,
            SampleRate(min),
            SampleRate(max),
            SupportedBufferSize::Range { min: 256, max: 4096 },
            format,
        )
    }

    #[test]
    fn prefers_mono_i16_covering_rate() {
        let configs = vec![
            range(2, 8000, 48000, SampleFormat::I16),
            range(1, 8000, 48000, SampleFormat::F32),
            range(1, 8000, 48000, SampleFormat::I16),
            range(1, 44100, 48000, SampleFormat::I16),
        ];
        let chosen = select_config(configs.into_iter(), 16000).unwrap();
        assert_eq!(chosen.channels(), 1);
        assert_eq!(chosen.sample_format(), SampleFormat::I16);
        assert_eq!(chosen.min_sample_rate(), SampleRate(8000));
    }

    #[test]
    fn falls_back_to_stereo_float() {
        let configs = vec![
            range(2, 8000, 48000, SampleFormat::F32),
            range(1, 8000, 48000, SampleFormat::U8),
        ];
        let chosen = select_config(configs.into_iter(), 16000).unwrap();
        assert_eq!(chosen.channels(), 2);
        assert_eq!(chosen.sample_format(), SampleFormat::F32);
    }

    #[test]
    fn rejects_unsupported_rate() {
        let configs = vec![range(1, 44100, 48000, SampleFormat::I16)];
        assert!(select_config(configs.into_iter(), 16000).is_none());
    }

    #[test]
    fn queue_holds_two_frames() {
        assert_eq!(queue_capacity(&DeviceParams::mono_pcm16(16000, 512, 8000)), 16000);
        assert_eq!(queue_capacity(&DeviceParams::mono_pcm16(16000, 32000, 8000)), 64000);
    }

    #[test]
    fn frame_longer_than_one_second_completes() {
        let params = DeviceParams::mono_pcm16(16000, 32000, 8000);
        let queue = FrameQueue::new(queue_capacity(&params));
        let mut frame = vec![0i16; params.frame_length];

        let mut full_frames = 0;
        for chunk in 0..10i16 {
            queue.push(&[chunk; 8000]);
            if queue.pop_frame(&mut frame, Duration::ZERO).unwrap() == frame.len() {
                full_frames += 1;
            }
        }

        assert_eq!(full_frames, 2);
        assert_eq!(queue.dropped(), 0);
        assert_eq!(frame[0], 4);
    }

    #[test]
    fn named_device_is_kept() {
        let backend = CpalBackend::with_device("USB Mic");
        assert_eq!(backend.device_name(), Some("USB Mic"));
        assert_eq!(CpalBackend::default().device_name(), None);
    }
}
