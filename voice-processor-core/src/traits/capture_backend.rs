use crate::models::error::CaptureError;

/// Input source requested from the device layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioSource {
    Mic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelLayout {
    Mono,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleEncoding {
    /// Signed 16-bit little-endian PCM.
    Pcm16,
}

/// Everything a backend needs to open a capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceParams {
    pub source: AudioSource,
    pub sample_rate: u32,
    pub channels: ChannelLayout,
    pub encoding: SampleEncoding,
    /// Samples the worker asks for in every `read`.
    pub frame_length: usize,
    /// Device-side buffer size in bytes.
    pub buffer_size_bytes: usize,
}

impl DeviceParams {
    /// 16-bit mono microphone capture, the only shape the session requests.
    pub fn mono_pcm16(sample_rate: u32, frame_length: usize, buffer_size_bytes: usize) -> Self {
        Self {
            source: AudioSource::Mic,
            sample_rate,
            channels: ChannelLayout::Mono,
            encoding: SampleEncoding::Pcm16,
            frame_length,
            buffer_size_bytes,
        }
    }

    /// Device buffer capacity expressed in samples.
    pub fn buffer_size_samples(&self) -> usize {
        self.buffer_size_bytes / std::mem::size_of::<i16>()
    }
}

/// Platform audio API used by the capture worker.
///
/// Implemented by:
/// - `CpalBackend` (all desktop platforms)
/// - `WasapiBackend` (Windows)
///
/// Every method except construction is called from the capture worker thread,
/// so devices never cross threads and need not be `Send`.
pub trait CaptureBackend: Send + Sync + 'static {
    type Device: CaptureDevice;

    /// Smallest device buffer, in bytes, the platform accepts at `sample_rate`.
    fn min_buffer_size(&self, sample_rate: u32) -> Result<usize, CaptureError>;

    /// Open the capture device. The device is not recording until `start`.
    fn open(&self, params: &DeviceParams) -> Result<Self::Device, CaptureError>;

    /// Raise the calling thread to the platform's urgent-audio priority.
    fn promote_current_thread(&self) -> Result<(), CaptureError> {
        Ok(())
    }
}

/// An open capture device, exclusively owned by one worker.
pub trait CaptureDevice {
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Fill `buffer` with the next samples.
    ///
    /// Returns how many samples were written. Anything short of
    /// `buffer.len()` is a partial read; the session discards it and reads
    /// again, so implementations may return 0 when no data is ready yet.
    fn read(&mut self, buffer: &mut [i16]) -> Result<usize, CaptureError>;

    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Give the device back to the OS. Called exactly once, by the session.
    fn release(&mut self);
}
