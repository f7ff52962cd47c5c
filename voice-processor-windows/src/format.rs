//! PCM format arithmetic shared by the WASAPI backend.

/// WASAPI durations are expressed in 100-nanosecond units.
pub const HNS_PER_SECOND: i64 = 10_000_000;

pub const BITS_PER_SAMPLE: u16 = 16;
pub const BYTES_PER_SAMPLE: u16 = BITS_PER_SAMPLE / 8;

/// Field values of a mono 16-bit PCM `WAVEFORMATEX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl PcmFormat {
    pub fn mono16(sample_rate: u32) -> Self {
        let block_align = BYTES_PER_SAMPLE;
        Self {
            channels: 1,
            sample_rate,
            avg_bytes_per_sec: sample_rate * block_align as u32,
            block_align,
            bits_per_sample: BITS_PER_SAMPLE,
        }
    }
}

/// Duration, in 100ns units, of a mono 16-bit buffer of `bytes` at `sample_rate`.
pub fn buffer_duration_hns(bytes: usize, sample_rate: u32) -> i64 {
    if sample_rate == 0 {
        return 0;
    }
    let samples = (bytes / BYTES_PER_SAMPLE as usize) as i64;
    samples * HNS_PER_SECOND / sample_rate as i64
}

/// Size in bytes of a mono 16-bit buffer lasting `hns` at `sample_rate`,
/// rounded up to a whole sample.
pub fn buffer_bytes_for(hns: i64, sample_rate: u32) -> usize {
    let samples = (hns.max(0) * sample_rate as i64 + HNS_PER_SECOND - 1) / HNS_PER_SECOND;
    samples as usize * BYTES_PER_SAMPLE as usize
}
