//! Sample conversion from the device's native format to mono PCM16.

/// Scale a float sample in `[-1.0, 1.0]` to 16-bit, clamping out-of-range input.
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Average interleaved channels into `out`, converting each sample with `to_i16`.
///
/// `out` is cleared first; trailing samples that do not fill a whole
/// interleaved frame are ignored.
pub fn downmix_into<T, F>(input: &[T], channels: usize, out: &mut Vec<i16>, to_i16: F)
where
    T: Copy,
    F: Fn(T) -> i16,
{
    out.clear();
    if channels <= 1 {
        out.extend(input.iter().map(|&s| to_i16(s)));
        return;
    }

    out.extend(input.chunks_exact(channels).map(|frame| {
        let sum: i32 = frame.iter().map(|&s| to_i16(s) as i32).sum();
        (sum / channels as i32) as i16
    }));
}
