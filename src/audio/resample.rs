//! Channel mixing and sample-rate conversion.
//!
//! Capture devices deliver interleaved audio at their native rate (commonly
//! 44.1 or 48 kHz, often stereo).  The analyser wants mono; the transcription
//! upload wants 16 kHz mono.  Two steps cover both:
//!
//! 1. [`downmix_to_mono`] averages interleaved channels.
//! 2. [`resample`] converts between rates using linear interpolation.

// ---------------------------------------------------------------------------
// downmix_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// The output length is `samples.len() / channels`; a trailing partial frame
/// is dropped.  `channels == 0` yields an empty vector.
///
/// # Example
///
/// ```rust
/// use handsfree_voice::audio::downmix_to_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, 0.4]; // L R L R
/// let mono = downmix_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.0).abs() < 1e-6);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Resample mono `samples` from `source_rate` to `target_rate` Hz.
///
/// Equal rates return a copy.  A zero rate or empty input yields an empty
/// vector.  The output length is `ceil(len * target / source)`.
///
/// # Example
///
/// ```rust
/// use handsfree_voice::audio::resample;
///
/// let hi = vec![0.5_f32; 480]; // 10 ms @ 48 kHz
/// let lo = resample(&hi, 48_000, 16_000);
/// assert_eq!(lo.len(), 160);
/// ```
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate {
        return samples.to_vec();
    }
    if samples.is_empty() || source_rate == 0 || target_rate == 0 {
        return Vec::new();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let idx = src_pos as usize;
            let frac = (src_pos - idx as f64) as f32;

            match (samples.get(idx), samples.get(idx + 1)) {
                (Some(&a), Some(&b)) => a * (1.0 - frac) + b * frac,
                (Some(&a), None) => a,
                _ => 0.0,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_mono_is_passthrough() {
        let input = vec![0.1_f32, 0.2, 0.3];
        assert_eq!(downmix_to_mono(&input, 1), input);
    }

    #[test]
    fn downmix_drops_partial_frame() {
        let out = downmix_to_mono(&[1.0_f32, 1.0, 0.5], 2);
        assert_eq!(out, vec![1.0]);
    }

    #[test]
    fn downmix_zero_channels() {
        assert!(downmix_to_mono(&[1.0_f32, 2.0], 0).is_empty());
    }

    #[test]
    fn resample_same_rate_is_noop() {
        let input: Vec<f32> = (0..160).map(|i| i as f32 / 160.0).collect();
        assert_eq!(resample(&input, 16_000, 16_000), input);
    }

    #[test]
    fn resample_zero_rate_is_empty() {
        assert!(resample(&[0.5_f32; 10], 0, 16_000).is_empty());
    }

    #[test]
    fn resample_44100_to_16k_output_length() {
        let input = vec![0.0_f32; 44_100];
        let out = resample(&input, 44_100, 16_000);
        assert!(out.len().abs_diff(16_000) <= 1, "got {}", out.len());
    }

    #[test]
    fn resample_constant_signal_preserves_amplitude() {
        let out = resample(&[0.5_f32; 480], 48_000, 16_000);
        assert!(out.iter().all(|s| (s - 0.5).abs() < 1e-5));
    }

    #[test]
    fn resample_upsample_doubles_length() {
        let out = resample(&[0.0_f32; 80], 8_000, 16_000);
        assert_eq!(out.len(), 160);
    }
}
