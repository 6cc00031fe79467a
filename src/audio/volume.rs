//! Volume estimate from a frequency snapshot.

/// Largest value a frequency bin can hold.
const MAX_MAGNITUDE: f32 = u8::MAX as f32;

/// Reduce frequency-domain byte magnitudes to a volume in `[0.0, 1.0]`.
///
/// The result is the arithmetic mean of the bins divided by 255.  An empty
/// snapshot (no session, or a released one) reads as silence.
///
/// ```
/// use handsfree_voice::audio::compute_volume;
///
/// assert_eq!(compute_volume(&[]), 0.0);
/// assert_eq!(compute_volume(&[255; 128]), 1.0);
/// assert!((compute_volume(&[0, 51]) - 0.1).abs() < 1e-6);
/// ```
pub fn compute_volume(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u64 = bins.iter().map(|&b| u64::from(b)).sum();
    (sum as f64 / bins.len() as f64) as f32 / MAX_MAGNITUDE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_is_zero() {
        assert_eq!(compute_volume(&[0; 128]), 0.0);
    }

    #[test]
    fn uniform_bins_map_linearly() {
        let v = compute_volume(&[20; 128]);
        assert!((v - 20.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn result_stays_in_unit_range() {
        for level in [0u8, 1, 12, 13, 128, 254, 255] {
            let v = compute_volume(&[level; 64]);
            assert!((0.0..=1.0).contains(&v), "{level} -> {v}");
        }
    }

    /// 0.05 sits between 12/255 and 13/255.
    #[test]
    fn default_threshold_boundary() {
        assert!(compute_volume(&[12; 128]) < 0.05);
        assert!(compute_volume(&[13; 128]) > 0.05);
    }

    #[test]
    fn deterministic_for_same_input() {
        let bins: Vec<u8> = (0..128).map(|i| (i * 2) as u8).collect();
        assert_eq!(compute_volume(&bins), compute_volume(&bins));
    }
}
