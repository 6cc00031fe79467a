//! Byte-scaled frequency snapshots of the live microphone signal.
//!
//! [`FrequencyAnalyzer`] reproduces the behaviour of a browser
//! `AnalyserNode::getByteFrequencyData` call, which the volume thresholds
//! were tuned against:
//!
//! ```text
//! last fft_size samples ─▶ Blackman window ─▶ real FFT ─▶ |X[k]| / N
//!   ─▶ smoothed = τ·previous + (1-τ)·current         (τ = 0.8)
//!   ─▶ dB = 20·log10(smoothed)
//!   ─▶ byte = ⌊255 / (max_db - min_db) · (dB - min_db)⌋ clamped to 0..=255
//! ```
//!
//! The output has `fft_size / 2` bins.

use std::f32::consts::PI;
use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

/// Temporal smoothing between consecutive snapshots.
pub const SMOOTHING_TIME_CONSTANT: f32 = 0.8;
/// Level mapped to byte 0.
pub const MIN_DECIBELS: f32 = -100.0;
/// Level mapped to byte 255.
pub const MAX_DECIBELS: f32 = -30.0;

// ---------------------------------------------------------------------------
// FrequencyAnalyzer
// ---------------------------------------------------------------------------

/// Stateful analyser producing smoothed byte spectra.
///
/// # Example
///
/// ```rust
/// use handsfree_voice::audio::FrequencyAnalyzer;
///
/// let mut analyzer = FrequencyAnalyzer::new(256);
/// let bins = analyzer.byte_frequency_data(&[0.0; 256]);
/// assert_eq!(bins.len(), 128);
/// assert!(bins.iter().all(|&b| b == 0));
/// ```
pub struct FrequencyAnalyzer {
    fft_size: usize,
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    scratch_in: Vec<f32>,
    scratch_out: Vec<Complex<f32>>,
}

impl FrequencyAnalyzer {
    /// Whether `fft_size` is a frame length [`FrequencyAnalyzer::new`] accepts.
    pub fn supports(fft_size: usize) -> bool {
        fft_size >= 32 && fft_size.is_power_of_two()
    }

    /// Create an analyser for `fft_size`-sample frames.
    ///
    /// # Panics
    ///
    /// Panics if `fft_size` is not a power of two of at least 32.
    pub fn new(fft_size: usize) -> Self {
        assert!(
            Self::supports(fft_size),
            "fft_size must be a power of two >= 32"
        );

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch_in = fft.make_input_vec();
        let scratch_out = fft.make_output_vec();

        Self {
            fft_size,
            fft,
            window: blackman_window(fft_size),
            smoothed: vec![0.0; fft_size / 2],
            scratch_in,
            scratch_out,
        }
    }

    /// Frame length in samples.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of bins in each snapshot.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Compute a snapshot from the most recent mono samples.
    ///
    /// Only the newest `fft_size` samples are used; shorter input is
    /// zero-padded at the front.
    pub fn byte_frequency_data(&mut self, samples: &[f32]) -> Vec<u8> {
        let n = self.fft_size;
        let tail = &samples[samples.len().saturating_sub(n)..];
        let pad = n - tail.len();

        self.scratch_in[..pad].fill(0.0);
        for (i, &s) in tail.iter().enumerate() {
            self.scratch_in[pad + i] = s * self.window[pad + i];
        }

        if let Err(e) = self.fft.process(&mut self.scratch_in, &mut self.scratch_out) {
            log::warn!("spectrum: fft failed: {e}");
            return vec![0; self.bin_count()];
        }

        let scale = 1.0 / n as f32;
        let range = MAX_DECIBELS - MIN_DECIBELS;

        self.smoothed
            .iter_mut()
            .zip(&self.scratch_out)
            .map(|(prev, bin)| {
                let magnitude = bin.norm() * scale;
                *prev = SMOOTHING_TIME_CONSTANT * *prev
                    + (1.0 - SMOOTHING_TIME_CONSTANT) * magnitude;

                if *prev <= 0.0 {
                    return 0;
                }
                let db = 20.0 * prev.log10();
                let scaled = (255.0 / range * (db - MIN_DECIBELS)).floor();
                scaled.clamp(0.0, 255.0) as u8
            })
            .collect()
    }

    /// Forget the smoothing history.
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }
}

fn blackman_window(n: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    (0..n)
        .map(|i| {
            let x = 2.0 * PI * i as f32 / n as f32;
            A0 - A1 * x.cos() + A2 * (2.0 * x).cos()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
