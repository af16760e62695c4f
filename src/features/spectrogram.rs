//! Power-spectral-density spectrograms of epoched channels.
//!
//! Each epoch row is edge-padded by `window/2 - stride/2` samples on both
//! ends, cut into segments of `window` samples every `stride` samples, and
//! each segment is turned into a one-sided PSD:
//!
//! ```text
//! seg'   = (seg - mean(seg)) * w          w = periodic Tukey(0.25)
//! P[k]   = |FFT(seg')[k]|² / (fs · Σw²)
//! P[k]  *= 2   for 0 < k < window/2 (and k = window/2 when window is odd)
//! ```
//!
//! The number of time bins is `(padded_len - (window - stride)) / stride`.

use crate::error::{PsgError, Result};
use ndarray::{Array4, ArrayView1, ArrayView2};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::Arc;

/// Tukey taper fraction applied to every segment.
pub const TUKEY_ALPHA: f64 = 0.25;

/// Spectrogram parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrogramConfig {
    /// Sampling rate of the channel in Hz
    pub sampling_rate: u32,

    /// Segment length in samples
    pub window: usize,

    /// Hop between segments in samples
    pub stride: usize,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 250,
            window: 500,
            stride: 100,
        }
    }
}

impl SpectrogramConfig {
    /// Create a spectrogram configuration.
    pub fn new(sampling_rate: u32, window: usize, stride: usize) -> Self {
        Self {
            sampling_rate,
            window,
            stride,
        }
    }

    /// Validate parameters.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.sampling_rate == 0 {
            return Err("sampling_rate must be > 0".to_string());
        }
        if self.window < 2 {
            return Err("window must be >= 2".to_string());
        }
        if self.stride == 0 {
            return Err("stride must be > 0".to_string());
        }
        if self.stride > self.window {
            return Err(format!(
                "stride ({}) must not exceed window ({})",
                self.stride, self.window
            ));
        }
        Ok(())
    }

    /// Edge padding added to each side of an epoch.
    #[inline]
    pub fn padding(&self) -> usize {
        self.window / 2 - self.stride / 2
    }

    /// Segment overlap in samples.
    #[inline]
    pub fn overlap(&self) -> usize {
        self.window - self.stride
    }

    /// Number of one-sided frequency bins.
    #[inline]
    pub fn num_frequency_bins(&self) -> usize {
        self.window / 2 + 1
    }

    /// Bin centre frequencies in Hz.
    pub fn frequencies(&self) -> Vec<f64> {
        rfft_frequencies(self.window, self.sampling_rate as f64)
    }

    /// Number of time bins produced for an epoch of `epoch_samples`.
    pub fn num_time_bins(&self, epoch_samples: usize) -> usize {
        let padded = epoch_samples + 2 * self.padding();
        if padded < self.window {
            return 0;
        }
        (padded - self.overlap()) / self.stride
    }
}

/// Frequencies of a real FFT of length `n` at `sampling_rate`.
pub fn rfft_frequencies(n: usize, sampling_rate: f64) -> Vec<f64> {
    let step = sampling_rate / n as f64;
    (0..=n / 2).map(|k| k as f64 * step).collect()
}

/// Symmetric Tukey window of `len` points.
fn tukey_symmetric(len: usize, alpha: f64) -> Vec<f64> {
    match len {
        0 => return Vec::new(),
        1 => return vec![1.0],
        _ => {}
    }
    let last = (len - 1) as f64;
    if alpha <= 0.0 {
        return vec![1.0; len];
    }
    if alpha >= 1.0 {
        return (0..len)
            .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / last).cos())
            .collect();
    }

    let width = (alpha * last / 2.0).floor() as usize;
    (0..len)
        .map(|n| {
            let x = n as f64;
            if n <= width {
                0.5 * (1.0 + (PI * (-1.0 + 2.0 * x / alpha / last)).cos())
            } else if n >= len - width - 1 {
                0.5 * (1.0 + (PI * (-2.0 / alpha + 1.0 + 2.0 * x / alpha / last)).cos())
            } else {
                1.0
            }
        })
        .collect()
}

/// Periodic Tukey window (spectral-analysis convention).
pub fn tukey_window(len: usize, alpha: f64) -> Vec<f64> {
    let mut w = tukey_symmetric(len + 1, alpha);
    w.truncate(len);
    w
}

/// PSD spectrogram with a pre-planned FFT.
pub struct Spectrogram {
    config: SpectrogramConfig,
    taper: Vec<f64>,
    scale: f64,
    fft: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for Spectrogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spectrogram")
            .field("config", &self.config)
            .finish()
    }
}

impl Spectrogram {
    /// Plan the FFT for `config`.
    pub fn new(config: SpectrogramConfig) -> Result<Self> {
        config.validate().map_err(PsgError::Config)?;

        let taper = tukey_window(config.window, TUKEY_ALPHA);
        let power: f64 = taper.iter().map(|w| w * w).sum();
        let scale = 1.0 / (config.sampling_rate as f64 * power);
        let fft = FftPlanner::new().plan_fft_forward(config.window);

        Ok(Self {
            config,
            taper,
            scale,
            fft,
        })
    }

    /// Parameters this spectrogram was planned with.
    pub fn config(&self) -> &SpectrogramConfig {
        &self.config
    }

    /// Spectrogram of every epoch row.
    ///
    /// Input is `(epochs, samples)`; output is `(epochs, 1, freq, time)`.
    pub fn compute(&self, epochs: ArrayView2<f64>) -> Result<Array4<f64>> {
        let (n_epochs, epoch_samples) = epochs.dim();
        if epoch_samples == 0 {
            return Err(PsgError::config("cannot compute spectrogram of empty epochs"));
        }
        let n_time = self.config.num_time_bins(epoch_samples);
        if n_time == 0 {
            return Err(PsgError::config(format!(
                "epoch of {} samples is too short for window {}",
                epoch_samples, self.config.window
            )));
        }
        let n_freq = self.config.num_frequency_bins();

        let mut out = Array4::<f64>::zeros((n_epochs, 1, n_freq, n_time));
        let mut padded = Vec::with_capacity(epoch_samples + 2 * self.config.padding());
        let mut buffer = vec![Complex::new(0.0, 0.0); self.config.window];

        for (e, row) in epochs.outer_iter().enumerate() {
            self.pad_edges(row, &mut padded);
            for t in 0..n_time {
                let start = t * self.config.stride;
                let segment = &padded[start..start + self.config.window];
                self.segment_psd(segment, &mut buffer);
                for k in 0..n_freq {
                    out[[e, 0, k, t]] = self.one_sided_power(&buffer, k);
                }
            }
        }

        Ok(out)
    }

    /// Replicate boundary samples `padding` times on each side.
    fn pad_edges(&self, row: ArrayView1<f64>, padded: &mut Vec<f64>) {
        let pad = self.config.padding();
        let first = row[0];
        let last = row[row.len() - 1];
        padded.clear();
        padded.extend(std::iter::repeat(first).take(pad));
        padded.extend(row.iter().copied());
        padded.extend(std::iter::repeat(last).take(pad));
    }

    /// Detrend, taper and transform one segment in place.
    fn segment_psd(&self, segment: &[f64], buffer: &mut [Complex<f64>]) {
        let mean = segment.iter().sum::<f64>() / segment.len() as f64;
        for ((slot, &x), &w) in buffer.iter_mut().zip(segment).zip(&self.taper) {
            *slot = Complex::new((x - mean) * w, 0.0);
        }
        self.fft.process(buffer);
    }

    #[inline]
    fn one_sided_power(&self, spectrum: &[Complex<f64>], k: usize) -> f64 {
        let window = self.config.window;
        let p = spectrum[k].norm_sqr() * self.scale;
        let nyquist = window % 2 == 0 && k == window / 2;
        if k == 0 || nyquist {
            p
        } else {
            2.0 * p
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    #[test]
    fn test_default_geometry() {
        let cfg = SpectrogramConfig::default();
        assert_eq!(cfg.padding(), 200);
        assert_eq!(cfg.num_frequency_bins(), 251);
        // 30 s epochs at 250 Hz
        assert_eq!(cfg.num_time_bins(7500), 75);
        // 2 s epochs at 250 Hz
        assert_eq!(cfg.num_time_bins(500), 5);
    }

    #[test]
    fn test_rfft_frequencies() {
        let f = rfft_frequencies(500, 250.0);
        assert_eq!(f.len(), 251);
        assert_relative_eq!(f[1], 0.5);
        assert_relative_eq!(f[50], 25.0);
        assert_relative_eq!(f[250], 125.0);
    }

    #[test]
    fn test_tukey_window_shape() {
        let w = tukey_window(500, TUKEY_ALPHA);
        assert_eq!(w.len(), 500);
        assert_relative_eq!(w[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(w[250], 1.0);
        assert!(w.iter().all(|&v| (0.0..=1.0).contains(&v)));
        // Periodic window is symmetric around len/2
        assert_relative_eq!(w[1], w[499], epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(Spectrogram::new(SpectrogramConfig::new(250, 100, 200)).is_err());
        assert!(Spectrogram::new(SpectrogramConfig::new(0, 500, 100)).is_err());
        assert!(Spectrogram::new(SpectrogramConfig::new(250, 500, 0)).is_err());
    }

    #[test]
    fn test_constant_signal_has_no_power() {
        let spec = Spectrogram::new(SpectrogramConfig::default()).unwrap();
        let epochs = Array2::from_elem((2, 500), 3.5);
        let out = spec.compute(epochs.view()).unwrap();
        assert_eq!(out.shape(), &[2, 1, 251, 5]);
        assert!(out.iter().all(|&v| v.abs() < 1e-20));
    }

    #[test]
    fn test_sine_peak_at_its_frequency() {
        let cfg = SpectrogramConfig::default();
        let spec = Spectrogram::new(cfg.clone()).unwrap();
        let fs = cfg.sampling_rate as f64;
        let row: Vec<f64> = (0..2500)
            .map(|n| (2.0 * PI * 10.0 * n as f64 / fs).sin())
            .collect();
        let epochs = Array2::from_shape_vec((1, 2500), row).unwrap();
        let out = spec.compute(epochs.view()).unwrap();

        let t = 10;
        let column: Vec<f64> = (0..cfg.num_frequency_bins())
            .map(|k| out[[0, 0, k, t]])
            .collect();
        let peak = column
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, _)| k)
            .unwrap();
        // 10 Hz at 0.5 Hz resolution
        assert_eq!(peak, 20);
    }

    #[test]
    fn test_too_short_epoch_is_error() {
        let spec = Spectrogram::new(SpectrogramConfig::new(100, 400, 10)).unwrap();
        let epochs = Array2::<f64>::zeros((1, 4));
        assert!(spec.compute(epochs.view()).is_err());
    }
}
