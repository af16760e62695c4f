//! Frequency-axis stages: band cut and PSD reduction.
//!
//! Both operate on `(epochs, channels, freq, time)` tensors and leave the
//! epoch, channel and time axes untouched.

use crate::error::{PsgError, Result};
use ndarray::{Array4, Axis};
use serde::{Deserialize, Serialize};

/// Keeps the frequency bins whose centre lies in `[lower, upper]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyCut {
    indices: Vec<usize>,
}

impl FrequencyCut {
    /// Resolve the band against a frequency grid.
    ///
    /// An empty selection is a configuration error.
    pub fn new(frequencies: &[f64], lower: f64, upper: f64) -> Result<Self> {
        if lower > upper {
            return Err(PsgError::config(format!(
                "frequency cut lower bound {lower} exceeds upper bound {upper}"
            )));
        }
        let indices: Vec<usize> = frequencies
            .iter()
            .enumerate()
            .filter(|(_, &f)| f >= lower && f <= upper)
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            return Err(PsgError::config(format!(
                "frequency band [{lower}, {upper}] selects no bins"
            )));
        }
        Ok(Self { indices })
    }

    /// Number of bins kept.
    pub fn num_bins(&self) -> usize {
        self.indices.len()
    }

    /// Apply the cut.
    pub fn apply(&self, input: &Array4<f64>) -> Array4<f64> {
        input.select(Axis(2), &self.indices)
    }
}

/// How the frequency axis is collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PsdMode {
    /// Mean power across bins
    #[default]
    Mean,
    /// Total power across bins
    Sum,
}

/// Collapses the frequency axis to one value and repeats it `output_dim` times.
#[derive(Debug, Clone, PartialEq)]
pub struct PsdReduce {
    mode: PsdMode,
    output_dim: usize,
}

impl PsdReduce {
    /// Create a reduction.
    pub fn new(mode: PsdMode, output_dim: usize) -> Result<Self> {
        if output_dim == 0 {
            return Err(PsgError::config("psd output_dim must be > 0"));
        }
        Ok(Self { mode, output_dim })
    }

    /// Number of bins after broadcasting.
    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Apply the reduction.
    pub fn apply(&self, input: &Array4<f64>) -> Array4<f64> {
        let (n_epochs, n_channels, n_freq, n_time) = input.dim();
        let reduced = match self.mode {
            PsdMode::Mean if n_freq > 0 => input.sum_axis(Axis(2)) / n_freq as f64,
            PsdMode::Mean | PsdMode::Sum => input.sum_axis(Axis(2)),
        };
        let reduced = reduced.insert_axis(Axis(2));

        let mut out = Array4::<f64>::zeros((n_epochs, n_channels, self.output_dim, n_time));
        for mut bin in out.axis_chunks_iter_mut(Axis(2), 1) {
            bin.assign(&reduced);
        }
        out
    }
}
