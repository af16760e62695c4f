//! Log compression and whitening of spectrogram features.
//!
//! Two families live here:
//!
//! - **Pipeline stages** operating on `(epochs, channels, freq, time)` tensors
//!   inside a channel pipeline ([`log_transform`], [`standardize_per_sample`]).
//! - **Sample transforms** applied lazily to one persisted windowed sample
//!   `(channels, freq, time)` when it is read back ([`SampleTransform`]).
//!
//! # Per-sample standardization
//!
//! ```text
//! x' = (x - mean(x)) / (std(x) + 1e-4)
//! ```
//!
//! Statistics are taken over the frequency × time extent of a single epoch and
//! channel (population standard deviation). Nothing is shared across epochs.

use ndarray::{Array3, Array4, ArrayViewMut2, Axis};
use serde::{Deserialize, Serialize};

/// Additive floor inside the logarithm.
pub const LOG_EPSILON: f64 = 1e-4;

/// Added to the standard deviation before dividing.
pub const STD_EPSILON: f64 = 1e-4;

/// `ln(x + 1e-4)` elementwise.
pub fn log_transform(mut input: Array4<f64>) -> Array4<f64> {
    input.mapv_inplace(|x| (x + LOG_EPSILON).ln());
    input
}

/// Whiten every `(freq, time)` plane independently.
pub fn standardize_per_sample(mut input: Array4<f64>) -> Array4<f64> {
    for mut epoch in input.outer_iter_mut() {
        for plane in epoch.outer_iter_mut() {
            standardize_plane(plane);
        }
    }
    input
}

fn standardize_plane(mut plane: ArrayViewMut2<f64>) {
    let n = plane.len();
    if n == 0 {
        return;
    }
    let mean = plane.sum() / n as f64;
    let var = plane.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    let denom = var.sqrt() + STD_EPSILON;
    plane.mapv_inplace(|x| (x - mean) / denom);
}

/// Optional transform applied to a sample when it is read from the store.
///
/// Serialized with a `kind` tag so it can sit inside a dataset config:
///
/// ```toml
/// [transform]
/// kind = "clip"
/// min = -5.0
/// max = 5.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SampleTransform {
    /// Per-channel whitening over `(freq, time)`.
    Standardize,
    /// Multiply every value by `factor`.
    Scale { factor: f64 },
    /// Clamp every value into `[min, max]`.
    Clip { min: f64, max: f64 },
}

impl SampleTransform {
    /// Validate parameters.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            SampleTransform::Standardize => Ok(()),
            SampleTransform::Scale { factor } if !factor.is_finite() => {
                Err(format!("scale factor must be finite, got {factor}"))
            }
            SampleTransform::Scale { .. } => Ok(()),
            SampleTransform::Clip { min, max } if !min.is_finite() || !max.is_finite() => {
                Err(format!("clip bounds must be finite, got [{min}, {max}]"))
            }
            SampleTransform::Clip { min, max } if min > max => {
                Err(format!("clip min ({min}) exceeds max ({max})"))
            }
            SampleTransform::Clip { .. } => Ok(()),
        }
    }

    /// Apply to one `(channels, freq, time)` sample.
    pub fn apply(&self, mut sample: Array3<f64>) -> Array3<f64> {
        match *self {
            SampleTransform::Standardize => {
                for plane in sample.axis_iter_mut(Axis(0)) {
                    standardize_plane(plane);
                }
            }
            SampleTransform::Scale { factor } => sample.mapv_inplace(|x| x * factor),
            SampleTransform::Clip { min, max } => sample.mapv_inplace(|x| x.clamp(min, max)),
        }
        sample
    }
}
