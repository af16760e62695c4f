use crate::error::{PsgError, Result};
use ndarray::{s, Array4, Axis};

/// Temporal context parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindow {
    neighbors: usize,
}

impl ContextWindow {
    /// Context of `neighbors` epochs split evenly before and after.
    ///
    /// Odd counts are a configuration error.
    pub fn new(neighbors: usize) -> Result<Self> {
        if neighbors % 2 != 0 {
            return Err(PsgError::config(format!(
                "neighbors must be even, got {neighbors}"
            )));
        }
        Ok(Self { neighbors })
    }

    /// Total neighbor count.
    #[inline]
    pub fn neighbors(&self) -> usize {
        self.neighbors
    }

    /// Epochs of context on each side.
    #[inline]
    pub fn half(&self) -> usize {
        self.neighbors / 2
    }

    /// Epochs per window, including the centre.
    #[inline]
    pub fn span(&self) -> usize {
        self.neighbors + 1
    }

    /// Time bins of a window built from epochs of `base_time_bins`.
    #[inline]
    pub fn output_time_bins(&self, base_time_bins: usize) -> usize {
        self.span() * base_time_bins
    }

    /// Build one window per epoch.
    ///
    /// Input `(epochs, channels, freq, time)`; output
    /// `(epochs, channels, freq, (neighbors + 1) * time)`. Window `i` holds
    /// epochs `i - neighbors/2 ..= i + neighbors/2` side by side along time,
    /// with zeros wherever that range leaves the recording.
    pub fn apply(&self, features: &Array4<f64>) -> Array4<f64> {
        if self.neighbors == 0 {
            return features.clone();
        }

        let (n_epochs, n_channels, n_freq, n_time) = features.dim();
        let mut out = Array4::<f64>::zeros((
            n_epochs,
            n_channels,
            n_freq,
            self.output_time_bins(n_time),
        ));
        let half = self.half() as isize;

        for (i, mut window) in out.outer_iter_mut().enumerate() {
            for slot in 0..self.span() {
                let src = i as isize + slot as isize - half;
                if src < 0 || src >= n_epochs as isize {
                    continue;
                }
                let start = slot * n_time;
                window
                    .slice_mut(s![.., .., start..start + n_time])
                    .assign(&features.index_axis(Axis(0), src as usize));
            }
        }
        out
    }
}

/// Build context windows with `neighbors` epochs of context.
pub fn build_context_windows(features: &Array4<f64>, neighbors: usize) -> Result<Array4<f64>> {
    Ok(ContextWindow::new(neighbors)?.apply(features))
}
