//! Parallel execution of channel pipelines.
//!
//! ```text
//!              ┌──────────── worker pool (feature_workers) ────────────┐
//!  recording → │ EEG pipeline │ EMG pipeline │ EOGL pipeline │ ...   │
//!              └──────┬───────────────┬──────────────┬─────────────────┘
//!                     ▼               ▼              ▼
//!               (E,1,F,T)       (E,1,F,T)      (E,1,F,T)
//!                     └──────── concat Axis(1) ──────┘
//!                                     ▼
//!                               (E,C,F,T)
//! ```
//!
//! Pipelines share no state. Results are gathered in configuration order, so
//! the channel axis is the same regardless of which worker finishes first.

use super::{ChannelPipeline, FeatureSetConfig};
use crate::error::{PsgError, Result};
use ndarray::{concatenate, Array2, Array4, ArrayView4, Axis};
use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Runs a fixed, ordered set of channel pipelines and concatenates them.
pub struct FeatureUnion {
    pipelines: Vec<ChannelPipeline>,
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
}

impl std::fmt::Debug for FeatureUnion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureUnion")
            .field("pipelines", &self.pipelines)
            .finish()
    }
}

impl FeatureUnion {
    /// Compile the feature set and check that outputs can be concatenated.
    ///
    /// `workers` bounds the pool running pipelines concurrently (at least 1).
    pub fn new(config: &FeatureSetConfig, workers: usize) -> Result<Self> {
        config.validate().map_err(PsgError::Config)?;

        let pipelines = config
            .channels
            .iter()
            .map(ChannelPipeline::from_config)
            .collect::<Result<Vec<_>>>()?;

        if let Some(first) = pipelines.first() {
            let expected = first.output_frequency_bins();
            for p in &pipelines[1..] {
                if p.output_frequency_bins() != expected {
                    return Err(PsgError::ShapeMismatch {
                        pipeline: p.name().to_string(),
                        expected: vec![expected],
                        actual: vec![p.output_frequency_bins()],
                    });
                }
            }
        }

        #[cfg(feature = "parallel")]
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("feature-union-{i}"))
            .build()
            .map_err(|e| PsgError::generic(format!("Failed to create thread pool: {e}")))?;

        #[cfg(not(feature = "parallel"))]
        let _ = workers;

        Ok(Self {
            pipelines,
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    /// Compiled pipelines in concatenation order.
    pub fn pipelines(&self) -> &[ChannelPipeline] {
        &self.pipelines
    }

    /// Number of output channels.
    pub fn num_channels(&self) -> usize {
        self.pipelines.len()
    }

    /// Shared size of the frequency axis.
    pub fn output_frequency_bins(&self) -> usize {
        self.pipelines
            .first()
            .map(ChannelPipeline::output_frequency_bins)
            .unwrap_or(0)
    }

    /// Run every pipeline on its channel's `(epochs, samples)` rows.
    ///
    /// Output is `(epochs, pipelines, freq, time)`.
    pub fn transform(&self, channels: &BTreeMap<String, Array2<f64>>) -> Result<Array4<f64>> {
        let run = |pipeline: &ChannelPipeline| -> Result<Array4<f64>> {
            let rows = channels.get(pipeline.channel()).ok_or_else(|| {
                PsgError::config(format!(
                    "pipeline '{}' reads missing channel '{}'",
                    pipeline.name(),
                    pipeline.channel()
                ))
            })?;
            pipeline.transform(rows.view())
        };

        #[cfg(feature = "parallel")]
        let outputs: Vec<Result<Array4<f64>>> =
            self.pool.install(|| self.pipelines.par_iter().map(run).collect());

        #[cfg(not(feature = "parallel"))]
        let outputs: Vec<Result<Array4<f64>>> = self.pipelines.iter().map(run).collect();

        let outputs = outputs.into_iter().collect::<Result<Vec<_>>>()?;
        self.concat(&outputs)
    }

    fn concat(&self, outputs: &[Array4<f64>]) -> Result<Array4<f64>> {
        let first = outputs
            .first()
            .ok_or_else(|| PsgError::config("feature union has no pipelines"))?;
        let (e, _, f, t) = first.dim();

        for (pipeline, out) in self.pipelines.iter().zip(outputs) {
            let (oe, _, of, ot) = out.dim();
            if (oe, of, ot) != (e, f, t) {
                return Err(PsgError::ShapeMismatch {
                    pipeline: pipeline.name().to_string(),
                    expected: first.shape().to_vec(),
                    actual: out.shape().to_vec(),
                });
            }
        }

        let views: Vec<ArrayView4<f64>> = outputs.iter().map(|o| o.view()).collect();
        Ok(concatenate(Axis(1), &views)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{presets, ChannelPipelineConfig, SpectrogramConfig, StageConfig};

    fn two_channel_input(n_epochs: usize) -> BTreeMap<String, Array2<f64>> {
        let mut channels = BTreeMap::new();
        channels.insert(
            "EEG".to_string(),
            Array2::from_shape_fn((n_epochs, 500), |(e, i)| ((e * 500 + i) as f64 * 0.21).sin()),
        );
        channels.insert(
            "EMG".to_string(),
            Array2::from_shape_fn((n_epochs, 500), |(e, i)| ((e * 500 + i) as f64 * 0.73).cos()),
        );
        channels
    }

    #[test]
    fn test_concatenates_in_config_order() {
        let set = FeatureSetConfig::new(vec![presets::eeg_spectrogram(), presets::emg_psd()]);
        let union = FeatureUnion::new(&set, 2).unwrap();
        let out = union.transform(&two_channel_input(4)).unwrap();
        assert_eq!(out.shape(), &[4, 2, 51, 5]);

        let eeg_only = FeatureUnion::new(
            &FeatureSetConfig::new(vec![presets::eeg_spectrogram()]),
            1,
        )
        .unwrap()
        .transform(&two_channel_input(4))
        .unwrap();
        assert_eq!(out.index_axis(Axis(1), 0), eeg_only.index_axis(Axis(1), 0));
    }

    #[test]
    fn test_deterministic_across_worker_counts() {
        let set = FeatureSetConfig::new(vec![presets::eeg_spectrogram(), presets::emg_psd()]);
        let a = FeatureUnion::new(&set, 1).unwrap().transform(&two_channel_input(2)).unwrap();
        let b = FeatureUnion::new(&set, 4).unwrap().transform(&two_channel_input(2)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_frequency_mismatch_is_fatal() {
        let narrow = ChannelPipelineConfig::new("narrow", "EMG")
            .with_stage(StageConfig::CutFrequencies {
                lower: 0.0,
                upper: 10.0,
            });
        let set = FeatureSetConfig::new(vec![presets::eeg_spectrogram(), narrow]);
        let err = FeatureUnion::new(&set, 2).unwrap_err();
        assert!(matches!(err, PsgError::ShapeMismatch { ref pipeline, .. } if pipeline == "narrow"));
        assert!(err.is_config());
    }

    #[test]
    fn test_time_mismatch_is_fatal() {
        let coarse = presets::emg_psd().with_spectrogram(SpectrogramConfig::new(250, 500, 250));
        let set = FeatureSetConfig::new(vec![presets::eeg_spectrogram(), coarse]);
        let union = FeatureUnion::new(&set, 2).unwrap();
        let err = union.transform(&two_channel_input(2)).unwrap_err();
        assert!(matches!(err, PsgError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_missing_channel() {
        let set = FeatureSetConfig::new(vec![presets::eogl_psd()]);
        let union = FeatureUnion::new(&set, 1).unwrap();
        assert!(union.transform(&two_channel_input(1)).is_err());
    }
}
