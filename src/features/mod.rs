//! Per-channel spectrogram feature pipelines.
//!
//! A channel pipeline selects one signal channel, computes its PSD spectrogram
//! and then runs an ordered list of stages over the
//! `(epochs, 1, freq, time)` tensor:
//!
//! | Stage             | Effect on the frequency axis              |
//! |-------------------|-------------------------------------------|
//! | `cut_frequencies` | keep bins in `[lower, upper]` Hz           |
//! | `psd_reduce`      | collapse to 1, repeat to `output_dim`     |
//! | `log`             | unchanged, `ln(x + 1e-4)`                 |
//! | `standardize`     | unchanged, per-epoch whitening            |
//!
//! Pipelines are plain configuration ([`ChannelPipelineConfig`]) compiled once
//! into a [`ChannelPipeline`]. Named presets live in [`presets`]; the
//! [`FeatureUnion`] runs a set of pipelines and concatenates their outputs.
//!
//! # Example
//!
//! ```
//! use psg_feature_extractor::features::{ChannelPipelineConfig, StageConfig};
//!
//! let eeg = ChannelPipelineConfig::new("eeg", "EEG")
//!     .with_stage(StageConfig::CutFrequencies { lower: 0.0, upper: 25.0 })
//!     .with_stage(StageConfig::Log)
//!     .with_stage(StageConfig::Standardize);
//!
//! assert_eq!(eeg.output_frequency_bins().unwrap(), 51);
//! ```

pub mod frequency;
pub mod presets;
pub mod spectrogram;
pub mod union;

pub use frequency::{FrequencyCut, PsdMode, PsdReduce};
pub use presets::{default_feature_set, preset};
pub use spectrogram::{Spectrogram, SpectrogramConfig};
pub use union::FeatureUnion;

use crate::error::{PsgError, Result};
use crate::preprocessing::{log_transform, standardize_per_sample};
use ndarray::{Array4, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One stage applied after the spectrogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageConfig {
    /// Keep frequency bins inside `[lower, upper]` Hz (inclusive).
    CutFrequencies { lower: f64, upper: f64 },
    /// Collapse the frequency axis and broadcast it to `output_dim` bins.
    PsdReduce {
        #[serde(default)]
        mode: PsdMode,
        output_dim: usize,
    },
    /// `ln(x + 1e-4)`
    Log,
    /// Per-epoch whitening over frequency × time.
    Standardize,
}

/// Configuration of a single channel pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelPipelineConfig {
    /// Pipeline name (unique within a feature set)
    pub name: String,

    /// Recording channel the spectrogram reads
    pub channel: String,

    /// Spectrogram parameters
    #[serde(default)]
    pub spectrogram: SpectrogramConfig,

    /// Stages in application order
    #[serde(default)]
    pub stages: Vec<StageConfig>,
}

impl ChannelPipelineConfig {
    /// Pipeline with default spectrogram parameters and no stages.
    pub fn new(name: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channel: channel.into(),
            spectrogram: SpectrogramConfig::default(),
            stages: Vec::new(),
        }
    }

    /// Set spectrogram parameters.
    pub fn with_spectrogram(mut self, spectrogram: SpectrogramConfig) -> Self {
        self.spectrogram = spectrogram;
        self
    }

    /// Append a stage.
    pub fn with_stage(mut self, stage: StageConfig) -> Self {
        self.stages.push(stage);
        self
    }

    /// Size of the frequency axis this pipeline produces.
    pub fn output_frequency_bins(&self) -> std::result::Result<usize, String> {
        let mut grid = Some(self.spectrogram.frequencies());
        let mut bins = self.spectrogram.num_frequency_bins();

        for stage in &self.stages {
            match stage {
                StageConfig::CutFrequencies { lower, upper } => {
                    let freqs = grid.as_ref().ok_or_else(|| {
                        format!(
                            "pipeline '{}': cut_frequencies cannot follow psd_reduce",
                            self.name
                        )
                    })?;
                    let kept: Vec<f64> = freqs
                        .iter()
                        .copied()
                        .filter(|f| f >= lower && f <= upper)
                        .collect();
                    if kept.is_empty() {
                        return Err(format!(
                            "pipeline '{}': band [{lower}, {upper}] selects no bins",
                            self.name
                        ));
                    }
                    bins = kept.len();
                    grid = Some(kept);
                }
                StageConfig::PsdReduce { output_dim, .. } => {
                    if *output_dim == 0 {
                        return Err(format!("pipeline '{}': output_dim must be > 0", self.name));
                    }
                    bins = *output_dim;
                    grid = None;
                }
                StageConfig::Log | StageConfig::Standardize => {}
            }
        }
        Ok(bins)
    }

    /// Validate parameters and stage order.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.is_empty() {
            return Err("pipeline name must not be empty".to_string());
        }
        if self.channel.is_empty() {
            return Err(format!("pipeline '{}': channel must not be empty", self.name));
        }
        self.spectrogram
            .validate()
            .map_err(|e| format!("pipeline '{}': {e}", self.name))?;
        self.output_frequency_bins().map(|_| ())
    }
}

/// Ordered set of channel pipelines whose outputs are concatenated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSetConfig {
    /// Pipelines in concatenation order
    pub channels: Vec<ChannelPipelineConfig>,
}

impl Default for FeatureSetConfig {
    fn default() -> Self {
        default_feature_set()
    }
}

impl FeatureSetConfig {
    /// Feature set from an explicit pipeline list.
    pub fn new(channels: Vec<ChannelPipelineConfig>) -> Self {
        Self { channels }
    }

    /// Feature set from preset names, in the given order.
    pub fn from_presets(names: &[&str]) -> Result<Self> {
        let channels = names
            .iter()
            .map(|name| {
                preset(name).ok_or_else(|| PsgError::config(format!("unknown preset '{name}'")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { channels })
    }

    /// Recording channels read by this feature set.
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.channel.as_str()).collect()
    }

    /// Validate every pipeline and name uniqueness.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.channels.is_empty() {
            return Err("feature set must contain at least one pipeline".to_string());
        }
        let mut seen = HashSet::new();
        for pipeline in &self.channels {
            pipeline.validate()?;
            if !seen.insert(pipeline.name.as_str()) {
                return Err(format!("duplicate pipeline name '{}'", pipeline.name));
            }
        }
        Ok(())
    }
}

/// Compiled stage.
#[derive(Debug)]
enum Stage {
    Cut(FrequencyCut),
    Psd(PsdReduce),
    Log,
    Standardize,
}

impl Stage {
    fn apply(&self, input: Array4<f64>) -> Array4<f64> {
        match self {
            Stage::Cut(cut) => cut.apply(&input),
            Stage::Psd(psd) => psd.apply(&input),
            Stage::Log => log_transform(input),
            Stage::Standardize => standardize_per_sample(input),
        }
    }
}

/// A channel pipeline ready to run.
#[derive(Debug)]
pub struct ChannelPipeline {
    name: String,
    channel: String,
    spectrogram: Spectrogram,
    stages: Vec<Stage>,
    output_bins: usize,
}

impl ChannelPipeline {
    /// Compile a pipeline configuration.
    pub fn from_config(config: &ChannelPipelineConfig) -> Result<Self> {
        config.validate().map_err(PsgError::Config)?;

        let spectrogram = Spectrogram::new(config.spectrogram.clone())?;
        let mut grid = config.spectrogram.frequencies();
        let mut stages = Vec::with_capacity(config.stages.len());

        for stage in &config.stages {
            let compiled = match *stage {
                StageConfig::CutFrequencies { lower, upper } => {
                    let cut = FrequencyCut::new(&grid, lower, upper)?;
                    log::debug!(
                        "pipeline '{}': cut [{lower}, {upper}] Hz keeps {} bins",
                        config.name,
                        cut.num_bins()
                    );
                    grid.retain(|&f| f >= lower && f <= upper);
                    Stage::Cut(cut)
                }
                StageConfig::PsdReduce { mode, output_dim } => {
                    Stage::Psd(PsdReduce::new(mode, output_dim)?)
                }
                StageConfig::Log => Stage::Log,
                StageConfig::Standardize => Stage::Standardize,
            };
            stages.push(compiled);
        }

        Ok(Self {
            name: config.name.clone(),
            channel: config.channel.clone(),
            spectrogram,
            stages,
            output_bins: config.output_frequency_bins().map_err(PsgError::Config)?,
        })
    }

    /// Pipeline name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recording channel this pipeline reads.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Sampling rate the spectrogram expects.
    pub fn sampling_rate(&self) -> u32 {
        self.spectrogram.config().sampling_rate
    }

    /// Size of the output frequency axis.
    pub fn output_frequency_bins(&self) -> usize {
        self.output_bins
    }

    /// Number of time bins for epochs of `epoch_samples`.
    pub fn output_time_bins(&self, epoch_samples: usize) -> usize {
        self.spectrogram.config().num_time_bins(epoch_samples)
    }

    /// Run the pipeline over `(epochs, samples)` rows of its channel.
    pub fn transform(&self, epochs: ArrayView2<f64>) -> Result<Array4<f64>> {
        let mut out = self.spectrogram.compute(epochs)?;
        for stage in &self.stages {
            out = stage.apply(out);
        }
        log::debug!("pipeline '{}' produced {:?}", self.name, out.shape());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_stage_config_tagged_serde() {
        let json = r#"[
            {"stage": "cut_frequencies", "lower": 0.0, "upper": 60.0},
            {"stage": "psd_reduce", "output_dim": 51},
            {"stage": "log"},
            {"stage": "standardize"}
        ]"#;
        let stages: Vec<StageConfig> = serde_json::from_str(json).unwrap();
        assert_eq!(stages.len(), 4);
        assert_eq!(
            stages[1],
            StageConfig::PsdReduce {
                mode: PsdMode::Mean,
                output_dim: 51
            }
        );
    }

    #[test]
    fn test_cut_after_psd_is_rejected() {
        let cfg = ChannelPipelineConfig::new("bad", "EMG")
            .with_stage(StageConfig::PsdReduce {
                mode: PsdMode::Mean,
                output_dim: 4,
            })
            .with_stage(StageConfig::CutFrequencies {
                lower: 0.0,
                upper: 10.0,
            });
        assert!(cfg.validate().is_err());
        assert!(ChannelPipeline::from_config(&cfg).unwrap_err().is_config());
    }

    #[test]
    fn test_duplicate_pipeline_names_rejected() {
        let set = FeatureSetConfig::new(vec![
            ChannelPipelineConfig::new("a", "EEG"),
            ChannelPipelineConfig::new("a", "EMG"),
        ]);
        assert!(set.validate().is_err());
        assert!(FeatureSetConfig::new(vec![]).validate().is_err());
    }

    #[test]
    fn test_pipeline_output_shape() {
        let pipeline = ChannelPipeline::from_config(&presets::eeg_spectrogram()).unwrap();
        let epochs = Array2::from_shape_fn((3, 500), |(e, i)| ((e * 500 + i) as f64 * 0.3).sin());
        let out = pipeline.transform(epochs.view()).unwrap();
        assert_eq!(out.shape(), &[3, 1, 51, 5]);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_unknown_preset_is_config_error() {
        let err = FeatureSetConfig::from_presets(&["eeg_spectrogram", "nope"]).unwrap_err();
        assert!(err.is_config());
    }
}
