//! Fluent builder for dataset configuration.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use psg_feature_extractor::{DatasetBuilder, NpzRecordingLoader};
//!
//! let materializer = DatasetBuilder::new("/data/sleep-edf")
//!     .num_labels(3)
//!     .neighbors(4)
//!     .manifest("/data/folds.csv", "fold0")
//!     .oversample()
//!     .build(Arc::new(NpzRecordingLoader::new()))?;
//!
//! let dataset = materializer.materialize()?;
//! ```
//!
//! # Sample Shape Reference
//!
//! With the default feature set (4 channels, 51 frequency bins) and 30 s
//! epochs at 250 Hz, the spectrogram yields 75 time bins per epoch:
//!
//! | Neighbors | Sample shape      |
//! |-----------|-------------------|
//! | 0         | `(4, 51, 75)`     |
//! | 2         | `(4, 51, 225)`    |
//! | 4         | `(4, 51, 375)`    |

use crate::config::{DatasetConfig, ErrorMode};
use crate::error::{PsgError, Result};
use crate::features::{ChannelPipelineConfig, FeatureSetConfig};
use crate::manifest::SubjectSelection;
use crate::materializer::DatasetMaterializer;
use crate::preprocessing::SampleTransform;
use crate::recording::RecordingLoader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fluent builder for [`DatasetConfig`].
///
/// Starts from [`DatasetConfig::new`] defaults: 5 classes, no neighbors,
/// artifacts discarded, the four-channel default feature set, shuffled
/// batches of 32.
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    config: DatasetConfig,
}

impl DatasetBuilder {
    /// Builder reading recordings from `source_dir`.
    pub fn new<P: AsRef<Path>>(source_dir: P) -> Self {
        Self {
            config: DatasetConfig::new(source_dir),
        }
    }

    /// Continue from an existing configuration.
    pub fn from_config(config: DatasetConfig) -> Self {
        Self { config }
    }

    /// Number of target classes (3 or 5).
    pub fn num_labels(mut self, num_labels: usize) -> Self {
        self.config.num_labels = num_labels;
        self
    }

    /// Context epochs per sample; must be even.
    pub fn neighbors(mut self, neighbors: usize) -> Self {
        self.config.neighbors = neighbors;
        self
    }

    /// Keep epochs staged as Artifact.
    pub fn keep_artifacts(mut self) -> Self {
        self.config.discard_artifacts = false;
        self
    }

    /// Downsample recordings faster than `hz`.
    pub fn resample(mut self, hz: u32) -> Self {
        self.config.resample_hz = Some(hz);
        self
    }

    /// Create the artifact store under `root` instead of the source directory.
    pub fn store_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.config.store_root = Some(root.into());
        self
    }

    /// Select subjects from a manifest column.
    pub fn manifest(mut self, path: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        self.config.subjects = SubjectSelection::manifest(path, column);
        self
    }

    /// Use every file in the source directory with `extension`.
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.config.subjects = SubjectSelection::directory_with_extension(extension);
        self
    }

    /// Replace the feature set.
    pub fn features(mut self, features: FeatureSetConfig) -> Self {
        self.config.features = features;
        self
    }

    /// Replace the feature set with the named presets.
    pub fn presets(mut self, names: &[&str]) -> Result<Self> {
        self.config.features = FeatureSetConfig::from_presets(names)?;
        Ok(self)
    }

    /// Append one channel pipeline.
    pub fn with_channel(mut self, channel: ChannelPipelineConfig) -> Self {
        self.config.features.channels.push(channel);
        self
    }

    /// Transform applied to every sample on read.
    pub fn transform(mut self, transform: SampleTransform) -> Self {
        self.config.transform = Some(transform);
        self
    }

    /// Samples per batch.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.loader.batch_size = batch_size;
        self
    }

    /// Class-balanced sampling; disables shuffling.
    pub fn oversample(mut self) -> Self {
        self.config.loader.oversample = true;
        self.config.loader.shuffle = false;
        self
    }

    /// Iterate samples in index order.
    pub fn sequential(mut self) -> Self {
        self.config.loader.oversample = false;
        self.config.loader.shuffle = false;
        self
    }

    /// Seed for shuffling and oversampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.loader.seed = Some(seed);
        self
    }

    /// Threads reading artifacts during batch loading.
    pub fn num_workers(mut self, workers: usize) -> Self {
        self.config.loader.num_workers = workers;
        self
    }

    /// Threads running channel pipelines.
    pub fn feature_workers(mut self, workers: usize) -> Self {
        self.config.processing.feature_workers = workers;
        self
    }

    /// Skip subjects that fail instead of aborting.
    pub fn skip_failed_subjects(mut self) -> Self {
        self.config.processing.error_mode = ErrorMode::SkipSubject;
        self
    }

    /// Validated configuration.
    pub fn build_config(self) -> std::result::Result<DatasetConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Materializer for the configuration.
    pub fn build(self, loader: Arc<dyn RecordingLoader>) -> Result<DatasetMaterializer> {
        let config = self.build_config().map_err(PsgError::Config)?;
        DatasetMaterializer::new(config, loader)
    }

    /// Channels of the current feature set.
    pub fn channel_names(&self) -> Vec<&str> {
        self.config.features.channel_names()
    }

    /// Get a summary of the current configuration.
    pub fn summary(&self) -> String {
        let sampling_desc = match (self.config.loader.shuffle, self.config.loader.oversample) {
            (_, true) => "Oversampled",
            (true, false) => "Shuffled",
            (false, false) => "Sequential",
        };
        let subjects_desc = match &self.config.subjects {
            SubjectSelection::Directory { extension: None } => "all files".to_string(),
            SubjectSelection::Directory {
                extension: Some(ext),
            } => format!("*.{ext}"),
            SubjectSelection::Manifest { path, column } => {
                format!("{} [{}]", path.display(), column)
            }
        };

        format!(
            "DatasetBuilder Summary:\n\
             - Source: {}\n\
             - Subjects: {}\n\
             - Channels: {}\n\
             - Classes: {}, neighbors: {}\n\
             - Discard artifacts: {}\n\
             - Batches: {} x {}",
            self.config.source_dir.display(),
            subjects_desc,
            self.channel_names().join(", "),
            self.config.num_labels,
            self.config.neighbors,
            self.config.discard_artifacts,
            sampling_desc,
            self.config.loader.batch_size,
        )
    }
}
