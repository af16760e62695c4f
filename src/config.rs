//! Dataset build configuration.
//!
//! One serializable struct carries every parameter of a dataset build, from
//! the source directory to the sampler flags, so an experiment can be
//! reproduced from a single TOML or JSON file.
//!
//! # Example
//!
//! ```toml
//! source_dir = "/data/sleep-edf"
//! num_labels = 5
//! neighbors = 4
//! discard_artifacts = true
//!
//! [subjects]
//! kind = "manifest"
//! path = "/data/folds.csv"
//! column = "fold0"
//!
//! [loader]
//! batch_size = 32
//! shuffle = false
//! oversample = true
//! ```
//!
//! Parameters that shape the persisted samples (source directory, subject
//! selection, label count, feature set, neighbors, discard flag, transform,
//! resampling) form the store fingerprint. Loader and processing options do
//! not.

use crate::error::{PsgError, Result};
use crate::export::fingerprint;
use crate::features::FeatureSetConfig;
use crate::labeling::LabelScheme;
use crate::manifest::SubjectSelection;
use crate::preprocessing::SampleTransform;
use crate::sampler::SamplingStrategy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

/// Complete configuration of a dataset build and its loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Directory holding the recordings
    pub source_dir: PathBuf,

    /// Directory the artifact store is created under (defaults to `source_dir`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_root: Option<PathBuf>,

    /// Target classes: 3 or 5
    pub num_labels: usize,

    /// Context epochs per sample (even)
    #[serde(default)]
    pub neighbors: usize,

    /// Drop epochs staged as Artifact
    #[serde(default = "default_true")]
    pub discard_artifacts: bool,

    /// Resample recordings sampled faster than this rate (Hz)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resample_hz: Option<u32>,

    /// Which recordings to use
    #[serde(default)]
    pub subjects: SubjectSelection,

    /// Transform applied to samples when read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<SampleTransform>,

    /// Channel pipelines
    #[serde(default)]
    pub features: FeatureSetConfig,

    /// Batch loading options
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Materialization options
    #[serde(default)]
    pub processing: ProcessingConfig,
}

/// Batch loading options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Samples per batch
    pub batch_size: usize,

    /// Uniform random permutation each pass
    pub shuffle: bool,

    /// Class-balanced sampling with replacement
    pub oversample: bool,

    /// Threads reading artifacts
    pub num_workers: usize,

    /// Seed for shuffling and oversampling (entropy when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            shuffle: true,
            oversample: false,
            num_workers: 1,
            seed: None,
        }
    }
}

impl LoaderConfig {
    /// Validate loader options.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be > 0".to_string());
        }
        if self.num_workers == 0 {
            return Err("num_workers must be > 0".to_string());
        }
        self.strategy().map(|_| ()).map_err(|e| e.to_string())
    }

    /// Sampling strategy selected by the shuffle/oversample flags.
    pub fn strategy(&self) -> Result<SamplingStrategy> {
        SamplingStrategy::from_flags(self.shuffle, self.oversample)
    }
}

/// What happens when one subject fails to load or transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Abort the whole build (default).
    #[default]
    FailFast,

    /// Log a warning, record the subject as skipped and continue.
    SkipSubject,
}

/// Materialization options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Threads running channel pipelines
    pub feature_workers: usize,

    /// Per-subject failure handling
    #[serde(default)]
    pub error_mode: ErrorMode,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            feature_workers: 2,
            error_mode: ErrorMode::FailFast,
        }
    }
}

/// Parameters that determine the persisted samples.
#[derive(Serialize)]
struct FingerprintInput<'a> {
    source_dir: &'a Path,
    subjects: &'a SubjectSelection,
    num_labels: usize,
    features: &'a FeatureSetConfig,
    neighbors: usize,
    discard_artifacts: bool,
    transform: &'a Option<SampleTransform>,
    resample_hz: Option<u32>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            store_root: None,
            num_labels: 5,
            neighbors: 0,
            discard_artifacts: true,
            resample_hz: None,
            subjects: SubjectSelection::default(),
            transform: None,
            features: FeatureSetConfig::default(),
            loader: LoaderConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl DatasetConfig {
    /// Default configuration reading from `source_dir`.
    pub fn new<P: AsRef<Path>>(source_dir: P) -> Self {
        Self {
            source_dir: source_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Active label scheme.
    pub fn label_scheme(&self) -> Result<LabelScheme> {
        LabelScheme::from_num_labels(self.num_labels)
    }

    /// Directory the artifact store is created under.
    pub fn store_root(&self) -> &Path {
        self.store_root.as_deref().unwrap_or(&self.source_dir)
    }

    /// Fingerprint of every parameter that shapes the persisted samples.
    pub fn fingerprint(&self) -> Result<String> {
        fingerprint(&FingerprintInput {
            source_dir: &self.source_dir,
            subjects: &self.subjects,
            num_labels: self.num_labels,
            features: &self.features,
            neighbors: self.neighbors,
            discard_artifacts: self.discard_artifacts,
            transform: &self.transform,
            resample_hz: self.resample_hz,
        })
    }

    /// Validate the configuration.
    ///
    /// Returns Ok(()) if valid, Err(msg) otherwise.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.num_labels != 3 && self.num_labels != 5 {
            return Err(format!("num_labels must be 3 or 5, got {}", self.num_labels));
        }
        if self.neighbors % 2 != 0 {
            return Err(format!("neighbors must be even, got {}", self.neighbors));
        }
        if self.resample_hz == Some(0) {
            return Err("resample_hz must be > 0".to_string());
        }
        if self.processing.feature_workers == 0 {
            return Err("feature_workers must be > 0".to_string());
        }
        if let Some(transform) = &self.transform {
            transform.validate()?;
        }
        self.loader.validate()?;
        self.features.validate()
    }

    /// Save configuration to TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load and validate configuration from TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: DatasetConfig = toml::from_str(&contents)?;
        config.validate().map_err(PsgError::Config)?;
        Ok(config)
    }

    /// Save configuration to JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load and validate configuration from JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: DatasetConfig = serde_json::from_str(&contents)?;
        config.validate().map_err(PsgError::Config)?;
        Ok(config)
    }
}
