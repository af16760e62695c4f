//! Persisted dataset artifacts.
//!
//! # Modules
//!
//! - **store**: the fingerprinted artifact directory and its `.npz` samples
//! - **fingerprint**: SHA-256 addressing of build parameters
//!
//! # Formats
//!
//! - NumPy archives (`.npz`), one per labeled sample
//! - JSON for the build parameters and the dataset summary / sample index

pub mod fingerprint;
mod store;

pub use fingerprint::fingerprint;
pub use store::ArtifactStore;

use crate::error::Result;
use crate::labeling::{ClassDistribution, ClassWeights, LabelScheme};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One persisted training sample.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    /// `<subject>_epoch_<00000>_<n>N_<stage>`
    pub id: String,
    /// Windowed features `(channels, freq, time)`
    pub x: Array3<f64>,
    /// Target class
    pub y: i64,
}

impl LabeledSample {
    /// Sample id for epoch `epoch` of `subject`.
    pub fn make_id(subject: &str, epoch: usize, neighbors: usize, stage_name: &str) -> String {
        format!("{subject}_epoch_{epoch:05}_{neighbors}N_{stage_name}")
    }
}

/// Index entry for one persisted sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Artifact id
    pub id: String,
    /// Target class
    pub y: i64,
}

/// A subject left out of the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSubject {
    /// Recording path
    pub path: PathBuf,
    /// Why it was skipped
    pub reason: String,
}

/// Summary of a materialized dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Store fingerprint
    pub fingerprint: String,

    /// Subject labels in processing order
    pub subjects: Vec<String>,

    /// Subjects that failed and were skipped
    #[serde(default)]
    pub skipped_subjects: Vec<SkippedSubject>,

    /// Persisted samples per native stage
    pub class_distribution: ClassDistribution,

    /// Shape `(channels, freq, time)` of one windowed sample
    pub input_shape: Vec<usize>,

    /// Persisted sample count
    pub num_samples: usize,

    /// Target classes (3 or 5)
    pub num_classes: usize,

    /// Context epochs per sample
    pub neighbors: usize,

    /// Build time (RFC 3339)
    pub created_at: String,
}

impl DatasetInfo {
    /// Empty summary stamped with the current time.
    pub fn new(fingerprint: String, num_classes: usize, neighbors: usize) -> Self {
        Self {
            fingerprint,
            subjects: Vec::new(),
            skipped_subjects: Vec::new(),
            class_distribution: ClassDistribution::new(),
            input_shape: Vec::new(),
            num_samples: 0,
            num_classes,
            neighbors,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Smoothed inverse-frequency weights over the six native stages.
    pub fn class_weights(&self) -> ClassWeights {
        ClassWeights::native(&self.class_distribution)
    }

    /// Smoothed inverse-frequency weights over the target classes.
    pub fn target_class_weights(&self) -> Result<ClassWeights> {
        let scheme = LabelScheme::from_num_labels(self.num_classes)?;
        Ok(ClassWeights::for_scheme(&self.class_distribution, scheme))
    }
}

/// Contents of the store's index file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreIndex {
    /// Dataset summary
    pub info: DatasetInfo,
    /// Samples in accessor order
    pub samples: Vec<SampleRecord>,
}
