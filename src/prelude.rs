//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```ignore
//! use psg_feature_extractor::prelude::*;
//!
//! let config = DatasetConfig::load_toml("dataset.toml")?;
//! let materializer = DatasetMaterializer::new(config, Arc::new(NpzRecordingLoader::new()))?;
//! let dataset = materializer.materialize()?;
//! ```
//!
//! # What's Included
//!
//! ## Configuration
//! - [`DatasetConfig`] - Complete build configuration
//! - [`DatasetBuilder`] - Fluent configuration builder
//! - [`LoaderConfig`] - Batch loading options
//!
//! ## Recordings
//! - [`SignalRecording`] - Multi-channel recording with hypnogram
//! - [`RecordingLoader`] - Recording source trait
//! - [`NpzRecordingLoader`] - `.npz` recording reader
//!
//! ## Features
//! - [`ChannelPipelineConfig`] - One channel's stage list
//! - [`FeatureSetConfig`] - Pipelines of a feature union
//! - [`FeatureUnion`] - Runs pipelines and concatenates channels
//!
//! ## Dataset
//! - [`DatasetMaterializer`] - Builds or reuses the artifact store
//! - [`SleepDataset`] - Lazy sample accessor
//! - [`DataLoader`] - Batches in sampler order

// ============================================================================
// Configuration
// ============================================================================

pub use crate::builder::DatasetBuilder;
pub use crate::config::{DatasetConfig, ErrorMode, LoaderConfig, ProcessingConfig};
pub use crate::error::{PsgError, Result};

// ============================================================================
// Recordings
// ============================================================================

pub use crate::manifest::SubjectSelection;
pub use crate::recording::{NpzRecordingLoader, RecordingLoader, SignalRecording};

// ============================================================================
// Features
// ============================================================================

pub use crate::features::{
    presets, ChannelPipelineConfig, FeatureSetConfig, FeatureUnion, PsdMode, SpectrogramConfig,
    StageConfig,
};
pub use crate::preprocessing::SampleTransform;
pub use crate::sequence_builder::ContextWindow;

// ============================================================================
// Labeling
// ============================================================================

pub use crate::labeling::{ClassWeights, LabelScheme, SleepStage};

// ============================================================================
// Dataset
// ============================================================================

pub use crate::dataset::{Dataset, SleepDataset};
pub use crate::export::{ArtifactStore, DatasetInfo};
pub use crate::materializer::{
    BuildOutcome, ConsoleProgress, DatasetMaterializer, ProgressCallback, ProgressInfo,
};
pub use crate::sampler::{Batch, DataLoader, SamplingStrategy};

pub use std::sync::Arc;
