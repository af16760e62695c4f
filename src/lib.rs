//! PSG Feature Extractor
//!
//! Spectrogram feature extraction and dataset materialization for
//! polysomnography (PSG) sleep staging.
//!
//! # Overview
//!
//! Each subject's recording is cut into fixed-length epochs, every configured
//! channel runs through its own feature pipeline, and the channel outputs are
//! stacked into one `(channels, freq, time)` tensor per epoch. Neighbouring
//! epochs can be concatenated along time for context. Samples are persisted
//! once per configuration in a fingerprinted store and read back lazily for
//! training.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   PSG Feature Extractor                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  recording/      - Signal recordings and loaders                │
//! │  features/       - Spectrogram, frequency cut, PSD, union       │
//! │  preprocessing/  - Log, standardization, resampling             │
//! │  sequence/       - Context windows over neighbouring epochs     │
//! │  labeling/       - Stage table, label schemes, class weights    │
//! │  export/         - Fingerprinted artifact store                 │
//! │  materializer/   - Subject loop persisting samples              │
//! │  dataset/        - Lazy accessor, sampler and batch loader      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use psg_feature_extractor::prelude::*;
//!
//! let config = DatasetBuilder::new("/data/sleep-edf")
//!     .num_labels(5)
//!     .neighbors(2)
//!     .build_config()?;
//!
//! let dataset = SleepDataset::load(config.clone(), Arc::new(NpzRecordingLoader::new()))?;
//! let mut loader = DataLoader::new(&dataset, &config.loader)?;
//! for batch in loader.iter()? {
//!     let batch = batch?;
//!     println!("{:?}", batch.x.shape());
//! }
//! ```

pub mod builder;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod features;
pub mod labeling;
pub mod manifest;
pub mod materializer;
pub mod pipeline;
pub mod prelude;
pub mod preprocessing;
pub mod recording;
pub mod sampler;
pub mod sequence_builder;

// Re-exports - Errors
pub use error::{PsgError, Result};

// Re-exports - Config
pub use builder::DatasetBuilder;
pub use config::{DatasetConfig, ErrorMode, LoaderConfig, ProcessingConfig};

// Re-exports - Recordings
pub use manifest::{list_directory, read_manifest, SubjectSelection};
pub use recording::{
    save_recording_npz, EpochedSignals, NpzRecordingLoader, RecordingLoader, SignalRecording,
};

// Re-exports - Features
pub use features::{
    ChannelPipeline, ChannelPipelineConfig, FeatureSetConfig, FeatureUnion, FrequencyCut,
    PsdMode, PsdReduce, Spectrogram, SpectrogramConfig, StageConfig,
};

// Re-exports - Preprocessing
pub use preprocessing::{log_transform, resample_rows, standardize_per_sample, SampleTransform};

// Re-exports - Sequence Building
pub use sequence_builder::{build_context_windows, ContextWindow};

// Re-exports - Labeling
pub use labeling::{ClassDistribution, ClassWeights, LabelScheme, SleepStage};

// Re-exports - Export
pub use export::{
    ArtifactStore, DatasetInfo, LabeledSample, SampleRecord, SkippedSubject, StoreIndex,
};

// Re-exports - Pipeline
pub use dataset::{Dataset, SleepDataset};
pub use materializer::{
    BuildOutcome, ConsoleProgress, DatasetMaterializer, MaterializedDataset, ProgressCallback,
    ProgressInfo,
};
pub use pipeline::{SubjectOutput, SubjectPipeline};
pub use sampler::{Batch, DataLoader, Sampler, SamplingStrategy};
