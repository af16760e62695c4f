//! Error types for feature extraction and dataset materialization.
//!
//! Errors fall into three groups:
//!
//! - **Configuration errors**: raised before or while pipelines are built
//!   (unknown label count, conflicting sampler flags, channel outputs that
//!   cannot be concatenated). Never retried.
//! - **Data errors**: a recording whose channel or hypnogram length does not
//!   match its epoch grid, or whose stage codes fall outside the stage table.
//! - **I/O errors**: artifact, manifest and recording reads/writes, surfaced
//!   as-is.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PsgError>;

/// Errors produced by the feature pipeline, the materializer and the accessor.
#[derive(Error, Debug)]
pub enum PsgError {
    /// Invalid or inconsistent configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Channel pipelines produced outputs that cannot be concatenated.
    #[error(
        "feature union shape mismatch: pipeline '{pipeline}' produced {actual:?}, expected {expected:?}"
    )]
    ShapeMismatch {
        /// Offending pipeline name
        pipeline: String,
        /// Shape (epochs, channels, freq, time) of the first pipeline
        expected: Vec<usize>,
        /// Shape produced by the offending pipeline
        actual: Vec<usize>,
    },

    /// Recording does not satisfy its epoch-grid invariants.
    #[error("invalid recording '{subject}': {reason}")]
    InvalidRecording {
        /// Subject label
        subject: String,
        /// What is wrong
        reason: String,
    },

    /// Hypnogram code outside the stage table.
    #[error("unknown sleep stage code {0}")]
    UnknownStage(i64),

    /// Recording sampling rate differs from the rate a spectrogram expects.
    #[error(
        "sampling rate mismatch for channel '{channel}': recording is {recording} Hz, pipeline expects {pipeline} Hz"
    )]
    SamplingRateMismatch {
        /// Channel name
        channel: String,
        /// Effective recording rate
        recording: u32,
        /// Rate configured on the spectrogram
        pipeline: u32,
    },

    /// Accessor index past the end of the dataset.
    #[error("index {index} out of bounds for dataset of length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Dataset length
        len: usize,
    },

    /// A subject failed to load or transform.
    #[error("subject {} failed: {source}", path.display())]
    SubjectFailed {
        /// Recording path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: Box<PsgError>,
    },

    /// Filesystem error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// NPY read failure.
    #[error("npy read error: {0}")]
    NpyRead(#[from] ndarray_npy::ReadNpyError),

    /// NPY write failure.
    #[error("npy write error: {0}")]
    NpyWrite(#[from] ndarray_npy::WriteNpyError),

    /// NPZ read failure.
    #[error("npz read error: {0}")]
    NpzRead(#[from] ndarray_npy::ReadNpzError),

    /// NPZ write failure.
    #[error("npz write error: {0}")]
    NpzWrite(#[from] ndarray_npy::WriteNpzError),

    /// Manifest parse failure.
    #[error("manifest error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse failure.
    #[error("toml parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization failure.
    #[error("toml write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Array shape error.
    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Anything else.
    #[error("{0}")]
    Generic(String),
}

impl PsgError {
    /// Create an ad-hoc error from a message.
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a data error for a recording.
    pub fn invalid_recording(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecording {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// True for errors raised before any data is touched.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::ShapeMismatch { .. })
    }
}

impl From<String> for PsgError {
    fn from(msg: String) -> Self {
        Self::Generic(msg)
    }
}

impl From<&str> for PsgError {
    fn from(msg: &str) -> Self {
        Self::Generic(msg.to_string())
    }
}
