//! Signal and feature preprocessing.
//!
//! - **Normalization**: log compression, per-sample whitening and the lazy
//!   [`SampleTransform`] applied on read.
//! - **Resampling**: FFT resampling of epoch rows, used when a recording is
//!   sampled faster than the configured target rate.

pub mod normalization;
pub mod resample;

pub use normalization::{log_transform, standardize_per_sample, SampleTransform};
pub use resample::resample_rows;
