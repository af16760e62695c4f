//! Per-subject feature pipeline.
//!
//! Turns one [`SignalRecording`] into one windowed feature tensor per epoch:
//!
//! ```text
//! recording ──► epochs (E, samples) per channel
//!           ──► FeatureUnion        (E, C, F, T)
//!           ──► ContextWindow       (E, C, F, (n+1)·T)
//! ```
//!
//! Labels stay native here; discarding and remapping happen when samples are
//! persisted.

use crate::config::DatasetConfig;
use crate::error::{PsgError, Result};
use crate::features::FeatureUnion;
use crate::labeling::SleepStage;
use crate::recording::SignalRecording;
use crate::sequence_builder::ContextWindow;
use ndarray::Array4;

/// Windowed features of one subject.
#[derive(Debug, Clone)]
pub struct SubjectOutput {
    /// Subject label
    pub subject: String,
    /// `(epochs, channels, freq, (neighbors + 1) * time)`
    pub windows: Array4<f64>,
    /// Native stage of each epoch
    pub stages: Vec<SleepStage>,
}

impl SubjectOutput {
    /// Number of epochs.
    pub fn num_epochs(&self) -> usize {
        self.stages.len()
    }

    /// Shape `(channels, freq, time)` of one window.
    pub fn sample_shape(&self) -> Vec<usize> {
        self.windows.shape()[1..].to_vec()
    }
}

/// Feature union and context windowing compiled from a dataset config.
#[derive(Debug)]
pub struct SubjectPipeline {
    union: FeatureUnion,
    window: ContextWindow,
    resample_hz: Option<u32>,
}

impl SubjectPipeline {
    /// Compile the pipeline; configuration errors surface here.
    pub fn from_config(config: &DatasetConfig) -> Result<Self> {
        config.validate().map_err(PsgError::Config)?;
        Ok(Self {
            union: FeatureUnion::new(&config.features, config.processing.feature_workers)?,
            window: ContextWindow::new(config.neighbors)?,
            resample_hz: config.resample_hz,
        })
    }

    /// The feature union.
    pub fn union(&self) -> &FeatureUnion {
        &self.union
    }

    /// Context window parameters.
    pub fn window(&self) -> &ContextWindow {
        &self.window
    }

    /// Compute windowed features for every epoch of `recording`.
    pub fn process(&self, recording: &SignalRecording) -> Result<SubjectOutput> {
        let channels: Vec<&str> = self.union.pipelines().iter().map(|p| p.channel()).collect();
        let epoched = recording.to_epochs(&channels, self.resample_hz)?;

        for pipeline in self.union.pipelines() {
            if pipeline.sampling_rate() != epoched.sampling_rate {
                return Err(PsgError::SamplingRateMismatch {
                    channel: pipeline.channel().to_string(),
                    recording: epoched.sampling_rate,
                    pipeline: pipeline.sampling_rate(),
                });
            }
        }

        let features = self.union.transform(&epoched.channels)?;
        let windows = self.window.apply(&features);
        log::debug!(
            "subject '{}': {} epochs -> windows {:?}",
            recording.label,
            epoched.num_epochs,
            windows.shape()
        );

        Ok(SubjectOutput {
            subject: recording.label.clone(),
            windows,
            stages: recording.stages()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{presets, FeatureSetConfig};
    use ndarray::Array1;

    fn recording(sampling_rate: u32) -> SignalRecording {
        let n = 3 * sampling_rate as usize * 2;
        SignalRecording::new("s01", sampling_rate, 2)
            .with_channel("EEG", Array1::from_shape_fn(n, |i| (i as f64 * 0.37).sin()))
            .with_channel("EMG", Array1::from_shape_fn(n, |i| (i as f64 * 1.1).cos()))
            .with_hypnogram(vec![0, 2, 4])
    }

    fn config(neighbors: usize) -> DatasetConfig {
        let mut config = DatasetConfig::new("/unused");
        config.neighbors = neighbors;
        config.features =
            FeatureSetConfig::new(vec![presets::eeg_spectrogram(), presets::emg_psd()]);
        config
    }

    #[test]
    fn test_process_shapes() {
        let pipeline = SubjectPipeline::from_config(&config(2)).unwrap();
        let out = pipeline.process(&recording(250)).unwrap();
        assert_eq!(out.windows.shape(), &[3, 2, 51, 15]);
        assert_eq!(out.sample_shape(), vec![2, 51, 15]);
        assert_eq!(out.stages, vec![SleepStage::Wake, SleepStage::N2, SleepStage::Rem]);
    }

    #[test]
    fn test_sampling_rate_mismatch() {
        let pipeline = SubjectPipeline::from_config(&config(0)).unwrap();
        let err = pipeline.process(&recording(200)).unwrap_err();
        assert!(matches!(err, PsgError::SamplingRateMismatch { recording: 200, .. }));
    }

    #[test]
    fn test_invalid_config_fails_at_construction() {
        let mut bad = config(0);
        bad.num_labels = 7;
        assert!(SubjectPipeline::from_config(&bad).unwrap_err().is_config());
    }
}
