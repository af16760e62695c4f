//! Signal recordings and the loaders that produce them.
//!
//! A [`SignalRecording`] is one subject's night: a set of named 1-D channels
//! sampled at a common rate plus a hypnogram with one stage code per epoch.
//! Every channel must hold exactly
//!
//! ```text
//! hypnogram.len() * sampling_rate * epoch_length
//! ```
//!
//! samples. Recordings are read through the [`RecordingLoader`] trait; any
//! `Fn(&Path) -> Result<SignalRecording>` closure is a loader, and
//! [`NpzRecordingLoader`] reads the `.npz` layout written by
//! [`save_recording_npz`]:
//!
//! | Array          | dtype | Shape     |
//! |----------------|-------|-----------|
//! | `<channel>`    | f64   | (samples) |
//! | `hypnogram`    | i64   | (epochs)  |
//! | `sampling_rate`| i64   | ()        |
//! | `epoch_length` | i64   | ()        |
//!
//! The subject label is the file stem.

use crate::error::{PsgError, Result};
use crate::labeling::SleepStage;
use crate::preprocessing::resample::{resample_rows, resampled_epoch_len};
use ndarray::{arr0, Array0, Array1, Array2};
use ndarray_npy::{NpzReader, NpzWriter};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

const HYPNOGRAM: &str = "hypnogram";
const SAMPLING_RATE: &str = "sampling_rate";
const EPOCH_LENGTH: &str = "epoch_length";
const NPY_SUFFIX: &str = ".npy";

/// One subject's multi-channel recording.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecording {
    /// Subject label
    pub label: String,

    /// Channel name → samples
    pub psgs: BTreeMap<String, Array1<f64>>,

    /// Stage code per epoch
    pub hypnogram: Vec<i64>,

    /// Samples per second, shared by all channels
    pub sampling_rate: u32,

    /// Epoch duration in seconds
    pub epoch_length: u32,
}

impl SignalRecording {
    /// Empty recording.
    pub fn new(label: impl Into<String>, sampling_rate: u32, epoch_length: u32) -> Self {
        Self {
            label: label.into(),
            psgs: BTreeMap::new(),
            hypnogram: Vec::new(),
            sampling_rate,
            epoch_length,
        }
    }

    /// Add a channel.
    pub fn with_channel(mut self, name: impl Into<String>, samples: Array1<f64>) -> Self {
        self.psgs.insert(name.into(), samples);
        self
    }

    /// Set the hypnogram.
    pub fn with_hypnogram(mut self, hypnogram: Vec<i64>) -> Self {
        self.hypnogram = hypnogram;
        self
    }

    /// Number of epochs.
    #[inline]
    pub fn num_epochs(&self) -> usize {
        self.hypnogram.len()
    }

    /// Samples per epoch at the recording rate, `None` on overflow.
    #[inline]
    pub fn samples_per_epoch(&self) -> Option<usize> {
        (self.sampling_rate as usize).checked_mul(self.epoch_length as usize)
    }

    /// Samples every channel must hold, `None` on overflow.
    pub fn expected_samples(&self) -> Option<usize> {
        self.samples_per_epoch()?.checked_mul(self.num_epochs())
    }

    /// Check the epoch grid and stage codes.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| PsgError::invalid_recording(&self.label, reason);

        // The label becomes part of artifact file names
        if self.label.is_empty()
            || self.label.contains("..")
            || self.label.contains(&['/', '\\'][..])
        {
            return Err(invalid(format!(
                "label '{}' must be a non-empty file-name-safe string",
                self.label
            )));
        }
        if self.sampling_rate == 0 || self.epoch_length == 0 {
            return Err(invalid(format!(
                "sampling_rate ({}) and epoch_length ({}) must be > 0",
                self.sampling_rate, self.epoch_length
            )));
        }
        if self.hypnogram.is_empty() {
            return Err(invalid("hypnogram is empty".to_string()));
        }
        if self.psgs.is_empty() {
            return Err(invalid("recording has no channels".to_string()));
        }

        let expected = self.expected_samples().ok_or_else(|| {
            invalid(format!(
                "{} epochs x {} Hz x {} s overflows the sample count",
                self.num_epochs(),
                self.sampling_rate,
                self.epoch_length
            ))
        })?;
        for (name, signal) in &self.psgs {
            if signal.len() != expected {
                return Err(invalid(format!(
                    "channel '{}' has {} samples, expected {} ({} epochs x {} Hz x {} s)",
                    name,
                    signal.len(),
                    expected,
                    self.num_epochs(),
                    self.sampling_rate,
                    self.epoch_length
                )));
            }
        }

        self.stages().map(|_| ())
    }

    /// Hypnogram as stages.
    pub fn stages(&self) -> Result<Vec<SleepStage>> {
        self.hypnogram
            .iter()
            .map(|&code| SleepStage::from_code(code))
            .collect()
    }

    /// Split channels into `(epochs, samples)` rows.
    ///
    /// `channels` selects which channels to keep (all when empty). When
    /// `resample_hz` is set and lower than the recording rate, rows are
    /// resampled to it.
    pub fn to_epochs(&self, channels: &[&str], resample_hz: Option<u32>) -> Result<EpochedSignals> {
        self.validate()?;

        let n_epochs = self.num_epochs();
        let per_epoch = self
            .samples_per_epoch()
            .ok_or_else(|| PsgError::invalid_recording(&self.label, "epoch size overflows"))?;
        let target = match resample_hz {
            Some(0) => {
                return Err(PsgError::config("resample_hz must be > 0"));
            }
            Some(hz) if hz < self.sampling_rate => Some(hz),
            _ => None,
        };

        let names: Vec<&str> = if channels.is_empty() {
            self.psgs.keys().map(String::as_str).collect()
        } else {
            channels.to_vec()
        };

        let mut rows = BTreeMap::new();
        for name in names {
            let signal = self.psgs.get(name).ok_or_else(|| {
                PsgError::invalid_recording(&self.label, format!("missing channel '{name}'"))
            })?;
            let epochs = Array2::from_shape_vec((n_epochs, per_epoch), signal.to_vec())?;
            let epochs = match target {
                Some(hz) => resample_rows(&epochs, resampled_epoch_len(self.epoch_length, hz)),
                None => epochs,
            };
            rows.insert(name.to_string(), epochs);
        }

        Ok(EpochedSignals {
            subject: self.label.clone(),
            channels: rows,
            sampling_rate: target.unwrap_or(self.sampling_rate),
            num_epochs: n_epochs,
        })
    }
}

/// Channels reshaped into per-epoch rows.
#[derive(Debug, Clone)]
pub struct EpochedSignals {
    /// Subject label
    pub subject: String,
    /// Channel name → `(epochs, samples)`
    pub channels: BTreeMap<String, Array2<f64>>,
    /// Effective sampling rate after optional resampling
    pub sampling_rate: u32,
    /// Number of epochs
    pub num_epochs: usize,
}

/// Produces a recording from a file.
pub trait RecordingLoader: Send + Sync {
    /// Load the recording stored at `path`.
    fn load(&self, path: &Path) -> Result<SignalRecording>;
}

impl<F> RecordingLoader for F
where
    F: Fn(&Path) -> Result<SignalRecording> + Send + Sync,
{
    fn load(&self, path: &Path) -> Result<SignalRecording> {
        self(path)
    }
}

/// Reads recordings stored as `.npz` archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct NpzRecordingLoader;

impl NpzRecordingLoader {
    /// Create a loader.
    pub fn new() -> Self {
        Self
    }
}

fn read_scalar(npz: &mut NpzReader<File>, name: &str, subject: &str) -> Result<u32> {
    let value: Array0<i64> = npz.by_name(&format!("{name}{NPY_SUFFIX}"))?;
    u32::try_from(value.into_scalar())
        .map_err(|_| PsgError::invalid_recording(subject, format!("{name} out of range")))
}

impl RecordingLoader for NpzRecordingLoader {
    fn load(&self, path: &Path) -> Result<SignalRecording> {
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut npz = NpzReader::new(File::open(path)?)?;
        let sampling_rate = read_scalar(&mut npz, SAMPLING_RATE, &label)?;
        let epoch_length = read_scalar(&mut npz, EPOCH_LENGTH, &label)?;
        let hypnogram: Array1<i64> = npz.by_name(&format!("{HYPNOGRAM}{NPY_SUFFIX}"))?;

        let mut recording = SignalRecording::new(label, sampling_rate, epoch_length)
            .with_hypnogram(hypnogram.to_vec());

        for name in npz.names()? {
            let channel = name.strip_suffix(NPY_SUFFIX).unwrap_or(&name);
            if matches!(channel, HYPNOGRAM | SAMPLING_RATE | EPOCH_LENGTH) {
                continue;
            }
            let samples: Array1<f64> = npz.by_name(&name)?;
            recording.psgs.insert(channel.to_string(), samples);
        }

        log::debug!(
            "loaded '{}': {} channels, {} epochs",
            recording.label,
            recording.psgs.len(),
            recording.num_epochs()
        );
        Ok(recording)
    }
}

/// Write a recording in the layout [`NpzRecordingLoader`] reads.
pub fn save_recording_npz(recording: &SignalRecording, path: &Path) -> Result<()> {
    let mut npz = NpzWriter::new(File::create(path)?);
    for (name, samples) in &recording.psgs {
        if matches!(name.as_str(), HYPNOGRAM | SAMPLING_RATE | EPOCH_LENGTH) {
            return Err(PsgError::invalid_recording(
                &recording.label,
                format!("channel name '{name}' is reserved"),
            ));
        }
        npz.add_array(name.as_str(), samples)?;
    }
    npz.add_array(HYPNOGRAM, &Array1::from(recording.hypnogram.clone()))?;
    npz.add_array(SAMPLING_RATE, &arr0(recording.sampling_rate as i64))?;
    npz.add_array(EPOCH_LENGTH, &arr0(recording.epoch_length as i64))?;
    npz.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn synthetic(n_epochs: usize) -> SignalRecording {
        let n = n_epochs * 250 * 2;
        SignalRecording::new("s01", 250, 2)
            .with_channel("EEG", Array1::from_shape_fn(n, |i| (i as f64 * 0.1).sin()))
            .with_channel("EMG", Array1::from_shape_fn(n, |i| i as f64))
            .with_hypnogram(vec![0; n_epochs])
    }

    #[test]
    fn test_validate_ok() {
        assert!(synthetic(3).validate().is_ok());
    }

    #[test]
    fn test_channel_length_mismatch() {
        let mut rec = synthetic(3);
        rec.psgs.insert("EOGL".to_string(), Array1::zeros(10));
        let err = rec.validate().unwrap_err();
        assert!(matches!(err, PsgError::InvalidRecording { .. }));
    }

    #[test]
    fn test_hypnogram_mismatch_and_unknown_code() {
        let rec = synthetic(3).with_hypnogram(vec![0, 1]);
        assert!(rec.validate().is_err());

        let rec = synthetic(2).with_hypnogram(vec![0, 9]);
        assert!(matches!(rec.validate(), Err(PsgError::UnknownStage(9))));

        let rec = synthetic(1).with_hypnogram(vec![]);
        assert!(rec.validate().is_err());
    }

    #[test]
    fn test_unsafe_labels_rejected() {
        for label in ["", "../escaped", "a/b", "a\\b", ".."] {
            let mut rec = synthetic(1);
            rec.label = label.to_string();
            assert!(
                matches!(rec.validate(), Err(PsgError::InvalidRecording { .. })),
                "label {label:?} accepted"
            );
        }
    }

    #[test]
    fn test_oversized_header_rejected() {
        let mut rec = synthetic(2);
        rec.sampling_rate = u32::MAX;
        rec.epoch_length = u32::MAX;
        rec.hypnogram = vec![0; 1 << 20];
        assert!(matches!(
            rec.validate(),
            Err(PsgError::InvalidRecording { .. })
        ));
        assert_eq!(rec.expected_samples(), None);
    }

    #[test]
    fn test_to_epochs_rows() {
        let epochs = synthetic(3).to_epochs(&["EMG"], None).unwrap();
        let emg = &epochs.channels["EMG"];
        assert_eq!(emg.dim(), (3, 500));
        assert_eq!(emg[[1, 0]], 500.0);
        assert_eq!(epochs.channels.len(), 1);
        assert_eq!(epochs.sampling_rate, 250);
    }

    #[test]
    fn test_to_epochs_resamples_down_only() {
        let rec = synthetic(2);
        let down = rec.to_epochs(&[], Some(100)).unwrap();
        assert_eq!(down.sampling_rate, 100);
        assert_eq!(down.channels["EEG"].dim(), (2, 200));

        let unchanged = rec.to_epochs(&[], Some(500)).unwrap();
        assert_eq!(unchanged.sampling_rate, 250);
        assert_eq!(unchanged.channels["EEG"].dim(), (2, 500));
    }

    #[test]
    fn test_missing_channel() {
        assert!(synthetic(1).to_epochs(&["EOGR"], None).is_err());
    }

    #[test]
    fn test_npz_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s01.npz");
        let rec = synthetic(2);
        save_recording_npz(&rec, &path).unwrap();

        let loaded = NpzRecordingLoader::new().load(&path).unwrap();
        assert_eq!(loaded, rec);
    }

    #[test]
    fn test_closure_loader() {
        let loader = |_: &Path| -> Result<SignalRecording> { Ok(synthetic(1)) };
        let rec = loader.load(Path::new("ignored")).unwrap();
        assert_eq!(rec.label, "s01");
    }
}
