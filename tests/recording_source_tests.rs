//! Integration tests for `.npz` recordings and manifest-driven subject selection.

use ndarray::Array1;
use psg_feature_extractor::prelude::*;
use psg_feature_extractor::recording::save_recording_npz;
use std::path::Path;
use tempfile::TempDir;

fn write_recording(dir: &Path, label: &str, hypnogram: Vec<i64>) {
    let n = hypnogram.len() * 500;
    let recording = SignalRecording::new(label, 250, 2)
        .with_channel("EEG", Array1::from_shape_fn(n, |i| (i as f64 * 0.11).sin()))
        .with_channel("EMG", Array1::from_shape_fn(n, |i| (i as f64 * 0.7).cos()))
        .with_channel("EOGL", Array1::from_shape_fn(n, |i| (i as f64 * 0.05).sin()))
        .with_channel("EOGR", Array1::from_shape_fn(n, |i| (i as f64 * 0.05).cos()))
        .with_hypnogram(hypnogram);
    save_recording_npz(&recording, &dir.join(format!("{label}.npz"))).unwrap();
}

#[test]
fn test_npz_round_trip_preserves_recording() {
    let dir = TempDir::new().unwrap();
    write_recording(dir.path(), "s07", vec![0, 2, 3]);

    let loaded = NpzRecordingLoader::new()
        .load(&dir.path().join("s07.npz"))
        .unwrap();
    assert_eq!(loaded.label, "s07");
    assert_eq!(loaded.sampling_rate, 250);
    assert_eq!(loaded.epoch_length, 2);
    assert_eq!(loaded.hypnogram, vec![0, 2, 3]);
    assert_eq!(loaded.psgs.len(), 4);
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_default_feature_set_from_npz_files() {
    let dir = TempDir::new().unwrap();
    write_recording(dir.path(), "s01", vec![0, 1, 2, 4]);
    write_recording(dir.path(), "s02", vec![3, 3, 5]);
    std::fs::write(dir.path().join("notes.txt"), "not a recording").unwrap();

    let config = DatasetBuilder::new(dir.path())
        .extension("npz")
        .build_config()
        .unwrap();
    let dataset = SleepDataset::load(config, Arc::new(NpzRecordingLoader::new())).unwrap();

    assert_eq!(dataset.info().subjects, vec!["s01", "s02"]);
    assert_eq!(dataset.len(), 6);
    assert_eq!(dataset.info().input_shape, vec![4, 51, 5]);
    assert_eq!(dataset.labels().unwrap(), vec![0, 1, 2, 3, 3, 3]);
    assert_eq!(dataset.id(5).unwrap(), "s02_epoch_00001_0N_N3");
}

#[test]
fn test_manifest_selects_fold() {
    let dir = TempDir::new().unwrap();
    for label in ["s01", "s02", "s03"] {
        write_recording(dir.path(), label, vec![0, 2]);
    }
    let manifest = dir.path().join("folds.csv");
    std::fs::write(&manifest, "train,test\ns01.npz,s03.npz\ns02.npz,\n").unwrap();

    let train = DatasetBuilder::new(dir.path())
        .manifest(&manifest, "train")
        .build_config()
        .unwrap();
    let test = DatasetBuilder::new(dir.path())
        .manifest(&manifest, "test")
        .build_config()
        .unwrap();
    assert_ne!(train.fingerprint().unwrap(), test.fingerprint().unwrap());

    let loader: Arc<dyn RecordingLoader> = Arc::new(NpzRecordingLoader::new());
    let train = SleepDataset::load(train, loader.clone()).unwrap();
    let test = SleepDataset::load(test, loader).unwrap();

    assert_eq!(train.info().subjects, vec!["s01", "s02"]);
    assert_eq!(test.info().subjects, vec!["s03"]);
    assert_eq!(test.len(), 2);
    assert_ne!(train.store().dir(), test.store().dir());
}

#[test]
fn test_manifest_missing_column_is_config_error() {
    let dir = TempDir::new().unwrap();
    write_recording(dir.path(), "s01", vec![0]);
    let manifest = dir.path().join("folds.csv");
    std::fs::write(&manifest, "train\ns01.npz\n").unwrap();

    let config = DatasetBuilder::new(dir.path())
        .manifest(&manifest, "fold9")
        .build_config()
        .unwrap();
    let err = DatasetMaterializer::new(config, Arc::new(NpzRecordingLoader::new()))
        .unwrap()
        .materialize()
        .unwrap_err();
    assert!(err.is_config());
}

#[test]
fn test_resampled_recording_matches_lower_rate_pipeline() {
    let dir = TempDir::new().unwrap();
    let n = 2 * 1000;
    let recording = SignalRecording::new("fast", 500, 2)
        .with_channel("EEG", Array1::from_shape_fn(n, |i| (i as f64 * 0.03).sin()))
        .with_hypnogram(vec![0, 4]);
    save_recording_npz(&recording, &dir.path().join("fast.npz")).unwrap();

    let config = DatasetBuilder::new(dir.path())
        .features(FeatureSetConfig::new(vec![presets::eeg_spectrogram()]))
        .resample(250)
        .build_config()
        .unwrap();
    let dataset = SleepDataset::load(config, Arc::new(NpzRecordingLoader::new())).unwrap();
    assert_eq!(dataset.info().input_shape, vec![1, 51, 5]);
    assert_eq!(dataset.labels().unwrap(), vec![0, 3]);
}
