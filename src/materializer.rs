//! Dataset materialization.
//!
//! Walks the configured subjects one at a time, runs the subject pipeline,
//! and persists every kept epoch as its own artifact:
//!
//! ```text
//! ┌──────────────────────── DatasetMaterializer ────────────────────────┐
//! │  subjects ─► loader ─► SubjectPipeline ─► label / discard / remap   │
//! │                                               │                      │
//! │                                               ▼                      │
//! │                      ArtifactStore  <id>.npz  ×  kept epochs         │
//! │                                               │                      │
//! │                                               ▼                      │
//! │                      dataset_info.json  (written last)               │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Store lifecycle
//!
//! - The store directory is addressed by the config fingerprint.
//! - If it already holds a complete index for the same fingerprint it is
//!   reused as-is.
//! - Otherwise it is cleared and rebuilt from scratch. Concurrent readers
//!   during a rebuild are not supported.
//!
//! # Failures
//!
//! With [`ErrorMode::FailFast`] (default) the first subject that fails to load
//! or transform aborts the build. With [`ErrorMode::SkipSubject`] the subject
//! is logged, recorded in [`DatasetInfo::skipped_subjects`] and the build goes
//! on. Store I/O failures always abort.

use crate::config::{DatasetConfig, ErrorMode};
use crate::error::{PsgError, Result};
use crate::export::{ArtifactStore, DatasetInfo, LabeledSample, SampleRecord, SkippedSubject, StoreIndex};
use crate::labeling::{ClassDistribution, LabelScheme};
use crate::pipeline::{SubjectOutput, SubjectPipeline};
use crate::recording::RecordingLoader;
use ndarray::Axis;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ============================================================================
// Progress Reporting
// ============================================================================

/// Progress of a running build.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Recording being processed
    pub current_subject: PathBuf,

    /// Position in the subject list
    pub current_index: usize,

    /// Number of subjects
    pub total_subjects: usize,

    /// Samples persisted so far
    pub samples_written: usize,

    /// Time since the build started
    pub elapsed: Duration,
}

impl ProgressInfo {
    /// Completion percentage (0.0 to 100.0).
    pub fn percent_complete(&self) -> f64 {
        if self.total_subjects == 0 {
            100.0
        } else {
            self.current_index as f64 / self.total_subjects as f64 * 100.0
        }
    }
}

/// Receives progress updates while a dataset is built.
pub trait ProgressCallback: Send + Sync {
    /// Called before each subject is loaded.
    fn on_subject(&self, info: &ProgressInfo);

    /// Called once the index has been written.
    fn on_complete(&self, info: &DatasetInfo);
}

/// Prints progress to stdout.
#[derive(Debug, Default)]
pub struct ConsoleProgress {
    /// One line per subject instead of an in-place counter.
    pub verbose: bool,
}

impl ConsoleProgress {
    /// Create a console reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable verbose output.
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_subject(&self, info: &ProgressInfo) {
        if self.verbose {
            println!(
                "[{:3}/{:3}] loading {} ({} samples so far)",
                info.current_index + 1,
                info.total_subjects,
                info.current_subject.display(),
                info.samples_written
            );
        } else {
            print!(
                "\r[{:3}/{:3}] {:.1}%",
                info.current_index,
                info.total_subjects,
                info.percent_complete()
            );
            use std::io::Write;
            std::io::stdout().flush().ok();
        }
    }

    fn on_complete(&self, info: &DatasetInfo) {
        println!();
        println!("Dataset materialized");
        println!("  Subjects:      {}", info.subjects.len());
        println!("  Skipped:       {}", info.skipped_subjects.len());
        println!("  Samples:       {}", info.num_samples);
        println!("  Sample shape:  {:?}", info.input_shape);
        for (stage, count) in info.class_distribution.named_counts() {
            println!("  {stage:<9}      {count}");
        }
    }
}

// ============================================================================
// Materializer
// ============================================================================

/// Whether the store was reused or rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// A complete store with the same fingerprint already existed.
    Reused,
    /// The store was cleared and rebuilt.
    Built,
}

/// A store ready for reading.
#[derive(Debug, Clone)]
pub struct MaterializedDataset {
    /// Artifact store
    pub store: ArtifactStore,
    /// Summary and sample index
    pub index: StoreIndex,
    /// Reused or rebuilt
    pub outcome: BuildOutcome,
}

/// Samples planned for one subject before anything is written.
struct SubjectPlan {
    subject: String,
    samples: Vec<LabeledSample>,
    distribution: ClassDistribution,
    sample_shape: Vec<usize>,
}

/// Builds (or reuses) the artifact store for a dataset config.
pub struct DatasetMaterializer {
    config: DatasetConfig,
    loader: Arc<dyn RecordingLoader>,
    pipeline: SubjectPipeline,
    scheme: LabelScheme,
    fingerprint: String,
    store: ArtifactStore,
    progress_callback: Option<Box<dyn ProgressCallback>>,
}

impl std::fmt::Debug for DatasetMaterializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetMaterializer")
            .field("fingerprint", &self.fingerprint)
            .field("store", &self.store)
            .finish()
    }
}

impl DatasetMaterializer {
    /// Validate the config and compile its pipeline.
    ///
    /// Configuration errors surface here, before any subject is touched.
    pub fn new(config: DatasetConfig, loader: Arc<dyn RecordingLoader>) -> Result<Self> {
        config.validate().map_err(PsgError::Config)?;
        let scheme = config.label_scheme()?;
        let pipeline = SubjectPipeline::from_config(&config)?;
        let fingerprint = config.fingerprint()?;
        let store = ArtifactStore::new(config.store_root(), &fingerprint);

        Ok(Self {
            config,
            loader,
            pipeline,
            scheme,
            fingerprint,
            store,
            progress_callback: None,
        })
    }

    /// Report progress through `callback`.
    pub fn with_progress_callback(mut self, callback: Box<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Config fingerprint.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Target store.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// The config this materializer was built from.
    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    /// Reuse a complete store or rebuild it.
    pub fn materialize(&self) -> Result<MaterializedDataset> {
        if self.store.is_complete() {
            let index = self.store.read_index()?;
            if index.info.fingerprint == self.fingerprint {
                log::info!(
                    "reusing artifact store {} ({} samples)",
                    self.store.dir().display(),
                    index.samples.len()
                );
                return Ok(MaterializedDataset {
                    store: self.store.clone(),
                    index,
                    outcome: BuildOutcome::Reused,
                });
            }
            log::warn!(
                "store {} belongs to fingerprint {}, rebuilding",
                self.store.dir().display(),
                index.info.fingerprint
            );
        }
        self.rebuild()
    }

    /// Clear the store and build it from scratch.
    pub fn rebuild(&self) -> Result<MaterializedDataset> {
        let start = Instant::now();
        let subjects = self.config.subjects.resolve(&self.config.source_dir)?;
        if subjects.is_empty() {
            return Err(PsgError::config(format!(
                "no subjects found in {}",
                self.config.source_dir.display()
            )));
        }
        log::info!(
            "materializing {} subjects into {}",
            subjects.len(),
            self.store.dir().display()
        );

        self.store.reset()?;
        self.store.write_config(&self.config)?;

        let mut info = DatasetInfo::new(
            self.fingerprint.clone(),
            self.scheme.num_classes(),
            self.config.neighbors,
        );
        let mut records: Vec<SampleRecord> = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();

        for (index, path) in subjects.iter().enumerate() {
            if let Some(callback) = &self.progress_callback {
                callback.on_subject(&ProgressInfo {
                    current_subject: path.clone(),
                    current_index: index,
                    total_subjects: subjects.len(),
                    samples_written: records.len(),
                    elapsed: start.elapsed(),
                });
            }

            let plan = match self.plan_subject(path, &info.input_shape, &seen_ids) {
                Ok(plan) => plan,
                Err(err) => match self.config.processing.error_mode {
                    ErrorMode::FailFast => {
                        return Err(PsgError::SubjectFailed {
                            path: path.clone(),
                            source: Box::new(err),
                        });
                    }
                    ErrorMode::SkipSubject => {
                        log::warn!("skipping subject {}: {}", path.display(), err);
                        info.skipped_subjects.push(SkippedSubject {
                            path: path.clone(),
                            reason: err.to_string(),
                        });
                        continue;
                    }
                },
            };

            for sample in &plan.samples {
                self.store.write_sample(sample)?;
                seen_ids.insert(sample.id.clone());
                records.push(SampleRecord {
                    id: sample.id.clone(),
                    y: sample.y,
                });
            }
            log::info!(
                "subject '{}': {} samples persisted",
                plan.subject,
                plan.samples.len()
            );

            if info.input_shape.is_empty() {
                info.input_shape = plan.sample_shape;
            }
            info.class_distribution.merge(&plan.distribution);
            info.subjects.push(plan.subject);
        }

        info.num_samples = records.len();
        let index = StoreIndex {
            info,
            samples: records,
        };
        self.store.write_index(&index)?;

        log::info!(
            "materialized {} samples from {} subjects in {:?}",
            index.info.num_samples,
            index.info.subjects.len(),
            start.elapsed()
        );
        if let Some(callback) = &self.progress_callback {
            callback.on_complete(&index.info);
        }

        Ok(MaterializedDataset {
            store: self.store.clone(),
            index,
            outcome: BuildOutcome::Built,
        })
    }

    /// Load, transform and label one subject without touching the store.
    fn plan_subject(
        &self,
        path: &Path,
        expected_shape: &[usize],
        seen_ids: &HashSet<String>,
    ) -> Result<SubjectPlan> {
        let recording = self.loader.load(path)?;
        let output = self.pipeline.process(&recording)?;

        let sample_shape = output.sample_shape();
        if !expected_shape.is_empty() && sample_shape != expected_shape {
            return Err(PsgError::invalid_recording(
                &output.subject,
                format!(
                    "sample shape {:?} differs from earlier subjects {:?}",
                    sample_shape, expected_shape
                ),
            ));
        }

        let (samples, distribution) = self.label_samples(&output);
        if let Some(dup) = samples.iter().find(|s| seen_ids.contains(&s.id)) {
            return Err(PsgError::invalid_recording(
                &output.subject,
                format!("duplicate sample id '{}'", dup.id),
            ));
        }

        Ok(SubjectPlan {
            subject: output.subject,
            samples,
            distribution,
            sample_shape,
        })
    }

    /// Apply the discard policy, count native stages and remap labels.
    fn label_samples(&self, output: &SubjectOutput) -> (Vec<LabeledSample>, ClassDistribution) {
        let mut distribution = ClassDistribution::new();
        let mut samples = Vec::with_capacity(output.num_epochs());

        for (epoch, &stage) in output.stages.iter().enumerate() {
            if stage.is_artifact() && self.config.discard_artifacts {
                continue;
            }
            distribution.record(stage);
            samples.push(LabeledSample {
                id: LabeledSample::make_id(
                    &output.subject,
                    epoch,
                    self.config.neighbors,
                    stage.name(),
                ),
                x: output.windows.index_axis(Axis(0), epoch).to_owned(),
                y: self.scheme.remap(stage),
            });
        }
        (samples, distribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{presets, FeatureSetConfig};
    use crate::labeling::SleepStage;
    use crate::recording::SignalRecording;
    use ndarray::Array1;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn synthetic_loader(hypnogram: Vec<i64>) -> Arc<dyn RecordingLoader> {
        Arc::new(move |path: &Path| -> Result<SignalRecording> {
            let label = path.file_stem().unwrap().to_string_lossy().into_owned();
            if label.starts_with("broken") {
                return Err(PsgError::invalid_recording(label, "truncated file"));
            }
            let n = hypnogram.len() * 500;
            Ok(SignalRecording::new(label, 250, 2)
                .with_channel("EEG", Array1::from_shape_fn(n, |i| (i as f64 * 0.2).sin()))
                .with_channel("EMG", Array1::from_shape_fn(n, |i| (i as f64 * 0.9).cos()))
                .with_hypnogram(hypnogram.clone()))
        })
    }

    fn setup(files: &[&str]) -> (TempDir, DatasetConfig) {
        let dir = TempDir::new().unwrap();
        for f in files {
            std::fs::write(dir.path().join(f), b"").unwrap();
        }
        let mut config = DatasetConfig::new(dir.path());
        config.num_labels = 5;
        config.features =
            FeatureSetConfig::new(vec![presets::eeg_spectrogram(), presets::emg_psd()]);
        (dir, config)
    }

    #[test]
    fn test_build_then_reuse() {
        let (_dir, config) = setup(&["a.rec", "b.rec"]);
        let m = DatasetMaterializer::new(config, synthetic_loader(vec![0, 2, 5])).unwrap();

        let first = m.materialize().unwrap();
        assert_eq!(first.outcome, BuildOutcome::Built);
        assert_eq!(first.index.samples.len(), 4);
        assert_eq!(first.index.info.subjects, vec!["a", "b"]);
        assert_eq!(first.index.info.class_distribution.count(SleepStage::Artifact), 0);

        let second = m.materialize().unwrap();
        assert_eq!(second.outcome, BuildOutcome::Reused);
        assert_eq!(second.index.samples, first.index.samples);
        assert_eq!(second.store.artifact_count().unwrap(), 4);
    }

    #[test]
    fn test_fail_fast_aborts() {
        let (_dir, config) = setup(&["a.rec", "broken.rec"]);
        let m = DatasetMaterializer::new(config, synthetic_loader(vec![0, 1])).unwrap();
        let err = m.materialize().unwrap_err();
        assert!(matches!(err, PsgError::SubjectFailed { .. }));
        assert!(!m.store().is_complete());
    }

    #[test]
    fn test_skip_subject_records_it() {
        let (_dir, mut config) = setup(&["a.rec", "broken.rec", "c.rec"]);
        config.processing.error_mode = ErrorMode::SkipSubject;
        let m = DatasetMaterializer::new(config, synthetic_loader(vec![0, 1])).unwrap();
        let built = m.materialize().unwrap();
        assert_eq!(built.index.info.subjects, vec!["a", "c"]);
        assert_eq!(built.index.info.skipped_subjects.len(), 1);
        assert!(built.index.info.skipped_subjects[0].reason.contains("truncated"));
        assert_eq!(built.index.info.num_samples, 4);
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let (_dir, config) = setup(&["a.rec", "x.rec"]);
        let loader: Arc<dyn RecordingLoader> = Arc::new(|_: &Path| -> Result<SignalRecording> {
            Ok(SignalRecording::new("same", 250, 2)
                .with_channel("EEG", Array1::zeros(500))
                .with_channel("EMG", Array1::zeros(500))
                .with_hypnogram(vec![0]))
        });
        let m = DatasetMaterializer::new(config, loader).unwrap();
        let err = m.materialize().unwrap_err();
        assert!(err.to_string().contains("x.rec"));
    }

    struct Counting(Arc<AtomicUsize>);

    impl ProgressCallback for Counting {
        fn on_subject(&self, _info: &ProgressInfo) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
        fn on_complete(&self, _info: &DatasetInfo) {}
    }

    #[test]
    fn test_progress_callback_per_subject() {
        let (_dir, config) = setup(&["a.rec", "b.rec", "c.rec"]);
        let calls = Arc::new(AtomicUsize::new(0));
        let m = DatasetMaterializer::new(config, synthetic_loader(vec![1]))
            .unwrap()
            .with_progress_callback(Box::new(Counting(calls.clone())));
        m.materialize().unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_empty_source_is_config_error() {
        let (_dir, config) = setup(&[]);
        let m = DatasetMaterializer::new(config, synthetic_loader(vec![0])).unwrap();
        assert!(m.materialize().unwrap_err().is_config());
    }
}
