//! Random access to materialized samples.
//!
//! [`SleepDataset`] keeps only the sample index in memory; every `get` reads
//! the sample's artifact from disk and applies the optional transform.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use psg_feature_extractor::prelude::*;
//!
//! let config = DatasetConfig::load_toml("dataset.toml")?;
//! let dataset = SleepDataset::load(config, Arc::new(NpzRecordingLoader::new()))?;
//!
//! let (x, y) = dataset.get(0)?;
//! println!("{:?} -> class {}", x.shape(), y);
//! println!("weights: {:?}", dataset.class_weights().weights);
//! ```

use crate::config::DatasetConfig;
use crate::error::{PsgError, Result};
use crate::export::{ArtifactStore, DatasetInfo, SampleRecord, StoreIndex};
use crate::labeling::ClassWeights;
use crate::materializer::{DatasetMaterializer, MaterializedDataset};
use crate::preprocessing::SampleTransform;
use crate::recording::RecordingLoader;
use ndarray::Array3;
use std::sync::Arc;

/// Indexed collection of `(features, label)` samples.
pub trait Dataset: Send + Sync {
    /// Number of samples.
    fn len(&self) -> usize;

    /// True when there are no samples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Features and label of sample `index`.
    fn get(&self, index: usize) -> Result<(Array3<f64>, i64)>;

    /// Label of sample `index` without reading its features.
    fn label(&self, index: usize) -> Result<i64>;

    /// Labels of every sample in index order.
    fn labels(&self) -> Result<Vec<i64>> {
        (0..self.len()).map(|i| self.label(i)).collect()
    }
}

/// Samples persisted in an artifact store, read lazily.
#[derive(Debug, Clone)]
pub struct SleepDataset {
    store: ArtifactStore,
    index: StoreIndex,
    transform: Option<SampleTransform>,
}

impl SleepDataset {
    /// Materialize (or reuse) the store for `config` and open it.
    pub fn load(config: DatasetConfig, loader: Arc<dyn RecordingLoader>) -> Result<Self> {
        let transform = config.transform.clone();
        let materialized = DatasetMaterializer::new(config, loader)?.materialize()?;
        Self::from_materialized(materialized, transform)
    }

    /// Wrap the output of a materializer.
    pub fn from_materialized(
        materialized: MaterializedDataset,
        transform: Option<SampleTransform>,
    ) -> Result<Self> {
        validate_transform(transform.as_ref())?;
        Ok(Self {
            store: materialized.store,
            index: materialized.index,
            transform,
        })
    }

    /// Open a complete store directly.
    pub fn open(store: ArtifactStore, transform: Option<SampleTransform>) -> Result<Self> {
        validate_transform(transform.as_ref())?;
        if !store.is_complete() {
            return Err(PsgError::generic(format!(
                "artifact store {} is incomplete",
                store.dir().display()
            )));
        }
        let index = store.read_index()?;
        Ok(Self {
            store,
            index,
            transform,
        })
    }

    /// Dataset summary.
    pub fn info(&self) -> &DatasetInfo {
        &self.index.info
    }

    /// Backing store.
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Id of sample `index`.
    pub fn id(&self, index: usize) -> Result<&str> {
        self.record(index).map(|r| r.id.as_str())
    }

    /// Smoothed inverse-frequency weights over the native stages.
    pub fn class_weights(&self) -> ClassWeights {
        self.index.info.class_weights()
    }

    /// Smoothed inverse-frequency weights over the target classes.
    pub fn target_class_weights(&self) -> Result<ClassWeights> {
        self.index.info.target_class_weights()
    }

    fn record(&self, index: usize) -> Result<&SampleRecord> {
        self.index
            .samples
            .get(index)
            .ok_or(PsgError::IndexOutOfBounds {
                index,
                len: self.index.samples.len(),
            })
    }
}

fn validate_transform(transform: Option<&SampleTransform>) -> Result<()> {
    match transform {
        Some(t) => t.validate().map_err(PsgError::Config),
        None => Ok(()),
    }
}

impl Dataset for SleepDataset {
    fn len(&self) -> usize {
        self.index.samples.len()
    }

    fn get(&self, index: usize) -> Result<(Array3<f64>, i64)> {
        let record = self.record(index)?;
        let sample = self.store.read_sample(&record.id)?;
        let x = match &self.transform {
            Some(transform) => transform.apply(sample.x),
            None => sample.x,
        };
        Ok((x, sample.y))
    }

    fn label(&self, index: usize) -> Result<i64> {
        self.record(index).map(|r| r.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::LabeledSample;
    use tempfile::TempDir;

    fn store_with(samples: &[(&str, i64, f64)]) -> (TempDir, ArtifactStore) {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path(), "feed");
        store.reset().unwrap();
        let mut records = Vec::new();
        for &(id, y, fill) in samples {
            store
                .write_sample(&LabeledSample {
                    id: id.to_string(),
                    x: Array3::from_elem((1, 2, 3), fill),
                    y,
                })
                .unwrap();
            records.push(SampleRecord {
                id: id.to_string(),
                y,
            });
        }
        store
            .write_index(&StoreIndex {
                info: DatasetInfo::new("feed".to_string(), 3, 0),
                samples: records,
            })
            .unwrap();
        (dir, store)
    }

    #[test]
    fn test_get_reads_lazily() {
        let (_dir, store) = store_with(&[("a", 0, 1.0), ("b", 2, 5.0)]);
        let ds = SleepDataset::open(store, None).unwrap();
        assert_eq!(ds.len(), 2);
        let (x, y) = ds.get(1).unwrap();
        assert_eq!(y, 2);
        assert!(x.iter().all(|&v| v == 5.0));
        assert_eq!(ds.labels().unwrap(), vec![0, 2]);
        assert_eq!(ds.id(0).unwrap(), "a");
    }

    #[test]
    fn test_transform_applied_on_get() {
        let (_dir, store) = store_with(&[("a", 1, 2.0)]);
        let ds = SleepDataset::open(store, Some(SampleTransform::Scale { factor: 3.0 })).unwrap();
        let (x, _) = ds.get(0).unwrap();
        assert!(x.iter().all(|&v| v == 6.0));
    }

    #[test]
    fn test_invalid_transform_rejected_on_open() {
        let (_dir, store) = store_with(&[("a", 0, 0.5)]);
        let clip = SampleTransform::Clip {
            min: f64::NAN,
            max: 1.0,
        };
        let err = SleepDataset::open(store, Some(clip)).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_out_of_bounds() {
        let (_dir, store) = store_with(&[("a", 0, 0.0)]);
        let ds = SleepDataset::open(store, None).unwrap();
        assert!(matches!(
            ds.get(3),
            Err(PsgError::IndexOutOfBounds { index: 3, len: 1 })
        ));
    }

    #[test]
    fn test_open_incomplete_store() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path(), "beef");
        store.reset().unwrap();
        assert!(SleepDataset::open(store, None).is_err());
    }
}
