use super::fingerprint::store_dir_name;
use super::{LabeledSample, StoreIndex};
use crate::error::{PsgError, Result};
use ndarray::{arr0, Array0, Array1, Array3};
use ndarray_npy::{NpzReader, NpzWriter};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

const ARTIFACT_EXT: &str = "npz";

/// Fingerprinted directory holding one `.npz` artifact per sample.
///
/// ```text
/// <root>/transformed_<fingerprint>/
///     config.json           parameters the fingerprint was computed from
///     <id>.npz              x.npy (f64, 3-D), y.npy (i64, 0-D), id.npy (u8)
///     dataset_info.json     written last; its presence marks a complete store
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Completion marker and sample index.
    pub const INDEX_FILE: &'static str = "dataset_info.json";

    /// Parameters the store was built from.
    pub const CONFIG_FILE: &'static str = "config.json";

    /// Store addressed by `fingerprint` under `root`.
    pub fn new(root: &Path, fingerprint: &str) -> Self {
        Self {
            dir: root.join(store_dir_name(fingerprint)),
        }
    }

    /// Store at an explicit directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for `id`.
    pub fn sample_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{ARTIFACT_EXT}"))
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(Self::INDEX_FILE)
    }

    /// True once a build finished writing its index.
    pub fn is_complete(&self) -> bool {
        self.index_path().is_file()
    }

    /// Remove any previous contents and recreate the directory.
    pub fn reset(&self) -> Result<()> {
        if self.dir.exists() {
            log::warn!("clearing artifact store {}", self.dir.display());
            fs::remove_dir_all(&self.dir)?;
        }
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Write the build parameters next to the artifacts.
    pub fn write_config<T: Serialize>(&self, config: &T) -> Result<()> {
        let file = File::create(self.dir.join(Self::CONFIG_FILE))?;
        serde_json::to_writer_pretty(BufWriter::new(file), config)?;
        Ok(())
    }

    /// Persist one sample as `<id>.npz`.
    pub fn write_sample(&self, sample: &LabeledSample) -> Result<()> {
        let mut npz = NpzWriter::new(File::create(self.sample_path(&sample.id))?);
        npz.add_array("x", &sample.x)?;
        npz.add_array("y", &arr0(sample.y))?;
        npz.add_array("id", &Array1::from(sample.id.as_bytes().to_vec()))?;
        npz.finish()?;
        Ok(())
    }

    /// Read the sample stored under `id`.
    pub fn read_sample(&self, id: &str) -> Result<LabeledSample> {
        let mut npz = NpzReader::new(File::open(self.sample_path(id))?)?;
        let x: Array3<f64> = npz.by_name("x.npy")?;
        let y: Array0<i64> = npz.by_name("y.npy")?;
        let stored_id: Array1<u8> = npz.by_name("id.npy")?;
        let stored_id = String::from_utf8(stored_id.to_vec())
            .map_err(|e| PsgError::generic(format!("artifact {id} has a non-UTF-8 id: {e}")))?;

        Ok(LabeledSample {
            id: stored_id,
            x,
            y: y.into_scalar(),
        })
    }

    /// Write the index; the store counts as complete afterwards.
    pub fn write_index(&self, index: &StoreIndex) -> Result<()> {
        let tmp = self.dir.join(format!("{}.tmp", Self::INDEX_FILE));
        {
            let file = File::create(&tmp)?;
            serde_json::to_writer_pretty(BufWriter::new(file), index)?;
        }
        fs::rename(&tmp, self.index_path())?;
        Ok(())
    }

    /// Read the index of a complete store.
    pub fn read_index(&self) -> Result<StoreIndex> {
        let file = File::open(self.index_path())?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// Number of `.npz` artifacts on disk.
    pub fn artifact_count(&self) -> Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == ARTIFACT_EXT) {
                count += 1;
            }
        }
        Ok(count)
    }
}
