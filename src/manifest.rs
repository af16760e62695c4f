//! Subject discovery.
//!
//! Subjects come either from a fold manifest or from a directory listing.
//!
//! A manifest is a CSV file with one column per cross-validation fold; each
//! column lists the recording files of that fold. Columns may have different
//! lengths, so blank cells are skipped:
//!
//! ```text
//! fold0,fold1,fold2
//! s01.npz,s04.npz,s07.npz
//! s02.npz,s05.npz,s08.npz
//! s03.npz,,s09.npz
//! ```
//!
//! Relative entries resolve against the source directory.

use crate::error::{PsgError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the subject list comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubjectSelection {
    /// Every file in the source directory, sorted by name.
    Directory {
        /// Only files with this extension (without the dot)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extension: Option<String>,
    },
    /// The files listed in one column of a manifest.
    Manifest {
        /// CSV manifest path
        path: PathBuf,
        /// Fold column name
        column: String,
    },
}

impl Default for SubjectSelection {
    fn default() -> Self {
        SubjectSelection::Directory { extension: None }
    }
}

impl SubjectSelection {
    /// Manifest fold selection.
    pub fn manifest(path: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        SubjectSelection::Manifest {
            path: path.into(),
            column: column.into(),
        }
    }

    /// Directory listing filtered by extension.
    pub fn directory_with_extension(extension: impl Into<String>) -> Self {
        SubjectSelection::Directory {
            extension: Some(extension.into()),
        }
    }

    /// Resolve to recording paths, in processing order.
    pub fn resolve(&self, source_dir: &Path) -> Result<Vec<PathBuf>> {
        let subjects = match self {
            SubjectSelection::Directory { extension } => {
                list_directory(source_dir, extension.as_deref())?
            }
            SubjectSelection::Manifest { path, column } => read_manifest(path, column)?
                .into_iter()
                .map(|entry| source_dir.join(entry))
                .collect(),
        };
        log::debug!("resolved {} subjects from {:?}", subjects.len(), self);
        Ok(subjects)
    }
}

/// Entries of `column` in a fold manifest, blanks removed.
pub fn read_manifest(path: &Path, column: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let index = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| {
            PsgError::config(format!(
                "manifest {} has no column '{}'",
                path.display(),
                column
            ))
        })?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(cell) = record.get(index).map(str::trim) {
            if !cell.is_empty() {
                entries.push(cell.to_string());
            }
        }
    }
    Ok(entries)
}

/// Files directly inside `dir`, sorted by name.
pub fn list_directory(dir: &Path, extension: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let keep = match extension {
            Some(ext) => path.extension().is_some_and(|e| e == ext),
            None => true,
        };
        if keep {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_column_with_blanks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("folds.csv");
        fs::write(
            &path,
            "fold0,fold1\ns01.npz,s04.npz\ns02.npz,\n,s05.npz\n s03.npz ,\n",
        )
        .unwrap();

        assert_eq!(
            read_manifest(&path, "fold0").unwrap(),
            vec!["s01.npz", "s02.npz", "s03.npz"]
        );
        assert_eq!(
            read_manifest(&path, "fold1").unwrap(),
            vec!["s04.npz", "s05.npz"]
        );
    }

    #[test]
    fn test_missing_column_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("folds.csv");
        fs::write(&path, "fold0\ns01.npz\n").unwrap();
        assert!(read_manifest(&path, "fold9").unwrap_err().is_config());
    }

    #[test]
    fn test_directory_listing_sorted_files_only() {
        let dir = TempDir::new().unwrap();
        for name in ["b.npz", "a.npz", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("transformed_abc")).unwrap();

        let all = list_directory(dir.path(), None).unwrap();
        assert_eq!(all.len(), 3);

        let npz = SubjectSelection::directory_with_extension("npz")
            .resolve(dir.path())
            .unwrap();
        let names: Vec<_> = npz
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.npz", "b.npz"]);
    }

    #[test]
    fn test_manifest_entries_resolve_against_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("folds.csv");
        fs::write(&path, "fold0\ns01.npz\n").unwrap();
        let subjects = SubjectSelection::manifest(&path, "fold0")
            .resolve(Path::new("/data/psg"))
            .unwrap();
        assert_eq!(subjects, vec![PathBuf::from("/data/psg/s01.npz")]);
    }
}
