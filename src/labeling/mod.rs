//! Sleep-stage labels and target-class remapping.
//!
//! Hypnograms arrive as integer codes from the frozen stage table:
//!
//! | Code | Stage    |
//! |------|----------|
//! | 0    | Wake     |
//! | 1    | N1       |
//! | 2    | N2       |
//! | 3    | N3       |
//! | 4    | REM      |
//! | 5    | Artifact |
//!
//! Training targets use a reduced vocabulary selected once by configuration
//! through [`LabelScheme`]:
//!
//! ```text
//! code        0  1  2  3  4  5
//! 5 classes   0  1  2  3  3  4
//! 3 classes   0  1  1  1  1  2
//! ```
//!
//! # Example
//!
//! ```
//! use psg_feature_extractor::labeling::{LabelScheme, SleepStage};
//!
//! let scheme = LabelScheme::from_num_labels(3).unwrap();
//! let stage = SleepStage::from_code(2).unwrap();
//! assert_eq!(stage.name(), "N2");
//! assert_eq!(scheme.remap(stage), 1);
//! ```

pub mod distribution;

pub use distribution::{ClassDistribution, ClassWeights};

use crate::error::{PsgError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Native sleep stage, one per hypnogram code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SleepStage {
    /// Awake
    Wake = 0,
    /// Light sleep, stage 1
    N1 = 1,
    /// Light sleep, stage 2
    N2 = 2,
    /// Deep sleep
    N3 = 3,
    /// Rapid eye movement sleep
    Rem = 4,
    /// Epoch unusable for staging
    Artifact = 5,
}

impl SleepStage {
    /// All stages in code order.
    pub const ALL: [SleepStage; 6] = [
        SleepStage::Wake,
        SleepStage::N1,
        SleepStage::N2,
        SleepStage::N3,
        SleepStage::Rem,
        SleepStage::Artifact,
    ];

    /// Number of native stages.
    pub const COUNT: usize = 6;

    /// Look up a hypnogram code.
    pub fn from_code(code: i64) -> Result<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
            .ok_or(PsgError::UnknownStage(code))
    }

    /// Look up a stage by its name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }

    /// Hypnogram code.
    #[inline]
    pub fn code(self) -> usize {
        self as usize
    }

    /// Name used in sample ids and class-distribution keys.
    pub fn name(self) -> &'static str {
        match self {
            SleepStage::Wake => "Wake",
            SleepStage::N1 => "N1",
            SleepStage::N2 => "N2",
            SleepStage::N3 => "N3",
            SleepStage::Rem => "REM",
            SleepStage::Artifact => "Artifact",
        }
    }

    /// True for epochs flagged as unusable.
    #[inline]
    pub fn is_artifact(self) -> bool {
        self == SleepStage::Artifact
    }
}

impl fmt::Display for SleepStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Target vocabulary the native stages are collapsed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelScheme {
    /// Wake / N1 / N2 / N3+REM / Artifact
    FiveClass,
    /// Wake / sleep / Artifact
    ThreeClass,
}

const FIVE_CLASS_TABLE: [i64; SleepStage::COUNT] = [0, 1, 2, 3, 3, 4];
const THREE_CLASS_TABLE: [i64; SleepStage::COUNT] = [0, 1, 1, 1, 1, 2];

impl LabelScheme {
    /// Select the scheme for a configured label count.
    ///
    /// Any count other than 3 or 5 is a configuration error.
    pub fn from_num_labels(num_labels: usize) -> Result<Self> {
        match num_labels {
            5 => Ok(LabelScheme::FiveClass),
            3 => Ok(LabelScheme::ThreeClass),
            other => Err(PsgError::config(format!(
                "num_labels must be 3 or 5, got {other}"
            ))),
        }
    }

    /// Number of target classes.
    pub fn num_classes(self) -> usize {
        match self {
            LabelScheme::FiveClass => 5,
            LabelScheme::ThreeClass => 3,
        }
    }

    /// Remapping table indexed by stage code.
    pub fn table(self) -> &'static [i64; SleepStage::COUNT] {
        match self {
            LabelScheme::FiveClass => &FIVE_CLASS_TABLE,
            LabelScheme::ThreeClass => &THREE_CLASS_TABLE,
        }
    }

    /// Target class for a native stage.
    #[inline]
    pub fn remap(self, stage: SleepStage) -> i64 {
        self.table()[stage.code()]
    }
}
