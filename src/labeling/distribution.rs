//! Class statistics accumulated while a dataset is materialized.

use super::{LabelScheme, SleepStage};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Per-stage sample counts over native labels.
///
/// Serialized as a stage-name → count map in stage-code order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassDistribution {
    counts: [usize; SleepStage::COUNT],
}

impl ClassDistribution {
    /// Empty distribution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one sample of `stage`.
    #[inline]
    pub fn record(&mut self, stage: SleepStage) {
        self.counts[stage.code()] += 1;
    }

    /// Samples counted for `stage`.
    #[inline]
    pub fn count(&self, stage: SleepStage) -> usize {
        self.counts[stage.code()]
    }

    /// Counts in stage-code order.
    pub fn counts(&self) -> &[usize; SleepStage::COUNT] {
        &self.counts
    }

    /// Total samples counted.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Add another distribution into this one.
    pub fn merge(&mut self, other: &ClassDistribution) {
        for (mine, theirs) in self.counts.iter_mut().zip(other.counts.iter()) {
            *mine += theirs;
        }
    }

    /// `(stage name, count)` pairs in stage-code order.
    pub fn named_counts(&self) -> Vec<(&'static str, usize)> {
        SleepStage::ALL
            .iter()
            .map(|&s| (s.name(), self.count(s)))
            .collect()
    }

    /// Counts collapsed onto the target classes of `scheme`.
    pub fn remapped(&self, scheme: LabelScheme) -> Vec<usize> {
        let mut out = vec![0usize; scheme.num_classes()];
        for stage in SleepStage::ALL {
            out[scheme.remap(stage) as usize] += self.count(stage);
        }
        out
    }
}

impl Serialize for ClassDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.named_counts())
    }
}

impl<'de> Deserialize<'de> for ClassDistribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let named = BTreeMap::<String, usize>::deserialize(deserializer)?;
        let mut dist = ClassDistribution::new();
        for (name, count) in named {
            let stage = SleepStage::from_name(&name)
                .ok_or_else(|| D::Error::custom(format!("unknown sleep stage '{name}'")))?;
            dist.counts[stage.code()] = count;
        }
        Ok(dist)
    }
}

/// Inverse-frequency class weights with add-one smoothing.
///
/// ```text
/// weight[c] = total / (count[c] + 1)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassWeights {
    /// One weight per class, in class order.
    pub weights: Vec<f64>,
}

impl ClassWeights {
    /// Weights from raw per-class counts.
    pub fn from_counts(counts: &[usize]) -> Self {
        let total: usize = counts.iter().sum();
        let weights = counts
            .iter()
            .map(|&c| total as f64 / (c as f64 + 1.0))
            .collect();
        Self { weights }
    }

    /// Weights over the six native stages.
    pub fn native(distribution: &ClassDistribution) -> Self {
        Self::from_counts(distribution.counts())
    }

    /// Weights over the target classes of `scheme`.
    pub fn for_scheme(distribution: &ClassDistribution, scheme: LabelScheme) -> Self {
        Self::from_counts(&distribution.remapped(scheme))
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// True when there are no classes.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
