//! Sample ordering and batch loading for training passes.
//!
//! | Strategy      | Order per pass                          | Draws          |
//! |---------------|-----------------------------------------|----------------|
//! | `Sequential`  | index order                             | each once      |
//! | `Shuffled`    | uniform random permutation              | each once      |
//! | `Oversampled` | `P(i) ∝ 1 / count(class(i))`            | `len`, with replacement |
//!
//! Oversampling already randomizes order, so combining it with shuffling is a
//! configuration error.

use crate::config::LoaderConfig;
use crate::dataset::Dataset;
use crate::error::{PsgError, Result};
use ndarray::{stack, Array3, Array4, ArrayView3, Axis};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// How a training pass orders samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingStrategy {
    /// Index order unchanged.
    Sequential,
    /// Fresh uniform permutation each pass.
    Shuffled,
    /// Class-balanced draws with replacement.
    Oversampled,
}

impl SamplingStrategy {
    /// Strategy for the loader flags.
    pub fn from_flags(shuffle: bool, oversample: bool) -> Result<Self> {
        match (shuffle, oversample) {
            (true, true) => Err(PsgError::config(
                "shuffle and oversample are mutually exclusive",
            )),
            (false, true) => Ok(SamplingStrategy::Oversampled),
            (true, false) => Ok(SamplingStrategy::Shuffled),
            (false, false) => Ok(SamplingStrategy::Sequential),
        }
    }
}

/// Produces the index order of each pass.
#[derive(Debug, Clone)]
pub struct Sampler {
    strategy: SamplingStrategy,
    rng: StdRng,
}

impl Sampler {
    /// Sampler seeded from `seed`, or from entropy when absent.
    pub fn new(strategy: SamplingStrategy, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { strategy, rng }
    }

    /// Active strategy.
    pub fn strategy(&self) -> SamplingStrategy {
        self.strategy
    }

    /// Indices for one pass over samples with `labels`.
    pub fn indices(&mut self, labels: &[i64]) -> Result<Vec<usize>> {
        let n = labels.len();
        match self.strategy {
            SamplingStrategy::Sequential => Ok((0..n).collect()),
            SamplingStrategy::Shuffled => {
                let mut order: Vec<usize> = (0..n).collect();
                order.shuffle(&mut self.rng);
                Ok(order)
            }
            SamplingStrategy::Oversampled => {
                if n == 0 {
                    return Ok(Vec::new());
                }
                let weights = inverse_frequency_weights(labels);
                let dist = WeightedIndex::new(&weights)
                    .map_err(|e| PsgError::generic(format!("invalid sampling weights: {e}")))?;
                Ok((0..n).map(|_| dist.sample(&mut self.rng)).collect())
            }
        }
    }
}

/// Per-sample weight `1 / count(label)`.
pub fn inverse_frequency_weights(labels: &[i64]) -> Vec<f64> {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    labels
        .iter()
        .map(|label| 1.0 / counts[label] as f64)
        .collect()
}

/// A stacked batch of samples.
#[derive(Debug, Clone)]
pub struct Batch {
    /// `(batch, channels, freq, time)`
    pub x: Array4<f64>,
    /// Labels in batch order
    pub y: Vec<i64>,
    /// Dataset indices in batch order
    pub indices: Vec<usize>,
}

/// Yields batches of a dataset in sampler order.
///
/// Artifacts of a batch are read on a pool of `num_workers` threads.
pub struct DataLoader<'a, D: Dataset> {
    dataset: &'a D,
    batch_size: usize,
    sampler: Sampler,
    #[cfg(feature = "parallel")]
    pool: rayon::ThreadPool,
}

impl<'a, D: Dataset> DataLoader<'a, D> {
    /// Loader over `dataset` configured by `config`.
    pub fn new(dataset: &'a D, config: &LoaderConfig) -> Result<Self> {
        config.validate().map_err(PsgError::Config)?;
        let sampler = Sampler::new(config.strategy()?, config.seed);

        #[cfg(feature = "parallel")]
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_workers)
            .build()
            .map_err(|e| PsgError::generic(format!("Failed to create thread pool: {e}")))?;

        Ok(Self {
            dataset,
            batch_size: config.batch_size,
            sampler,
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    /// Batches per pass, counting the final partial one.
    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    /// Sampling strategy.
    pub fn strategy(&self) -> SamplingStrategy {
        self.sampler.strategy()
    }

    /// Start a new pass.
    pub fn iter(&mut self) -> Result<Batches<'_, 'a, D>> {
        let labels = self.dataset.labels()?;
        let order = self.sampler.indices(&labels)?;
        Ok(Batches {
            loader: &*self,
            order,
            position: 0,
        })
    }

    fn load_batch(&self, indices: &[usize]) -> Result<Batch> {
        let dataset = self.dataset;

        #[cfg(feature = "parallel")]
        let items: Vec<Result<(Array3<f64>, i64)>> = self
            .pool
            .install(|| indices.par_iter().map(|&i| dataset.get(i)).collect());

        #[cfg(not(feature = "parallel"))]
        let items: Vec<Result<(Array3<f64>, i64)>> =
            indices.iter().map(|&i| dataset.get(i)).collect();

        let items = items.into_iter().collect::<Result<Vec<_>>>()?;
        let views: Vec<ArrayView3<f64>> = items.iter().map(|(x, _)| x.view()).collect();

        Ok(Batch {
            x: stack(Axis(0), &views)?,
            y: items.iter().map(|&(_, y)| y).collect(),
            indices: indices.to_vec(),
        })
    }
}

/// Batches of one pass.
pub struct Batches<'l, 'a, D: Dataset> {
    loader: &'l DataLoader<'a, D>,
    order: Vec<usize>,
    position: usize,
}

impl<'l, 'a, D: Dataset> Batches<'l, 'a, D> {
    /// Index order of this pass.
    pub fn order(&self) -> &[usize] {
        &self.order
    }
}

impl<'l, 'a, D: Dataset> Iterator for Batches<'l, 'a, D> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.order.len() {
            return None;
        }
        let end = (self.position + self.loader.batch_size).min(self.order.len());
        let batch = self.loader.load_batch(&self.order[self.position..end]);
        self.position = end;
        Some(batch)
    }
}
