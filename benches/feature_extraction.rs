//! Benchmark suite for feature extraction performance.
//!
//! Run with: `cargo bench`
//!
//! This benchmark measures:
//! - Spectrogram throughput per epoch
//! - Full channel pipelines (EEG and PSD presets)
//! - Feature union over the default four channels
//! - Context windowing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::{Array2, Array4};
use psg_feature_extractor::features::{
    presets, ChannelPipeline, FeatureUnion, Spectrogram, SpectrogramConfig,
};
use psg_feature_extractor::sequence_builder::ContextWindow;
use std::collections::BTreeMap;

const SAMPLING_RATE: usize = 250;
const EPOCH_SECONDS: usize = 30;

/// Deterministic multi-tone epochs.
fn create_epochs(num_epochs: usize) -> Array2<f64> {
    let n = SAMPLING_RATE * EPOCH_SECONDS;
    Array2::from_shape_fn((num_epochs, n), |(e, i)| {
        let t = i as f64 / SAMPLING_RATE as f64;
        (2.0 * std::f64::consts::PI * 10.0 * t).sin()
            + 0.5 * (2.0 * std::f64::consts::PI * (1.0 + e as f64 % 7.0) * t).cos()
    })
}

/// Benchmark the raw spectrogram.
fn bench_spectrogram(c: &mut Criterion) {
    let mut group = c.benchmark_group("spectrogram");
    let spectrogram = Spectrogram::new(SpectrogramConfig::default()).expect("valid config");

    for num_epochs in [1usize, 16, 64].iter() {
        let epochs = create_epochs(*num_epochs);

        group.throughput(Throughput::Elements(*num_epochs as u64));
        group.bench_with_input(BenchmarkId::new("compute", num_epochs), num_epochs, |b, _| {
            b.iter(|| black_box(spectrogram.compute(black_box(epochs.view())).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark single channel pipelines.
fn bench_channel_pipelines(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel_pipeline");
    let epochs = create_epochs(16);

    let eeg = ChannelPipeline::from_config(&presets::eeg_spectrogram()).expect("valid preset");
    let emg = ChannelPipeline::from_config(&presets::emg_psd()).expect("valid preset");

    group.throughput(Throughput::Elements(16));
    group.bench_function("eeg_spectrogram", |b| {
        b.iter(|| black_box(eeg.transform(black_box(epochs.view())).unwrap()))
    });
    group.bench_function("emg_psd", |b| {
        b.iter(|| black_box(emg.transform(black_box(epochs.view())).unwrap()))
    });

    group.finish();
}

/// Benchmark the four-channel union with varying worker counts.
fn bench_feature_union(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_union");
    let config = presets::default_feature_set();

    let mut channels = BTreeMap::new();
    for name in config.channel_names() {
        channels.insert(name.to_string(), create_epochs(32));
    }

    for workers in [1usize, 2, 4].iter() {
        let union = FeatureUnion::new(&config, *workers).expect("valid feature set");

        group.throughput(Throughput::Elements(32));
        group.bench_with_input(BenchmarkId::new("workers", workers), workers, |b, _| {
            b.iter(|| black_box(union.transform(black_box(&channels)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark context windowing.
fn bench_context_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("context_window");
    let features = Array4::from_elem((200, 4, 51, 75), 1.0);

    for neighbors in [0usize, 2, 4].iter() {
        let window = ContextWindow::new(*neighbors).expect("even neighbors");
        group.bench_with_input(BenchmarkId::new("apply", neighbors), neighbors, |b, _| {
            b.iter(|| black_box(window.apply(black_box(&features))));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_spectrogram,
    bench_channel_pipelines,
    bench_feature_union,
    bench_context_window,
);

criterion_main!(benches);
