//! Named channel pipelines.
//!
//! | Preset            | Channel | Band (Hz) | PSD            | Output bins |
//! |-------------------|---------|-----------|----------------|-------------|
//! | `eeg_spectrogram` | EEG     | 0 - 25    | no             | 51          |
//! | `emg_psd`         | EMG     | 0 - 60    | mean, repeated | 51          |
//! | `eogl_psd`        | EOGL    | 0 - 60    | mean, repeated | 51          |
//! | `eogr_psd`        | EOGR    | 0 - 60    | mean, repeated | 51          |
//!
//! All presets use a 250 Hz, 500-sample window, 100-sample stride spectrogram
//! followed by log compression and per-sample whitening.

use super::{ChannelPipelineConfig, FeatureSetConfig, PsdMode, SpectrogramConfig, StageConfig};

/// Frequency bins EEG keeps after its band cut; the PSD presets repeat to it.
pub const EEG_OUTPUT_BINS: usize = 51;

/// Preset names in default concatenation order.
pub const PRESET_NAMES: [&str; 4] = ["eeg_spectrogram", "emg_psd", "eogl_psd", "eogr_psd"];

/// EEG: band-limited spectrogram.
pub fn eeg_spectrogram() -> ChannelPipelineConfig {
    ChannelPipelineConfig::new("eeg_spectrogram", "EEG")
        .with_spectrogram(SpectrogramConfig::default())
        .with_stage(StageConfig::CutFrequencies {
            lower: 0.0,
            upper: 25.0,
        })
        .with_stage(StageConfig::Log)
        .with_stage(StageConfig::Standardize)
}

fn psd_pipeline(name: &str, channel: &str) -> ChannelPipelineConfig {
    ChannelPipelineConfig::new(name, channel)
        .with_spectrogram(SpectrogramConfig::default())
        .with_stage(StageConfig::CutFrequencies {
            lower: 0.0,
            upper: 60.0,
        })
        .with_stage(StageConfig::PsdReduce {
            mode: PsdMode::Mean,
            output_dim: EEG_OUTPUT_BINS,
        })
        .with_stage(StageConfig::Log)
        .with_stage(StageConfig::Standardize)
}

/// EMG: band power repeated to the EEG bin count.
pub fn emg_psd() -> ChannelPipelineConfig {
    psd_pipeline("emg_psd", "EMG")
}

/// Left EOG: band power repeated to the EEG bin count.
pub fn eogl_psd() -> ChannelPipelineConfig {
    psd_pipeline("eogl_psd", "EOGL")
}

/// Right EOG: band power repeated to the EEG bin count.
pub fn eogr_psd() -> ChannelPipelineConfig {
    psd_pipeline("eogr_psd", "EOGR")
}

/// Look up a preset by name.
pub fn preset(name: &str) -> Option<ChannelPipelineConfig> {
    match name {
        "eeg_spectrogram" => Some(eeg_spectrogram()),
        "emg_psd" => Some(emg_psd()),
        "eogl_psd" => Some(eogl_psd()),
        "eogr_psd" => Some(eogr_psd()),
        _ => None,
    }
}

/// EEG, EMG, EOGL and EOGR in that order.
pub fn default_feature_set() -> FeatureSetConfig {
    FeatureSetConfig::new(vec![eeg_spectrogram(), emg_psd(), eogl_psd(), eogr_psd()])
}
