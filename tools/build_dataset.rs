//! Sleep Staging Dataset Build Tool
//!
//! Materializes the artifact store for one dataset configuration, or reuses
//! it when a complete store with the same fingerprint already exists.
//!
//! # Usage
//!
//! ```bash
//! # From TOML config
//! cargo run --release --bin build_dataset -- --config configs/fold0.toml
//!
//! # Force a rebuild
//! cargo run --release --bin build_dataset -- --config configs/fold0.toml --rebuild
//!
//! # Generate sample config
//! cargo run --release --bin build_dataset -- --generate-config fold0.toml
//! ```
//!
//! Logging goes through `env_logger`; set `RUST_LOG=debug` for per-subject
//! detail.

use psg_feature_extractor::manifest::SubjectSelection;
use psg_feature_extractor::materializer::{BuildOutcome, ConsoleProgress, DatasetMaterializer};
use psg_feature_extractor::{DatasetConfig, NpzRecordingLoader};
use std::sync::Arc;

/// Main entry point for the build tool
fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    match args[1].as_str() {
        "--config" => {
            if args.len() < 3 {
                eprintln!("Error: --config requires a path argument");
                std::process::exit(1);
            }
            let rebuild = args.iter().skip(3).any(|a| a == "--rebuild");
            run_from_config(&args[2], rebuild);
        }
        "--generate-config" => {
            if args.len() < 3 {
                eprintln!("Error: --generate-config requires a path argument");
                std::process::exit(1);
            }
            generate_sample_config(&args[2]);
        }
        "--help" | "-h" => {
            print_usage(&args[0]);
        }
        _ => {
            eprintln!("Unknown argument: {}", args[1]);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!(
        r#"
Sleep Staging Dataset Build Tool

Usage:
    {program} --config <path.toml> [--rebuild]   Build dataset from config file
    {program} --generate-config <path>           Generate sample config file
    {program} --help                             Show this help

Examples:
    # Build the fold 0 training set
    {program} --config configs/fold0.toml

    # Generate sample config
    {program} --generate-config configs/my_dataset.toml
"#
    );
}

/// Generate a sample configuration file
fn generate_sample_config(path: &str) {
    let mut sample = DatasetConfig::new("/path/to/recordings");
    sample.num_labels = 5;
    sample.neighbors = 4;
    sample.subjects = SubjectSelection::manifest("/path/to/folds.csv", "fold0");
    sample.loader.shuffle = false;
    sample.loader.oversample = true;

    match sample.save_toml(path) {
        Ok(()) => {
            println!("Generated sample config: {}", path);
            println!("\nEdit the following fields before running:");
            println!("  - source_dir: Directory holding the .npz recordings");
            println!("  - subjects.path / subjects.column: Fold manifest and column");
        }
        Err(e) => {
            eprintln!("Error generating config: {}", e);
            std::process::exit(1);
        }
    }
}

/// Build the dataset described by a configuration file
fn run_from_config(config_path: &str, rebuild: bool) {
    let config = match DatasetConfig::load_toml(config_path) {
        Ok(c) => {
            println!("Loaded configuration: {}", config_path);
            c
        }
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    print_config_summary(&config);

    let materializer = match DatasetMaterializer::new(config, Arc::new(NpzRecordingLoader::new()))
    {
        Ok(m) => m.with_progress_callback(Box::new(ConsoleProgress::new())),
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    println!("Store: {}", materializer.store().dir().display());

    let result = if rebuild {
        materializer.rebuild()
    } else {
        materializer.materialize()
    };

    match result {
        Ok(dataset) => {
            if dataset.outcome == BuildOutcome::Reused {
                println!("Reused existing store ({} samples)", dataset.index.info.num_samples);
            }
            match serde_json::to_string_pretty(&dataset.index.info) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("Failed to render dataset info: {}", e),
            }
        }
        Err(e) => {
            eprintln!("Build failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_config_summary(config: &DatasetConfig) {
    println!("┌─ Configuration Summary ───────────────────────────────────────┐");
    println!("│ Source:     {}", config.source_dir.display());
    println!("│ Subjects:   {:?}", config.subjects);
    println!("│ Channels:   {}", config.features.channel_names().join(", "));
    println!("│ Classes:    {}", config.num_labels);
    println!("│ Neighbors:  {}", config.neighbors);
    println!("│ Artifacts:  {}", if config.discard_artifacts { "discarded" } else { "kept" });
    if let Some(hz) = config.resample_hz {
        println!("│ Resample:   {} Hz", hz);
    }
    println!("│ Errors:     {:?}", config.processing.error_mode);
    println!("└────────────────────────────────────────────────────────────────┘");
    println!();
}
