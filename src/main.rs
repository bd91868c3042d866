use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::LevelFilter;

use bial_ift_lib::config::{Config, SegmentationMethod};
use bial_ift_lib::image_io::load_image;
use bial_ift_lib::output::write_summary_json;
use bial_ift_lib::pipeline::{process_directory, process_image, SUMMARY_FILE};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "bial_ift - Image Foresting Transform segmentation")]
struct Args {
    /// Path to input file or directory
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Seed file (overwrites config)
    #[clap(short, long)]
    seeds: Option<String>,

    /// Segmentation method (overwrites config)
    #[clap(short, long)]
    method: Option<MethodArg>,

    /// Print per-image statistics and enable debug logging
    #[clap(short, long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MethodArg {
    Watershed,
    LiveWire,
    EdgeMax,
    Oriented,
}

impl From<MethodArg> for SegmentationMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Watershed => SegmentationMethod::Watershed,
            MethodArg::LiveWire => SegmentationMethod::LiveWire,
            MethodArg::EdgeMax => SegmentationMethod::EdgeMax,
            MethodArg::Oriented => SegmentationMethod::Oriented,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.debug { LevelFilter::Debug } else { LevelFilter::Info })
        .init();

    let mut config = if PathBuf::from(&args.config).exists() {
        Config::from_file(&args.config)
            .with_context(|| format!("Loading configuration from {}", args.config))?
    } else {
        log::warn!("{} not found, using default configuration", args.config);
        Config::default()
    };

    // Override config with command-line arguments
    if let Some(input) = args.input.clone() {
        config.input_path = input;
    }
    if let Some(output) = args.output.clone() {
        config.output_base_dir = output;
    }
    if let Some(seeds) = args.seeds.clone() {
        config.seeds_path = Some(seeds);
    }
    if let Some(method) = args.method {
        config.method = method.into();
    }

    config.validate().context("Invalid configuration")?;

    let start_time = Instant::now();

    let input_path = PathBuf::from(&config.input_path);
    if input_path.is_file() {
        println!("Processing single file: {}", input_path.display());
        let input_image = load_image(&input_path)
            .with_context(|| format!("Loading {}", input_path.display()))?;
        let summary = process_image(input_image, &config, args.debug)
            .with_context(|| format!("Segmenting {}", input_path.display()))?;
        write_summary_json(
            std::slice::from_ref(&summary),
            PathBuf::from(&config.output_base_dir).join(SUMMARY_FILE),
        )?;
    } else if input_path.is_dir() {
        println!("Processing directory: {}", input_path.display());
        let summaries = process_directory(&config, args.debug)?;
        println!("Segmented {} images", summaries.len());
    } else {
        bail!("Invalid input path: {}", input_path.display());
    }

    let elapsed = start_time.elapsed();
    println!("Processing completed in {:.2} seconds", elapsed.as_secs_f64());

    Ok(())
}
