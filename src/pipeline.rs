// src/pipeline.rs - Per-image segmentation pipeline and batch driver

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, error, info};
use rayon::prelude::*;

use crate::adjacency::{GridAdjacency, GridShape};
use crate::config::{Config, SegmentationMethod};
use crate::errors::{IftError, Result};
use crate::image_io::{
    complement, get_png_files_in_dir, gradient_magnitude, image_to_values, label_image,
    load_image, path_overlay, save_gray_image, save_image, value_image, InputImage,
};
use crate::output::{write_forest_csv, write_path_csv, write_summary_json, RunSummary};
use crate::seeds::{load_seeds, seed_nodes, Seed};
use crate::segmentation::{
    edge_max_regions, live_wire, oriented_watershed, watershed, watershed_from_minima, Forest,
};

/// Name of the batch summary written into the output directory
pub const SUMMARY_FILE: &str = "summary.json";

fn resolve_target(config: &Config, shape: &GridShape) -> Result<Option<usize>> {
    match config.live_wire_target {
        Some([x, y]) => shape.index(&[x, y]).map(Some).ok_or_else(|| {
            IftError::Config(format!(
                "live_wire_target [{}, {}] is outside the {:?} image",
                x,
                y,
                shape.dims()
            ))
        }),
        None => Ok(None),
    }
}

fn require_seeds<'s>(seeds: &'s Option<Vec<Seed>>, method: SegmentationMethod) -> Result<&'s [Seed]> {
    seeds.as_deref().ok_or_else(|| {
        IftError::Config(format!("method '{}' requires seeds_path", method.name()))
    })
}

/// Run the configured segmentation on one image and write its outputs
pub fn process_image(input_image: InputImage, config: &Config, debug: bool) -> Result<RunSummary> {
    let start_time = Instant::now();
    let shape = input_image.shape()?;
    let InputImage { image, path, filename } = input_image;
    let (width, height) = image.dimensions();

    let adjacency = GridAdjacency::hyperspheric(shape.clone(), config.adjacency_radius)?;
    let seeds = match &config.seeds_path {
        Some(seeds_path) => Some(load_seeds(seeds_path, &shape)?),
        None => None,
    };
    let gradient = gradient_magnitude(&image);
    debug!(
        "{}: {}x{} image, {} adjacent positions",
        path.display(),
        width,
        height,
        adjacency.offsets().len()
    );

    let mut traced_path = None;
    let forest: Forest = match config.method {
        SegmentationMethod::Watershed => match &seeds {
            Some(seeds) => watershed(&gradient, &adjacency, seeds)?,
            None => watershed_from_minima(&gradient, &adjacency)?,
        },
        SegmentationMethod::LiveWire => {
            let seeds = require_seeds(&seeds, config.method)?;
            let cost = complement(&gradient);
            let target = resolve_target(config, &shape)?;
            let wire = live_wire(&cost, &adjacency, &seed_nodes(seeds), target)?;
            if target.is_some() {
                traced_path = Some(wire.path);
            }
            wire.forest
        }
        SegmentationMethod::EdgeMax => {
            let seeds = require_seeds(&seeds, config.method)?;
            let handicap = image_to_values(&image);
            edge_max_regions(&handicap, &shape, &adjacency, &seed_nodes(seeds), config.force_root)?
        }
        SegmentationMethod::Oriented => {
            let seeds = require_seeds(&seeds, config.method)?;
            let intensity = image_to_values(&image);
            oriented_watershed(&gradient, &intensity, &adjacency, seeds, config.alpha, None)?
        }
    };

    let output_dir = Path::new(&config.output_base_dir).join(config.method.name());
    std::fs::create_dir_all(&output_dir)?;

    save_image(
        &label_image(&forest.label, width, height)?,
        output_dir.join(format!("{}_labels.png", filename)),
    )?;
    save_gray_image(
        &value_image(&forest.value, width, height)?,
        output_dir.join(format!("{}_values.png", filename)),
    )?;
    if let Some(traced) = &traced_path {
        save_image(
            &path_overlay(&image, traced),
            output_dir.join(format!("{}_path.png", filename)),
        )?;
        write_path_csv(traced, &shape, &output_dir, &filename)?;
    }
    if config.write_csv {
        write_forest_csv(&forest, &shape, &output_dir, &filename)?;
    }

    let elapsed = start_time.elapsed();
    let summary = RunSummary {
        filename: filename.clone(),
        method: config.method,
        width: width as usize,
        height: height as usize,
        seeds: seeds.as_ref().map_or(forest.stats.roots, Vec::len),
        roots: forest.stats.roots,
        removed: forest.stats.removed,
        propagations: forest.stats.propagations,
        conquered: forest.conquered(),
        regions: RunSummary::count_regions(&forest),
        path_length: traced_path.as_ref().map(Vec::len),
        elapsed_ms: elapsed.as_secs_f64() * 1000.0,
    };

    if debug {
        println!("Segmentation of {}:", filename);
        println!("  Method: {}", config.method.name());
        println!("  Roots: {}", summary.roots);
        println!("  Regions: {}", summary.regions);
        println!("  Conquered: {} of {} pixels", summary.conquered, width * height);
        if let Some(length) = summary.path_length {
            println!("  Path length: {} pixels", length);
        }
    }
    info!(
        "Processed {} in {:.2} ms ({} regions)",
        filename, summary.elapsed_ms, summary.regions
    );

    Ok(summary)
}

fn process_file(path: &Path, config: &Config, debug: bool) -> Option<RunSummary> {
    info!("Processing: {}", path.display());
    match load_image(path).and_then(|input| process_image(input, config, debug)) {
        Ok(summary) => Some(summary),
        Err(e) => {
            error!("Error processing {}: {}", path.display(), e);
            None
        }
    }
}

/// Segment every PNG under `config.input_path`, in parallel when configured.
/// Failed images are logged and skipped; the summaries of the rest are
/// written to [`SUMMARY_FILE`].
pub fn process_directory(config: &Config, debug: bool) -> Result<Vec<RunSummary>> {
    let png_files = get_png_files_in_dir(&config.input_path)?;
    info!("Found {} PNG files", png_files.len());

    let summaries: Vec<RunSummary> = if config.use_parallel {
        png_files
            .par_iter()
            .filter_map(|path| process_file(path, config, debug))
            .collect()
    } else {
        png_files
            .iter()
            .filter_map(|path| process_file(path, config, debug))
            .collect()
    };

    let summary_path = PathBuf::from(&config.output_base_dir).join(SUMMARY_FILE);
    write_summary_json(&summaries, &summary_path)?;
    info!(
        "{} of {} images segmented, summary in {}",
        summaries.len(),
        png_files.len(),
        summary_path.display()
    );

    Ok(summaries)
}
