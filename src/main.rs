#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_lossless
)]

mod common;
mod io;
mod pipeline;

use crate::common::config::BufferConfig;
use crate::io::geojson::FeatureCollection;
use crate::io::groups::{collect_groups, generalize_groups};
use crate::pipeline::voronoi::QvoronoiDriver;
use anyhow::{anyhow, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

/// Collapse dense street and route networks in a GeoJSON file into single
/// labeling centerlines.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// GeoJSON FeatureCollection to generalize
    input: PathBuf,
    /// Where to write the generalized FeatureCollection
    output: PathBuf,
    /// Zoom level the output is meant for
    #[arg(short, long, default_value_t = 12)]
    zoom: u32,
    /// Line width in pixels at that zoom
    #[arg(short, long, default_value_t = 15.0)]
    width: f64,
    /// Properties that identify a route, e.g. "network,ref" for relations
    #[arg(short, long, value_delimiter = ',', default_value = "name,highway")]
    keys: Vec<String>,
    /// Output extra progress information
    #[arg(short, long)]
    verbose: bool,
    /// Output no progress information
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        log::Level::Debug
    } else if args.quiet {
        log::Level::Warn
    } else {
        log::Level::Info
    };
    simple_logger::init_with_level(level)?;

    let text = fs::read_to_string(&args.input)
        .map_err(|e| anyhow!("Failed to read {}: {}", args.input.display(), e))?;
    let collection: FeatureCollection = serde_json::from_str(&text)
        .map_err(|e| anyhow!("Failed to parse {}: {}", args.input.display(), e))?;

    let config = BufferConfig::from_zoom_width(args.zoom, args.width);
    log::info!(
        "Buffering {:.1}m for {}px lines at zoom {}",
        config.buffer,
        args.width,
        args.zoom
    );

    let groups = collect_groups(&collection, &args.keys);
    log::info!(
        "{} groups keyed on ({}) from {} features",
        groups.len(),
        args.keys.join(", "),
        collection.features.len()
    );

    let driver = QvoronoiDriver::default();
    let features = generalize_groups(&groups, &driver, &config, &args.keys);
    log::info!("Writing {} generalized features", features.len());

    let output = FeatureCollection::new(features);
    fs::write(&args.output, serde_json::to_string(&output)?)
        .map_err(|e| anyhow!("Failed to write {}: {}", args.output.display(), e))?;
    Ok(())
}
