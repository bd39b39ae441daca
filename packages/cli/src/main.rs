#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line tools for the road map.
//!
//! Prepares tier data (`split`, `search-index`) and runs the view engine
//! headless (`search`, `labels`) against a directory of tier files.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use road_map_geometry::BBox;
use road_map_ingest::{
    build_search_index, load_tiers, read_collection, split_by_class, write_search_index,
    write_split,
};
use road_map_labels::WebMercatorCamera;
use road_map_view::MapState;
use road_map_view_models::{MapConfig, Projection, SearchQuery, Viewport};

/// Deepest zoom used when framing a `labels` viewport.
const LABELS_MAX_ZOOM: f64 = 22.0;

#[derive(Parser)]
#[command(name = "road_map_cli", about = "Road map data tools")]
struct Cli {
    /// TOML file overriding the default view settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a full extract into per-class `osm_<class>.geojson.gz` files
    Split {
        /// Input `GeoJSON` `FeatureCollection` (plain or gzip)
        input: PathBuf,
        /// Output directory
        out_dir: PathBuf,
    },
    /// Build the compact search index from a tier directory
    SearchIndex {
        /// Directory holding the tier files
        data_dir: PathBuf,
        /// Output JSON file
        output: PathBuf,
    },
    /// Search roads by name, class, or route reference
    Search {
        /// Directory holding the tier files
        data_dir: PathBuf,
        /// Substring of the road name
        #[arg(long)]
        name: Option<String>,
        /// Exact road class
        #[arg(long)]
        fclass: Option<String>,
        /// Route reference (case-insensitive)
        #[arg(long = "ref")]
        ref_: Option<String>,
    },
    /// Print the decluttered label set for a viewport
    Labels {
        /// Directory holding the tier files
        data_dir: PathBuf,
        /// Western edge in degrees
        #[arg(long, allow_hyphen_values = true)]
        west: f64,
        /// Southern edge in degrees
        #[arg(long, allow_hyphen_values = true)]
        south: f64,
        /// Eastern edge in degrees
        #[arg(long, allow_hyphen_values = true)]
        east: f64,
        /// Northern edge in degrees
        #[arg(long, allow_hyphen_values = true)]
        north: f64,
        /// Viewport width in pixels
        #[arg(long, default_value_t = 1280.0)]
        width: f64,
        /// Viewport height in pixels
        #[arg(long, default_value_t = 800.0)]
        height: f64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            log::info!("Using config {}", path.display());
            MapConfig::load(path)?
        }
        None => MapConfig::default(),
    };

    match cli.command {
        Commands::Split { input, out_dir } => {
            let collection = read_collection(&input)?;
            write_split(&split_by_class(&collection)?, &out_dir)?;
        }
        Commands::SearchIndex { data_dir, output } => {
            let tiers = load_tiers(&data_dir)?;
            let entries = build_search_index(
                tiers
                    .iter()
                    .map(|(class, parsed)| (*class, parsed.features.as_slice())),
            );
            write_search_index(&entries, &output)?;
            println!("{} entries written to {}", entries.len(), output.display());
        }
        Commands::Search {
            data_dir,
            name,
            fclass,
            ref_,
        } => {
            let query = SearchQuery::new(name.as_deref(), fclass.as_deref(), ref_.as_deref());
            search(config, &data_dir, &query)?;
        }
        Commands::Labels {
            data_dir,
            west,
            south,
            east,
            north,
            width,
            height,
        } => {
            labels(
                config,
                &data_dir,
                BBox::new(west, south, east, north),
                width,
                height,
            )?;
        }
    }

    Ok(())
}

fn load_state(config: MapConfig, data_dir: &Path) -> Result<MapState, Box<dyn std::error::Error>> {
    let mut state = MapState::new(config);
    for (class, parsed) in load_tiers(data_dir)? {
        state.ingest(class, parsed.features);
    }
    if state.tiers().is_empty() {
        return Err(format!("No tier files found in {}", data_dir.display()).into());
    }
    Ok(state)
}

fn search(
    config: MapConfig,
    data_dir: &Path,
    query: &SearchQuery,
) -> Result<(), Box<dyn std::error::Error>> {
    if query.is_empty() {
        println!("Empty query, nothing to search for");
        return Ok(());
    }

    let mut state = load_state(config, data_dir)?;
    let (count, fit) = state.search(query);

    if count == 0 {
        println!("No matching roads");
        return Ok(());
    }

    if let Some(highlight) = state.highlight() {
        for feature in highlight.features() {
            let properties = &feature.properties;
            println!(
                "{}\t{}\t{}",
                properties.name().unwrap_or("-"),
                properties.fclass().unwrap_or("-"),
                properties.ref_or_empty()
            );
        }
    }
    println!("{count} matching roads");
    if let Some(fit) = fit {
        let [w, s, e, n] = fit.bbox.to_array();
        println!("Bounds: {w:.5},{s:.5},{e:.5},{n:.5}");
    }

    Ok(())
}

fn labels(
    config: MapConfig,
    data_dir: &Path,
    bounds: BBox,
    width_px: f64,
    height_px: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    if !(bounds.width() > 0.0 && bounds.height() > 0.0) {
        return Err("Viewport must have west < east and south < north".into());
    }

    let mut state = load_state(config, data_dir)?;
    let camera = WebMercatorCamera::fit_bounds(&bounds, width_px, height_px, 0.0, LABELS_MAX_ZOOM);
    log::debug!("Camera {camera:?}");

    state.viewport_settled(Viewport {
        west: bounds.min_lng,
        south: bounds.min_lat,
        east: bounds.max_lng,
        north: bounds.max_lat,
        projection: Projection::WebMercator(camera),
    });

    let layer = state.labels();
    for label in &layer.labels {
        println!(
            "{}\t{}\t{:.5},{:.5}\t{:.1}°\t{:.0},{:.0}",
            label.candidate.text,
            label.candidate.fclass().unwrap_or("-"),
            label.candidate.position.x,
            label.candidate.position.y,
            label.candidate.angle,
            label.screen.x,
            label.screen.y
        );
    }
    println!("{} labels placed", layer.labels.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_with_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "road_map_cli",
            "labels",
            "data",
            "--west",
            "-74.1",
            "--south",
            "40.6",
            "--east",
            "-73.8",
            "--north",
            "40.9",
        ])
        .unwrap();
        match cli.command {
            Commands::Labels { west, width, .. } => {
                assert!((west + 74.1).abs() < f64::EPSILON);
                assert!((width - 1280.0).abs() < f64::EPSILON);
            }
            _ => panic!("expected labels command"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from([
            "road_map_cli",
            "search",
            "data",
            "--ref",
            "E1",
            "--config",
            "map.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("map.toml")));
        assert!(matches!(
            cli.command,
            Commands::Search { ref_: Some(ref r), .. } if r == "E1"
        ));
    }
}
