#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road tier data on disk.
//!
//! Loads the per-class `osm_<class>.geojson.gz` files the view consumes,
//! splits a full extract into those files, and builds the compact search
//! index of unique named roads.

pub mod search_index;
pub mod split;
pub mod tier_files;

pub use search_index::{SearchIndexEntry, build_search_index, write_search_index};
pub use split::{OTHERS_BUCKET, bucket_name, split_by_class, write_split};
pub use tier_files::{
    GZIP_MAGIC, decode_bytes, is_gzip, load_tier_file, load_tiers, read_collection, tier_file_name,
};

/// Errors that can occur while reading or writing tier data.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Filesystem or decompression failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON is not a `FeatureCollection`.
    #[error("Not a GeoJSON FeatureCollection: {0}")]
    NotFeatureCollection(String),
}
