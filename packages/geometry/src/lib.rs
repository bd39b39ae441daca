#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road feature geometry.
//!
//! Converts raw `GeoJSON` features into [`RoadFeature`]s without ever
//! aborting on bad input, and provides the pure geometric helpers shared by
//! the grid index and the label generator: bounding boxes and arc-length
//! sampling of lines.

pub mod bbox;
pub mod feature;
pub mod scan;

pub use bbox::BBox;
pub use feature::{
    FeatureRef, ParsedCollection, RoadFeature, RoadGeometry, geometry_from_json, parse_feature,
    parse_feature_collection, properties_from_json, same_feature,
};
pub use geo::{Coord, LineString, MultiLineString};
pub use scan::{LinePoint, bounding_box, line_points};
