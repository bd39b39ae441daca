//! Road features and their conversion from raw `GeoJSON`.

use std::sync::Arc;

use geo::{LineString, MultiLineString, Point};
use road_map_road_models::RoadProperties;
use serde_json::Value;

use crate::{BBox, scan};

/// Shared handle to an ingested feature.
///
/// Tiers, grid cells, candidates, and highlight sets all point at the same
/// allocation, so pointer equality ([`same_feature`]) is feature identity.
pub type FeatureRef = Arc<RoadFeature>;

/// Whether two handles refer to the same ingested feature.
#[must_use]
pub fn same_feature(a: &FeatureRef, b: &FeatureRef) -> bool {
    Arc::ptr_eq(a, b)
}

/// Geometry kinds a road feature may carry.
#[derive(Debug, Clone, PartialEq)]
pub enum RoadGeometry {
    /// A single position. Indexed and searchable but never labeled.
    Point(Point<f64>),
    /// One line.
    Line(LineString<f64>),
    /// Several independent lines.
    MultiLine(MultiLineString<f64>),
}

impl RoadGeometry {
    /// The constituent lines (none for a point).
    pub fn lines(&self) -> impl Iterator<Item = &LineString<f64>> {
        let lines: &[LineString<f64>] = match self {
            Self::Point(_) => &[],
            Self::Line(line) => std::slice::from_ref(line),
            Self::MultiLine(multi) => &multi.0,
        };
        lines.iter()
    }

    /// Bounding box over every finite coordinate.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BBox> {
        match self {
            Self::Point(point) => BBox::from_coords([point.0]),
            Self::Line(_) | Self::MultiLine(_) => {
                BBox::from_coords(self.lines().flat_map(|line| line.coords().copied()))
            }
        }
    }

    /// `GeoJSON` type name of this geometry.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::Line(_) => "LineString",
            Self::MultiLine(_) => "MultiLineString",
        }
    }
}

/// A road feature: optional geometry plus its recognised properties.
///
/// Immutable once ingested; a tier replaces its features wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoadFeature {
    /// Geometry, `None` when missing or unreadable.
    pub geometry: Option<RoadGeometry>,
    /// Name, class, and route reference.
    pub properties: RoadProperties,
}

impl RoadFeature {
    /// Creates a feature.
    #[must_use]
    pub const fn new(properties: RoadProperties, geometry: Option<RoadGeometry>) -> Self {
        Self {
            geometry,
            properties,
        }
    }

    /// Convenience constructor for a single-line feature.
    #[must_use]
    pub fn line(properties: RoadProperties, coords: Vec<(f64, f64)>) -> Self {
        Self::new(properties, Some(RoadGeometry::Line(LineString::from(coords))))
    }

    /// Bounding box of the geometry.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BBox> {
        scan::bounding_box(self)
    }
}

/// Outcome of converting a raw feature collection.
#[derive(Debug, Clone, Default)]
pub struct ParsedCollection {
    /// Every feature object, including those whose geometry was unreadable.
    pub features: Vec<RoadFeature>,
    /// Number of features kept without geometry.
    pub missing_geometry: usize,
    /// Number of array entries that were not feature objects at all.
    pub skipped: usize,
}

/// Converts a raw `FeatureCollection` value.
///
/// Never fails: a missing `features` array yields an empty result, and a
/// feature whose geometry cannot be read is kept with `geometry: None` so
/// it stays searchable.
#[must_use]
pub fn parse_feature_collection(value: &Value) -> ParsedCollection {
    let mut parsed = ParsedCollection::default();

    let Some(entries) = value.get("features").and_then(Value::as_array) else {
        log::warn!("Feature collection has no features array");
        return parsed;
    };

    parsed.features.reserve(entries.len());

    for entry in entries {
        let Some(feature) = parse_feature(entry) else {
            parsed.skipped += 1;
            continue;
        };
        if feature.geometry.is_none() {
            parsed.missing_geometry += 1;
        }
        parsed.features.push(feature);
    }

    if parsed.missing_geometry > 0 || parsed.skipped > 0 {
        log::debug!(
            "Parsed {} features ({} without geometry, {} skipped entries)",
            parsed.features.len(),
            parsed.missing_geometry,
            parsed.skipped
        );
    }

    parsed
}

/// Converts a single raw feature object. Returns `None` only when `value`
/// is not a JSON object.
#[must_use]
pub fn parse_feature(value: &Value) -> Option<RoadFeature> {
    let object = value.as_object()?;

    let properties = object
        .get("properties")
        .map_or_else(RoadProperties::default, properties_from_json);
    let geometry = object.get("geometry").and_then(geometry_from_json);

    Some(RoadFeature::new(properties, geometry))
}

/// Reads the recognised keys from a raw properties object. Numbers are
/// accepted and stringified (some extracts store `ref` as a number).
#[must_use]
pub fn properties_from_json(value: &Value) -> RoadProperties {
    let text = |key: &str| match value.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    RoadProperties::new(text("name"), text("fclass"), text("ref"))
}

/// Converts a raw geometry object.
///
/// Well-formed `GeoJSON` goes through the `geojson` parser. Anything it
/// rejects falls back to [`scan::geometry_from_coordinates`], which reads the
/// `coordinates` member purely by nesting depth.
#[must_use]
pub fn geometry_from_json(value: &Value) -> Option<RoadGeometry> {
    if value.is_null() {
        return None;
    }

    let typed = geojson::Geometry::from_json_value(value.clone())
        .ok()
        .and_then(|geometry| geo::Geometry::<f64>::try_from(geometry).ok());

    match typed {
        Some(geo::Geometry::Point(point)) => Some(RoadGeometry::Point(point)),
        Some(geo::Geometry::LineString(line)) => Some(RoadGeometry::Line(line)),
        Some(geo::Geometry::MultiLineString(multi)) => Some(RoadGeometry::MultiLine(multi)),
        Some(other) => {
            log::debug!("Ignoring unsupported road geometry {other:?}");
            None
        }
        None => value
            .get("coordinates")
            .and_then(scan::geometry_from_coordinates),
    }
}
