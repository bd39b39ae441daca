//! Walks nested coordinate structures without trusting their shape.
//!
//! Road data arrives as loosely typed JSON. These helpers pull flat
//! coordinate sequences, bounding boxes, and arc-length samples out of it,
//! returning `None` or an empty result for anything malformed.

use geo::{Coord, LineString, MultiLineString, Point};
use serde_json::Value;

use crate::{BBox, RoadFeature, RoadGeometry};

/// A vertex of a line together with the distance travelled along the line
/// to reach it, in coordinate units (degrees).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePoint {
    /// Vertex position (`x` = longitude, `y` = latitude).
    pub position: Coord<f64>,
    /// Cumulative Euclidean length from the first vertex.
    pub arc_length: f64,
}

/// Bounding box of a feature's geometry, or `None` when the geometry is
/// absent or contains no finite coordinate.
#[must_use]
pub fn bounding_box(feature: &RoadFeature) -> Option<BBox> {
    feature.geometry.as_ref().and_then(RoadGeometry::bounding_box)
}

/// Vertices of a single line annotated with cumulative arc length.
///
/// Non-finite vertices are dropped before measuring.
#[must_use]
pub fn line_points(line: &LineString<f64>) -> Vec<LinePoint> {
    let mut points: Vec<LinePoint> = Vec::with_capacity(line.0.len());

    for coord in line.coords().copied().filter(is_finite) {
        let arc_length = points.last().map_or(0.0, |prev| {
            prev.arc_length + (coord.x - prev.position.x).hypot(coord.y - prev.position.y)
        });
        points.push(LinePoint {
            position: coord,
            arc_length,
        });
    }

    points
}

/// Builds a geometry from a raw `coordinates` value using only its nesting
/// depth, ignoring whatever `type` claimed.
///
/// A bare position becomes a point, an array of positions a line, and
/// anything nested deeper a multi-line made of every position array found
/// inside it. Returns `None` when no usable position exists.
#[must_use]
pub fn geometry_from_coordinates(value: &Value) -> Option<RoadGeometry> {
    if let Some(coord) = position(value) {
        return Some(RoadGeometry::Point(Point(coord)));
    }

    let mut lines = Vec::new();
    collect_lines(value, &mut lines);

    match lines.len() {
        0 => None,
        1 => lines.pop().map(RoadGeometry::Line),
        _ => Some(RoadGeometry::MultiLine(MultiLineString::new(lines))),
    }
}

fn collect_lines(value: &Value, out: &mut Vec<LineString<f64>>) {
    let Value::Array(items) = value else {
        return;
    };

    let coords: Vec<Coord<f64>> = items.iter().filter_map(position).collect();
    if !coords.is_empty() {
        out.push(LineString::new(coords));
        return;
    }

    for item in items {
        collect_lines(item, out);
    }
}

/// Reads `[lng, lat, ...]` as a finite coordinate.
fn position(value: &Value) -> Option<Coord<f64>> {
    let Value::Array(items) = value else {
        return None;
    };
    let x = items.first()?.as_f64()?;
    let y = items.get(1)?.as_f64()?;
    let coord = Coord { x, y };
    is_finite(&coord).then_some(coord)
}

fn is_finite(coord: &Coord<f64>) -> bool {
    coord.x.is_finite() && coord.y.is_finite()
}
