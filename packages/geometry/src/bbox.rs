//! Axis-aligned longitude/latitude bounding boxes.

use geo::Coord;
use serde::{Deserialize, Serialize};

/// A longitude/latitude rectangle. Edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    /// Western edge (minimum longitude).
    pub min_lng: f64,
    /// Southern edge (minimum latitude).
    pub min_lat: f64,
    /// Eastern edge (maximum longitude).
    pub max_lng: f64,
    /// Northern edge (maximum latitude).
    pub max_lat: f64,
}

impl BBox {
    /// Creates a box from its edges.
    #[must_use]
    pub const fn new(min_lng: f64, min_lat: f64, max_lng: f64, max_lat: f64) -> Self {
        Self {
            min_lng,
            min_lat,
            max_lng,
            max_lat,
        }
    }

    /// A zero-area box around a single coordinate.
    #[must_use]
    pub const fn from_coord(coord: Coord<f64>) -> Self {
        Self::new(coord.x, coord.y, coord.x, coord.y)
    }

    /// Smallest box containing every finite coordinate, or `None` when
    /// there is none.
    pub fn from_coords(coords: impl IntoIterator<Item = Coord<f64>>) -> Option<Self> {
        coords
            .into_iter()
            .filter(|c| c.x.is_finite() && c.y.is_finite())
            .fold(None, |acc: Option<Self>, c| {
                Some(acc.map_or_else(|| Self::from_coord(c), |b| b.including(c)))
            })
    }

    /// Returns this box grown to contain `coord`.
    #[must_use]
    pub fn including(self, coord: Coord<f64>) -> Self {
        Self::new(
            self.min_lng.min(coord.x),
            self.min_lat.min(coord.y),
            self.max_lng.max(coord.x),
            self.max_lat.max(coord.y),
        )
    }

    /// Smallest box containing both boxes.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self::new(
            self.min_lng.min(other.min_lng),
            self.min_lat.min(other.min_lat),
            self.max_lng.max(other.max_lng),
            self.max_lat.max(other.max_lat),
        )
    }

    /// Returns the box grown by `lng` degrees east and west and `lat`
    /// degrees north and south.
    #[must_use]
    pub fn expand(self, lng: f64, lat: f64) -> Self {
        Self::new(
            self.min_lng - lng,
            self.min_lat - lat,
            self.max_lng + lng,
            self.max_lat + lat,
        )
    }

    /// Whether the two boxes share at least one point.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_lng <= other.max_lng
            && other.min_lng <= self.max_lng
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }

    /// Whether the point lies inside or on the edge of the box.
    #[must_use]
    pub fn contains(&self, lng: f64, lat: f64) -> bool {
        (self.min_lng..=self.max_lng).contains(&lng) && (self.min_lat..=self.max_lat).contains(&lat)
    }

    /// Box width in degrees of longitude.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_lng - self.min_lng
    }

    /// Box height in degrees of latitude.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Rounds every edge to `decimals` decimal places.
    #[must_use]
    pub fn rounded(self, decimals: i32) -> Self {
        let factor = 10f64.powi(decimals);
        let round = |v: f64| (v * factor).round() / factor;
        Self::new(
            round(self.min_lng),
            round(self.min_lat),
            round(self.max_lng),
            round(self.max_lat),
        )
    }

    /// The box as `[min_lng, min_lat, max_lng, max_lat]`.
    #[must_use]
    pub const fn to_array(self) -> [f64; 4] {
        [self.min_lng, self.min_lat, self.max_lng, self.max_lat]
    }
}
