//! Geographic to screen-pixel projections.

use std::f64::consts::PI;

use road_map_geometry::BBox;
use serde::{Deserialize, Serialize};

/// Latitude limit of the square Web Mercator world.
pub const MAX_MERCATOR_LAT: f64 = 85.051_129;

/// Edge of the zoom-0 world in pixels (vector-tile renderers use 512).
pub const WORLD_TILE_SIZE: f64 = 512.0;

/// A position in screen pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    /// Pixels from the left edge.
    pub x: f64,
    /// Pixels from the top edge.
    pub y: f64,
}

/// Maps longitude/latitude onto the screen of the current camera.
pub trait ScreenProjection {
    /// Screen position of a coordinate, or `None` when it cannot be
    /// projected.
    fn project(&self, lng: f64, lat: f64) -> Option<ScreenPoint>;
}

impl<P: ScreenProjection + ?Sized> ScreenProjection for &P {
    fn project(&self, lng: f64, lat: f64) -> Option<ScreenPoint> {
        (**self).project(lng, lat)
    }
}

/// Plate-carrée projection: a fixed number of pixels per degree measured
/// from the top-left corner `(west, north)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearProjection {
    /// Longitude at the left edge.
    pub west: f64,
    /// Latitude at the top edge.
    pub north: f64,
    /// Pixels per degree on both axes.
    pub pixels_per_degree: f64,
}

impl ScreenProjection for LinearProjection {
    fn project(&self, lng: f64, lat: f64) -> Option<ScreenPoint> {
        let point = ScreenPoint {
            x: (lng - self.west) * self.pixels_per_degree,
            y: (self.north - lat) * self.pixels_per_degree,
        };
        (point.x.is_finite() && point.y.is_finite()).then_some(point)
    }
}

/// A Web Mercator camera looking at `center` from `zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WebMercatorCamera {
    /// Longitude at the screen center.
    pub center_lng: f64,
    /// Latitude at the screen center.
    pub center_lat: f64,
    /// Fractional zoom level.
    pub zoom: f64,
    /// Viewport width in pixels.
    pub width_px: f64,
    /// Viewport height in pixels.
    pub height_px: f64,
}

impl WebMercatorCamera {
    /// World edge in pixels at the camera's zoom.
    #[must_use]
    pub fn world_size(&self) -> f64 {
        WORLD_TILE_SIZE * self.zoom.exp2()
    }

    /// Camera that shows `bbox` inside a `width_px` × `height_px` viewport
    /// with `padding_px` left free on each side, zoom capped at `max_zoom`.
    #[must_use]
    pub fn fit_bounds(
        bbox: &BBox,
        width_px: f64,
        height_px: f64,
        padding_px: f64,
        max_zoom: f64,
    ) -> Self {
        let (west_x, north_y) = mercator(bbox.min_lng, bbox.max_lat);
        let (east_x, south_y) = mercator(bbox.max_lng, bbox.min_lat);

        let span_x = (east_x - west_x).abs().max(f64::EPSILON);
        let span_y = (south_y - north_y).abs().max(f64::EPSILON);
        let usable_w = (2.0f64.mul_add(-padding_px, width_px)).max(1.0);
        let usable_h = (2.0f64.mul_add(-padding_px, height_px)).max(1.0);

        let scale = (usable_w / (span_x * WORLD_TILE_SIZE)).min(usable_h / (span_y * WORLD_TILE_SIZE));
        let zoom = scale.log2().min(max_zoom);

        let (center_lng, center_lat) = inverse_mercator((west_x + east_x) / 2.0, (north_y + south_y) / 2.0);

        Self {
            center_lng,
            center_lat,
            zoom,
            width_px,
            height_px,
        }
    }

    /// Geographic bounds of the visible screen rectangle.
    #[must_use]
    pub fn bounds(&self) -> BBox {
        let size = self.world_size();
        let (cx, cy) = mercator(self.center_lng, self.center_lat);
        let half_w = self.width_px / 2.0 / size;
        let half_h = self.height_px / 2.0 / size;

        let (west, north) = inverse_mercator(cx - half_w, cy - half_h);
        let (east, south) = inverse_mercator(cx + half_w, cy + half_h);
        BBox::new(west, south, east, north)
    }
}

impl ScreenProjection for WebMercatorCamera {
    fn project(&self, lng: f64, lat: f64) -> Option<ScreenPoint> {
        let size = self.world_size();
        let (x, y) = mercator(lng, lat);
        let (cx, cy) = mercator(self.center_lng, self.center_lat);

        let point = ScreenPoint {
            x: (x - cx).mul_add(size, self.width_px / 2.0),
            y: (y - cy).mul_add(size, self.height_px / 2.0),
        };
        (point.x.is_finite() && point.y.is_finite()).then_some(point)
    }
}

/// Normalized Web Mercator coordinates in `[0, 1]`, `y` growing southward.
fn mercator(lng: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = (lng + 180.0) / 360.0;
    let y = 0.5 - (PI / 4.0 + lat / 2.0).tan().ln() / (2.0 * PI);
    (x, y)
}

fn inverse_mercator(x: f64, y: f64) -> (f64, f64) {
    let lng = x.mul_add(360.0, -180.0);
    let lat = (2.0 * ((0.5 - y) * 2.0 * PI).exp().atan() - PI / 2.0).to_degrees();
    (lng, lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_projection_matches_pixel_scale() {
        let projection = LinearProjection {
            west: 138.0,
            north: 37.0,
            pixels_per_degree: 500.0,
        };
        let p = projection.project(139.5, 35.5).unwrap();
        assert!((p.x - 750.0).abs() < 1e-9);
        assert!((p.y - 750.0).abs() < 1e-9);
    }

    #[test]
    fn camera_center_projects_to_screen_center() {
        let camera = WebMercatorCamera {
            center_lng: 139.7,
            center_lat: 35.7,
            zoom: 5.0,
            width_px: 1024.0,
            height_px: 768.0,
        };
        let p = camera.project(139.7, 35.7).unwrap();
        assert!((p.x - 512.0).abs() < 1e-6);
        assert!((p.y - 384.0).abs() < 1e-6);

        let east = camera.project(140.7, 35.7).unwrap();
        assert!(east.x > p.x);
        let north = camera.project(139.7, 36.7).unwrap();
        assert!(north.y < p.y);
    }

    #[test]
    fn mercator_round_trips() {
        let (x, y) = mercator(139.7, 35.7);
        let (lng, lat) = inverse_mercator(x, y);
        assert!((lng - 139.7).abs() < 1e-9);
        assert!((lat - 35.7).abs() < 1e-9);
    }

    #[test]
    fn fit_bounds_contains_box() {
        let bbox = BBox::new(139.0, 35.0, 140.0, 36.0);
        let camera = WebMercatorCamera::fit_bounds(&bbox, 800.0, 600.0, 50.0, 18.0);
        let visible = camera.bounds();
        assert!(visible.min_lng <= bbox.min_lng && visible.max_lng >= bbox.max_lng);
        assert!(visible.min_lat <= bbox.min_lat && visible.max_lat >= bbox.max_lat);
        assert!(camera.zoom <= 18.0);
    }

    #[test]
    fn fit_bounds_caps_zoom_for_tiny_boxes() {
        let bbox = BBox::new(139.0, 35.0, 139.000_01, 35.000_01);
        let camera = WebMercatorCamera::fit_bounds(&bbox, 800.0, 600.0, 50.0, 18.0);
        assert!((camera.zoom - 18.0).abs() < f64::EPSILON);
    }
}
