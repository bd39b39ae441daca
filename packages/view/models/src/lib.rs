#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the road map view.
//!
//! Holds the tunable [`MapConfig`], the [`Viewport`] handed over by the map
//! renderer, the inbound [`MapEvent`]s and outbound [`MapOutput`]s of the
//! view state machine, and the [`SearchQuery`] shape. No state lives here.

use std::{path::Path, sync::Arc};

use road_map_geometry::{BBox, FeatureRef, RoadFeature};
use road_map_labels::{
    CandidateParams, FilterParams, LinearProjection, PlacedLabel, ScreenPoint, ScreenProjection,
    WebMercatorCamera,
};
use road_map_road_models::{HIGHLIGHT_STYLE, RoadClass, RoadProperties, RoadStyle};
use serde::{Deserialize, Serialize};

/// Errors from loading or validating a [`MapConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the config file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("Invalid config value for {field}: {message}")]
    Invalid {
        /// Offending key.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Every tunable constant of the view.
///
/// Each key is optional in TOML and falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Grid cell edge in degrees.
    #[serde(default = "default_grid_cell_size")]
    pub grid_cell_size_deg: f64,
    /// Longitude of the grid origin.
    #[serde(default)]
    pub grid_origin_lng: f64,
    /// Latitude of the grid origin.
    #[serde(default)]
    pub grid_origin_lat: f64,
    /// Fraction of a cell added around the viewport before cell lookup.
    #[serde(default = "default_viewport_padding_fraction")]
    pub viewport_padding_fraction: f64,
    /// Label sampling interval along a line, in degrees (0.05° ≈ 5 km).
    #[serde(default = "default_label_interval")]
    pub label_candidate_interval_deg: f64,
    /// Lines shorter than this (meters) are not labeled.
    #[serde(default = "default_label_min_length")]
    pub label_min_road_length_m: f64,
    /// Flat degrees-to-meters factor for the length cutoff.
    #[serde(default = "default_meters_per_degree")]
    pub meters_per_degree: f64,
    /// Degrees added around the viewport before the label containment test.
    #[serde(default = "default_label_viewport_padding")]
    pub label_viewport_padding_deg: f64,
    /// Pixel edge of the label occupancy grid.
    #[serde(default = "default_label_spacing")]
    pub label_min_spacing_px: f64,
    /// Two clicks on one feature closer than this fire an activation.
    #[serde(default = "default_double_click_window")]
    pub double_click_window_ms: u64,
    /// Minimum interval between visible-cell recomputations while panning.
    #[serde(default = "default_viewport_throttle")]
    pub viewport_throttle_ms: u64,
    /// Degrees added around search results before fitting the camera.
    #[serde(default = "default_fit_padding")]
    pub fit_padding_deg: f64,
    /// Maximum features scanned when computing fit bounds.
    #[serde(default = "default_fit_sample_limit")]
    pub fit_sample_limit: usize,
    /// Whether labels are shown at startup.
    #[serde(default = "default_true")]
    pub labels_enabled: bool,
}

const fn default_grid_cell_size() -> f64 {
    2.0
}

const fn default_viewport_padding_fraction() -> f64 {
    0.1
}

const fn default_label_interval() -> f64 {
    0.05
}

const fn default_label_min_length() -> f64 {
    100.0
}

const fn default_meters_per_degree() -> f64 {
    100_000.0
}

const fn default_label_viewport_padding() -> f64 {
    0.01
}

const fn default_label_spacing() -> f64 {
    150.0
}

const fn default_double_click_window() -> u64 {
    400
}

const fn default_viewport_throttle() -> u64 {
    100
}

const fn default_fit_padding() -> f64 {
    0.01
}

const fn default_fit_sample_limit() -> usize {
    10_000
}

const fn default_true() -> bool {
    true
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            grid_cell_size_deg: default_grid_cell_size(),
            grid_origin_lng: 0.0,
            grid_origin_lat: 0.0,
            viewport_padding_fraction: default_viewport_padding_fraction(),
            label_candidate_interval_deg: default_label_interval(),
            label_min_road_length_m: default_label_min_length(),
            meters_per_degree: default_meters_per_degree(),
            label_viewport_padding_deg: default_label_viewport_padding(),
            label_min_spacing_px: default_label_spacing(),
            double_click_window_ms: default_double_click_window(),
            viewport_throttle_ms: default_viewport_throttle(),
            fit_padding_deg: default_fit_padding(),
            fit_sample_limit: default_fit_sample_limit(),
            labels_enabled: default_true(),
        }
    }
}

impl MapConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is out of range.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is malformed, or holds
    /// an out-of-range value.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Checks that every size and interval is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("grid_cell_size_deg", self.grid_cell_size_deg),
            (
                "label_candidate_interval_deg",
                self.label_candidate_interval_deg,
            ),
            ("label_min_spacing_px", self.label_min_spacing_px),
            ("meters_per_degree", self.meters_per_degree),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    message: format!("must be a positive number, got {value}"),
                });
            }
        }

        let non_negative = [
            ("viewport_padding_fraction", self.viewport_padding_fraction),
            ("label_min_road_length_m", self.label_min_road_length_m),
            ("label_viewport_padding_deg", self.label_viewport_padding_deg),
            ("fit_padding_deg", self.fit_padding_deg),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    message: format!("must be zero or positive, got {value}"),
                });
            }
        }

        if self.fit_sample_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "fit_sample_limit",
                message: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Label sampling parameters.
    #[must_use]
    pub const fn candidate_params(&self) -> CandidateParams {
        CandidateParams {
            interval_deg: self.label_candidate_interval_deg,
            min_road_length_m: self.label_min_road_length_m,
            meters_per_degree: self.meters_per_degree,
        }
    }

    /// Label declutter parameters.
    #[must_use]
    pub const fn filter_params(&self) -> FilterParams {
        FilterParams {
            viewport_padding_deg: self.label_viewport_padding_deg,
            min_spacing_px: self.label_min_spacing_px,
        }
    }
}

/// How the renderer maps coordinates to pixels for the current camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Projection {
    /// Web Mercator camera.
    WebMercator(WebMercatorCamera),
    /// Fixed pixels per degree.
    Linear(LinearProjection),
}

impl ScreenProjection for Projection {
    fn project(&self, lng: f64, lat: f64) -> Option<ScreenPoint> {
        match self {
            Self::WebMercator(camera) => camera.project(lng, lat),
            Self::Linear(linear) => linear.project(lng, lat),
        }
    }
}

/// The visible map area: geographic bounds plus the projection that places
/// them on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Western edge in degrees.
    pub west: f64,
    /// Southern edge in degrees.
    pub south: f64,
    /// Eastern edge in degrees.
    pub east: f64,
    /// Northern edge in degrees.
    pub north: f64,
    /// Screen mapping.
    pub projection: Projection,
}

impl Viewport {
    /// Viewport of a Web Mercator camera, bounds derived from the camera.
    #[must_use]
    pub fn from_camera(camera: WebMercatorCamera) -> Self {
        let bounds = camera.bounds();
        Self {
            west: bounds.min_lng,
            south: bounds.min_lat,
            east: bounds.max_lng,
            north: bounds.max_lat,
            projection: Projection::WebMercator(camera),
        }
    }

    /// Bounds as a box.
    #[must_use]
    pub const fn bbox(&self) -> BBox {
        BBox::new(self.west, self.south, self.east, self.north)
    }
}

/// A search request. Every field is optional; blank fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Substring of the road name.
    pub name: Option<String>,
    /// Exact road class.
    pub fclass: Option<String>,
    /// Route reference, compared case-insensitively per `;` value.
    #[serde(rename = "ref")]
    pub ref_: Option<String>,
}

impl SearchQuery {
    /// Builds a query, trimming each field and dropping blank ones.
    #[must_use]
    pub fn new(name: Option<&str>, fclass: Option<&str>, ref_: Option<&str>) -> Self {
        let clean = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            name: clean(name),
            fclass: clean(fclass),
            ref_: clean(ref_),
        }
    }

    /// Query pre-filled from a feature: class and reference, no name.
    #[must_use]
    pub fn for_feature(properties: &RoadProperties) -> Self {
        Self::new(None, properties.fclass(), properties.ref_.as_deref())
    }

    /// Whether no criterion is set. Empty queries match nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let blank = |value: &Option<String>| value.as_deref().is_none_or(|v| v.trim().is_empty());
        blank(&self.name) && blank(&self.fclass) && blank(&self.ref_)
    }
}

/// Camera request for framing a set of features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitBounds {
    /// Padded area to show.
    pub bbox: BBox,
    /// Screen padding in pixels.
    pub padding_px: f64,
    /// Zoom ceiling.
    pub max_zoom: f64,
}

/// Screen padding used when fitting search results.
pub const FIT_PADDING_PX: f64 = 50.0;

/// Zoom ceiling used when fitting search results.
pub const FIT_MAX_ZOOM: f64 = 18.0;

/// Pixel offset of the tooltip from the pointer.
pub const TOOLTIP_OFFSET_PX: f64 = 10.0;

/// Tooltip instruction for the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TooltipUpdate {
    /// Show `text` with its top-left corner at `(x, y)`.
    Show {
        /// Tooltip text.
        text: String,
        /// Left edge in pixels.
        x: f64,
        /// Top edge in pixels.
        y: f64,
    },
    /// Hide the tooltip.
    Hide,
}

/// Something that happened outside the view and needs handling.
#[derive(Debug, Clone)]
pub enum MapEvent {
    /// A tier's parsed features arrived. Replaces the tier's previous data.
    TierLoaded {
        /// Tier the data belongs to.
        class: RoadClass,
        /// Parsed features.
        features: Vec<RoadFeature>,
    },
    /// The camera moved and is still moving.
    ViewportMoved {
        /// New visible area.
        viewport: Viewport,
        /// Event time in milliseconds.
        now_ms: u64,
    },
    /// The camera came to rest.
    ViewportSettled {
        /// Final visible area.
        viewport: Viewport,
    },
    /// A road class checkbox was toggled.
    ClassVisibility {
        /// Class being toggled.
        class: RoadClass,
        /// New visibility.
        visible: bool,
    },
    /// The label checkbox was toggled.
    LabelsEnabled(bool),
    /// A search was submitted.
    Search(SearchQuery),
    /// The search was cleared.
    ClearHighlight,
    /// The pointer moved over the map.
    PointerMoved {
        /// Pointer x in pixels.
        x: f64,
        /// Pointer y in pixels.
        y: f64,
        /// Topmost rendered feature under the pointer.
        picked: Option<FeatureRef>,
    },
    /// The pointer left the map.
    PointerLeft,
    /// The map was clicked.
    Clicked {
        /// Topmost rendered feature under the pointer.
        picked: Option<FeatureRef>,
        /// Event time in milliseconds.
        now_ms: u64,
    },
}

/// Something the view wants its collaborators to do.
#[derive(Debug, Clone, PartialEq)]
pub enum MapOutput {
    /// Layer descriptors changed; fetch and redraw them.
    LayersChanged,
    /// Update the tooltip.
    Tooltip(TooltipUpdate),
    /// A feature was double-clicked. Carries the query to pre-fill.
    FeatureActivated(SearchQuery),
    /// A search finished.
    SearchResults {
        /// Number of matching features.
        count: usize,
        /// Where to move the camera, if anything matched.
        fit: Option<FitBounds>,
    },
}

/// Geometry of one tier inside one grid cell.
///
/// `features` is the cell's shared allocation from the grid index, so an
/// unchanged cell hands the renderer the same reference on every rebuild.
#[derive(Debug, Clone)]
pub struct RoadLayer {
    /// `road-<class>-<col>-<row>`.
    pub id: String,
    /// Tier the cell belongs to.
    pub class: RoadClass,
    /// Line style of the tier.
    pub style: RoadStyle,
    /// Whether the tier is toggled on.
    pub visible: bool,
    /// Features touching the cell.
    pub features: Arc<[FeatureRef]>,
}

/// The decluttered label set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLayer {
    /// Labels to draw, in acceptance order.
    pub labels: Vec<PlacedLabel>,
}

/// Search result geometry drawn above every tier.
#[derive(Debug, Clone)]
pub struct HighlightLayer {
    /// Highlighted features.
    pub features: Arc<[FeatureRef]>,
    /// Always [`HIGHLIGHT_STYLE`].
    pub style: RoadStyle,
}

impl HighlightLayer {
    /// Layer id used by the renderer.
    pub const ID: &'static str = "highlight";

    /// Highlight layer over `features`.
    #[must_use]
    pub const fn new(features: Arc<[FeatureRef]>) -> Self {
        Self {
            features,
            style: HIGHLIGHT_STYLE,
        }
    }
}

/// One entry of the list handed to the renderer, bottom to top.
#[derive(Debug, Clone)]
pub enum RenderLayer {
    /// Tier × cell geometry.
    Road(RoadLayer),
    /// Highlighted search results.
    Highlight(HighlightLayer),
    /// Labels.
    Text(TextLayer),
}

impl RenderLayer {
    /// Stable renderer id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Road(layer) => &layer.id,
            Self::Highlight(_) => HighlightLayer::ID,
            Self::Text(_) => "labels",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(MapConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = MapConfig::from_toml_str(
            "grid_cell_size_deg = 1.0\nlabel_min_spacing_px = 200.0\n",
        )
        .unwrap();
        assert!((config.grid_cell_size_deg - 1.0).abs() < f64::EPSILON);
        assert!((config.label_min_spacing_px - 200.0).abs() < f64::EPSILON);
        assert_eq!(config.double_click_window_ms, 400);
        assert!(config.labels_enabled);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(MapConfig::from_toml_str("").unwrap(), MapConfig::default());
    }

    #[test]
    fn rejects_non_positive_cell_size() {
        let err = MapConfig::from_toml_str("grid_cell_size_deg = 0.0").unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { field: "grid_cell_size_deg", .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            MapConfig::from_toml_str("grid_cell_size_deg = \"big\""),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn query_trims_and_drops_blanks() {
        let query = SearchQuery::new(Some("  東名 "), Some(""), Some("   "));
        assert_eq!(query.name.as_deref(), Some("東名"));
        assert_eq!(query.fclass, None);
        assert_eq!(query.ref_, None);
        assert!(!query.is_empty());
        assert!(SearchQuery::new(Some(""), Some(" "), None).is_empty());
        assert!(SearchQuery::default().is_empty());
    }

    #[test]
    fn query_for_feature_skips_name() {
        let props = RoadProperties::new(
            Some("東名高速道路".into()),
            Some("motorway".into()),
            Some("E1".into()),
        );
        let query = SearchQuery::for_feature(&props);
        assert_eq!(query.name, None);
        assert_eq!(query.fclass.as_deref(), Some("motorway"));
        assert_eq!(query.ref_.as_deref(), Some("E1"));
    }

    #[test]
    fn viewport_from_camera_matches_bounds() {
        let camera = WebMercatorCamera {
            center_lng: 139.7,
            center_lat: 35.7,
            zoom: 8.0,
            width_px: 800.0,
            height_px: 600.0,
        };
        let viewport = Viewport::from_camera(camera);
        assert_eq!(viewport.bbox(), camera.bounds());
        assert!(viewport.bbox().contains(139.7, 35.7));
    }
}
