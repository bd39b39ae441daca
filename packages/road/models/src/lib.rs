#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road class taxonomy, feature properties, and render styles.
//!
//! Every road feature carries a functional class (`fclass`) that drives its
//! line style, its draw order, and the priority its labels get during
//! decluttering. This crate holds those tables plus the typed property bag
//! the rest of the workspace reads instead of poking at raw JSON.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Label priority assigned to roads whose class is missing or unknown.
pub const UNKNOWN_PRIORITY: u8 = 1;

/// Functional road classification.
///
/// Variants are declared in draw order (bottom first). `Ord` follows the
/// declaration, so the most important class compares greatest.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RoadClass {
    /// Prefectural roads and other secondary routes.
    Secondary,
    /// Major regional roads.
    Primary,
    /// National highways.
    Trunk,
    /// Controlled-access expressways.
    Motorway,
}

impl RoadClass {
    /// All classes in draw order: secondary, primary, trunk, motorway.
    pub const DRAW_ORDER: [Self; 4] = [Self::Secondary, Self::Primary, Self::Trunk, Self::Motorway];

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &Self::DRAW_ORDER
    }

    /// Parses a raw `fclass` value. Returns `None` for anything outside the
    /// four known classes, including link roads such as `motorway_link`.
    #[must_use]
    pub fn from_fclass(fclass: &str) -> Option<Self> {
        fclass.parse().ok()
    }

    /// Maps a raw OSM class onto the tier that stores it.
    ///
    /// `motorway` and `motorway_link` both land in [`Self::Motorway`];
    /// anything that is neither a known class nor one of its `_` suffixed
    /// variants returns `None` (the "others" bucket).
    #[must_use]
    pub fn bucket_for(fclass: &str) -> Option<Self> {
        Self::all().iter().copied().find(|class| {
            let base = class.as_ref();
            fclass == base
                || fclass
                    .strip_prefix(base)
                    .is_some_and(|rest| rest.starts_with('_'))
        })
    }

    /// Label priority used for declutter precedence (motorway = 5 down to
    /// secondary = 2).
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Motorway => 5,
            Self::Trunk => 4,
            Self::Primary => 3,
            Self::Secondary => 2,
        }
    }

    /// Line style for this class.
    #[must_use]
    pub const fn style(self) -> RoadStyle {
        match self {
            Self::Motorway => RoadStyle::new(Rgba::opaque(220, 50, 50), 6.0),
            Self::Trunk => RoadStyle::new(Rgba::opaque(50, 100, 220), 4.0),
            Self::Primary => RoadStyle::new(Rgba::opaque(25, 90, 50), 3.0),
            Self::Secondary => RoadStyle::new(Rgba::opaque(25, 90, 50), 2.0),
        }
    }

    /// User-facing name shown in tooltips.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Motorway => "高速道路",
            Self::Trunk => "国道",
            Self::Primary => "主要地方道",
            Self::Secondary => "一般都道府県道",
        }
    }

    /// Base id of the render layer for this class (e.g. `road-motorway`).
    #[must_use]
    pub fn layer_id(self) -> String {
        format!("road-{self}")
    }
}

/// Label priority for a raw `fclass` value, falling back to
/// [`UNKNOWN_PRIORITY`] for missing or unrecognised classes.
#[must_use]
pub fn label_priority(fclass: Option<&str>) -> u8 {
    fclass
        .and_then(RoadClass::from_fclass)
        .map_or(UNKNOWN_PRIORITY, RoadClass::priority)
}

/// Tooltip display name for a raw `fclass`, falling back to the raw value.
#[must_use]
#[allow(clippy::redundant_closure_for_method_calls)]
pub fn display_fclass(fclass: &str) -> &str {
    RoadClass::from_fclass(fclass).map_or(fclass, |class| class.display_name())
}

/// An RGBA color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    /// Creates a fully opaque color.
    #[must_use]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    /// Formats the color as a CSS `rgb()` string, ignoring alpha.
    #[must_use]
    pub fn to_css(self) -> String {
        let [r, g, b, _] = self.0;
        format!("rgb({r}, {g}, {b})")
    }
}

/// Line style of a road layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadStyle {
    /// Line color.
    pub color: Rgba,
    /// Line width in pixels.
    pub width: f32,
}

impl RoadStyle {
    /// Creates a style.
    #[must_use]
    pub const fn new(color: Rgba, width: f32) -> Self {
        Self { color, width }
    }
}

/// Style used for roads outside the four known classes.
pub const DEFAULT_ROAD_STYLE: RoadStyle = RoadStyle::new(Rgba::opaque(128, 128, 128), 1.0);

/// Style of the highlight layer drawn above every tier.
pub const HIGHLIGHT_STYLE: RoadStyle = RoadStyle::new(Rgba::opaque(255, 255, 0), 8.0);

/// Style for a raw `fclass`, using [`DEFAULT_ROAD_STYLE`] when unknown.
#[must_use]
pub fn style_for(fclass: Option<&str>) -> RoadStyle {
    fclass
        .and_then(RoadClass::from_fclass)
        .map_or(DEFAULT_ROAD_STYLE, RoadClass::style)
}

/// Recognised properties of a road feature.
///
/// Empty strings are stored as `None` so that "absent" has one spelling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadProperties {
    /// Road name (e.g. "東名高速道路").
    pub name: Option<String>,
    /// Functional class as found in the data, which may be outside
    /// [`RoadClass`].
    pub fclass: Option<String>,
    /// Route reference, possibly `;`-delimited (e.g. "E1;E1A").
    #[serde(rename = "ref")]
    pub ref_: Option<String>,
}

impl RoadProperties {
    /// Builds properties, normalising empty or whitespace-only values to
    /// `None`.
    #[must_use]
    pub fn new(name: Option<String>, fclass: Option<String>, ref_: Option<String>) -> Self {
        Self {
            name: non_empty(name),
            fclass: non_empty(fclass),
            ref_: non_empty(ref_),
        }
    }

    /// Road name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Raw functional class, if any.
    #[must_use]
    pub fn fclass(&self) -> Option<&str> {
        self.fclass.as_deref()
    }

    /// Route reference, with a missing value read as the empty string.
    #[must_use]
    pub fn ref_or_empty(&self) -> &str {
        self.ref_.as_deref().unwrap_or_default()
    }

    /// Parsed road class, if the raw class is one of the known four.
    #[must_use]
    pub fn road_class(&self) -> Option<RoadClass> {
        self.fclass().and_then(RoadClass::from_fclass)
    }

    /// Individual route references from a `;`-delimited `ref`.
    pub fn ref_values(&self) -> impl Iterator<Item = &str> {
        self.ref_or_empty()
            .split(';')
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Label priority derived from the class.
    #[must_use]
    pub fn priority(&self) -> u8 {
        label_priority(self.fclass())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
