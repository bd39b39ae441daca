//! Pointer interaction: hover tooltips and double-click detection.

use road_map_geometry::{FeatureRef, same_feature};
use road_map_road_models::{RoadProperties, display_fclass};
use road_map_view_models::{SearchQuery, TOOLTIP_OFFSET_PX, TooltipUpdate};

/// Click tracking state.
#[derive(Debug, Clone, Default)]
pub enum ClickState {
    /// No pending click.
    #[default]
    Idle,
    /// A feature was clicked once; a second click on it within the window
    /// activates it.
    ArmedForDoubleClick {
        /// The clicked feature.
        feature: FeatureRef,
        /// Time of the click in milliseconds.
        at_ms: u64,
    },
}

/// Detects double clicks on the same feature.
#[derive(Debug, Clone)]
pub struct DoubleClickDetector {
    window_ms: u64,
    state: ClickState,
}

impl DoubleClickDetector {
    /// Detector firing on two clicks less than `window_ms` apart.
    #[must_use]
    pub const fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            state: ClickState::Idle,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &ClickState {
        &self.state
    }

    /// Feeds a click. Returns the activated feature on a double click.
    ///
    /// Clicks on empty space leave the state untouched.
    pub fn click(&mut self, picked: Option<&FeatureRef>, now_ms: u64) -> Option<FeatureRef> {
        let feature = picked?;

        if let ClickState::ArmedForDoubleClick {
            feature: armed,
            at_ms,
        } = &self.state
            && same_feature(armed, feature)
            && now_ms.saturating_sub(*at_ms) < self.window_ms
        {
            self.state = ClickState::Idle;
            return Some(feature.clone());
        }

        self.state = ClickState::ArmedForDoubleClick {
            feature: feature.clone(),
            at_ms: now_ms,
        };
        None
    }
}

/// Tooltip text of a road: `name (class ref)`, or `None` for unnamed roads.
#[must_use]
pub fn tooltip_text(properties: &RoadProperties) -> Option<String> {
    let name = properties.name()?;
    let detail = [
        properties.fclass().map(display_fclass),
        properties.ref_.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ");

    Some(if detail.is_empty() {
        name.to_string()
    } else {
        format!("{name} ({detail})")
    })
}

/// Tooltip for a pointer at `(x, y)` over `picked`.
#[must_use]
pub fn hover(x: f64, y: f64, picked: Option<&FeatureRef>) -> TooltipUpdate {
    picked
        .and_then(|feature| tooltip_text(&feature.properties))
        .map_or(TooltipUpdate::Hide, |text| TooltipUpdate::Show {
            text,
            x: x + TOOLTIP_OFFSET_PX,
            y: y + TOOLTIP_OFFSET_PX,
        })
}

/// Search pre-filled by activating `feature`.
#[must_use]
pub fn activation_query(feature: &FeatureRef) -> SearchQuery {
    SearchQuery::for_feature(&feature.properties)
}
