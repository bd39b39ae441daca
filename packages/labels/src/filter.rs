//! Per-viewport label decluttering.
//!
//! Picks a subset of candidates so that no two accepted labels share a
//! neighbourhood in a pixel-space occupancy grid. The pass is greedy and
//! deterministic: candidates are visited in list order (highlight first,
//! then by priority) and the first one into a neighbourhood keeps it.

use std::collections::HashSet;

use road_map_geometry::BBox;
use serde::{Deserialize, Serialize};

use crate::{LabelCandidate, ScreenPoint, ScreenProjection};

/// Declutter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Degrees added around the viewport before the containment test.
    pub viewport_padding_deg: f64,
    /// Edge of one occupancy cell in pixels.
    pub min_spacing_px: f64,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            viewport_padding_deg: 0.01,
            min_spacing_px: 150.0,
        }
    }
}

/// A candidate that survived decluttering.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLabel {
    /// The accepted candidate.
    pub candidate: LabelCandidate,
    /// Where it lands on screen.
    pub screen: ScreenPoint,
    /// Whether it came from the highlight set.
    pub highlighted: bool,
}

/// Pixel-space occupancy grid.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    cell_px: f64,
    occupied: HashSet<(i64, i64)>,
}

impl OccupancyGrid {
    /// Creates an empty grid with `cell_px` pixel cells.
    #[must_use]
    pub fn new(cell_px: f64) -> Self {
        Self {
            cell_px: if cell_px.is_finite() && cell_px > 0.0 {
                cell_px
            } else {
                1.0
            },
            occupied: HashSet::new(),
        }
    }

    /// Grid cell of a screen point.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn cell_of(&self, point: ScreenPoint) -> (i64, i64) {
        (
            (point.x / self.cell_px).floor() as i64,
            (point.y / self.cell_px).floor() as i64,
        )
    }

    /// Claims the cell of `point` unless it or any of its eight neighbours
    /// is already taken. Returns whether the claim succeeded.
    pub fn try_claim(&mut self, point: ScreenPoint) -> bool {
        let (col, row) = self.cell_of(point);
        let blocked = (-1..=1).any(|dr| {
            (-1..=1).any(|dc| self.occupied.contains(&(col + dc, row + dr)))
        });
        if !blocked {
            self.occupied.insert((col, row));
        }
        !blocked
    }

    /// Number of claimed cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    /// Whether nothing has been claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }
}

/// Selects the labels to draw for the current viewport.
///
/// `highlight` candidates are visited before `regular` ones so highlighted
/// roads win ties. Candidates whose class `is_hidden` reports as hidden,
/// that fall outside the padded `viewport`, or that cannot be projected are
/// dropped before the occupancy test.
#[must_use]
pub fn filter_labels_for_viewport(
    highlight: &[LabelCandidate],
    regular: &[LabelCandidate],
    viewport: &BBox,
    is_hidden: impl Fn(Option<&str>) -> bool,
    projection: &impl ScreenProjection,
    params: &FilterParams,
) -> Vec<PlacedLabel> {
    let bounds = viewport.expand(params.viewport_padding_deg, params.viewport_padding_deg);
    let mut grid = OccupancyGrid::new(params.min_spacing_px);

    let working = highlight
        .iter()
        .map(|c| (c, true))
        .chain(regular.iter().map(|c| (c, false)));

    let mut placed = Vec::new();
    for (candidate, highlighted) in working {
        if is_hidden(candidate.fclass()) {
            continue;
        }
        if !bounds.contains(candidate.position.x, candidate.position.y) {
            continue;
        }
        let Some(screen) = projection.project(candidate.position.x, candidate.position.y) else {
            continue;
        };
        if grid.try_claim(screen) {
            placed.push(PlacedLabel {
                candidate: candidate.clone(),
                screen,
                highlighted,
            });
        }
    }

    log::trace!(
        "Placed {} of {} label candidates",
        placed.len(),
        highlight.len() + regular.len()
    );

    placed
}
