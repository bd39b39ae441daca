#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Uniform grid index for viewport culling.
//!
//! Partitions road features into fixed-size longitude/latitude cells so that
//! only the cells under the current viewport are handed to the renderer.
//! The index is overlap tolerant: a feature whose bounding box spans several
//! cells is referenced from every one of them.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use road_map_geometry::{BBox, FeatureRef};
use serde::{Deserialize, Serialize};

/// Default cell edge in degrees (~150–220 km at Japanese latitudes).
pub const DEFAULT_CELL_SIZE_DEG: f64 = 2.0;

/// Default fraction of a cell added around the viewport before lookup.
pub const DEFAULT_VIEWPORT_PADDING: f64 = 0.1;

/// Integer address of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellKey {
    /// Column, counted eastward from the origin.
    pub col: i64,
    /// Row, counted northward from the origin.
    pub row: i64,
}

impl CellKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(col: i64, row: i64) -> Self {
        Self { col, row }
    }
}

/// Set of cell keys. Ordered, so equality never depends on insertion order.
pub type CellSet = BTreeSet<CellKey>;

/// Whether two cell sets hold exactly the same keys.
#[must_use]
pub fn sets_equal(a: &CellSet, b: &CellSet) -> bool {
    a == b
}

/// Cell geometry: edge length and the corner of cell `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Cell edge in degrees. Must be positive.
    pub cell_size_deg: f64,
    /// Longitude of the western edge of column 0.
    pub origin_lng: f64,
    /// Latitude of the southern edge of row 0.
    pub origin_lat: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            cell_size_deg: DEFAULT_CELL_SIZE_DEG,
            origin_lng: 0.0,
            origin_lat: 0.0,
        }
    }
}

impl GridSpec {
    /// Column containing a longitude.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn col(&self, lng: f64) -> i64 {
        ((lng - self.origin_lng) / self.cell_size_deg).floor() as i64
    }

    /// Row containing a latitude.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn row(&self, lat: f64) -> i64 {
        ((lat - self.origin_lat) / self.cell_size_deg).floor() as i64
    }

    /// Key of the cell containing a position.
    #[must_use]
    pub fn cell_key(&self, lng: f64, lat: f64) -> CellKey {
        CellKey::new(self.col(lng), self.row(lat))
    }

    /// Rectangle covered by a cell. The eastern and northern edges belong to
    /// the neighbouring cells.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cell_bounds(&self, key: CellKey) -> BBox {
        let west = (key.col as f64).mul_add(self.cell_size_deg, self.origin_lng);
        let south = (key.row as f64).mul_add(self.cell_size_deg, self.origin_lat);
        BBox::new(
            west,
            south,
            west + self.cell_size_deg,
            south + self.cell_size_deg,
        )
    }

    /// Every key whose cell overlaps `bbox`, clipped to the valid
    /// longitude/latitude range so runaway coordinates cannot explode the
    /// key count.
    pub fn keys_covering(&self, bbox: &BBox) -> impl Iterator<Item = CellKey> + use<> {
        let (min_col, max_col) = (
            self.col(bbox.min_lng.max(-180.0)),
            self.col(bbox.max_lng.min(180.0)),
        );
        let (min_row, max_row) = (
            self.row(bbox.min_lat.max(-90.0)),
            self.row(bbox.max_lat.min(90.0)),
        );

        (min_row..=max_row)
            .flat_map(move |row| (min_col..=max_col).map(move |col| CellKey::new(col, row)))
    }

    /// Keys of every cell visible in `bounds` after padding each side by
    /// `padding_fraction` of a cell.
    ///
    /// Pure: identical arguments always give identical sets.
    #[must_use]
    pub fn cells_for_viewport(&self, bounds: &BBox, padding_fraction: f64) -> CellSet {
        if !self.is_valid() || !is_finite_bbox(bounds) {
            return CellSet::new();
        }
        let pad = self.cell_size_deg * padding_fraction.max(0.0);
        self.keys_covering(&bounds.expand(pad, pad)).collect()
    }

    fn is_valid(&self) -> bool {
        self.cell_size_deg.is_finite()
            && self.cell_size_deg > 0.0
            && self.origin_lng.is_finite()
            && self.origin_lat.is_finite()
    }
}

fn is_finite_bbox(bbox: &BBox) -> bool {
    bbox.to_array().iter().all(|v| v.is_finite())
}

/// Features of one cell. Shared so that a rebuilt layer list can hand the
/// renderer the very same allocation for an unchanged cell.
pub type CellFeatures = Arc<[FeatureRef]>;

/// A built grid index over one set of features.
#[derive(Debug, Clone, Default)]
pub struct GridIndex {
    spec: GridSpec,
    cells: BTreeMap<CellKey, CellFeatures>,
    unindexed: usize,
}

impl GridIndex {
    /// Indexes `features` under every cell their bounding box touches.
    ///
    /// Features without a valid bounding box, or whose box lies entirely
    /// off the globe, are left out of the index and counted in
    /// [`Self::unindexed`].
    #[must_use]
    pub fn build(spec: GridSpec, features: &[FeatureRef]) -> Self {
        let mut cells: BTreeMap<CellKey, Vec<FeatureRef>> = BTreeMap::new();
        let mut unindexed = 0;

        if !spec.is_valid() {
            log::warn!("Invalid grid spec {spec:?}, index left empty");
            return Self {
                spec,
                cells: BTreeMap::new(),
                unindexed: features.len(),
            };
        }

        for feature in features {
            let Some(bbox) = feature.bounding_box() else {
                unindexed += 1;
                continue;
            };
            let mut placed = false;
            for key in spec.keys_covering(&bbox) {
                cells.entry(key).or_default().push(Arc::clone(feature));
                placed = true;
            }
            if !placed {
                unindexed += 1;
            }
        }

        log::debug!(
            "Built grid index: {} features in {} cells ({} unindexed)",
            features.len() - unindexed,
            cells.len(),
            unindexed
        );

        Self {
            spec,
            cells: cells
                .into_iter()
                .map(|(key, list)| (key, CellFeatures::from(list)))
                .collect(),
            unindexed,
        }
    }

    /// Cell geometry the index was built with.
    #[must_use]
    pub const fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Features of one cell, if any feature touches it.
    #[must_use]
    pub fn cell(&self, key: CellKey) -> Option<&CellFeatures> {
        self.cells.get(&key)
    }

    /// All non-empty cells in key order.
    pub fn cells(&self) -> impl Iterator<Item = (CellKey, &CellFeatures)> {
        self.cells.iter().map(|(key, features)| (*key, features))
    }

    /// Non-empty cells among `visible`, in key order.
    pub fn visible_cells<'a>(
        &'a self,
        visible: &'a CellSet,
    ) -> impl Iterator<Item = (CellKey, &'a CellFeatures)> + 'a {
        visible
            .iter()
            .filter_map(|key| self.cells.get(key).map(|features| (*key, features)))
    }

    /// Keys of every non-empty cell.
    #[must_use]
    pub fn keys(&self) -> CellSet {
        self.cells.keys().copied().collect()
    }

    /// Number of non-empty cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether no feature was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of features skipped for lack of a bounding box.
    #[must_use]
    pub const fn unindexed(&self) -> usize {
        self.unindexed
    }
}

#[cfg(test)]
mod tests {
    use road_map_geometry::RoadFeature;
    use road_map_road_models::RoadProperties;

    use super::*;

    fn line(coords: Vec<(f64, f64)>) -> FeatureRef {
        Arc::new(RoadFeature::line(RoadProperties::default(), coords))
    }

    fn contains(index: &GridIndex, key: CellKey, feature: &FeatureRef) -> bool {
        index
            .cell(key)
            .is_some_and(|list| list.iter().any(|f| Arc::ptr_eq(f, feature)))
    }

    #[test]
    fn cell_key_uses_floor() {
        let spec = GridSpec::default();
        assert_eq!(spec.cell_key(139.7, 35.7), CellKey::new(69, 17));
        assert_eq!(spec.cell_key(-0.5, -0.5), CellKey::new(-1, -1));
        assert_eq!(spec.cell_key(2.0, 0.0), CellKey::new(1, 0));
    }

    #[test]
    fn spanning_feature_appears_in_every_touched_cell() {
        let spec = GridSpec::default();
        let feature = line(vec![(139.0, 35.0), (141.5, 36.5)]);
        let index = GridIndex::build(spec, std::slice::from_ref(&feature));

        let expected: CellSet = [
            CellKey::new(69, 17),
            CellKey::new(70, 17),
            CellKey::new(69, 18),
            CellKey::new(70, 18),
        ]
        .into_iter()
        .collect();

        assert!(sets_equal(&index.keys(), &expected), "got {:?}", index.keys());
        for key in &expected {
            assert!(contains(&index, *key, &feature), "missing from {key:?}");
        }
    }

    #[test]
    fn coverage_matches_bbox_intersection_exactly() {
        let spec = GridSpec {
            cell_size_deg: 0.5,
            origin_lng: 0.25,
            origin_lat: -0.1,
        };
        let features = vec![
            line(vec![(139.0, 35.0), (139.2, 35.8)]),
            line(vec![(140.26, 34.0), (138.1, 34.3), (139.9, 33.7)]),
            line(vec![(135.0, 34.7), (135.0, 34.7)]),
        ];
        let index = GridIndex::build(spec, &features);

        for feature in &features {
            let bbox = feature.bounding_box().unwrap();
            for row in spec.row(bbox.min_lat) - 2..=spec.row(bbox.max_lat) + 2 {
                for col in spec.col(bbox.min_lng) - 2..=spec.col(bbox.max_lng) + 2 {
                    let key = CellKey::new(col, row);
                    let cell = spec.cell_bounds(key);
                    let overlaps = bbox.min_lng < cell.max_lng
                        && cell.min_lng <= bbox.max_lng
                        && bbox.min_lat < cell.max_lat
                        && cell.min_lat <= bbox.max_lat;
                    assert_eq!(
                        contains(&index, key, feature),
                        overlaps,
                        "feature {bbox:?} vs cell {key:?} ({cell:?})"
                    );
                }
            }
        }
    }

    #[test]
    fn features_without_bbox_are_not_indexed() {
        let features = vec![
            Arc::new(RoadFeature::default()),
            line(Vec::new()),
            line(vec![(139.0, 35.0), (139.1, 35.1)]),
        ];
        let index = GridIndex::build(GridSpec::default(), &features);
        assert_eq!(index.unindexed(), 2);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn features_off_the_globe_count_as_unindexed() {
        let features = vec![
            line(vec![(15_470_000.0, 4_160_000.0), (15_570_000.0, 4_160_000.0)]),
            line(vec![(-500.0, -200.0), (-400.0, -100.0)]),
            line(vec![(139.0, 35.0), (139.1, 35.1)]),
        ];
        let index = GridIndex::build(GridSpec::default(), &features);
        assert_eq!(index.unindexed(), 2);
        assert_eq!(index.len(), 1);
        assert!(contains(&index, CellKey::new(69, 17), &features[2]));
    }

    #[test]
    fn viewport_lookup_pads_by_cell_fraction() {
        let spec = GridSpec::default();
        // 0.1 * 2° = 0.2° of padding pushes 139.9 over the 140° edge.
        let cells = spec.cells_for_viewport(&BBox::new(138.5, 34.5, 139.9, 35.5), 0.1);
        assert!(cells.contains(&CellKey::new(70, 17)));
        assert!(cells.contains(&CellKey::new(69, 17)));

        let unpadded = spec.cells_for_viewport(&BBox::new(138.5, 34.5, 139.9, 35.5), 0.0);
        assert!(!unpadded.contains(&CellKey::new(70, 17)));
    }

    #[test]
    fn viewport_lookup_is_idempotent() {
        let spec = GridSpec::default();
        let bounds = BBox::new(135.3, 33.1, 141.9, 37.2);
        let a = spec.cells_for_viewport(&bounds, 0.1);
        let b = spec.cells_for_viewport(&bounds, 0.1);
        assert!(sets_equal(&a, &b));
        assert!(sets_equal(&b, &a));
        assert!(sets_equal(&a, &a));
    }

    #[test]
    fn sets_equal_ignores_insertion_order() {
        let a: CellSet = [CellKey::new(1, 2), CellKey::new(3, 4)].into_iter().collect();
        let b: CellSet = [CellKey::new(3, 4), CellKey::new(1, 2)].into_iter().collect();
        let c: CellSet = [CellKey::new(3, 4)].into_iter().collect();
        assert!(sets_equal(&a, &b));
        assert!(!sets_equal(&a, &c));
        assert!(!sets_equal(&c, &a));
    }

    #[test]
    fn non_finite_viewport_yields_nothing() {
        let spec = GridSpec::default();
        assert!(
            spec.cells_for_viewport(&BBox::new(f64::NAN, 0.0, 1.0, 1.0), 0.1)
                .is_empty()
        );
    }

    #[test]
    fn visible_cells_skips_empty_keys() {
        let spec = GridSpec::default();
        let feature = line(vec![(139.0, 35.0), (139.1, 35.1)]);
        let index = GridIndex::build(spec, &[feature]);
        let visible = spec.cells_for_viewport(&BBox::new(130.0, 30.0, 145.0, 40.0), 0.1);
        let hits: Vec<CellKey> = index.visible_cells(&visible).map(|(key, _)| key).collect();
        assert_eq!(hits, vec![CellKey::new(69, 17)]);
    }
}
