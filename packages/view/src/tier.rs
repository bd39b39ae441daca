//! Per-class feature tiers.
//!
//! A [`Tier`] bundles one road class's features with the grid index and
//! label candidates derived from them. Tiers are built whole and swapped in,
//! so the index and candidates always describe the current feature set.

use std::{
    collections::{BTreeMap, BTreeSet, btree_map::Entry},
    sync::Arc,
};

use road_map_geometry::{FeatureRef, RoadFeature};
use road_map_labels::{CandidateParams, LabelCandidate, generate_candidates, sort_by_priority};
use road_map_road_models::{RoadClass, RoadStyle};
use road_map_spatial::{GridIndex, GridSpec};

use crate::Cached;

/// One road class's data and derived caches.
#[derive(Debug, Clone)]
pub struct Tier {
    class: RoadClass,
    features: Arc<[FeatureRef]>,
    index: GridIndex,
    candidates: Arc<[LabelCandidate]>,
}

impl Tier {
    fn build(
        class: RoadClass,
        features: Arc<[FeatureRef]>,
        grid: GridSpec,
        params: Option<&CandidateParams>,
    ) -> Self {
        let index = GridIndex::build(grid, &features);
        let candidates = params
            .map(|params| generate_candidates(&features, params))
            .unwrap_or_default()
            .into();
        Self {
            class,
            features,
            index,
            candidates,
        }
    }

    /// Road class of the tier.
    #[must_use]
    pub const fn class(&self) -> RoadClass {
        self.class
    }

    /// Line style of the tier.
    #[must_use]
    pub const fn style(&self) -> RoadStyle {
        self.class.style()
    }

    /// Every ingested feature, including ones the index could not place.
    #[must_use]
    pub fn features(&self) -> &[FeatureRef] {
        &self.features
    }

    /// Grid index over [`Self::features`].
    #[must_use]
    pub const fn index(&self) -> &GridIndex {
        &self.index
    }

    /// Cached label candidates, sorted by descending priority. Empty while
    /// labels are disabled.
    #[must_use]
    pub fn candidates(&self) -> &[LabelCandidate] {
        &self.candidates
    }
}

/// Owns every tier plus the class visibility toggles.
#[derive(Debug, Clone)]
pub struct TierStore {
    grid: GridSpec,
    params: CandidateParams,
    labels_enabled: bool,
    tiers: BTreeMap<RoadClass, Tier>,
    load_order: Vec<RoadClass>,
    hidden: BTreeSet<RoadClass>,
    combined: Cached<Arc<[FeatureRef]>>,
    merged_candidates: Cached<Arc<[LabelCandidate]>>,
}

impl TierStore {
    /// Empty store. Every class starts visible.
    #[must_use]
    pub fn new(grid: GridSpec, params: CandidateParams, labels_enabled: bool) -> Self {
        Self {
            grid,
            params,
            labels_enabled,
            tiers: BTreeMap::new(),
            load_order: Vec::new(),
            hidden: BTreeSet::new(),
            combined: Cached::Stale,
            merged_candidates: Cached::Stale,
        }
    }

    /// Grid the tiers are indexed with.
    #[must_use]
    pub const fn grid(&self) -> &GridSpec {
        &self.grid
    }

    /// Replaces the data of `class`.
    ///
    /// The new tier (index and, when labels are enabled, candidates) is
    /// built before it replaces the old one. Returns the installed tier.
    pub fn ingest(&mut self, class: RoadClass, features: Vec<RoadFeature>) -> &Tier {
        let features: Arc<[FeatureRef]> = features.into_iter().map(Arc::new).collect();
        let params = self.labels_enabled.then_some(&self.params);
        let tier = Tier::build(class, features, self.grid, params);

        log::info!(
            "Loaded {class} tier: {} features, {} cells, {} label candidates",
            tier.features.len(),
            tier.index.len(),
            tier.candidates.len()
        );
        if tier.index.unindexed() > 0 {
            log::warn!(
                "{} {class} features have no usable geometry and will not be drawn",
                tier.index.unindexed()
            );
        }

        if !self.load_order.contains(&class) {
            self.load_order.push(class);
        }
        self.combined.invalidate();
        self.merged_candidates.invalidate();
        match self.tiers.entry(class) {
            Entry::Occupied(mut entry) => {
                entry.insert(tier);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(tier),
        }
    }

    /// The tier of `class`, if loaded.
    #[must_use]
    pub fn tier(&self, class: RoadClass) -> Option<&Tier> {
        self.tiers.get(&class)
    }

    /// Loaded tiers in draw order, bottom first.
    pub fn tiers(&self) -> impl Iterator<Item = &Tier> {
        RoadClass::DRAW_ORDER
            .iter()
            .filter_map(|class| self.tiers.get(class))
    }

    /// Number of loaded tiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Whether no tier is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// All features of all tiers, in the order the tiers were first loaded.
    pub fn combined(&mut self) -> Arc<[FeatureRef]> {
        let tiers = &self.tiers;
        let order = &self.load_order;
        self.combined.get_or_build(|| {
            order
                .iter()
                .filter_map(|class| tiers.get(class))
                .flat_map(|tier| tier.features.iter().cloned())
                .collect()
        })
    }

    /// Candidates of every tier merged by descending priority.
    pub fn label_candidates(&mut self) -> Arc<[LabelCandidate]> {
        let tiers = &self.tiers;
        let order = &self.load_order;
        self.merged_candidates.get_or_build(|| {
            let mut merged: Vec<LabelCandidate> = order
                .iter()
                .filter_map(|class| tiers.get(class))
                .flat_map(|tier| tier.candidates.iter().cloned())
                .collect();
            sort_by_priority(&mut merged);
            merged.into()
        })
    }

    /// Whether labels are generated.
    #[must_use]
    pub const fn labels_enabled(&self) -> bool {
        self.labels_enabled
    }

    /// Candidate sampling parameters.
    #[must_use]
    pub const fn candidate_params(&self) -> &CandidateParams {
        &self.params
    }

    /// Regenerates (enabled) or drops (disabled) every tier's candidates.
    /// Returns whether the flag changed.
    pub fn set_labels_enabled(&mut self, enabled: bool) -> bool {
        if self.labels_enabled == enabled {
            return false;
        }
        self.labels_enabled = enabled;
        for tier in self.tiers.values_mut() {
            tier.candidates = if enabled {
                generate_candidates(&tier.features, &self.params).into()
            } else {
                Arc::from([])
            };
        }
        self.merged_candidates.invalidate();
        log::debug!("Labels {}", if enabled { "enabled" } else { "disabled" });
        true
    }

    /// Shows or hides `class`. Returns whether the toggle changed.
    pub fn set_visible(&mut self, class: RoadClass, visible: bool) -> bool {
        if visible {
            self.hidden.remove(&class)
        } else {
            self.hidden.insert(class)
        }
    }

    /// Whether `class` is toggled on.
    #[must_use]
    pub fn is_visible(&self, class: RoadClass) -> bool {
        !self.hidden.contains(&class)
    }

    /// Whether a raw class string belongs to a hidden class. Unknown classes
    /// are never hidden.
    #[must_use]
    pub fn is_hidden_fclass(&self, fclass: Option<&str>) -> bool {
        fclass
            .and_then(RoadClass::bucket_for)
            .is_some_and(|class| self.hidden.contains(&class))
    }
}
