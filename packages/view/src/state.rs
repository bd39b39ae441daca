//! The map view state and its event handlers.
//!
//! [`MapState`] owns every tier, the visibility toggles, the highlight, and
//! the derived render caches. Each handler updates the inputs and marks the
//! affected caches stale in the same call; [`MapState::layers`] rebuilds
//! whatever is stale.

use std::sync::Arc;

use road_map_geometry::{FeatureRef, RoadFeature};
use road_map_labels::{LabelCandidate, filter_labels_for_viewport, generate_candidates};
use road_map_road_models::RoadClass;
use road_map_spatial::{CellSet, GridSpec, sets_equal};
use road_map_view_models::{
    FitBounds, HighlightLayer, MapConfig, MapEvent, MapOutput, RenderLayer, RoadLayer,
    SearchQuery, TextLayer, TooltipUpdate, Viewport,
};

use crate::{
    Cached, DoubleClickDetector, TierStore, ViewportThrottle, activation_query, fit_bounds, hover,
    search,
};

/// Search results currently drawn above the tiers.
#[derive(Debug, Clone)]
pub struct Highlight {
    features: Arc<[FeatureRef]>,
    candidates: Arc<[LabelCandidate]>,
}

impl Highlight {
    /// Highlighted features.
    #[must_use]
    pub fn features(&self) -> &[FeatureRef] {
        &self.features
    }

    /// Label candidates of the highlighted features.
    #[must_use]
    pub fn candidates(&self) -> &[LabelCandidate] {
        &self.candidates
    }
}

/// The complete view state.
#[derive(Debug, Clone)]
pub struct MapState {
    config: MapConfig,
    tiers: TierStore,
    viewport: Option<Viewport>,
    visible_cells: CellSet,
    highlight: Option<Highlight>,
    throttle: ViewportThrottle,
    clicks: DoubleClickDetector,
    road_layers: Cached<Arc<[RoadLayer]>>,
    labels: Cached<Arc<TextLayer>>,
    road_layer_builds: usize,
}

impl MapState {
    /// Empty view configured by `config`.
    #[must_use]
    pub fn new(config: MapConfig) -> Self {
        let grid = GridSpec {
            cell_size_deg: config.grid_cell_size_deg,
            origin_lng: config.grid_origin_lng,
            origin_lat: config.grid_origin_lat,
        };
        Self {
            tiers: TierStore::new(grid, config.candidate_params(), config.labels_enabled),
            viewport: None,
            visible_cells: CellSet::new(),
            highlight: None,
            throttle: ViewportThrottle::new(config.viewport_throttle_ms),
            clicks: DoubleClickDetector::new(config.double_click_window_ms),
            road_layers: Cached::Stale,
            labels: Cached::Stale,
            road_layer_builds: 0,
            config,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &MapConfig {
        &self.config
    }

    /// The tier store.
    #[must_use]
    pub const fn tiers(&self) -> &TierStore {
        &self.tiers
    }

    /// Last applied viewport.
    #[must_use]
    pub const fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    /// Grid cells currently treated as visible.
    #[must_use]
    pub const fn visible_cells(&self) -> &CellSet {
        &self.visible_cells
    }

    /// Current highlight, if any.
    #[must_use]
    pub const fn highlight(&self) -> Option<&Highlight> {
        self.highlight.as_ref()
    }

    /// How many times the road layers have been rebuilt.
    #[must_use]
    pub const fn road_layer_builds(&self) -> usize {
        self.road_layer_builds
    }

    /// Handles one event and reports what collaborators should do.
    pub fn dispatch(&mut self, event: MapEvent) -> Vec<MapOutput> {
        match event {
            MapEvent::TierLoaded { class, features } => {
                self.ingest(class, features);
                vec![MapOutput::LayersChanged]
            }
            MapEvent::ViewportMoved { viewport, now_ms } => {
                if self.viewport_moved(viewport, now_ms) {
                    vec![MapOutput::LayersChanged]
                } else {
                    Vec::new()
                }
            }
            MapEvent::ViewportSettled { viewport } => {
                self.viewport_settled(viewport);
                vec![MapOutput::LayersChanged]
            }
            MapEvent::ClassVisibility { class, visible } => {
                if self.set_class_visible(class, visible) {
                    vec![MapOutput::LayersChanged]
                } else {
                    Vec::new()
                }
            }
            MapEvent::LabelsEnabled(enabled) => {
                if self.set_labels_enabled(enabled) {
                    vec![MapOutput::LayersChanged]
                } else {
                    Vec::new()
                }
            }
            MapEvent::Search(query) => {
                let (count, fit) = self.search(&query);
                vec![
                    MapOutput::SearchResults { count, fit },
                    MapOutput::LayersChanged,
                ]
            }
            MapEvent::ClearHighlight => {
                self.clear_highlight();
                vec![MapOutput::LayersChanged]
            }
            MapEvent::PointerMoved { x, y, picked } => {
                vec![MapOutput::Tooltip(hover(x, y, picked.as_ref()))]
            }
            MapEvent::PointerLeft => vec![MapOutput::Tooltip(TooltipUpdate::Hide)],
            MapEvent::Clicked { picked, now_ms } => self
                .click(picked.as_ref(), now_ms)
                .map(MapOutput::FeatureActivated)
                .into_iter()
                .collect(),
        }
    }

    /// Replaces the data of one tier.
    pub fn ingest(&mut self, class: RoadClass, features: Vec<RoadFeature>) {
        self.tiers.ingest(class, features);
        self.road_layers.invalidate();
        self.labels.invalidate();
    }

    /// A camera move while panning. Returns whether it was applied.
    pub fn viewport_moved(&mut self, viewport: Viewport, now_ms: u64) -> bool {
        if !self.throttle.on_move(now_ms) {
            return false;
        }
        self.apply_viewport(viewport);
        true
    }

    /// The camera came to rest. Always applied.
    pub fn viewport_settled(&mut self, viewport: Viewport) {
        self.throttle.on_move_end();
        self.apply_viewport(viewport);
    }

    /// Recomputes visible cells for `viewport`. Road layers are only marked
    /// stale when the cell set actually changed.
    pub fn apply_viewport(&mut self, viewport: Viewport) {
        let cells = self
            .tiers
            .grid()
            .cells_for_viewport(&viewport.bbox(), self.config.viewport_padding_fraction);

        if sets_equal(&cells, &self.visible_cells) {
            log::trace!("Visible cells unchanged ({} cells)", cells.len());
        } else {
            log::debug!(
                "Visible cells changed: {} -> {}",
                self.visible_cells.len(),
                cells.len()
            );
            self.visible_cells = cells;
            self.road_layers.invalidate();
        }

        self.viewport = Some(viewport);
        self.labels.invalidate();
    }

    /// Shows or hides a road class. Returns whether anything changed.
    pub fn set_class_visible(&mut self, class: RoadClass, visible: bool) -> bool {
        if !self.tiers.set_visible(class, visible) {
            return false;
        }
        self.road_layers.invalidate();
        self.labels.invalidate();
        true
    }

    /// Turns labels on or off. Returns whether anything changed.
    pub fn set_labels_enabled(&mut self, enabled: bool) -> bool {
        if !self.tiers.set_labels_enabled(enabled) {
            return false;
        }
        if let Some(highlight) = &mut self.highlight {
            highlight.candidates = highlight_candidates(&self.tiers, &highlight.features);
        }
        self.labels.invalidate();
        true
    }

    /// Runs `query` over every tier and highlights the result, or clears the
    /// highlight when nothing matches. Returns the match count and where to
    /// move the camera.
    pub fn search(&mut self, query: &SearchQuery) -> (usize, Option<FitBounds>) {
        let combined = self.tiers.combined();
        let results = search(&combined, query);
        let count = results.len();
        log::info!("Search matched {count} roads");

        if results.is_empty() {
            self.clear_highlight();
            (0, None)
        } else {
            (count, self.set_highlight(results))
        }
    }

    /// Highlights `features`, or clears the highlight when empty. Returns the
    /// camera framing of the new highlight.
    pub fn set_highlight(&mut self, features: Vec<FeatureRef>) -> Option<FitBounds> {
        if features.is_empty() {
            self.clear_highlight();
            return None;
        }

        let features: Arc<[FeatureRef]> = features.into();
        let fit = fit_bounds(
            &features,
            self.config.fit_sample_limit,
            self.config.fit_padding_deg,
        );
        self.highlight = Some(Highlight {
            candidates: highlight_candidates(&self.tiers, &features),
            features,
        });
        self.labels.invalidate();
        fit
    }

    /// Drops the highlight.
    pub fn clear_highlight(&mut self) {
        if self.highlight.take().is_some() {
            self.labels.invalidate();
        }
    }

    /// Feeds a click. Returns the search to pre-fill on a double click.
    pub fn click(&mut self, picked: Option<&FeatureRef>, now_ms: u64) -> Option<SearchQuery> {
        self.clicks
            .click(picked, now_ms)
            .map(|feature| activation_query(&feature))
    }

    /// Per-tier per-cell geometry layers for the visible cells.
    pub fn road_layers(&mut self) -> Arc<[RoadLayer]> {
        if let Some(layers) = self.road_layers.get() {
            log::trace!("Reusing {} road layers", layers.len());
            return Arc::clone(layers);
        }

        let tiers = &self.tiers;
        let visible_cells = &self.visible_cells;
        let layers: Arc<[RoadLayer]> = tiers
            .tiers()
            .flat_map(|tier| {
                let visible = tiers.is_visible(tier.class());
                tier.index()
                    .visible_cells(visible_cells)
                    .map(move |(key, features)| RoadLayer {
                        id: format!("{}-{}-{}", tier.class().layer_id(), key.col, key.row),
                        class: tier.class(),
                        style: tier.style(),
                        visible,
                        features: Arc::clone(features),
                    })
            })
            .collect();

        self.road_layer_builds += 1;
        log::debug!("Rebuilt {} road layers", layers.len());
        self.road_layers = Cached::Fresh(Arc::clone(&layers));
        layers
    }

    /// Decluttered labels for the current viewport. Empty without a viewport.
    pub fn labels(&mut self) -> Arc<TextLayer> {
        if let Some(labels) = self.labels.get() {
            return Arc::clone(labels);
        }

        let regular = self.tiers.label_candidates();
        let highlight = self
            .highlight
            .as_ref()
            .map(|h| Arc::clone(&h.candidates))
            .unwrap_or_else(|| Arc::from([]));

        let layer = Arc::new(self.viewport.as_ref().map_or_else(TextLayer::default, |viewport| {
            let tiers = &self.tiers;
            TextLayer {
                labels: filter_labels_for_viewport(
                    &highlight,
                    &regular,
                    &viewport.bbox(),
                    |fclass| tiers.is_hidden_fclass(fclass),
                    &viewport.projection,
                    &self.config.filter_params(),
                ),
            }
        }));

        self.labels = Cached::Fresh(Arc::clone(&layer));
        layer
    }

    /// The full render list, bottom to top: road layers in draw order, the
    /// highlight, then labels when enabled.
    pub fn layers(&mut self) -> Vec<RenderLayer> {
        let mut layers: Vec<RenderLayer> = self
            .road_layers()
            .iter()
            .cloned()
            .map(RenderLayer::Road)
            .collect();

        if let Some(highlight) = &self.highlight {
            layers.push(RenderLayer::Highlight(HighlightLayer::new(Arc::clone(
                &highlight.features,
            ))));
        }

        if self.tiers.labels_enabled() {
            layers.push(RenderLayer::Text(self.labels().as_ref().clone()));
        }

        layers
    }
}

fn highlight_candidates(tiers: &TierStore, features: &[FeatureRef]) -> Arc<[LabelCandidate]> {
    if tiers.labels_enabled() {
        generate_candidates(features, tiers.candidate_params()).into()
    } else {
        Arc::from([])
    }
}
