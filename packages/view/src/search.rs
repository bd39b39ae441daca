//! Attribute search and result framing.

use road_map_geometry::{BBox, FeatureRef};
use road_map_road_models::RoadProperties;
use road_map_view_models::{FIT_MAX_ZOOM, FIT_PADDING_PX, FitBounds, SearchQuery};

/// Whether `properties` satisfies every criterion of `query`.
///
/// Name is a substring match, class an exact match, and reference a
/// case-insensitive match against any `;`-separated value. An empty query
/// matches nothing.
#[must_use]
pub fn matches(properties: &RoadProperties, query: &SearchQuery) -> bool {
    if query.is_empty() {
        return false;
    }

    if let Some(name) = criterion(query.name.as_deref())
        && !properties.name().is_some_and(|n| n.contains(name))
    {
        return false;
    }

    if let Some(fclass) = criterion(query.fclass.as_deref())
        && properties.fclass() != Some(fclass)
    {
        return false;
    }

    if let Some(ref_) = criterion(query.ref_.as_deref()) {
        let wanted = ref_.to_lowercase();
        if !properties.ref_values().any(|v| v.to_lowercase() == wanted) {
            return false;
        }
    }

    true
}

fn criterion(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Features matching `query`, in input order.
#[must_use]
pub fn search(features: &[FeatureRef], query: &SearchQuery) -> Vec<FeatureRef> {
    if query.is_empty() {
        return Vec::new();
    }
    let results: Vec<FeatureRef> = features
        .iter()
        .filter(|feature| matches(&feature.properties, query))
        .cloned()
        .collect();
    log::debug!("Search {query:?} matched {} features", results.len());
    results
}

/// Merged bounding box of `features`, looking at no more than
/// `sample_limit` of them (evenly strided when there are more).
#[must_use]
pub fn merged_bounds(features: &[FeatureRef], sample_limit: usize) -> Option<BBox> {
    let step = features.len().div_ceil(sample_limit.max(1)).max(1);
    features
        .iter()
        .step_by(step)
        .filter_map(|feature| feature.bounding_box())
        .reduce(BBox::merge)
}

/// Camera request framing `features`, padded by `padding_deg`.
#[must_use]
pub fn fit_bounds(features: &[FeatureRef], sample_limit: usize, padding_deg: f64) -> Option<FitBounds> {
    merged_bounds(features, sample_limit).map(|bbox| FitBounds {
        bbox: bbox.expand(padding_deg, padding_deg),
        padding_px: FIT_PADDING_PX,
        max_zoom: FIT_MAX_ZOOM,
    })
}
