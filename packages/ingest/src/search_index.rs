//! Compact search index of unique named roads.

use std::{collections::HashMap, path::Path};

use road_map_geometry::{BBox, RoadFeature};
use road_map_road_models::RoadClass;
use serde::{Deserialize, Serialize};

use crate::IngestError;

/// Decimal places kept in index bounding boxes.
pub const BBOX_DECIMALS: i32 = 5;

/// One unique `(name, fclass, ref)` road with the box around all of its
/// segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndexEntry {
    /// Road name.
    pub name: String,
    /// Tier the road was found in.
    pub fclass: String,
    /// Route reference, empty when absent.
    #[serde(rename = "ref")]
    pub ref_: String,
    /// `[min_lng, min_lat, max_lng, max_lat]`.
    pub bbox: [f64; 4],
}

/// Aggregates named features by `(name, tier, ref)`.
///
/// Entries come out in first-seen order. Unnamed features are ignored, as
/// are roads none of whose segments has usable geometry.
#[must_use]
pub fn build_search_index<'a>(
    tiers: impl IntoIterator<Item = (RoadClass, &'a [RoadFeature])>,
) -> Vec<SearchIndexEntry> {
    let mut order: Vec<(String, String, String)> = Vec::new();
    let mut boxes: HashMap<(String, String, String), Option<BBox>> = HashMap::new();

    for (class, features) in tiers {
        let mut named = 0_usize;
        for feature in features {
            let Some(name) = feature.properties.name() else {
                continue;
            };
            named += 1;

            let key = (
                name.to_string(),
                class.to_string(),
                feature.properties.ref_or_empty().to_string(),
            );
            let merged = boxes.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                None
            });
            if let Some(bbox) = feature.bounding_box() {
                *merged = Some((*merged).map_or(bbox, |existing| existing.merge(bbox)));
            }
        }
        log::info!("{class}: {named} features with name");
    }

    let entries: Vec<SearchIndexEntry> = order
        .into_iter()
        .filter_map(|key| {
            let bbox = boxes.get(&key).copied().flatten()?;
            let (name, fclass, ref_) = key;
            Some(SearchIndexEntry {
                name,
                fclass,
                ref_,
                bbox: bbox.rounded(BBOX_DECIMALS).to_array(),
            })
        })
        .collect();

    log::info!("Search index has {} entries", entries.len());
    entries
}

/// Writes `entries` as compact JSON.
///
/// # Errors
///
/// * If the file cannot be written
pub fn write_search_index(entries: &[SearchIndexEntry], path: &Path) -> Result<(), IngestError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(entries)?;
    std::fs::write(path, &json)?;
    log::info!(
        "Wrote {} ({} KB)",
        path.display(),
        json.len().div_ceil(1024)
    );
    Ok(())
}
