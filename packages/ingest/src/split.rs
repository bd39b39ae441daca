//! Splitting a full road extract into per-class tier files.

use std::{collections::BTreeMap, io::Write as _, path::Path};

use flate2::{Compression, write::GzEncoder};
use road_map_road_models::RoadClass;
use serde_json::{Map, Value};

use crate::IngestError;

/// Bucket for features outside the four road classes.
pub const OTHERS_BUCKET: &str = "others";

/// Bucket name of a raw class: the road class it belongs to (links
/// included), or [`OTHERS_BUCKET`].
#[must_use]
pub fn bucket_name(fclass: Option<&str>) -> String {
    fclass
        .and_then(RoadClass::bucket_for)
        .map_or_else(|| OTHERS_BUCKET.to_string(), |class| class.to_string())
}

/// Splits a `FeatureCollection` into one collection per bucket.
///
/// Every top-level member other than `features` (`type`, `name`, `crs`, ...)
/// is copied into each output. All four class buckets and the others
/// bucket are present even when empty.
///
/// # Errors
///
/// * If `collection` has no `features` array
pub fn split_by_class(collection: &Value) -> Result<BTreeMap<String, Value>, IngestError> {
    let Some(features) = collection.get("features").and_then(Value::as_array) else {
        return Err(IngestError::NotFeatureCollection(
            "input has no features array".to_string(),
        ));
    };

    let base: Map<String, Value> = collection
        .as_object()
        .map(|object| {
            object
                .iter()
                .filter(|(key, _)| key.as_str() != "features")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default();

    let mut buckets: BTreeMap<String, Vec<Value>> = RoadClass::all()
        .iter()
        .map(ToString::to_string)
        .chain(std::iter::once(OTHERS_BUCKET.to_string()))
        .map(|name| (name, Vec::new()))
        .collect();

    for feature in features {
        let fclass = feature
            .get("properties")
            .and_then(|properties| properties.get("fclass"))
            .and_then(Value::as_str);
        buckets
            .entry(bucket_name(fclass))
            .or_default()
            .push(feature.clone());
    }

    for (name, features) in &buckets {
        log::info!("{name:12}: {:6} features", features.len());
    }
    log::info!("{:12}: {:6} features", "total", features.len());

    Ok(buckets
        .into_iter()
        .map(|(name, features)| {
            let mut object = base.clone();
            object.insert("features".to_string(), Value::Array(features));
            (name, Value::Object(object))
        })
        .collect())
}

/// Writes each bucket to `dir/osm_<bucket>.geojson.gz`.
///
/// # Errors
///
/// * If the directory or a file cannot be written
/// * If serialization fails
pub fn write_split(buckets: &BTreeMap<String, Value>, dir: &Path) -> Result<(), IngestError> {
    std::fs::create_dir_all(dir)?;

    for (name, collection) in buckets {
        let path = dir.join(format!("osm_{name}.geojson.gz"));
        let file = std::fs::File::create(&path)?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        serde_json::to_writer(&mut encoder, collection)?;
        encoder.finish()?.flush()?;
        log::debug!("Wrote {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{load_tier_file, tier_file_name};

    fn feature(fclass: Option<&str>) -> Value {
        json!({
            "type": "Feature",
            "properties": {"name": "x", "fclass": fclass},
            "geometry": {"type": "LineString", "coordinates": [[139.0, 35.0], [139.1, 35.0]]}
        })
    }

    fn count(buckets: &BTreeMap<String, Value>, name: &str) -> usize {
        buckets[name]["features"].as_array().map_or(0, Vec::len)
    }

    #[test]
    fn links_join_their_class() {
        assert_eq!(bucket_name(Some("motorway")), "motorway");
        assert_eq!(bucket_name(Some("motorway_link")), "motorway");
        assert_eq!(bucket_name(Some("trunk_link")), "trunk");
        assert_eq!(bucket_name(Some("motorways")), OTHERS_BUCKET);
        assert_eq!(bucket_name(Some("residential")), OTHERS_BUCKET);
        assert_eq!(bucket_name(None), OTHERS_BUCKET);
    }

    #[test]
    fn splits_and_keeps_foreign_members() {
        let collection = json!({
            "type": "FeatureCollection",
            "name": "osm",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:OGC:1.3:CRS84"}},
            "features": [
                feature(Some("motorway")),
                feature(Some("motorway_link")),
                feature(Some("primary")),
                feature(Some("tertiary")),
                feature(None),
            ]
        });

        let buckets = split_by_class(&collection).unwrap();
        assert_eq!(buckets.len(), 5);
        assert_eq!(count(&buckets, "motorway"), 2);
        assert_eq!(count(&buckets, "primary"), 1);
        assert_eq!(count(&buckets, "trunk"), 0);
        assert_eq!(count(&buckets, "secondary"), 0);
        assert_eq!(count(&buckets, OTHERS_BUCKET), 2);

        for collection in buckets.values() {
            assert_eq!(collection["type"], "FeatureCollection");
            assert_eq!(collection["name"], "osm");
            assert!(collection.get("crs").is_some());
        }
    }

    #[test]
    fn rejects_input_without_features() {
        assert!(split_by_class(&json!({"type": "Feature"})).is_err());
    }

    #[test]
    fn written_tiers_load_back() {
        let dir = std::env::temp_dir().join(format!("road_map_split_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let collection = json!({
            "type": "FeatureCollection",
            "features": [feature(Some("trunk")), feature(Some("trunk_link"))]
        });
        write_split(&split_by_class(&collection).unwrap(), &dir).unwrap();

        let parsed = load_tier_file(&dir.join(tier_file_name(RoadClass::Trunk))).unwrap();
        assert_eq!(parsed.features.len(), 2);
        assert!(dir.join("osm_others.geojson.gz").is_file());

        std::fs::remove_dir_all(dir).unwrap();
    }
}
