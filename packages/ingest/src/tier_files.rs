//! Reading per-class tier files.

use std::{
    io::Read as _,
    path::{Path, PathBuf},
};

use road_map_geometry::{ParsedCollection, parse_feature_collection};
use road_map_road_models::RoadClass;
use serde_json::Value;

use crate::IngestError;

/// First two bytes of every gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// File name of a tier: `osm_<class>.geojson.gz`.
#[must_use]
pub fn tier_file_name(class: RoadClass) -> String {
    format!("osm_{class}.geojson.gz")
}

/// Whether `bytes` start with the gzip magic number.
#[must_use]
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Decompresses `bytes` if they are gzip, otherwise returns them as is.
///
/// Servers sometimes decompress `.gz` files transparently, so the content is
/// sniffed rather than trusted from the file name.
///
/// # Errors
///
/// * If the gzip stream is corrupt
pub fn decode_bytes(bytes: Vec<u8>) -> Result<Vec<u8>, IngestError> {
    if !is_gzip(&bytes) {
        return Ok(bytes);
    }

    let mut decoder = flate2::read::GzDecoder::new(bytes.as_slice());
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    log::debug!(
        "Decompressed {} bytes to {}",
        bytes.len(),
        decompressed.len()
    );
    Ok(decompressed)
}

/// Reads a `GeoJSON` `FeatureCollection`, gzip or plain.
///
/// # Errors
///
/// * If the file cannot be read or decompressed
/// * If the content is not JSON
/// * If the JSON has no `features` array
pub fn read_collection(path: &Path) -> Result<Value, IngestError> {
    let bytes = decode_bytes(std::fs::read(path)?)?;
    let value: Value = serde_json::from_slice(&bytes)?;

    if !value.get("features").is_some_and(Value::is_array) {
        return Err(IngestError::NotFeatureCollection(path.display().to_string()));
    }

    Ok(value)
}

/// Reads one tier file and converts its features.
///
/// Malformed features are kept or skipped as described by
/// [`parse_feature_collection`]; only an unreadable file is an error.
///
/// # Errors
///
/// * If [`read_collection`] fails
pub fn load_tier_file(path: &Path) -> Result<ParsedCollection, IngestError> {
    let parsed = parse_feature_collection(&read_collection(path)?);
    log::info!(
        "Loaded {} features from {}",
        parsed.features.len(),
        path.display()
    );
    Ok(parsed)
}

/// Loads every tier present in `dir`, in draw order.
///
/// For each class the gzip file is preferred, falling back to the plain
/// `osm_<class>.geojson`. Missing classes are skipped with a warning.
///
/// # Errors
///
/// * If a present tier file fails to load
pub fn load_tiers(dir: &Path) -> Result<Vec<(RoadClass, ParsedCollection)>, IngestError> {
    let mut tiers = Vec::new();

    for &class in RoadClass::all() {
        let Some(path) = tier_path(dir, class) else {
            log::warn!("No tier file for {class} in {}, skipping", dir.display());
            continue;
        };
        tiers.push((class, load_tier_file(&path)?));
    }

    Ok(tiers)
}

fn tier_path(dir: &Path, class: RoadClass) -> Option<PathBuf> {
    let gz = dir.join(tier_file_name(class));
    if gz.is_file() {
        return Some(gz);
    }
    let plain = dir.join(format!("osm_{class}.geojson"));
    plain.is_file().then_some(plain)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use flate2::{Compression, write::GzEncoder};

    use super::*;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"name": "東名高速道路", "fclass": "motorway", "ref": "E1"},
             "geometry": {"type": "LineString", "coordinates": [[139.0, 35.0], [139.5, 35.0]]}},
            {"type": "Feature", "properties": {"name": "broken", "fclass": "motorway"},
             "geometry": null},
            42
        ]
    }"#;

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("road_map_ingest_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn tier_file_names_use_class() {
        assert_eq!(tier_file_name(RoadClass::Motorway), "osm_motorway.geojson.gz");
        assert_eq!(tier_file_name(RoadClass::Secondary), "osm_secondary.geojson.gz");
    }

    #[test]
    fn detects_gzip_magic() {
        assert!(is_gzip(&gzip(b"{}")));
        assert!(!is_gzip(b"{}"));
        assert!(!is_gzip(&[0x1f]));
        assert!(!is_gzip(&[]));
    }

    #[test]
    fn decodes_gzip_and_passes_plain_through() {
        assert_eq!(decode_bytes(gzip(b"hello")).unwrap(), b"hello");
        assert_eq!(decode_bytes(b"plain".to_vec()).unwrap(), b"plain");
    }

    #[test]
    fn corrupt_gzip_is_an_error() {
        let mut bytes = gzip(b"some longer payload to corrupt");
        bytes.truncate(12);
        assert!(matches!(decode_bytes(bytes), Err(IngestError::Io(_))));
    }

    #[test]
    fn loads_gzip_file_tolerating_bad_features() {
        let dir = scratch_dir("gzip");
        let path = dir.join(tier_file_name(RoadClass::Motorway));
        std::fs::write(&path, gzip(COLLECTION.as_bytes())).unwrap();

        let parsed = load_tier_file(&path).unwrap();
        assert_eq!(parsed.features.len(), 2);
        assert_eq!(parsed.missing_geometry, 1);
        assert_eq!(parsed.skipped, 1);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn rejects_non_collections() {
        let dir = scratch_dir("reject");
        let path = dir.join("bad.geojson");
        std::fs::write(&path, r#"{"type": "Feature"}"#).unwrap();
        assert!(matches!(
            read_collection(&path),
            Err(IngestError::NotFeatureCollection(_))
        ));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(read_collection(&path), Err(IngestError::Json(_))));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn load_tiers_skips_missing_and_reads_plain() {
        let dir = scratch_dir("tiers");
        std::fs::write(dir.join("osm_trunk.geojson"), COLLECTION).unwrap();
        std::fs::write(
            dir.join(tier_file_name(RoadClass::Motorway)),
            gzip(COLLECTION.as_bytes()),
        )
        .unwrap();

        let tiers = load_tiers(&dir).unwrap();
        let classes: Vec<RoadClass> = tiers.iter().map(|(class, _)| *class).collect();
        assert_eq!(classes, vec![RoadClass::Trunk, RoadClass::Motorway]);

        std::fs::remove_dir_all(dir).unwrap();
    }
}
