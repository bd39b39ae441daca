//! Label candidate generation.
//!
//! Samples positions along each named line at a fixed arc-length interval,
//! with an upright text angle and a priority taken from the road class.
//! Candidates are computed once per tier and then only filtered.

use std::sync::Arc;

use road_map_geometry::{Coord, FeatureRef, LinePoint, LineString, line_points};
use serde::{Deserialize, Serialize};

/// Longitude span of the whole globe. A line needing more samples than one
/// full span would give is treated as bad data.
const WORLD_SPAN_DEG: f64 = 360.0;

/// Sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateParams {
    /// Distance between samples along a line, in degrees (0.05° ≈ 5 km).
    pub interval_deg: f64,
    /// Lines shorter than this many meters get no label.
    pub min_road_length_m: f64,
    /// Flat degrees-to-meters factor used for the length cutoff.
    pub meters_per_degree: f64,
}

impl Default for CandidateParams {
    fn default() -> Self {
        Self {
            interval_deg: 0.05,
            min_road_length_m: 100.0,
            meters_per_degree: 100_000.0,
        }
    }
}

/// A label position waiting for viewport decluttering.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelCandidate {
    /// Anchor (`x` = longitude, `y` = latitude).
    pub position: Coord<f64>,
    /// Text rotation in degrees, always within `[-90, 90]`.
    pub angle: f64,
    /// Feature the label belongs to.
    pub feature: FeatureRef,
    /// Text to draw.
    pub text: String,
    /// Higher wins during decluttering.
    pub priority: u8,
}

impl LabelCandidate {
    /// Raw class of the owning feature.
    #[must_use]
    pub fn fclass(&self) -> Option<&str> {
        self.feature.properties.fclass()
    }
}

/// Folds an angle into `[-90, 90]` so that text never renders upside down.
#[must_use]
pub fn normalize_angle(degrees: f64) -> f64 {
    let mut angle = degrees % 360.0;
    if angle > 180.0 {
        angle -= 360.0;
    } else if angle <= -180.0 {
        angle += 360.0;
    }

    if angle > 90.0 {
        angle - 180.0
    } else if angle < -90.0 {
        angle + 180.0
    } else {
        angle
    }
}

/// Candidates for one feature, in line order. Empty for unnamed features,
/// point geometries, and lines that are too short.
#[must_use]
pub fn candidates_for_feature(feature: &FeatureRef, params: &CandidateParams) -> Vec<LabelCandidate> {
    let Some(name) = feature.properties.name() else {
        return Vec::new();
    };
    let Some(geometry) = feature.geometry.as_ref() else {
        return Vec::new();
    };

    let priority = feature.properties.priority();

    geometry
        .lines()
        .flat_map(|line| sample_line(line, params))
        .map(|(position, angle)| LabelCandidate {
            position,
            angle,
            feature: Arc::clone(feature),
            text: name.to_string(),
            priority,
        })
        .collect()
}

/// Candidates for a whole feature set, highest priority first. The sort is
/// stable, so equal priorities keep feature order.
#[must_use]
pub fn generate_candidates(features: &[FeatureRef], params: &CandidateParams) -> Vec<LabelCandidate> {
    let mut candidates: Vec<LabelCandidate> = features
        .iter()
        .flat_map(|feature| candidates_for_feature(feature, params))
        .collect();
    sort_by_priority(&mut candidates);

    log::debug!(
        "Generated {} label candidates from {} features",
        candidates.len(),
        features.len()
    );

    candidates
}

/// Stable sort, highest priority first.
pub fn sort_by_priority(candidates: &mut [LabelCandidate]) {
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
}

/// Evenly spaced `(position, angle)` samples along one line.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn sample_line(line: &LineString<f64>, params: &CandidateParams) -> Vec<(Coord<f64>, f64)> {
    let points = line_points(line);
    if points.len() < 2 {
        return Vec::new();
    }

    if !points.iter().all(|p| on_globe(p.position)) {
        log::debug!("Skipping labels for a line with coordinates off the globe");
        return Vec::new();
    }

    let total = points[points.len() - 1].arc_length;
    if !total.is_finite() || total * params.meters_per_degree < params.min_road_length_m {
        return Vec::new();
    }

    let count = if params.interval_deg > 0.0 {
        let samples = (total / params.interval_deg).round();
        if samples > WORLD_SPAN_DEG / params.interval_deg {
            log::debug!("Skipping labels for a line of {total}° ({samples} samples)");
            return Vec::new();
        }
        (samples as usize).max(1)
    } else {
        1
    };

    (0..count)
        .filter_map(|i| {
            let target = total * (i as f64 + 0.5) / count as f64;
            point_at(&points, target)
        })
        .collect()
}

fn on_globe(coord: Coord<f64>) -> bool {
    (-180.0..=180.0).contains(&coord.x) && (-90.0..=90.0).contains(&coord.y)
}

/// Position and normalized angle at arc length `target`.
fn point_at(points: &[LinePoint], target: f64) -> Option<(Coord<f64>, f64)> {
    // First vertex at or beyond the target closes the containing segment.
    let end = points
        .partition_point(|p| p.arc_length < target)
        .clamp(1, points.len() - 1);

    // Skip zero-length segments so the angle comes from real direction.
    let end = (end..points.len()).find(|&i| points[i].arc_length > points[i - 1].arc_length)?;
    let (a, b) = (points[end - 1], points[end]);

    let span = b.arc_length - a.arc_length;
    let t = ((target - a.arc_length) / span).clamp(0.0, 1.0);
    let dx = b.position.x - a.position.x;
    let dy = b.position.y - a.position.y;

    let position = Coord {
        x: dx.mul_add(t, a.position.x),
        y: dy.mul_add(t, a.position.y),
    };
    Some((position, normalize_angle(dy.atan2(dx).to_degrees())))
}

#[cfg(test)]
mod tests {
    use road_map_geometry::{MultiLineString, RoadFeature, RoadGeometry};
    use road_map_road_models::RoadProperties;

    use super::*;

    fn named(name: Option<&str>, fclass: &str, coords: Vec<(f64, f64)>) -> FeatureRef {
        Arc::new(RoadFeature::line(
            RoadProperties::new(name.map(str::to_string), Some(fclass.to_string()), None),
            coords,
        ))
    }

    #[test]
    fn long_motorway_gets_several_flat_candidates() {
        let feature = named(Some("長い道路"), "motorway", vec![(139.0, 35.0), (139.5, 35.0)]);
        let candidates = candidates_for_feature(&feature, &CandidateParams::default());

        assert!(candidates.len() > 1, "got {}", candidates.len());
        for c in &candidates {
            assert_eq!(c.fclass(), Some("motorway"));
            assert_eq!(c.priority, 5);
            assert!(c.angle.abs() < 1e-9, "angle {}", c.angle);
            assert!((c.position.y - 35.0).abs() < 1e-9);
            assert!(c.position.x > 139.0 && c.position.x < 139.5);
        }
    }

    #[test]
    fn candidate_count_follows_interval() {
        let feature = named(Some("x"), "trunk", vec![(139.0, 35.0), (139.5, 35.0)]);
        // 0.5° / 0.05° = 10 samples.
        assert_eq!(
            candidates_for_feature(&feature, &CandidateParams::default()).len(),
            10
        );
    }

    #[test]
    fn projected_meter_coordinates_get_no_candidates() {
        let feature = named(
            Some("東名高速道路"),
            "motorway",
            vec![(15_470_000.0, 4_160_000.0), (15_570_000.0, 4_160_000.0)],
        );
        assert!(candidates_for_feature(&feature, &CandidateParams::default()).is_empty());
    }

    #[test]
    fn zigzag_longer_than_the_world_gets_no_candidates() {
        // 400 crossings of a 179° span stays on the globe but runs far past it.
        let coords: Vec<(f64, f64)> = (0..400)
            .map(|i| (if i % 2 == 0 { -89.5 } else { 89.5 }, 0.0))
            .collect();
        let feature = named(Some("往復"), "trunk", coords);
        assert!(candidates_for_feature(&feature, &CandidateParams::default()).is_empty());
    }

    #[test]
    fn short_line_gets_no_candidates() {
        // ~1.4 m under the flat approximation.
        let feature = named(Some("短い道路"), "secondary", vec![(139.0, 35.0), (139.000_01, 35.000_01)]);
        assert!(candidates_for_feature(&feature, &CandidateParams::default()).is_empty());
    }

    #[test]
    fn line_above_cutoff_gets_one_candidate() {
        // 0.002° ≈ 200 m, well under one interval.
        let feature = named(Some("橋"), "primary", vec![(139.0, 35.0), (139.002, 35.0)]);
        let candidates = candidates_for_feature(&feature, &CandidateParams::default());
        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].position.x - 139.001).abs() < 1e-9);
    }

    #[test]
    fn unnamed_and_degenerate_features_get_nothing() {
        let params = CandidateParams::default();
        assert!(candidates_for_feature(&named(None, "motorway", vec![(139.0, 35.0), (140.0, 35.0)]), &params).is_empty());
        assert!(candidates_for_feature(&named(Some("a"), "motorway", vec![(139.0, 35.0)]), &params).is_empty());
        assert!(candidates_for_feature(&named(Some("a"), "motorway", Vec::new()), &params).is_empty());
        assert!(
            candidates_for_feature(
                &Arc::new(RoadFeature::new(
                    RoadProperties::new(Some("a".into()), None, None),
                    None
                )),
                &params
            )
            .is_empty()
        );
    }

    #[test]
    fn angles_stay_upright() {
        let params = CandidateParams::default();
        let features = vec![
            named(Some("A"), "motorway", vec![(139.0, 35.0), (139.1, 35.2)]),
            named(Some("B"), "trunk", vec![(139.0, 35.0), (138.9, 35.1)]),
            named(Some("C"), "primary", vec![(139.0, 35.0), (139.0, 35.5)]),
            named(Some("D"), "primary", vec![(139.5, 35.0), (139.0, 35.0)]),
            named(Some("E"), "primary", vec![(139.5, 35.5), (139.0, 35.0)]),
        ];
        let candidates = generate_candidates(&features, &params);
        assert!(!candidates.is_empty());
        for c in &candidates {
            assert!((-90.0..=90.0).contains(&c.angle), "{} has angle {}", c.text, c.angle);
        }
        let westward = candidates.iter().find(|c| c.text == "D").unwrap();
        assert!(westward.angle.abs() < 1e-9);
    }

    #[test]
    fn normalize_angle_folds_into_upright_range() {
        assert!((normalize_angle(180.0) - 0.0).abs() < 1e-12);
        assert!((normalize_angle(135.0) - -45.0).abs() < 1e-12);
        assert!((normalize_angle(-135.0) - 45.0).abs() < 1e-12);
        assert!((normalize_angle(90.0) - 90.0).abs() < 1e-12);
        assert!((normalize_angle(-90.0) - -90.0).abs() < 1e-12);
        assert!((normalize_angle(450.0) - 90.0).abs() < 1e-12);
    }

    #[test]
    fn sorted_by_descending_priority() {
        let features = vec![
            named(Some("県道"), "secondary", vec![(139.0, 35.0), (139.1, 35.1)]),
            named(Some("その他"), "tertiary", vec![(139.0, 35.0), (139.1, 35.1)]),
            named(Some("高速道路"), "motorway", vec![(139.0, 35.0), (139.1, 35.1)]),
            named(Some("主要道"), "primary", vec![(139.0, 35.0), (139.1, 35.1)]),
            named(Some("国道"), "trunk", vec![(139.0, 35.0), (139.1, 35.1)]),
        ];
        let candidates = generate_candidates(&features, &CandidateParams::default());
        for pair in candidates.windows(2) {
            assert!(pair[0].priority >= pair[1].priority);
        }
        let first_of = |text: &str| candidates.iter().position(|c| c.text == text).unwrap();
        assert!(first_of("高速道路") < first_of("国道"));
        assert!(first_of("国道") < first_of("主要道"));
        assert!(first_of("主要道") < first_of("県道"));
        assert!(first_of("県道") < first_of("その他"));
    }

    #[test]
    fn multi_line_arms_are_sampled_independently() {
        let feature = Arc::new(RoadFeature::new(
            RoadProperties::new(Some("環状道路".into()), Some("primary".into()), None),
            Some(RoadGeometry::MultiLine(MultiLineString::new(vec![
                LineString::from(vec![(139.0, 35.0), (139.05, 35.05)]),
                LineString::from(vec![(139.1, 35.1), (139.15, 35.15)]),
                LineString::from(vec![(139.2, 35.2), (139.200_001, 35.2)]),
            ]))),
        ));
        let candidates = candidates_for_feature(&feature, &CandidateParams::default());
        // One per long arm, none for the stub.
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].position.x < 139.1);
        assert!(candidates[1].position.x > 139.1);
    }

    #[test]
    fn zero_length_segments_do_not_break_sampling() {
        let feature = named(
            Some("重複点"),
            "trunk",
            vec![(139.0, 35.0), (139.0, 35.0), (139.2, 35.0), (139.2, 35.0)],
        );
        let candidates = candidates_for_feature(&feature, &CandidateParams::default());
        assert_eq!(candidates.len(), 4);
        for c in &candidates {
            assert!(c.angle.abs() < 1e-9);
            assert!(c.position.x > 139.0 && c.position.x < 139.2);
        }
    }
}
