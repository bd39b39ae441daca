#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road label placement.
//!
//! Two stages:
//!
//! - **Candidates** ([`candidate`]): computed once per tier when its data or
//!   the label toggle changes. Each named line is sampled every
//!   ~5 km with an upright angle and a class-derived priority.
//! - **Decluttering** ([`filter`]): rerun on every viewport change against
//!   the cached candidates, never against raw geometry. A greedy pass over a
//!   pixel occupancy grid keeps labels from piling onto each other.

pub mod candidate;
pub mod filter;
pub mod projection;

pub use candidate::{
    CandidateParams, LabelCandidate, candidates_for_feature, generate_candidates,
    normalize_angle, sort_by_priority,
};
pub use filter::{FilterParams, OccupancyGrid, PlacedLabel, filter_labels_for_viewport};
pub use projection::{LinearProjection, ScreenPoint, ScreenProjection, WebMercatorCamera};
