#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road map view state.
//!
//! Ties the grid index and label engine to the interactive map: per-class
//! tiers, visibility toggles, viewport tracking, search and highlight,
//! pointer interaction, and the render-layer list. Everything runs
//! synchronously inside [`MapState::dispatch`].

pub mod cache;
pub mod interaction;
pub mod search;
pub mod state;
pub mod throttle;
pub mod tier;

pub use cache::Cached;
pub use interaction::{ClickState, DoubleClickDetector, activation_query, hover, tooltip_text};
pub use search::{fit_bounds, matches, merged_bounds, search};
pub use state::{Highlight, MapState};
pub use throttle::ViewportThrottle;
pub use tier::{Tier, TierStore};
