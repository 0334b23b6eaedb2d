//! Tilestream - frame-driven streaming for interactive map tiles
//!
//! This library keeps a zoomable map drawable while its data streams in. It
//! tracks which quad-tree cells the viewport needs, fills missing tiles with
//! donor imagery from cached ancestors or descendants, fetches per-region
//! vector fragments under a concurrency cap, and evicts by relevance first
//! and recency second.
//!
//! The host calls [`engine::TileStreamEngine::update`] once per frame with
//! the current [`viewport::ViewportGridState`]. Everything else happens
//! inside the systems in [`systems`].

pub mod cache;
pub mod config;
pub mod coord;
pub mod engine;
pub mod entity;
pub mod error;
pub mod executor;
pub mod geometry;
pub mod logging;
pub mod provider;
pub mod systems;
pub mod tile;
pub mod viewport;

pub use config::EngineConfig;
pub use coord::{CellKey, FragmentKey, QuadKey, Rect, RegionId};
pub use engine::{TileSink, TileStreamEngine};
pub use error::EngineError;
pub use tile::Tile;
pub use viewport::ViewportGridState;
