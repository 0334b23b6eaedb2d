//! Crate-level error type.

use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::coord::CoordError;

/// Errors raised while building or configuring the engine.
///
/// Fetch failures never appear here: they are absorbed by the downloading
/// system and retried on a later frame.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Key error: {0}")]
    Coord(#[from] CoordError),

    /// A tokio spawner was requested outside a runtime.
    #[error("No tokio runtime is running")]
    NoRuntime,
}
