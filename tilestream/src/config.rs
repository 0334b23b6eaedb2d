//! Engine configuration.
//!
//! Cache budgets scale with the viewport: a larger screen shows more cells,
//! so more of them must stay resident for panning to feel instant. Use
//! [`EngineConfig::for_viewport`] to derive them, or set them explicitly.
//!
//! Embedding hosts can also load the configuration from JSON; missing
//! fields take their defaults.

use serde::Deserialize;
use thiserror::Error;

// =============================================================================
// Defaults
// =============================================================================

/// Default cap on concurrent fragment downloads.
pub const DEFAULT_MAX_ACTIVE_DOWNLOADS: usize = 8;

/// Default edge of a basemap tile in screen pixels.
pub const DEFAULT_TILE_PIXEL_SIZE: u32 = 256;

/// Cells kept resident per cell on screen.
pub const CACHE_FACTOR: usize = 4;

/// Default viewport the budgets are sized for when none is given.
pub const DEFAULT_VIEWPORT: (u32, u32) = (1024, 768);

/// Default number of quads held by the fragment provider cache.
pub const DEFAULT_FRAGMENT_PROVIDER_CACHE_LIMIT: usize = 10_000;

/// Errors raised while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A limit that must hold at least one item was zero.
    #[error("{field} must be greater than zero")]
    ZeroLimit { field: &'static str },

    /// The JSON document could not be parsed.
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration of the streaming engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // ==================== Downloads ====================
    /// Maximum number of fragment keys in flight at once.
    ///
    /// Default: 8.
    pub max_active_downloads: usize,

    // ==================== Budgets ====================
    /// Cacheable fragments kept beyond the ones in use.
    ///
    /// Default: derived from a 1024×768 viewport.
    pub fragment_cache_limit: usize,

    /// Off-screen basemap cells kept for quick re-display.
    ///
    /// Default: derived from a 1024×768 viewport.
    pub tile_cache_limit: usize,

    /// Quads held by the fragment provider's geometry cache.
    ///
    /// Default: 10 000.
    pub fragment_provider_cache_limit: usize,

    // ==================== Geometry ====================
    /// Edge of a basemap tile in screen pixels.
    ///
    /// Default: 256.
    pub tile_pixel_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_viewport(DEFAULT_VIEWPORT.0, DEFAULT_VIEWPORT.1)
    }
}

impl EngineConfig {
    /// Configuration with budgets sized for a `width`×`height` viewport.
    pub fn for_viewport(width: u32, height: u32) -> Self {
        let budget = Self::viewport_budget(width, height, DEFAULT_TILE_PIXEL_SIZE);
        Self {
            max_active_downloads: DEFAULT_MAX_ACTIVE_DOWNLOADS,
            fragment_cache_limit: budget,
            tile_cache_limit: budget,
            fragment_provider_cache_limit: DEFAULT_FRAGMENT_PROVIDER_CACHE_LIMIT,
            tile_pixel_size: DEFAULT_TILE_PIXEL_SIZE,
        }
    }

    /// Number of cells covering the viewport, times [`CACHE_FACTOR`].
    pub fn viewport_budget(width: u32, height: u32, tile_pixel_size: u32) -> usize {
        let tile = tile_pixel_size.max(1);
        let columns = width.div_ceil(tile) as usize;
        let rows = height.div_ceil(tile) as usize;
        columns * rows * CACHE_FACTOR
    }

    /// Parse a JSON document; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_active_downloads(mut self, limit: usize) -> Self {
        self.max_active_downloads = limit;
        self
    }

    pub fn with_fragment_cache_limit(mut self, limit: usize) -> Self {
        self.fragment_cache_limit = limit;
        self
    }

    pub fn with_tile_cache_limit(mut self, limit: usize) -> Self {
        self.tile_cache_limit = limit;
        self
    }

    pub fn with_fragment_provider_cache_limit(mut self, limit: usize) -> Self {
        self.fragment_provider_cache_limit = limit;
        self
    }

    pub fn with_tile_pixel_size(mut self, size: u32) -> Self {
        self.tile_pixel_size = size;
        self
    }

    /// Check that limits which must admit at least one item do.
    ///
    /// The two eviction budgets may be zero: nothing off-screen is kept.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_active_downloads == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "max_active_downloads",
            });
        }
        if self.fragment_provider_cache_limit == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "fragment_provider_cache_limit",
            });
        }
        if self.tile_pixel_size == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "tile_pixel_size",
            });
        }
        Ok(())
    }
}
