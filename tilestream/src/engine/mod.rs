//! Frame driver.
//!
//! [`TileStreamEngine`] owns the per-frame state and runs the systems in
//! their fixed order once per [`update`](TileStreamEngine::update). It is
//! driven from a single thread; the only cross-thread traffic is fetch
//! completions and tile deliveries, both through mailboxes.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilestream::engine::TileStreamEngine;
//! use tilestream::entity::LayerKind;
//! use tilestream::executor::TokioSpawner;
//!
//! let mut engine = TileStreamEngine::new(config, service, Arc::new(TokioSpawner::current()?))?;
//! let basemap = engine.add_layer(LayerKind::Basemap);
//! engine.add_region("FR");
//!
//! let sink = engine.tile_sink();     // hand to the tile downloader
//! loop {
//!     engine.update(&viewport);      // once per animation frame
//! }
//! ```

mod sink;

pub use sink::TileSink;

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::coord::{Rect, RegionId};
use crate::entity::{LayerId, LayerKind};
use crate::error::EngineError;
use crate::executor::{Mailbox, Spawner};
use crate::provider::{FragmentProvider, FragmentService};
use crate::systems::{
    BasemapCellLoadingSystem, BasemapCellsRemovingSystem, FragmentDownloadingSystem,
    FragmentEmitSystem, FragmentUpdateSystem, FragmentsRemovingSystem, FrameContext, FrameState,
    Layer, RegionEmitSystem, System,
};
use crate::viewport::ViewportGridState;

/// The streaming engine.
pub struct TileStreamEngine {
    config: EngineConfig,
    state: FrameState,
    provider: FragmentProvider,
    tile_deliveries: Mailbox<crate::systems::TileDelivery>,
    systems: Vec<Box<dyn System>>,
    next_layer: u32,
}

impl TileStreamEngine {
    /// Build an engine fetching geometry from `service`.
    ///
    /// Fetch futures run on `spawner`.
    pub fn new(
        config: EngineConfig,
        service: Arc<dyn FragmentService>,
        spawner: Arc<dyn Spawner>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let provider = FragmentProvider::new(service, config.fragment_provider_cache_limit)?;
        let tile_deliveries = Mailbox::new();
        let size = config.tile_pixel_size as f64;

        let systems: Vec<Box<dyn System>> = vec![
            Box::new(BasemapCellsRemovingSystem::new(config.tile_cache_limit)),
            Box::new(FragmentsRemovingSystem::new(
                config.fragment_cache_limit,
                provider.clone(),
            )),
            Box::new(FragmentUpdateSystem::new()),
            Box::new(BasemapCellLoadingSystem::new(tile_deliveries.clone())),
            Box::new(FragmentDownloadingSystem::new(
                config.max_active_downloads,
                provider.clone(),
                spawner,
            )),
            Box::new(FragmentEmitSystem::new()),
            Box::new(RegionEmitSystem::new()),
        ];

        info!(
            max_active_downloads = config.max_active_downloads,
            fragment_cache_limit = config.fragment_cache_limit,
            tile_cache_limit = config.tile_cache_limit,
            "Tile stream engine created"
        );

        Ok(Self {
            state: FrameState::new(Rect::new(0.0, 0.0, size, size)),
            config,
            provider,
            tile_deliveries,
            systems,
            next_layer: 0,
        })
    }

    /// Start drawing a region. Returns false if it was already registered.
    pub fn add_region(&mut self, region_id: impl Into<RegionId>) -> bool {
        self.state.regions.insert(region_id.into())
    }

    /// Stop drawing a region; its fragments become evictable.
    pub fn remove_region(&mut self, region_id: &RegionId) -> bool {
        self.state.regions.remove(region_id)
    }

    /// Register a basemap layer. Cells are created for it from the next
    /// frame's cells to load on.
    pub fn add_layer(&mut self, kind: LayerKind) -> LayerId {
        let id = LayerId(self.next_layer);
        self.next_layer += 1;
        self.state.layers.push(Layer { id, kind });
        id
    }

    /// Handle for the external tile downloader.
    pub fn tile_sink(&self) -> TileSink {
        TileSink::new(self.tile_deliveries.clone())
    }

    /// Advance one frame.
    pub fn update(&mut self, viewport: &ViewportGridState) {
        self.state.frame += 1;
        let mut ctx = FrameContext::new(viewport, &mut self.state);
        for system in &mut self.systems {
            system.update(&mut ctx);
        }
        debug_assert!(self.state.downloading.is_disjoint(&self.state.cached));

        debug!(
            frame = self.state.frame,
            zoom = viewport.zoom(),
            cells = self.state.cells.len(),
            requested = self.state.requested.len(),
            downloading = self.state.downloading.len(),
            cached = self.state.cached.len(),
            active = self.state.active_fragments.len(),
            "Frame complete"
        );
    }

    pub fn state(&self) -> &FrameState {
        &self.state
    }

    /// Mutable access for hosts that tag entities (e.g. non-cacheable).
    pub fn state_mut(&mut self) -> &mut FrameState {
        &mut self.state
    }

    pub fn provider(&self) -> &FragmentProvider {
        &self.provider
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// System names in execution order.
    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|system| system.name()).collect()
    }
}

impl std::fmt::Debug for TileStreamEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileStreamEngine")
            .field("frame", &self.state.frame)
            .field("systems", &self.system_names())
            .finish_non_exhaustive()
    }
}
