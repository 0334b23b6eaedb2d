//! Fetch seam types.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::cache::FragmentData;
use crate::coord::{FragmentKey, QuadKey, RegionId};
use crate::geometry::MultiPolygon;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Quads wanted per region.
pub type FragmentRequest = HashMap<RegionId, HashSet<QuadKey>>;

/// Geometry returned per region. Only quads that have geometry are listed;
/// absence is not an error.
pub type FragmentResponse = HashMap<RegionId, Vec<(QuadKey, MultiPolygon)>>;

/// Transient failures of a fragment fetch.
///
/// Never fatal: the downloading system logs them and lets the keys be
/// requested again on a later frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request never reached the service or the response was lost.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with an error.
    #[error("Service error: {0}")]
    Service(String),

    /// The request was dropped before completing.
    #[error("Fetch cancelled")]
    Cancelled,
}

/// The external geometry service.
///
/// Implementations perform the actual network fetch and decode. The
/// returned future must not borrow `self`, since the engine spawns it.
///
/// # Dyn Compatibility
///
/// Uses [`BoxFuture`] so the engine can hold an `Arc<dyn FragmentService>`.
pub trait FragmentService: Send + Sync {
    /// Fetch geometry for `request`.
    ///
    /// `region_ids` lists the regions of `request` in a stable order.
    fn fetch_fragments(
        &self,
        region_ids: Vec<RegionId>,
        request: FragmentRequest,
    ) -> BoxFuture<'static, Result<FragmentResponse, FetchError>>;
}

/// One fragment as answered by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub key: FragmentKey,
    pub data: FragmentData,
}

impl Fragment {
    pub fn new(key: FragmentKey, data: FragmentData) -> Self {
        Self { key, data }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Provider answer: every requested quad of a region, in request order.
pub type FragmentMap = HashMap<RegionId, Vec<Fragment>>;
