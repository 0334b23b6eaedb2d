//! In-memory fragment service.
//!
//! Answers from a fixed geometry table without any I/O. Useful for hosts
//! that ship geometry with the application and for driving the engine in
//! tests. Every request is recorded, and failures can be injected.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::coord::{FragmentKey, RegionId};
use crate::geometry::MultiPolygon;

use super::types::{BoxFuture, FetchError, FragmentRequest, FragmentResponse, FragmentService};

/// Fragment service backed by a geometry table.
#[derive(Debug, Default)]
pub struct InMemoryFragmentService {
    geometry: Mutex<HashMap<FragmentKey, MultiPolygon>>,
    requests: Mutex<Vec<FragmentRequest>>,
    failures: AtomicUsize,
}

impl InMemoryFragmentService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Self::insert`].
    pub fn with_fragment(self, key: FragmentKey, geometry: MultiPolygon) -> Self {
        self.insert(key, geometry);
        self
    }

    /// Make geometry available for `key`.
    pub fn insert(&self, key: FragmentKey, geometry: MultiPolygon) {
        self.geometry.lock().insert(key, geometry);
    }

    /// Fail the next `count` requests with a service error.
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<FragmentRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl FragmentService for InMemoryFragmentService {
    fn fetch_fragments(
        &self,
        region_ids: Vec<RegionId>,
        request: FragmentRequest,
    ) -> BoxFuture<'static, Result<FragmentResponse, FetchError>> {
        self.requests.lock().push(request.clone());

        if self.take_failure() {
            return Box::pin(futures::future::ready(Err(FetchError::Service(
                "injected failure".to_string(),
            ))));
        }

        let geometry = self.geometry.lock();
        let mut response = FragmentResponse::new();
        for region_id in region_ids {
            let Some(quads) = request.get(&region_id) else {
                continue;
            };
            let found: Vec<_> = quads
                .iter()
                .filter_map(|quad| {
                    let key = FragmentKey::new(region_id.clone(), *quad);
                    geometry.get(&key).map(|g| (*quad, g.clone()))
                })
                .collect();
            if !found.is_empty() {
                response.insert(region_id, found);
            }
        }

        Box::pin(futures::future::ready(Ok(response)))
    }
}
