//! Where fetch futures run.
//!
//! The engine never awaits anything itself; it hands each fetch to a
//! [`Spawner`] and picks the result up from a mailbox on a later frame.

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::error::EngineError;
use crate::provider::BoxFuture;

/// Runs detached futures.
pub trait Spawner: Send + Sync {
    fn spawn(&self, future: BoxFuture<'static, ()>);
}

/// Spawns onto a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Spawner for the runtime the caller is running in.
    pub fn current() -> Result<Self, EngineError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| EngineError::NoRuntime)
    }
}

impl Spawner for TokioSpawner {
    fn spawn(&self, future: BoxFuture<'static, ()>) {
        self.handle.spawn(future);
    }
}

/// Queues futures until [`ManualSpawner::run_pending`] is called.
///
/// Lets a test decide exactly between which frames a fetch completes.
#[derive(Default)]
pub struct ManualSpawner {
    pending: Mutex<Vec<BoxFuture<'static, ()>>>,
}

impl ManualSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every queued future to completion on the calling thread.
    ///
    /// Returns how many ran. Futures spawned while running stay queued.
    pub fn run_pending(&self) -> usize {
        let pending = std::mem::take(&mut *self.pending.lock());
        let count = pending.len();
        for future in pending {
            futures::executor::block_on(future);
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Spawner for ManualSpawner {
    fn spawn(&self, future: BoxFuture<'static, ()>) {
        self.pending.lock().push(future);
    }
}

impl std::fmt::Debug for ManualSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualSpawner")
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_manual_spawner_defers_until_run() {
        let spawner = ManualSpawner::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = Arc::clone(&counter);
            spawner.spawn(Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }

        assert_eq!(spawner.pending_count(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        assert_eq!(spawner.run_pending(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(spawner.run_pending(), 0);
    }

    #[test]
    fn test_tokio_spawner_requires_runtime() {
        assert!(matches!(TokioSpawner::current(), Err(EngineError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_tokio_spawner_runs_future() {
        let spawner = TokioSpawner::current().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        spawner.spawn(Box::pin(async move {
            let _ = tx.send(42);
        }));
        assert_eq!(rx.await.unwrap(), 42);
    }
}
