//! Hand-off buffer between async completions and the frame loop.
//!
//! Producers append under the lock and return. The frame loop swaps the
//! whole buffer out once per frame and processes it outside the lock, so a
//! completion never waits on frame work.

use std::sync::Arc;

use parking_lot::Mutex;

/// Multi-producer buffer drained by a single consumer.
///
/// Cloning yields another handle to the same buffer.
#[derive(Debug)]
pub struct Mailbox<T> {
    buffer: Arc<Mutex<Vec<T>>>,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append one item.
    pub fn post(&self, item: T) {
        self.buffer.lock().push(item);
    }

    /// Swap the buffer for an empty one and return what was in it.
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.buffer.lock())
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
