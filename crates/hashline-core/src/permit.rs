//! Counting permit pool for bounding an expensive shared resource.
//!
//! Wraps tokio's semaphore so waiters yield to the scheduler instead of
//! blocking a worker thread. Permits are owned, so one can be moved into a
//! `spawn_blocking` closure and is released when that closure returns or unwinds.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::StageError;

/// A pool of `capacity` interchangeable permits shared across tasks.
#[derive(Clone)]
pub struct PermitPool {
    sem: Arc<Semaphore>,
    capacity: usize,
}

/// RAII guard that returns one permit to its pool on drop.
pub struct Permit(#[allow(dead_code)] OwnedSemaphorePermit);

impl PermitPool {
    /// Create a pool with `capacity` permits (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            sem: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait until a permit is available, then take it.
    ///
    /// Returns [`StageError::Cancelled`] if `cancel` fires first.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Permit, StageError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StageError::Cancelled),
            permit = self.sem.clone().acquire_owned() => {
                permit.map(Permit).map_err(|_| StageError::Cancelled)
            }
        }
    }

    /// Total permits in the pool.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.sem.available_permits()
    }
}
