use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds the number of in-flight directory-size computations and directory
/// reads. Acquisition is a cooperative async wait, never a spin.
#[derive(Debug, Clone)]
pub struct IoLimiter {
    semaphore: Arc<Semaphore>,
    permits: usize,
}

impl IoLimiter {
    pub fn new(permits: usize) -> Self {
        let permits = permits.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            permits,
        }
    }

    pub fn permits(&self) -> usize {
        self.permits
    }

    /// The semaphore is never closed, so this only returns `None` if the
    /// runtime is shutting down; callers proceed unthrottled in that case.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore).acquire_owned().await.ok()
    }
}
