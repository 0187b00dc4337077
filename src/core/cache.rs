use std::future::Future;
use std::path::{Path, PathBuf};

use dashmap::DashMap;

/// Concurrent memoization of computed directory sizes.
///
/// Values are inserted once and never invalidated; the cache lives for the
/// process. No lock is held while `compute` runs, so two racing first-callers
/// may both compute — the first completed write wins and the loser's result
/// is returned to its caller without being persisted. The value is idempotent
/// for an unchanged tree, so the race is harmless.
#[derive(Debug, Default)]
pub struct SizeCache {
    map: DashMap<PathBuf, u64>,
}

impl SizeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<u64> {
        self.map.get(path).map(|size| *size)
    }

    pub async fn get_or_compute<F, Fut>(&self, path: &Path, compute: F) -> u64
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = u64>,
    {
        if let Some(size) = self.get(path) {
            return size;
        }
        let size = compute().await;
        self.map.entry(path.to_path_buf()).or_insert(size);
        size
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
