use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use super::category::CategorySpec;

/// Final result of a cleanup run. Constructed once, immutable after return.
///
/// Errors are recorded at category granularity; partial success is the
/// expected common case, so the totals always reflect what did succeed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupOutcome {
    pub total_files: usize,
    pub total_bytes: u64,
    pub errors: Vec<String>,
}

impl CleanupOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Summary of a completed scan, suitable for JSON export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub categories: Vec<CategorySpec>,
    pub total_files: usize,
    pub total_bytes: u64,
    pub duration: Duration,
    pub timestamp: SystemTime,
}

impl ScanReport {
    pub fn from_categories(categories: Vec<CategorySpec>, duration: Duration) -> Self {
        let total_files = categories.iter().map(|c| c.found_files).sum();
        let total_bytes = categories.iter().map(|c| c.found_bytes).sum();
        Self {
            categories,
            total_files,
            total_bytes,
            duration,
            timestamp: SystemTime::now(),
        }
    }
}
