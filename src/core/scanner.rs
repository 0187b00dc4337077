use std::path::PathBuf;
use std::sync::Arc;

use globset::GlobSet;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::models::category::{CategoryKind, CategorySpec};

use super::cancel::CancelFlag;
use super::cleaner::recycle_bin_contents;
use super::error::SweepError;
use super::events::{ProgressEvent, ProgressSender};
use super::limiter::IoLimiter;
use super::walker::Walker;

/// Drives a multi-category scan: categories run strictly sequentially so
/// progress reporting stays linear; parallelism lives inside the walks.
pub struct Scanner {
    limiter: Arc<IoLimiter>,
    progress: ProgressSender,
    cancel: CancelFlag,
}

impl Scanner {
    pub fn new(walker: &Walker, progress: ProgressSender, cancel: CancelFlag) -> Self {
        Self {
            limiter: walker.limiter(),
            progress,
            cancel,
        }
    }

    /// Scan each category in caller order, accumulating found-file counts and
    /// byte totals into the specs. A failing category records its error and
    /// does not abort the rest.
    pub async fn scan(&self, categories: &mut [CategorySpec]) {
        let total = categories.len();
        for (index, category) in categories.iter_mut().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            category.reset();
            let percent = (index as f64 * 100.0) / total as f64;
            self.emit(
                percent,
                format!("Scanning {}...", category.name),
                Some(category.name.clone()),
                0,
                0,
            );

            match self.scan_category(category).await {
                Ok((files, bytes)) => {
                    category.found_files = files;
                    category.found_bytes = bytes;
                    self.emit(
                        percent,
                        format!("Scanned {}", category.name),
                        Some(category.name.clone()),
                        files,
                        bytes,
                    );
                }
                Err(e) => {
                    warn!(category = %category.name, error = %e, "category scan failed");
                    category.error = Some(format!("Error scanning {}: {e}", category.name));
                }
            }
        }

        self.emit(100.0, "Scan completed".to_string(), None, 0, 0);
    }

    async fn scan_category(&self, category: &CategorySpec) -> Result<(usize, u64), SweepError> {
        if category.kind == CategoryKind::RecycleBin {
            let _permit = self.limiter.acquire().await;
            return tokio::task::spawn_blocking(recycle_bin_contents)
                .await
                .map_err(|e| SweepError::RecycleBin(e.to_string()))?;
        }

        let globs = category
            .scan_globs()
            .map_err(|source| SweepError::Pattern {
                pattern: category.patterns.join(", "),
                source,
            })?;
        let dirs = category.scan_dirs.clone();

        let _permit = self.limiter.acquire().await;
        tokio::task::spawn_blocking(move || scan_directories(&dirs, &globs))
            .await
            .map_err(|e| SweepError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other(e),
            })?
    }

    fn emit(
        &self,
        percent: f64,
        operation: String,
        category: Option<String>,
        files_found: usize,
        bytes_found: u64,
    ) {
        let _ = self.progress.send(ProgressEvent::Scan {
            percent,
            operation,
            category,
            files_found,
            bytes_found,
        });
    }
}

/// Count files matching the pattern set under each configured root.
///
/// Roots that do not exist on this host are skipped; a root that exists but
/// cannot be opened fails the whole category. Deeper access errors are
/// per-entry transient failures and only logged.
fn scan_directories(dirs: &[PathBuf], globs: &GlobSet) -> Result<(usize, u64), SweepError> {
    let mut files_found = 0usize;
    let mut bytes_found = 0u64;

    for dir in dirs {
        if !dir.is_dir() {
            continue;
        }
        std::fs::read_dir(dir).map_err(|e| SweepError::from_io(dir.clone(), e))?;

        for entry in WalkDir::new(dir).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !globs.is_match(entry.file_name()) {
                continue;
            }
            match entry.metadata() {
                Ok(metadata) => {
                    files_found += 1;
                    bytes_found += metadata.len();
                }
                Err(e) => debug!(path = %entry.path().display(), error = %e, "skipping file"),
            }
        }
    }

    Ok((files_found, bytes_found))
}
