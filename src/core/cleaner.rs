use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::GlobSet;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::models::category::{CategoryKind, CategorySpec};
use crate::models::entry::{Entry, EntryKind};
use crate::models::outcome::CleanupOutcome;

use super::cancel::CancelFlag;
use super::error::SweepError;
use super::events::{ProgressEvent, ProgressSender};
use super::limiter::IoLimiter;
use super::walker::Walker;

/// Per-file deletion result. Locked and vanished files are skips, not
/// errors; only unexpected I/O failures are reported upward.
#[derive(Debug)]
pub enum FileOutcome {
    Deleted(u64),
    SkippedMissing,
    SkippedLocked,
    Failed(std::io::Error),
}

#[derive(Debug, Default)]
struct CleanStats {
    files_deleted: usize,
    bytes_deleted: u64,
    files_skipped: usize,
}

/// Drives deletion across selected categories, sequentially, accumulating a
/// [`CleanupOutcome`]. Partial success is the expected case: the outcome's
/// totals always cover what did succeed, alongside any category errors.
pub struct Cleaner {
    limiter: Arc<IoLimiter>,
    progress: ProgressSender,
    cancel: CancelFlag,
}

impl Cleaner {
    pub fn new(walker: &Walker, progress: ProgressSender, cancel: CancelFlag) -> Self {
        Self {
            limiter: walker.limiter(),
            progress,
            cancel,
        }
    }

    pub async fn clean(&self, categories: &[CategorySpec]) -> CleanupOutcome {
        let mut outcome = CleanupOutcome::default();
        let total = categories.len();

        for (index, category) in categories.iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            let percent = (index as f64 * 100.0) / total as f64;
            self.emit(
                percent,
                format!("Cleaning {}...", category.name),
                outcome.total_files,
                outcome.total_bytes,
            );

            match self.clean_category(category).await {
                Ok(stats) => {
                    outcome.total_files += stats.files_deleted;
                    outcome.total_bytes += stats.bytes_deleted;
                    if stats.files_skipped > 0 {
                        debug!(
                            category = %category.name,
                            skipped = stats.files_skipped,
                            "files skipped (locked or vanished)"
                        );
                    }
                    self.emit(
                        percent,
                        format!("Cleaned {}", category.name),
                        outcome.total_files,
                        outcome.total_bytes,
                    );
                }
                Err(e) => {
                    warn!(category = %category.name, error = %e, "category cleanup failed");
                    outcome
                        .errors
                        .push(format!("Error cleaning {}: {e}", category.name));
                }
            }
        }

        self.emit(
            100.0,
            "Cleanup completed".to_string(),
            outcome.total_files,
            outcome.total_bytes,
        );
        outcome
    }

    async fn clean_category(&self, category: &CategorySpec) -> Result<CleanStats, SweepError> {
        if category.kind == CategoryKind::RecycleBin {
            let _permit = self.limiter.acquire().await;
            let (files, bytes) = tokio::task::spawn_blocking(empty_recycle_bin)
                .await
                .map_err(|e| SweepError::RecycleBin(e.to_string()))??;
            return Ok(CleanStats {
                files_deleted: files,
                bytes_deleted: bytes,
                files_skipped: 0,
            });
        }

        let globs = category
            .safe_globs()
            .map_err(|source| SweepError::Pattern {
                pattern: category.safe_patterns.join(", "),
                source,
            })?;
        let dirs = category.safe_dirs.clone();
        let cancel = self.cancel.clone();

        let _permit = self.limiter.acquire().await;
        tokio::task::spawn_blocking(move || clean_directories(&dirs, &globs, &cancel))
            .await
            .map_err(|e| SweepError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other(e),
            })?
    }

    /// Delete explicitly selected browse entries. Returns true iff every
    /// entry was deleted without error.
    pub async fn delete_entries(&self, entries: &[Entry]) -> bool {
        let total = entries.len();
        let mut processed = 0usize;
        let mut errors = 0usize;
        let mut bytes = 0u64;

        for (index, entry) in entries.iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            let percent = (index as f64 * 100.0) / total.max(1) as f64;
            self.emit(
                percent,
                format!("Deleting {}... ({}/{})", entry.name, index + 1, total),
                processed,
                bytes,
            );

            let path = entry.path.clone();
            let kind = entry.kind;
            let _permit = self.limiter.acquire().await;
            match tokio::task::spawn_blocking(move || delete_entry_path(&path, kind)).await {
                Ok(Ok(())) => {
                    processed += 1;
                    bytes += entry.size_bytes;
                }
                Ok(Err(e)) => {
                    warn!(path = %entry.path.display(), error = %e, "deletion failed");
                    errors += 1;
                }
                Err(e) => {
                    warn!(error = %e, "deletion task failed");
                    errors += 1;
                }
            }
        }

        self.emit(
            100.0,
            format!("Completed. {processed} items deleted, {errors} errors."),
            processed,
            bytes,
        );
        errors == 0
    }

    fn emit(&self, percent: f64, operation: String, files: usize, bytes: u64) {
        let _ = self.progress.send(ProgressEvent::Clean {
            percent,
            operation,
            files_processed: files,
            bytes_processed: bytes,
        });
    }
}

/// Delete every matching file under each safe root, then prune now-empty
/// subdirectories bottom-up. A missing root is skipped; a root that exists
/// but cannot be opened fails the category.
fn clean_directories(
    dirs: &[PathBuf],
    globs: &GlobSet,
    cancel: &CancelFlag,
) -> Result<CleanStats, SweepError> {
    let mut stats = CleanStats::default();

    for dir in dirs {
        if !dir.is_dir() {
            continue;
        }
        std::fs::read_dir(dir).map_err(|e| SweepError::from_io(dir.clone(), e))?;

        for entry in WalkDir::new(dir).follow_links(false) {
            if cancel.is_cancelled() {
                return Ok(stats);
            }
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
            match delete_file(entry.path()) {
                FileOutcome::Deleted(size) => {
                    stats.files_deleted += 1;
                    stats.bytes_deleted += size;
                }
                FileOutcome::SkippedMissing | FileOutcome::SkippedLocked => {
                    stats.files_skipped += 1;
                }
                FileOutcome::Failed(e) => {
                    debug!(path = %entry.path().display(), error = %e, "could not delete file");
                }
            }
        }

        remove_empty_dirs(dir);
    }

    Ok(stats)
}

/// Delete one file, probing for in-use first. The pre-deletion size is
/// captured before the unlink so the outcome totals stay accurate.
pub fn delete_file(path: &Path) -> FileOutcome {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => return FileOutcome::SkippedMissing,
    };
    if is_file_in_use(path) {
        return FileOutcome::SkippedLocked;
    }
    let size = metadata.len();
    match std::fs::remove_file(path) {
        Ok(()) => FileOutcome::Deleted(size),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileOutcome::SkippedMissing,
        Err(e) => FileOutcome::Failed(e),
    }
}

/// Probe exclusivity by opening with no sharing. A sharing or lock
/// violation means another process holds the file open.
#[cfg(windows)]
pub fn is_file_in_use(path: &Path) -> bool {
    use std::fs::OpenOptions;
    use std::os::windows::fs::OpenOptionsExt;

    const ERROR_SHARING_VIOLATION: i32 = 32;
    const ERROR_LOCK_VIOLATION: i32 = 33;

    match OpenOptions::new().read(true).share_mode(0).open(path) {
        Ok(_) => false,
        Err(e) => matches!(
            e.raw_os_error(),
            Some(ERROR_SHARING_VIOLATION) | Some(ERROR_LOCK_VIOLATION)
        ),
    }
}

/// Unix file locks are advisory and never block deletion.
#[cfg(not(windows))]
pub fn is_file_in_use(_path: &Path) -> bool {
    false
}

/// Remove now-empty subdirectories of `root`, bottom-up. The root itself is
/// kept. A subdirectory still holding anything (e.g. a locked file that was
/// skipped) stays in place; errors here are ignored.
pub fn remove_empty_dirs(root: &Path) {
    let read = match std::fs::read_dir(root) {
        Ok(read) => read,
        Err(_) => return,
    };
    for entry in read.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        remove_empty_dirs(&path);
        if let Ok(mut remaining) = std::fs::read_dir(&path) {
            if remaining.next().is_none() {
                let _ = std::fs::remove_dir(&path);
            }
        }
    }
}

/// Count and size the recycle bin by walking the platform trash
/// directories, the same accounting that emptying it reclaims.
pub fn recycle_bin_contents() -> Result<(usize, u64), SweepError> {
    Ok(sum_trash_files(&trash_directories()))
}

/// Empty the platform recycle bin through the shell-level API. This is an
/// all-or-nothing purge, not a file-by-file walk; the reclaimed size is
/// measured before the purge.
#[cfg(any(target_os = "windows", target_os = "linux", target_os = "freebsd"))]
pub fn empty_recycle_bin() -> Result<(usize, u64), SweepError> {
    let (files, bytes) = sum_trash_files(&trash_directories());
    let items = trash::os_limited::list().map_err(|e| SweepError::RecycleBin(e.to_string()))?;
    if !items.is_empty() {
        trash::os_limited::purge_all(items).map_err(|e| SweepError::RecycleBin(e.to_string()))?;
    }
    Ok((files, bytes))
}

#[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "freebsd")))]
pub fn empty_recycle_bin() -> Result<(usize, u64), SweepError> {
    Err(SweepError::RecycleBin(
        "not supported on this platform".to_string(),
    ))
}

/// One hidden recycle root per mounted drive.
#[cfg(windows)]
fn trash_directories() -> Vec<PathBuf> {
    sysinfo::Disks::new_with_refreshed_list()
        .list()
        .iter()
        .map(|disk| disk.mount_point().join("$Recycle.Bin"))
        .collect()
}

/// The XDG trash spool holding the actual file contents.
#[cfg(all(unix, not(target_os = "macos")))]
fn trash_directories() -> Vec<PathBuf> {
    std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".local").join("share"))
        })
        .map(|base| vec![base.join("Trash").join("files")])
        .unwrap_or_default()
}

#[cfg(target_os = "macos")]
fn trash_directories() -> Vec<PathBuf> {
    std::env::var_os("HOME")
        .map(|home| vec![PathBuf::from(home).join(".Trash")])
        .unwrap_or_default()
}

#[cfg(not(any(unix, windows)))]
fn trash_directories() -> Vec<PathBuf> {
    Vec::new()
}

/// Recursive file count and byte total across the given roots. Missing
/// roots contribute nothing; deeper access errors skip the entry.
fn sum_trash_files(dirs: &[PathBuf]) -> (usize, u64) {
    let mut files = 0usize;
    let mut bytes = 0u64;
    for dir in dirs {
        if !dir.is_dir() {
            continue;
        }
        for entry in WalkDir::new(dir).follow_links(false).into_iter().flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(metadata) = entry.metadata() {
                files += 1;
                bytes += metadata.len();
            }
        }
    }
    (files, bytes)
}

fn delete_entry_path(path: &Path, kind: EntryKind) -> std::io::Result<()> {
    match kind {
        EntryKind::File => match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        },
        EntryKind::Directory => match std::fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        },
        EntryKind::Drive => Err(std::io::Error::other("cannot delete a drive")),
    }
}
