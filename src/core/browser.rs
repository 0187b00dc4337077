use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sysinfo::Disks;
use tracing::warn;

use crate::config::settings::Settings;
use crate::models::entry::{Entry, EntryKind};

use super::error::SweepError;
use super::walker::{walk_bounded, Walker};

/// Read-only navigation: drive roots, directory listings, and the two
/// "what is eating my disk" queries. All sizes flow through the shared
/// walker so the browser benefits from the process-wide size cache.
pub struct Browser {
    walker: Walker,
    settings: Arc<Settings>,
}

impl Browser {
    pub fn new(walker: Walker) -> Self {
        let settings = walker.settings();
        Self { walker, settings }
    }

    /// Enumerate mounted drives with their used space. Drive percentages are
    /// shares of total used space across all drives, matching directory
    /// listings one level down.
    pub async fn list_drives(&self) -> Result<Vec<Entry>, SweepError> {
        let limiter = self.walker.limiter();
        let _permit = limiter.acquire().await;
        let mut drives = tokio::task::spawn_blocking(collect_drives)
            .await
            .map_err(|e| SweepError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other(e),
            })?;
        Entry::assign_percentages(&mut drives);
        drives.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
        Ok(drives)
    }

    /// List the children of `path`, directories sized recursively.
    pub async fn list_directory(
        &self,
        path: &Path,
        include_files: bool,
    ) -> Result<Vec<Entry>, SweepError> {
        self.walker.list_immediate(path, include_files).await
    }

    /// Folders under `root` whose shallow size clears the large-folder
    /// threshold, biggest first, capped at `max_results`. A root that is not
    /// a directory yields no results rather than an error.
    pub async fn find_largest_folders(
        &self,
        root: &Path,
        max_results: usize,
    ) -> Result<Vec<Entry>, SweepError> {
        if !root.is_dir() {
            return Ok(Vec::new());
        }
        let target = root.to_path_buf();
        let max_depth = self.settings.max_depth;
        let min_bytes = self.settings.large_folder_min_bytes;

        let limiter = self.walker.limiter();
        let _permit = limiter.acquire().await;
        let mut entries = tokio::task::spawn_blocking(move || {
            walk_bounded(&target, max_depth, &|entry: &Entry| {
                entry.kind == EntryKind::Directory && entry.size_bytes > min_bytes
            })
        })
        .await
        .map_err(|e| SweepError::Io {
            path: root.to_path_buf(),
            source: std::io::Error::other(e),
        })?;

        entries.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
        entries.truncate(max_results);
        Ok(entries)
    }

    /// Files under `root` matching one of the given extensions and clearing
    /// the large-file threshold, biggest first. Extensions are normalized to
    /// lowercase with a leading dot, so "MP4" and ".mp4" select the same
    /// files.
    pub async fn find_files_by_extension(
        &self,
        root: &Path,
        extensions: &[String],
    ) -> Result<Vec<Entry>, SweepError> {
        if !root.is_dir() {
            return Ok(Vec::new());
        }
        let wanted: HashSet<String> = extensions.iter().map(|ext| normalize_extension(ext)).collect();
        let target = root.to_path_buf();
        let max_depth = self.settings.max_depth;
        let min_bytes = self.settings.large_file_min_bytes;

        let limiter = self.walker.limiter();
        let _permit = limiter.acquire().await;
        let mut entries = tokio::task::spawn_blocking(move || {
            walk_bounded(&target, max_depth, &|entry: &Entry| {
                entry.kind == EntryKind::File
                    && entry.size_bytes > min_bytes
                    && wanted.contains(&entry.extension)
            })
        })
        .await
        .map_err(|e| SweepError::Io {
            path: root.to_path_buf(),
            source: std::io::Error::other(e),
        })?;

        entries.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
        Ok(entries)
    }
}

fn collect_drives() -> Vec<Entry> {
    let disks = Disks::new_with_refreshed_list();
    let mut drives = Vec::new();
    for disk in disks.list() {
        let mount = disk.mount_point().to_path_buf();
        let total = disk.total_space();
        let available = disk.available_space();
        let used = total.saturating_sub(available);
        let name = format!(
            "{} ({:?}, {} free)",
            mount.display(),
            disk.kind(),
            crate::models::entry::human_readable_size(available)
        );
        drives.push(Entry::drive(mount, name, used));
    }
    if drives.is_empty() {
        warn!("no mounted drives reported by the platform");
    }
    drives
}

fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim().trim_start_matches('.');
    format!(".{}", trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn browser() -> Browser {
        Browser::new(Walker::new(Settings::default()))
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("MP4"), ".mp4");
        assert_eq!(normalize_extension(".Log"), ".log");
        assert_eq!(normalize_extension("  iso "), ".iso");
    }

    #[tokio::test]
    async fn test_find_largest_folders_missing_root_is_empty() {
        let missing = std::env::temp_dir().join("drivesweep_browser_missing");
        let result = browser().find_largest_folders(&missing, 10).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_find_files_by_extension_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("big.iso"), vec![0u8; 64]).unwrap();
        fs::write(root.join("bigger.iso"), vec![0u8; 128]).unwrap();
        fs::write(root.join("other.bin"), vec![0u8; 256]).unwrap();

        let mut settings = Settings::default();
        settings.large_file_min_bytes = 32;
        let browser = Browser::new(Walker::new(settings));

        let found = browser
            .find_files_by_extension(root, &["ISO".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "bigger.iso");
        assert_eq!(found[1].name, "big.iso");
    }

    #[tokio::test]
    async fn test_find_largest_folders_threshold_and_cap() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for (name, len) in [("a", 500usize), ("b", 300), ("c", 10)] {
            fs::create_dir(root.join(name)).unwrap();
            fs::write(root.join(name).join("f.bin"), vec![0u8; len]).unwrap();
        }

        let mut settings = Settings::default();
        settings.large_folder_min_bytes = 100;
        let browser = Browser::new(Walker::new(settings));

        let found = browser.find_largest_folders(root, 1).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "a");
    }
}
