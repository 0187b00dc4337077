use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Drive,
    Directory,
    File,
}

/// A filesystem object discovered by a walk or browse operation.
///
/// `size_bytes` is cumulative: a file's length, a directory's summed content
/// size, or a drive's used space. Entries whose size could not be computed
/// carry 0; failures are logged, never encoded in the value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    pub size_bytes: u64,
    pub modified: Option<SystemTime>,
    pub extension: String,
    pub size_percentage: f64,
}

impl Entry {
    pub fn file(path: PathBuf, name: String, size: u64, modified: Option<SystemTime>) -> Self {
        let extension = lowercase_extension(&path);
        Self {
            name,
            path,
            kind: EntryKind::File,
            size_bytes: size,
            modified,
            extension,
            size_percentage: 0.0,
        }
    }

    pub fn directory(path: PathBuf, name: String, size: u64, modified: Option<SystemTime>) -> Self {
        Self {
            name,
            path,
            kind: EntryKind::Directory,
            size_bytes: size,
            modified,
            extension: String::new(),
            size_percentage: 0.0,
        }
    }

    pub fn drive(path: PathBuf, name: String, used_bytes: u64) -> Self {
        Self {
            name,
            path,
            kind: EntryKind::Drive,
            size_bytes: used_bytes,
            modified: None,
            extension: String::new(),
            size_percentage: 0.0,
        }
    }

    pub fn human_readable_size(&self) -> String {
        human_readable_size(self.size_bytes)
    }

    /// Recompute `size_percentage` across a sibling set. Called once the set
    /// is fully materialized (all child size computations joined).
    pub fn assign_percentages(entries: &mut [Entry]) {
        let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
        if total == 0 {
            for entry in entries.iter_mut() {
                entry.size_percentage = 0.0;
            }
            return;
        }
        for entry in entries.iter_mut() {
            entry.size_percentage = (entry.size_bytes as f64 / total as f64) * 100.0;
        }
    }
}

/// Lowercase extension with leading dot, empty when absent.
pub fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

pub fn human_readable_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    const TB: u64 = 1024 * GB;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
