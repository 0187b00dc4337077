use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::config::settings::Settings;
use crate::models::entry::Entry;

use super::cache::SizeCache;
use super::error::SweepError;
use super::limiter::IoLimiter;

/// Directory traversal primitive shared by the scan orchestrator and the
/// interactive browser. Cheap to clone; clones share the limiter and cache.
#[derive(Clone)]
pub struct Walker {
    limiter: Arc<IoLimiter>,
    cache: Arc<SizeCache>,
    settings: Arc<Settings>,
}

struct RawEntry {
    path: PathBuf,
    name: String,
    size: u64,
    modified: Option<SystemTime>,
}

impl Walker {
    pub fn new(settings: Settings) -> Self {
        let limiter = Arc::new(IoLimiter::new(settings.max_concurrent_io));
        Self {
            limiter,
            cache: Arc::new(SizeCache::new()),
            settings: Arc::new(settings),
        }
    }

    pub fn limiter(&self) -> Arc<IoLimiter> {
        Arc::clone(&self.limiter)
    }

    pub fn cache(&self) -> Arc<SizeCache> {
        Arc::clone(&self.cache)
    }

    pub fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.settings)
    }

    /// List one directory level. Directory entries carry their full
    /// cumulative size (cached); unreadable entries are skipped. The result
    /// is sorted descending by size with sibling percentages assigned after
    /// all child computations have joined.
    pub async fn list_immediate(
        &self,
        path: &Path,
        include_files: bool,
    ) -> Result<Vec<Entry>, SweepError> {
        let root = path.to_path_buf();
        let (dirs, files) = {
            let _permit = self.limiter.acquire().await;
            let target = root.clone();
            tokio::task::spawn_blocking(move || read_dir_split(&target))
                .await
                .map_err(|e| SweepError::Io {
                    path: root,
                    source: std::io::Error::other(e),
                })??
        };

        let mut handles = Vec::new();
        for dir in dirs {
            let walker = self.clone();
            handles.push(tokio::spawn(async move {
                let size = walker.cached_directory_size(&dir.path).await;
                Entry::directory(dir.path, dir.name, size, dir.modified)
            }));
        }

        let mut entries = Vec::new();
        if include_files {
            for file in files {
                entries.push(Entry::file(file.path, file.name, file.size, file.modified));
            }
        }

        // Join barrier: every child size must land before shares are computed.
        for handle in handles {
            match handle.await {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(error = %e, "directory size task failed"),
            }
        }

        Entry::assign_percentages(&mut entries);
        entries.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));
        Ok(entries)
    }

    /// Full recursive size of a directory, memoized for the process lifetime.
    /// Failed computations yield 0, never an error.
    pub async fn cached_directory_size(&self, path: &Path) -> u64 {
        let limiter = Arc::clone(&self.limiter);
        let target = path.to_path_buf();
        self.cache
            .get_or_compute(path, move || async move {
                let _permit = limiter.acquire().await;
                match tokio::task::spawn_blocking(move || recursive_size(&target)).await {
                    Ok(size) => size,
                    Err(e) => {
                        warn!(error = %e, "directory size task failed");
                        0
                    }
                }
            })
            .await
    }
}

fn read_dir_split(dir: &Path) -> Result<(Vec<RawEntry>, Vec<RawEntry>), SweepError> {
    let read = std::fs::read_dir(dir).map_err(|e| SweepError::from_io(dir.to_path_buf(), e))?;

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for result in read {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        let metadata = match std::fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping entry without metadata");
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().to_string();
        let modified = metadata.modified().ok();
        if metadata.is_dir() {
            dirs.push(RawEntry {
                path,
                name,
                size: 0,
                modified,
            });
        } else if metadata.is_file() {
            files.push(RawEntry {
                path,
                name,
                size: metadata.len(),
                modified,
            });
        }
        // Symlinks and special files are not listed.
    }
    Ok((dirs, files))
}

/// Depth-limited depth-first traversal collecting entries that match the
/// predicate. The depth counter starts at 0 for the root's children;
/// `max_depth == 1` yields only immediate children. Directory sizes use the
/// shallow one-level policy (interactive estimate). Unreadable subtrees are
/// skipped without surfacing an error.
pub fn walk_bounded<P>(root: &Path, max_depth: usize, predicate: &P) -> Vec<Entry>
where
    P: Fn(&Entry) -> bool,
{
    let mut out = Vec::new();
    walk_level(root, 0, max_depth, predicate, &mut out);
    out
}

fn walk_level<P>(path: &Path, depth: usize, max_depth: usize, predicate: &P, out: &mut Vec<Entry>)
where
    P: Fn(&Entry) -> bool,
{
    if depth >= max_depth {
        return;
    }
    let read = match std::fs::read_dir(path) {
        Ok(read) => read,
        Err(e) => {
            debug!(dir = %path.display(), error = %e, "skipping unreadable directory");
            return;
        }
    };
    for entry in read.flatten() {
        let entry_path = entry.path();
        let metadata = match std::fs::symlink_metadata(&entry_path) {
            Ok(metadata) => metadata,
            Err(_) => continue,
        };
        if metadata.file_type().is_symlink() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        let modified = metadata.modified().ok();
        if metadata.is_dir() {
            let size = shallow_size(&entry_path);
            let candidate = Entry::directory(entry_path.clone(), name, size, modified);
            if predicate(&candidate) {
                out.push(candidate);
            }
            walk_level(&entry_path, depth + 1, max_depth, predicate, out);
        } else if metadata.is_file() {
            let candidate = Entry::file(entry_path, name, metadata.len(), modified);
            if predicate(&candidate) {
                out.push(candidate);
            }
        }
    }
}

/// Full recursive content size: every file under `root`, excluding
/// hidden/system files and well-known shell artifacts. Cycles through
/// symlinks or junctions are broken by tracking visited canonical paths.
pub fn recursive_size(root: &Path) -> u64 {
    let mut total = 0u64;
    let mut visited: HashSet<PathBuf> = HashSet::new();
    if let Ok(real) = std::fs::canonicalize(root) {
        visited.insert(real);
    }
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let read = match std::fs::read_dir(&dir) {
            Ok(read) => read,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };
        for entry in read.flatten() {
            let path = entry.path();
            let metadata = match std::fs::symlink_metadata(&path) {
                Ok(metadata) => metadata,
                Err(_) => continue,
            };
            if metadata.is_file() {
                if !is_excluded_file(&path, &metadata) {
                    total += metadata.len();
                }
            } else if metadata.is_dir() || metadata.file_type().is_symlink() {
                match std::fs::canonicalize(&path) {
                    Ok(real) => {
                        if visited.insert(real) {
                            stack.push(path);
                        }
                    }
                    Err(_) => continue,
                }
            }
        }
    }
    total
}

/// Shallow size estimate: direct files of `path` plus direct files of each
/// immediate subdirectory, nothing deeper. Used by the bounded walker where
/// speed matters more than accuracy.
pub fn shallow_size(path: &Path) -> u64 {
    let mut size = direct_file_size(path);
    if let Ok(read) = std::fs::read_dir(path) {
        for entry in read.flatten() {
            let entry_path = entry.path();
            if entry_path.is_dir() {
                size += direct_file_size(&entry_path);
            }
        }
    }
    size
}

fn direct_file_size(path: &Path) -> u64 {
    let mut size = 0u64;
    if let Ok(read) = std::fs::read_dir(path) {
        for entry in read.flatten() {
            if let Ok(metadata) = std::fs::symlink_metadata(entry.path()) {
                if metadata.is_file() {
                    size += metadata.len();
                }
            }
        }
    }
    size
}

fn is_excluded_file(path: &Path, metadata: &std::fs::Metadata) -> bool {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => return false,
    };
    if name.starts_with('$')
        || name.starts_with('.')
        || name.eq_ignore_ascii_case("desktop.ini")
        || name.eq_ignore_ascii_case("thumbs.db")
    {
        return true;
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;
        const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
        const FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;
        if metadata.file_attributes() & (FILE_ATTRIBUTE_HIDDEN | FILE_ATTRIBUTE_SYSTEM) != 0 {
            return true;
        }
    }
    #[cfg(not(windows))]
    let _ = metadata;
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::EntryKind;
    use std::fs;

    fn write_file(path: &Path, len: usize) {
        fs::write(path, vec![b'x'; len]).expect("write test file");
    }

    #[test]
    fn test_recursive_vs_shallow_size() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write_file(&root.join("a.bin"), 100);
        write_file(&root.join("b.bin"), 200);
        fs::create_dir(root.join("sub")).unwrap();
        write_file(&root.join("sub/c.bin"), 50);

        // One level of nesting: both policies agree.
        assert_eq!(recursive_size(root), 350);
        assert_eq!(shallow_size(root), 350);

        // Two levels down: only the full policy includes it.
        fs::create_dir(root.join("sub/deep")).unwrap();
        write_file(&root.join("sub/deep/d.bin"), 25);
        assert_eq!(recursive_size(root), 375);
        assert_eq!(shallow_size(root), 350);
    }

    #[test]
    fn test_recursive_size_excludes_shell_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write_file(&root.join("data.bin"), 10);
        write_file(&root.join("Thumbs.db"), 999);
        write_file(&root.join("desktop.ini"), 999);
        write_file(&root.join("$leftover"), 999);
        assert_eq!(recursive_size(root), 10);
    }

    #[test]
    fn test_empty_directory_is_zero_not_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(recursive_size(dir.path()), 0);
        assert_eq!(shallow_size(dir.path()), 0);
    }

    #[test]
    fn test_walk_bounded_depth_one_is_immediate_children() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write_file(&root.join("top.bin"), 1);
        fs::create_dir(root.join("child")).unwrap();
        write_file(&root.join("child/grand.bin"), 1);

        let entries = walk_bounded(root, 1, &|_: &Entry| true);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"top.bin"));
        assert!(names.contains(&"child"));
        assert!(!names.contains(&"grand.bin"));
    }

    #[test]
    fn test_walk_bounded_predicate_filters() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write_file(&root.join("small.log"), 10);
        write_file(&root.join("big.log"), 5000);

        let entries = walk_bounded(root, 3, &|e: &Entry| {
            e.kind == EntryKind::File && e.size_bytes > 100
        });
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "big.log");
    }

    #[cfg(unix)]
    #[test]
    fn test_recursive_size_breaks_symlink_cycles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write_file(&root.join("f.bin"), 40);
        fs::create_dir(root.join("sub")).unwrap();
        std::os::unix::fs::symlink(root, root.join("sub/loop")).unwrap();

        // Must terminate and count each file once.
        assert_eq!(recursive_size(root), 40);
    }

    #[tokio::test]
    async fn test_list_immediate_missing_root_is_not_found() {
        let walker = Walker::new(crate::config::settings::Settings::default());
        let missing = std::env::temp_dir().join("drivesweep_no_such_dir_xyz");
        let result = walker.list_immediate(&missing, true).await;
        assert!(matches!(result, Err(SweepError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_immediate_sizes_and_percentages() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write_file(&root.join("file.bin"), 300);
        fs::create_dir(root.join("sub")).unwrap();
        write_file(&root.join("sub/inner.bin"), 100);

        let walker = Walker::new(crate::config::settings::Settings::default());
        let entries = walker.list_immediate(root, true).await.expect("list");
        assert_eq!(entries.len(), 2);
        // Sorted descending by size.
        assert_eq!(entries[0].name, "file.bin");
        assert_eq!(entries[0].size_bytes, 300);
        assert_eq!(entries[1].name, "sub");
        assert_eq!(entries[1].size_bytes, 100);
        assert!((entries[0].size_percentage - 75.0).abs() < 1e-9);
        assert!((entries[1].size_percentage - 25.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_list_immediate_excludes_files_on_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        write_file(&root.join("file.bin"), 10);
        fs::create_dir(root.join("sub")).unwrap();

        let walker = Walker::new(crate::config::settings::Settings::default());
        let entries = walker.list_immediate(root, false).await.expect("list");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Directory);
    }
}
