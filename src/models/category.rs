use std::path::PathBuf;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

/// The fixed set of cleanup categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryKind {
    WindowsUpdate,
    TemporaryFiles,
    RecycleBin,
    SystemCache,
    BrowserCache,
    LogFiles,
    ErrorReports,
    ThumbnailCache,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 8] = [
        CategoryKind::WindowsUpdate,
        CategoryKind::TemporaryFiles,
        CategoryKind::RecycleBin,
        CategoryKind::SystemCache,
        CategoryKind::BrowserCache,
        CategoryKind::LogFiles,
        CategoryKind::ErrorReports,
        CategoryKind::ThumbnailCache,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CategoryKind::WindowsUpdate => "Windows Update Cache",
            CategoryKind::TemporaryFiles => "Temporary Files",
            CategoryKind::RecycleBin => "Recycle Bin",
            CategoryKind::SystemCache => "System Cache",
            CategoryKind::BrowserCache => "Browser Cache",
            CategoryKind::LogFiles => "Log Files",
            CategoryKind::ErrorReports => "Error Reports",
            CategoryKind::ThumbnailCache => "Thumbnail Cache",
        }
    }

    pub fn parse(s: &str) -> Option<CategoryKind> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "windowsupdate" | "update" => Some(CategoryKind::WindowsUpdate),
            "temporaryfiles" | "temp" => Some(CategoryKind::TemporaryFiles),
            "recyclebin" | "trash" => Some(CategoryKind::RecycleBin),
            "systemcache" | "system" => Some(CategoryKind::SystemCache),
            "browsercache" | "browser" => Some(CategoryKind::BrowserCache),
            "logfiles" | "logs" => Some(CategoryKind::LogFiles),
            "errorreports" | "wer" => Some(CategoryKind::ErrorReports),
            "thumbnailcache" | "thumbnails" => Some(CategoryKind::ThumbnailCache),
            _ => None,
        }
    }
}

/// Static per-category configuration plus the mutable results a scan fills in.
///
/// The safe set is the subset of the scan set approved for deletion; cleanup
/// scope can be narrower than scan scope (e.g. Windows Update scans four
/// roots but only the download cache is safe to clean).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySpec {
    pub kind: CategoryKind,
    pub name: String,
    pub scan_dirs: Vec<PathBuf>,
    pub patterns: Vec<String>,
    pub safe_dirs: Vec<PathBuf>,
    pub safe_patterns: Vec<String>,
    pub found_files: usize,
    pub found_bytes: u64,
    pub error: Option<String>,
}

impl CategorySpec {
    pub fn new(
        kind: CategoryKind,
        scan_dirs: Vec<PathBuf>,
        patterns: Vec<&str>,
        safe_dirs: Vec<PathBuf>,
        safe_patterns: Vec<&str>,
    ) -> Self {
        Self {
            kind,
            name: kind.name().to_string(),
            scan_dirs,
            patterns: patterns.into_iter().map(String::from).collect(),
            safe_dirs,
            safe_patterns: safe_patterns.into_iter().map(String::from).collect(),
            found_files: 0,
            found_bytes: 0,
            error: None,
        }
    }

    pub fn reset(&mut self) {
        self.found_files = 0;
        self.found_bytes = 0;
        self.error = None;
    }

    /// Compiled filename matcher for the scan patterns.
    pub fn scan_globs(&self) -> Result<GlobSet, globset::Error> {
        build_globs(&self.patterns)
    }

    /// Compiled filename matcher for the (possibly narrower) safe patterns.
    pub fn safe_globs(&self) -> Result<GlobSet, globset::Error> {
        build_globs(&self.safe_patterns)
    }
}

fn build_globs(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    builder.build()
}

fn windows_dir() -> PathBuf {
    std::env::var_os("WINDIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Windows"))
}

fn local_app_data() -> PathBuf {
    std::env::var_os("LOCALAPPDATA")
        .map(PathBuf::from)
        .unwrap_or_else(|| windows_dir().join("..").join("Users"))
}

fn program_data() -> PathBuf {
    std::env::var_os("PROGRAMDATA")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\ProgramData"))
}

/// Build the fixed category table. Directories that do not exist on the host
/// are skipped at scan time, so the table itself is unconditional.
pub fn default_categories() -> Vec<CategorySpec> {
    let windir = windows_dir();
    let local = local_app_data();
    let progdata = program_data();

    let temp_dirs = vec![
        std::env::temp_dir(),
        windir.join("Temp"),
        local.join("Temp"),
    ];

    let chrome_cache = local
        .join("Google")
        .join("Chrome")
        .join("User Data")
        .join("Default")
        .join("Cache");
    let edge_cache = local
        .join("Microsoft")
        .join("Edge")
        .join("User Data")
        .join("Default")
        .join("Cache");
    let firefox_profiles = local.join("Mozilla").join("Firefox").join("Profiles");

    let wer_system = progdata.join("Microsoft").join("Windows").join("WER");
    let wer_user = local.join("Microsoft").join("Windows").join("WER");

    vec![
        CategorySpec::new(
            CategoryKind::WindowsUpdate,
            vec![
                windir.join("SoftwareDistribution").join("Download"),
                windir.join("System32").join("catroot2"),
                windir.join("WinSxS").join("Backup"),
                windir.join("WinSxS").join("ManifestCache"),
            ],
            vec!["*.cab", "*.msu", "*.tmp", "*.log"],
            // Only the download cache is safe to clean, never WinSxS.
            vec![windir.join("SoftwareDistribution").join("Download")],
            vec!["*"],
        ),
        CategorySpec::new(
            CategoryKind::TemporaryFiles,
            temp_dirs.clone(),
            vec!["*"],
            temp_dirs,
            vec!["*"],
        ),
        CategorySpec::new(
            CategoryKind::RecycleBin,
            // Scanned through the platform trash API, cleaned all-or-nothing.
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        ),
        CategorySpec::new(
            CategoryKind::SystemCache,
            vec![
                windir.join("Prefetch"),
                local.join("Microsoft").join("Windows").join("INetCache"),
            ],
            vec!["*"],
            vec![windir.join("Prefetch")],
            vec!["*.pf"],
        ),
        CategorySpec::new(
            CategoryKind::BrowserCache,
            vec![
                chrome_cache.clone(),
                edge_cache.clone(),
                firefox_profiles,
            ],
            vec!["*"],
            vec![chrome_cache, edge_cache],
            vec!["*"],
        ),
        CategorySpec::new(
            CategoryKind::LogFiles,
            vec![
                windir.join("Logs"),
                windir.join("System32").join("LogFiles"),
                wer_system.clone(),
            ],
            vec!["*.log", "*.txt", "*.etl"],
            vec![windir.join("Logs").join("WindowsUpdate")],
            vec!["*.log"],
        ),
        CategorySpec::new(
            CategoryKind::ErrorReports,
            vec![wer_system.clone(), wer_user.clone()],
            vec!["*"],
            vec![wer_system, wer_user],
            vec!["*"],
        ),
        CategorySpec::new(
            CategoryKind::ThumbnailCache,
            vec![local.join("Microsoft").join("Windows").join("Explorer")],
            vec!["thumbcache_*.db", "iconcache_*.db"],
            vec![local.join("Microsoft").join("Windows").join("Explorer")],
            vec!["thumbcache_*.db", "iconcache_*.db"],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_categories_cover_all_kinds() {
        let categories = default_categories();
        assert_eq!(categories.len(), CategoryKind::ALL.len());
        for kind in CategoryKind::ALL {
            assert!(categories.iter().any(|c| c.kind == kind));
        }
    }

    #[test]
    fn test_safe_dirs_are_subset_of_scan_dirs() {
        for category in default_categories() {
            if category.kind == CategoryKind::WindowsUpdate {
                // Safe scope is deliberately narrower.
                assert_eq!(category.safe_dirs.len(), 1);
                assert!(category.scan_dirs.contains(&category.safe_dirs[0]));
            }
            for safe in &category.safe_dirs {
                let covered = category
                    .scan_dirs
                    .iter()
                    .any(|scan| safe.starts_with(scan) || scan == safe);
                assert!(covered, "{:?} not covered by scan dirs", safe);
            }
        }
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(CategoryKind::parse("temp"), Some(CategoryKind::TemporaryFiles));
        assert_eq!(CategoryKind::parse("Windows-Update"), Some(CategoryKind::WindowsUpdate));
        assert_eq!(CategoryKind::parse("nope"), None);
    }

    #[test]
    fn test_reset_clears_results() {
        let mut category = default_categories().remove(0);
        category.found_files = 3;
        category.found_bytes = 999;
        category.error = Some("boom".into());
        category.reset();
        assert_eq!(category.found_files, 0);
        assert_eq!(category.found_bytes, 0);
        assert!(category.error.is_none());
    }
}
