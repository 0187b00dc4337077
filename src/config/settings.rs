use serde::{Deserialize, Serialize};

pub const LARGE_FOLDER_MIN_BYTES: u64 = 10 * 1024 * 1024;
pub const LARGE_FILE_MIN_BYTES: u64 = 1024 * 1024;
pub const DEFAULT_MAX_DEPTH: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Upper bound on simultaneous directory-size computations.
    pub max_concurrent_io: usize,
    /// Depth limit for bounded walks (largest-folder / file-type search).
    pub max_depth: usize,
    /// Minimum size for a folder to show up in largest-folder results.
    pub large_folder_min_bytes: u64,
    /// Minimum size for a file to show up in extension search results.
    pub large_file_min_bytes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let processors = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        Self {
            // Sized to the host's logical processor count; capped so a wide
            // fan-out cannot exhaust the fd table.
            max_concurrent_io: cap_by_fd_limit(processors),
            max_depth: DEFAULT_MAX_DEPTH,
            large_folder_min_bytes: LARGE_FOLDER_MIN_BYTES,
            large_file_min_bytes: LARGE_FILE_MIN_BYTES,
        }
    }
}

/// Cap concurrency based on the system's file descriptor soft limit.
/// Reserves 25% of fds for non-scan use (stdio, channels, etc.).
fn cap_by_fd_limit(max_io: usize) -> usize {
    #[cfg(unix)]
    {
        let mut rlim = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        let ret = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut rlim) };
        if ret == 0 && rlim.rlim_cur != libc::RLIM_INFINITY {
            let fd_limit = rlim.rlim_cur as usize;
            let usable = fd_limit * 3 / 4;
            return max_io.min(usable).max(1);
        }
    }
    max_io
}
