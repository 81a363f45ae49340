//! Local cache management.

use instructkit_core::Result;
use std::path::{Path, PathBuf};

/// Get the default cache directory for ad-hoc downloads.
///
/// Data modules cache into their own `download_dir`; this is used by the CLI
/// when no directory is given.
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|p| p.join("instructkit"))
        .unwrap_or_else(|| PathBuf::from(".cache/instructkit"))
}

/// Remove a cache directory and everything in it.
///
/// Returns `false` when there was nothing to remove.
pub fn clear_cache(dir: &Path) -> Result<bool> {
    if !dir.exists() {
        return Ok(false);
    }
    std::fs::remove_dir_all(dir)?;
    Ok(true)
}

/// Total size in bytes of the files under a cache directory.
pub fn cache_size(dir: &Path) -> Result<u64> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut size = 0u64;
    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            size += entry.metadata().map_err(std::io::Error::from)?.len();
        }
    }
    Ok(size)
}
