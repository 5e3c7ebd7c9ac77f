//! Existence checks and removal for declared inputs and outputs.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Paths from `paths` that do not exist, in their original order.
///
/// Regular files and directories both count as present. Broken symlinks
/// count as missing.
pub fn missing<P: AsRef<Path>>(paths: &[P]) -> Vec<PathBuf> {
    let missing: Vec<PathBuf> = paths
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| !p.exists())
        .map(Path::to_path_buf)
        .collect();

    debug!(checked = paths.len(), missing = ?missing, "path existence check");
    missing
}

/// Whether every path exists. `false` for an empty list.
pub fn all_exist<P: AsRef<Path>>(paths: &[P]) -> bool {
    !paths.is_empty() && paths.iter().all(|p| p.as_ref().exists())
}

/// Remove each existing file or directory (recursively).
///
/// Absent paths are ignored.
pub fn remove_all<P: AsRef<Path>>(paths: &[P]) -> io::Result<()> {
    for path in paths.iter().map(AsRef::as_ref) {
        let meta = match std::fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        };

        if meta.is_dir() {
            std::fs::remove_dir_all(path)?;
            warn!(path = %path.display(), "directory removed");
        } else {
            std::fs::remove_file(path)?;
            warn!(path = %path.display(), "file removed");
        }
    }
    Ok(())
}
