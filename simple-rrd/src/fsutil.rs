//! Filesystem checks around the RRD file.
//!
//! Permission checks use the effective user, matching what the engine will
//! experience when it opens the file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, RrdError};

/// Returns `true` if the effective user may write `path`.
#[cfg(target_os = "linux")]
pub fn is_writable(path: &Path) -> bool {
    use nix::fcntl::AtFlags;
    use nix::unistd::{AccessFlags, faccessat};

    faccessat(None, path, AccessFlags::W_OK, AtFlags::AT_EACCESS).is_ok()
}

/// Returns `true` if the current user may write `path`.
#[cfg(all(unix, not(target_os = "linux")))]
pub fn is_writable(path: &Path) -> bool {
    use nix::unistd::{AccessFlags, access};

    access(path, AccessFlags::W_OK).is_ok()
}

/// Returns `true` if `path` exists and is not read-only.
#[cfg(not(unix))]
pub fn is_writable(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|meta| !meta.permissions().readonly())
}

/// Directory holding `path`; `.` for a bare file name.
pub fn directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Walks up from `dir` to the first directory that exists.
///
/// Stops at the filesystem root or `.`, which are returned even if missing.
pub fn nearest_existing_ancestor(dir: &Path) -> PathBuf {
    let mut current = dir.to_path_buf();
    while !current.exists() {
        match current.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => current = parent.to_path_buf(),
            _ => return PathBuf::from("."),
        }
    }
    current
}

/// Makes sure the directory for `path` exists and is writable.
///
/// Missing directories are created when their nearest existing ancestor is
/// writable.
///
/// # Errors
///
/// Returns [`RrdError::Directory`] if the directory cannot be written or
/// created, and [`RrdError::Io`] if creation fails part way.
pub fn ensure_directory(path: &Path) -> Result<()> {
    let dir = directory(path);
    if dir.is_dir() {
        return if is_writable(&dir) {
            Ok(())
        } else {
            Err(RrdError::Directory { path: dir })
        };
    }

    let ancestor = nearest_existing_ancestor(&dir);
    if !ancestor.is_dir() || !is_writable(&ancestor) {
        return Err(RrdError::Directory { path: dir });
    }

    debug!(dir = %dir.display(), "creating directory");
    fs::create_dir_all(&dir).map_err(|source| RrdError::Io { path: dir, source })
}
