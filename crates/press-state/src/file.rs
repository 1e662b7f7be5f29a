//! Locking and atomic replacement for flat state files.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{StateError, StateResult};

/// Mode for files holding secrets.
pub const OWNER_ONLY: u32 = 0o600;

/// Lock sidecars carry no data and stay world-readable.
const LOCK_MODE: u32 = 0o644;

/// Exclusive advisory lock on `<file>.lock`, released on drop.
///
/// Only writers lock. The sidecar is never replaced, so the lock stays
/// valid across the rename performed by [`atomic_write`], and readers see
/// either the old or the new file whole.
#[derive(Debug)]
pub struct FileLock {
    _file: File,
    path: PathBuf,
}

impl FileLock {
    /// Block until the lock guarding `target` is held.
    pub fn acquire(target: &Path) -> StateResult<Self> {
        let path = lock_path(target);
        ensure_parent_dir(&path)?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .mode(LOCK_MODE)
            .open(&path)
            .map_err(|e| StateError::io(&path, e))?;

        loop {
            // SAFETY: flock is a standard POSIX call on a descriptor owned by `file`.
            let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
            if rc == 0 {
                break;
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(StateError::Lock { path, source: err });
            }
        }
        debug!(path = %path.display(), "state lock acquired");
        Ok(Self { _file: file, path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "state lock released");
    }
}

pub fn lock_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    target.with_file_name(name)
}

/// Create the parent directory of `path` if needed.
pub fn ensure_parent_dir(path: &Path) -> StateResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| StateError::io(parent, e))?;
        }
    }
    Ok(())
}

/// Read a file, treating a missing file as empty.
pub fn read_or_empty(path: &Path) -> StateResult<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(StateError::io(path, e)),
    }
}

/// Replace `target` with `data`: write a temp file in the same directory,
/// fsync it, then rename it over the target.
pub fn atomic_write(target: &Path, data: &[u8], mode: u32) -> StateResult<()> {
    ensure_parent_dir(target)?;
    let parent = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| StateError::io(parent, e))?;
    fs::set_permissions(temp.path(), fs::Permissions::from_mode(mode))
        .map_err(|e| StateError::io(temp.path(), e))?;

    let mut file = temp.as_file();
    file.write_all(data).map_err(|e| StateError::io(target, e))?;
    file.sync_all().map_err(|e| StateError::io(target, e))?;

    temp.persist(target)
        .map_err(|e| StateError::io(target, e.error))?;
    debug!(path = %target.display(), bytes = data.len(), "state file replaced");
    Ok(())
}
