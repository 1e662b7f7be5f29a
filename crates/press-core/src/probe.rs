//! Host resource detection.
//!
//! Reads CPU cores, total memory, and free disk space for the filesystem
//! holding the web root.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::types::ResourceSnapshot;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not find MemTotal in /proc/meminfo")]
    MissingMemTotal,
    #[error("statvfs failed for {path}: {source}")]
    Statvfs {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Source of a [`ResourceSnapshot`].
pub trait ResourceProbe {
    fn snapshot(&self) -> Result<ResourceSnapshot, ProbeError>;
}

/// A fixed snapshot probes as itself (used by tests and `--ram`/`--cpus` overrides).
impl ResourceProbe for ResourceSnapshot {
    fn snapshot(&self) -> Result<ResourceSnapshot, ProbeError> {
        Ok(*self)
    }
}

/// Probe backed by the running Linux host.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    disk_path: PathBuf,
}

impl SystemProbe {
    /// Measure free disk on the filesystem containing `disk_path`.
    ///
    /// Walks up to the nearest existing ancestor so a web root that has not
    /// been created yet still resolves to its future filesystem.
    pub fn new(disk_path: impl Into<PathBuf>) -> Self {
        Self {
            disk_path: disk_path.into(),
        }
    }
}

impl ResourceProbe for SystemProbe {
    fn snapshot(&self) -> Result<ResourceSnapshot, ProbeError> {
        let cpu_cores = detect_cpu_cores();
        let meminfo = std::fs::read_to_string("/proc/meminfo").map_err(|source| ProbeError::Io {
            path: "/proc/meminfo".to_string(),
            source,
        })?;
        let total_ram_mb = parse_mem_total_mb(&meminfo).ok_or(ProbeError::MissingMemTotal)?;
        let available_disk_gb = available_disk_gb(&existing_ancestor(&self.disk_path))?;

        let snapshot = ResourceSnapshot::new(cpu_cores, total_ram_mb, available_disk_gb);
        debug!(?snapshot, "host resources probed");
        Ok(snapshot)
    }
}

/// Number of logical CPU cores, at least 1.
pub fn detect_cpu_cores() -> u32 {
    std::thread::available_parallelism()
        .map(|p| p.get() as u32)
        .unwrap_or(1)
}

/// Parse `MemTotal:  16384000 kB` out of `/proc/meminfo` content, in MiB.
pub fn parse_mem_total_mb(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find(|line| line.starts_with("MemTotal:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb / 1024)
}

fn existing_ancestor(path: &Path) -> PathBuf {
    let mut candidate = path.to_path_buf();
    while !candidate.exists() {
        if !candidate.pop() {
            return PathBuf::from("/");
        }
    }
    candidate
}

fn available_disk_gb(path: &Path) -> Result<u64, ProbeError> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| ProbeError::Statvfs {
        path: path.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
    })?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    // SAFETY: c_path is a valid NUL-terminated string and stat is a valid,
    // writable statvfs struct for the duration of the call.
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(ProbeError::Statvfs {
            path: path.display().to_string(),
            source: std::io::Error::last_os_error(),
        });
    }
    let bytes = (stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64);
    Ok(bytes / (1024 * 1024 * 1024))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mem_total() {
        let meminfo = "MemTotal:       16384000 kB\nMemFree:         1000000 kB\n";
        assert_eq!(parse_mem_total_mb(meminfo), Some(16_000));
    }

    #[test]
    fn missing_mem_total() {
        assert_eq!(parse_mem_total_mb("MemFree: 10 kB\n"), None);
    }

    #[test]
    fn fixed_snapshot_probes_as_itself() {
        let snapshot = ResourceSnapshot::new(2, 1024, 20);
        assert_eq!(snapshot.snapshot().unwrap(), snapshot);
    }

    #[test]
    fn existing_ancestor_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("a/b/c");
        assert_eq!(existing_ancestor(&missing), dir.path());
    }

    #[test]
    fn cpu_cores_is_positive() {
        assert!(detect_cpu_cores() >= 1);
    }
}
