//! Writes rendered config to disk with backup and rollback.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use press_state::file::atomic_write;
use tracing::{debug, info, warn};

use crate::RenderError;

const CONFIG_MODE: u32 = 0o644;

/// Outcome of writing one config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The file already had exactly this content; nothing was touched.
    Unchanged,
    /// The file was (re)written. `backup` holds the previous version, if any.
    Written { backup: Option<PathBuf> },
}

impl Applied {
    pub fn changed(&self) -> bool {
        matches!(self, Applied::Written { .. })
    }
}

/// Puts rendered configuration on disk.
#[derive(Debug, Clone, Default)]
pub struct ConfigWriter;

impl ConfigWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write `content` to `path`.
    ///
    /// Identical content is left alone (no rewrite, no backup). Otherwise the
    /// previous file is copied to `<path>.<YYYYmmdd-HHMMSS>.bak` and the new
    /// content replaces it atomically.
    pub fn apply(&self, path: &Path, content: &str) -> Result<Applied, RenderError> {
        let existing = match fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(source) => {
                return Err(RenderError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        if existing.as_deref() == Some(content) {
            debug!(path = %path.display(), "config unchanged");
            return Ok(Applied::Unchanged);
        }

        let backup = match existing {
            Some(_) => {
                let backup = backup_path(path);
                fs::copy(path, &backup).map_err(|source| RenderError::Io {
                    path: backup.clone(),
                    source,
                })?;
                debug!(path = %path.display(), backup = %backup.display(), "previous config backed up");
                Some(backup)
            }
            None => None,
        };

        atomic_write(path, content.as_bytes(), CONFIG_MODE)?;
        info!(path = %path.display(), "config written");
        Ok(Applied::Written { backup })
    }

    /// [`apply`](Self::apply), then run `validate`; on failure put the
    /// previous state back and return [`RenderError::Rejected`].
    pub fn apply_validated<F>(&self, path: &Path, content: &str, validate: F) -> Result<Applied, RenderError>
    where
        F: FnOnce() -> Result<(), String>,
    {
        let applied = self.apply(path, content)?;
        if !applied.changed() {
            return Ok(applied);
        }
        if let Err(reason) = validate() {
            warn!(path = %path.display(), %reason, "config rejected, rolling back");
            self.restore(path, &applied)?;
            return Err(RenderError::Rejected {
                path: path.to_path_buf(),
                reason,
            });
        }
        Ok(applied)
    }

    /// Undo an [`Applied`] write.
    pub fn restore(&self, path: &Path, applied: &Applied) -> Result<(), RenderError> {
        match applied {
            Applied::Unchanged => Ok(()),
            Applied::Written { backup: Some(backup) } => {
                let previous = fs::read(backup).map_err(|source| RenderError::Io {
                    path: backup.clone(),
                    source,
                })?;
                atomic_write(path, &previous, CONFIG_MODE)?;
                info!(path = %path.display(), backup = %backup.display(), "config restored from backup");
                Ok(())
            }
            Applied::Written { backup: None } => match fs::remove_file(path) {
                Ok(()) => {
                    info!(path = %path.display(), "new config removed");
                    Ok(())
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(RenderError::Io {
                    path: path.to_path_buf(),
                    source,
                }),
            },
        }
    }
}

/// `<path>.<stamp>.bak`, suffixed `-N` if a backup from the same second exists.
fn backup_path(path: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let base = format!("{}.{stamp}", path.display());
    let mut candidate = PathBuf::from(format!("{base}.bak"));
    let mut n = 1;
    while candidate.exists() {
        candidate = PathBuf::from(format!("{base}-{n}.bak"));
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backups(dir: &Path) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|e| e == "bak"))
            .collect();
        found.sort();
        found
    }

    #[test]
    fn first_write_has_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nginx.conf");
        let applied = ConfigWriter::new().apply(&path, "a\n").unwrap();
        assert_eq!(applied, Applied::Written { backup: None });
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\n");
    }

    #[test]
    fn identical_content_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nginx.conf");
        let writer = ConfigWriter::new();
        writer.apply(&path, "a\n").unwrap();
        assert_eq!(writer.apply(&path, "a\n").unwrap(), Applied::Unchanged);
        assert!(backups(dir.path()).is_empty());
    }

    #[test]
    fn changed_content_backs_up_previous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nginx.conf");
        let writer = ConfigWriter::new();
        writer.apply(&path, "old\n").unwrap();
        let applied = writer.apply(&path, "new\n").unwrap();

        let Applied::Written { backup: Some(backup) } = applied else {
            panic!("expected a backup, got {applied:?}");
        };
        assert_eq!(fs::read_to_string(&backup).unwrap(), "old\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
        assert!(backup.file_name().unwrap().to_string_lossy().starts_with("nginx.conf."));
    }

    #[test]
    fn backups_in_the_same_second_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("redis.conf");
        let writer = ConfigWriter::new();
        writer.apply(&path, "1\n").unwrap();
        writer.apply(&path, "2\n").unwrap();
        writer.apply(&path, "3\n").unwrap();
        assert_eq!(backups(dir.path()).len(), 2);
    }

    #[test]
    fn rejected_update_restores_previous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nginx.conf");
        let writer = ConfigWriter::new();
        writer.apply(&path, "good\n").unwrap();

        let err = writer
            .apply_validated(&path, "bad\n", || Err("syntax error".to_string()))
            .unwrap_err();
        assert!(matches!(err, RenderError::Rejected { ref reason, .. } if reason == "syntax error"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "good\n");
    }

    #[test]
    fn rejected_new_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.conf");
        let result = ConfigWriter::new().apply_validated(&path, "bad\n", || Err("nope".to_string()));
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn unchanged_skips_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nginx.conf");
        let writer = ConfigWriter::new();
        writer.apply(&path, "same\n").unwrap();
        let applied = writer
            .apply_validated(&path, "same\n", || panic!("validator must not run"))
            .unwrap();
        assert_eq!(applied, Applied::Unchanged);
    }
}
