//! CredentialStore — append-only log of generated secrets.
//!
//! This is an audit trail for the operator, not a vault: there is no read,
//! update, or delete API. Confidentiality rests on the file mode (0600),
//! which is set when the file is created and asserted again after every
//! append.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{StateError, StateResult};
use crate::file::{FileLock, OWNER_ONLY, ensure_parent_dir};
use crate::types::{CredentialEntry, now};

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a block for `subject` stamped with the current time.
    pub fn append<L, V>(&self, subject: &str, fields: &[(L, V)]) -> StateResult<()>
    where
        L: AsRef<str>,
        V: AsRef<str>,
    {
        let entry = CredentialEntry::new(subject, fields, now())?;
        self.append_entry(&entry)
    }

    pub fn append_entry(&self, entry: &CredentialEntry) -> StateResult<()> {
        let _lock = FileLock::acquire(&self.path)?;
        ensure_parent_dir(&self.path)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .mode(OWNER_ONLY)
            .open(&self.path)
            .map_err(|e| StateError::io(&self.path, e))?;
        file.write_all(entry.to_block().as_bytes())
            .map_err(|e| StateError::io(&self.path, e))?;
        file.sync_all().map_err(|e| StateError::io(&self.path, e))?;
        drop(file);

        // The file may predate us or have been widened by hand.
        fs::set_permissions(&self.path, fs::Permissions::from_mode(OWNER_ONLY))
            .map_err(|e| StateError::io(&self.path, e))?;

        info!(
            subject = %entry.subject,
            fields = entry.fields.len(),
            path = %self.path.display(),
            "credentials recorded"
        );
        Ok(())
    }
}
