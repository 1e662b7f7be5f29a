//! Per-site backups: database dump, files archive, manifest.

use std::fs::{self, File};
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use chrono::Local;
use press_state::file::{OWNER_ONLY, atomic_write};
use press_state::{StateError, TIMESTAMP_FORMAT};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;
use walkdir::WalkDir;

use crate::error::{ProvisionError, ProvisionResult, ToolContext};
use crate::provisioner::Provisioner;

pub const DATABASE_ARTIFACT: &str = "database.sql";
pub const FILES_ARTIFACT: &str = "files.tar.gz";
pub const MANIFEST_FILE: &str = "manifest.json";

/// One file in a backup directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub file: String,
    pub bytes: u64,
    pub sha256: String,
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub domain: String,
    pub database_name: String,
    pub created_at: String,
    pub directory: PathBuf,
    /// Regular files in the site tree at backup time.
    pub file_count: u64,
    pub database: ArtifactInfo,
    pub files: ArtifactInfo,
}

impl Provisioner {
    /// Back up one registered site into `<backup_dir>/<domain>/<stamp>/`.
    pub fn backup_site(&self, domain: &str) -> ProvisionResult<BackupManifest> {
        let domain = press_core::site::validate_domain(domain)?;
        let record = match self.registry.find(&domain) {
            Ok(record) => record,
            Err(StateError::NotFound(d)) => return Err(ProvisionError::SiteNotFound(d)),
            Err(e) => return Err(e.into()),
        };

        let now = Local::now();
        let directory = unique_dir(&self.config.site_backup_dir(&domain), &now.format("%Y%m%d-%H%M%S").to_string());
        fs::create_dir_all(&directory).map_err(|e| ProvisionError::io(&directory, e))?;
        fs::set_permissions(&directory, fs::Permissions::from_mode(0o700))
            .map_err(|e| ProvisionError::io(&directory, e))?;

        let dump = directory.join(DATABASE_ARTIFACT);
        self.host
            .database
            .dump(&record.database_name, &dump)
            .step(format!("dump of {}", record.database_name))?;
        fs::set_permissions(&dump, fs::Permissions::from_mode(OWNER_ONLY))
            .map_err(|e| ProvisionError::io(&dump, e))?;

        let site_root = self.config.site_root(&domain);
        let archive = directory.join(FILES_ARTIFACT);
        self.host
            .archiver
            .archive(&site_root, &archive)
            .step(format!("archive of {}", site_root.display()))?;

        let manifest = BackupManifest {
            domain: domain.clone(),
            database_name: record.database_name,
            created_at: now.naive_local().format(TIMESTAMP_FORMAT).to_string(),
            file_count: count_files(&site_root),
            database: artifact(&dump)?,
            files: artifact(&archive)?,
            directory,
        };
        let json = serde_json::to_string_pretty(&manifest).map_err(|e| ProvisionError::Serialize(e.to_string()))?;
        atomic_write(&manifest.directory.join(MANIFEST_FILE), json.as_bytes(), OWNER_ONLY)?;

        info!(%domain, directory = %manifest.directory.display(), files = manifest.file_count, "backup complete");
        Ok(manifest)
    }

    /// Back up every registered site, stopping at the first failure.
    pub fn backup_all(&self) -> ProvisionResult<Vec<BackupManifest>> {
        self.registry
            .list_all()?
            .iter()
            .map(|record| self.backup_site(&record.domain))
            .collect()
    }
}

fn unique_dir(parent: &Path, stamp: &str) -> PathBuf {
    let mut candidate = parent.join(stamp);
    let mut n = 1;
    while candidate.exists() {
        candidate = parent.join(format!("{stamp}-{n}"));
        n += 1;
    }
    candidate
}

fn count_files(root: &Path) -> u64 {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count() as u64
}

fn artifact(path: &Path) -> ProvisionResult<ArtifactInfo> {
    let mut file = File::open(path).map_err(|e| ProvisionError::io(path, e))?;
    let mut hasher = Sha256::new();
    let bytes = io::copy(&mut file, &mut hasher).map_err(|e| ProvisionError::io(path, e))?;
    Ok(ArtifactInfo {
        file: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        bytes,
        sha256: hex::encode(hasher.finalize()),
    })
}
