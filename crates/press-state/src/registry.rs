//! SiteRegistry — the list of provisioned sites.
//!
//! Backed by a human-editable text file:
//!
//! ```text
//! # domain|database_name|database_user|created_at
//! example.com|wp_example_com|wp_example_com|2026-10-18 09:30:00
//! ```
//!
//! Comment lines and lines that fail to parse are kept verbatim when the
//! file is rewritten, so hand edits are never silently dropped.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{StateError, StateResult};
use crate::file::{FileLock, atomic_write, read_or_empty};
use crate::types::{SiteRecord, now};

const HEADER: &str = "# domain|database_name|database_user|created_at";
const REGISTRY_MODE: u32 = 0o644;

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Record(SiteRecord),
    /// Comments, blank lines, and unparseable lines, preserved as-is.
    Verbatim(String),
}

/// In-memory view of the registry file.
#[derive(Debug, Default)]
struct RegistryFile {
    lines: Vec<Line>,
}

impl RegistryFile {
    fn parse(path: &Path, content: &str) -> Self {
        let lines = content
            .lines()
            .enumerate()
            .map(|(index, raw)| {
                let trimmed = raw.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    return Line::Verbatim(raw.to_string());
                }
                match SiteRecord::parse_line(trimmed) {
                    Some(record) => Line::Record(record),
                    None => {
                        warn!(
                            path = %path.display(),
                            line = index + 1,
                            "skipping malformed registry line"
                        );
                        Line::Verbatim(raw.to_string())
                    }
                }
            })
            .collect();
        Self { lines }
    }

    fn records(&self) -> impl Iterator<Item = &SiteRecord> {
        self.lines.iter().filter_map(|line| match line {
            Line::Record(record) => Some(record),
            Line::Verbatim(_) => None,
        })
    }

    fn render(&self) -> String {
        let mut out = String::new();
        if !matches!(self.lines.first(), Some(Line::Verbatim(l)) if l.starts_with('#')) {
            out.push_str(HEADER);
            out.push('\n');
        }
        for line in &self.lines {
            match line {
                Line::Record(record) => out.push_str(&record.to_line()),
                Line::Verbatim(raw) => out.push_str(raw),
            }
            out.push('\n');
        }
        out
    }
}

/// File-backed registry of hosted sites.
///
/// Mutations take the registry lock for their whole load → mutate → write
/// cycle. Reads take no lock, so unprivileged callers can list sites; the
/// handle itself holds no cached state.
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    path: PathBuf,
}

impl SiteRegistry {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StateResult<RegistryFile> {
        let content = read_or_empty(&self.path)?;
        Ok(RegistryFile::parse(&self.path, &content))
    }

    fn store(&self, file: &RegistryFile) -> StateResult<()> {
        atomic_write(&self.path, file.render().as_bytes(), REGISTRY_MODE)
    }

    /// Register a new site stamped with the current time.
    ///
    /// Fails with [`StateError::DuplicateDomain`] if the domain is already
    /// registered; replacing a site requires an explicit [`remove`](Self::remove).
    pub fn add(
        &self,
        domain: &str,
        database_name: &str,
        database_user: &str,
    ) -> StateResult<SiteRecord> {
        let record = SiteRecord::new(domain, database_name, database_user, now())?;
        self.insert(record.clone())?;
        Ok(record)
    }

    /// Register a prepared record (explicit timestamp).
    pub fn insert(&self, record: SiteRecord) -> StateResult<()> {
        let _lock = FileLock::acquire(&self.path)?;
        let mut file = self.load()?;
        if file.records().any(|r| r.domain == record.domain) {
            return Err(StateError::DuplicateDomain(record.domain));
        }
        info!(domain = %record.domain, database = %record.database_name, "registering site");
        file.lines.push(Line::Record(record));
        self.store(&file)
    }

    /// Look up a site by exact domain.
    pub fn find(&self, domain: &str) -> StateResult<SiteRecord> {
        self.load()?
            .records()
            .find(|r| r.domain == domain)
            .cloned()
            .ok_or_else(|| StateError::NotFound(domain.to_string()))
    }

    pub fn contains(&self, domain: &str) -> StateResult<bool> {
        match self.find(domain) {
            Ok(_) => Ok(true),
            Err(StateError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remove a site by exact domain, returning the removed record.
    pub fn remove(&self, domain: &str) -> StateResult<SiteRecord> {
        let _lock = FileLock::acquire(&self.path)?;
        let mut file = self.load()?;
        let position = file
            .lines
            .iter()
            .position(|line| matches!(line, Line::Record(r) if r.domain == domain))
            .ok_or_else(|| StateError::NotFound(domain.to_string()))?;
        let Line::Record(removed) = file.lines.remove(position) else {
            unreachable!("position matched a record line");
        };
        self.store(&file)?;
        info!(%domain, "site unregistered");
        Ok(removed)
    }

    /// All registered sites in insertion order.
    pub fn list_all(&self) -> StateResult<Vec<SiteRecord>> {
        let records: Vec<SiteRecord> = self.load()?.records().cloned().collect();
        debug!(count = records.len(), "registry listed");
        Ok(records)
    }
}
