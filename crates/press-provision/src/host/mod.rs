//! Capability traits for the external tools a host provides.
//!
//! [`system`] implements them by spawning the stock Debian tools; tests use
//! `testing::FakeHost`.

pub mod system;

use std::path::Path;

use press_core::Subsystem;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("could not run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {code}: {stderr}")]
    Failed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("{0}")]
    Unavailable(String),
}

/// Package installation (apt).
pub trait PackageManager {
    /// Install all of `packages`; fails if any of them cannot be installed.
    fn install(&self, packages: &[String]) -> Result<(), ToolError>;
    fn is_installed(&self, package: &str) -> Result<bool, ToolError>;
}

/// Service lifecycle (systemd).
pub trait ServiceManager {
    fn start(&self, service: &str) -> Result<(), ToolError>;
    fn enable(&self, service: &str) -> Result<(), ToolError>;
    fn restart(&self, service: &str) -> Result<(), ToolError>;
    fn reload(&self, service: &str) -> Result<(), ToolError>;
    fn is_active(&self, service: &str) -> Result<bool, ToolError>;
    fn is_enabled(&self, service: &str) -> Result<bool, ToolError>;
}

/// Offline syntax check of a subsystem's configuration.
pub trait ConfigValidator {
    fn validate(&self, subsystem: Subsystem) -> Result<(), ToolError>;
}

/// Administrative access to the local database server.
pub trait DatabaseClient {
    fn execute(&self, sql: &str) -> Result<(), ToolError>;
    /// Write a logical dump of `database` to `dest`.
    fn dump(&self, database: &str, dest: &Path) -> Result<(), ToolError>;
}

/// TLS certificate authority client (ACME).
pub trait CertificateClient {
    /// Obtain a certificate covering `domain` and `aliases`, non-interactively.
    fn issue(&self, domain: &str, aliases: &[String], email: &str, webroot: &Path) -> Result<(), ToolError>;
    fn renew(&self) -> Result<(), ToolError>;
}

/// Settings for a first-run WordPress install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordPressSettings {
    pub url: String,
    pub title: String,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub admin_user: String,
    pub admin_password: String,
    pub admin_email: String,
}

/// WordPress download and first-run configuration.
pub trait AppInstaller {
    /// Whether the WordPress CLI is available.
    fn has_cli(&self) -> bool;
    /// Download core into `dest` using the CLI.
    fn download(&self, dest: &Path) -> Result<(), ToolError>;
    /// Download and unpack the plain release archive into `dest`.
    fn download_archive(&self, dest: &Path) -> Result<(), ToolError>;
    /// Create wp-config.php and run the first-run installer using the CLI.
    fn configure(&self, dest: &Path, settings: &WordPressSettings) -> Result<(), ToolError>;
    /// Hand the site tree to the web server user.
    fn set_owner(&self, dest: &Path, user: &str) -> Result<(), ToolError>;
}

/// Compressed archives of site files.
pub trait Archiver {
    fn archive(&self, source_dir: &Path, dest: &Path) -> Result<(), ToolError>;
}

/// Outbound reachability of the download and certificate endpoints.
pub trait Connectivity {
    fn check(&self) -> Result<(), ToolError>;
}

/// Every tool the workflows need, behind trait objects.
pub struct Host {
    pub packages: Box<dyn PackageManager>,
    pub services: Box<dyn ServiceManager>,
    pub validator: Box<dyn ConfigValidator>,
    pub database: Box<dyn DatabaseClient>,
    pub certificates: Box<dyn CertificateClient>,
    pub installer: Box<dyn AppInstaller>,
    pub archiver: Box<dyn Archiver>,
    pub network: Box<dyn Connectivity>,
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}
