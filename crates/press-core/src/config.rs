//! press.toml configuration parser.
//!
//! Every field has a default matching a stock Debian/Ubuntu layout, so a
//! missing file or a partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::types::Subsystem;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "PRESSGRID_CONFIG";

/// System-wide config location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/pressgrid/press.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressConfig {
    pub paths: PathsConfig,
    pub web: WebConfig,
    pub php: PhpConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub tls: TlsConfig,
    pub requirements: RequirementsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Holds the site registry and credential log.
    pub state_dir: PathBuf,
    /// Each site lives in `<web_root>/<domain>`.
    pub web_root: PathBuf,
    pub backup_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("/var/lib/pressgrid"),
            web_root: PathBuf::from("/var/www"),
            backup_dir: PathBuf::from("/var/backups/pressgrid"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub nginx_dir: PathBuf,
    pub user: String,
    pub service: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            nginx_dir: PathBuf::from("/etc/nginx"),
            user: "www-data".to_string(),
            service: "nginx".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhpConfig {
    pub version: String,
    /// Defaults to `/etc/php/<version>/fpm`.
    pub fpm_dir: Option<PathBuf>,
}

impl Default for PhpConfig {
    fn default() -> Self {
        Self {
            version: "8.3".to_string(),
            fpm_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub config_path: PathBuf,
    pub service: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("/etc/mysql/mariadb.conf.d/60-pressgrid.cnf"),
            service: "mariadb".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub config_path: PathBuf,
    pub service: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("/etc/redis/redis.conf"),
            service: "redis-server".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Certificate client output, `<live_dir>/<domain>/fullchain.pem`.
    pub live_dir: PathBuf,
    /// Contact email used when none is given on the command line.
    pub email: Option<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            live_dir: PathBuf::from("/etc/letsencrypt/live"),
            email: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequirementsConfig {
    pub min_ram_mb: u64,
    pub min_disk_gb: u64,
    pub supported_os: Vec<OsRequirement>,
}

impl Default for RequirementsConfig {
    fn default() -> Self {
        Self {
            min_ram_mb: crate::types::MIN_RAM_MB,
            min_disk_gb: 5,
            supported_os: vec![
                OsRequirement {
                    id: "ubuntu".to_string(),
                    min_version: "22.04".to_string(),
                },
                OsRequirement {
                    id: "debian".to_string(),
                    min_version: "12".to_string(),
                },
            ],
        }
    }
}

/// A distribution accepted by the OS precondition check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsRequirement {
    /// `ID` from `/etc/os-release`.
    pub id: String,
    /// Lowest accepted `VERSION_ID`.
    pub min_version: String,
}

impl PressConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PressConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Resolve the config: explicit path, then `$PRESSGRID_CONFIG`, then
    /// the system path, then built-in defaults.
    ///
    /// An explicitly named file must exist; the fallbacks may be absent.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        let system = Path::new(DEFAULT_CONFIG_PATH);
        if system.is_file() {
            debug!(path = %system.display(), "loading system config");
            return Self::from_file(system);
        }
        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    // ── State ──────────────────────────────────────────────────────

    pub fn registry_path(&self) -> PathBuf {
        self.paths.state_dir.join("sites.registry")
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.paths.state_dir.join("credentials.log")
    }

    pub fn site_root(&self, domain: &str) -> PathBuf {
        self.paths.web_root.join(domain)
    }

    pub fn site_backup_dir(&self, domain: &str) -> PathBuf {
        self.paths.backup_dir.join(domain)
    }

    // ── Web server ─────────────────────────────────────────────────

    pub fn nginx_conf_path(&self) -> PathBuf {
        self.web.nginx_dir.join("nginx.conf")
    }

    pub fn site_available_path(&self, domain: &str) -> PathBuf {
        self.web
            .nginx_dir
            .join("sites-available")
            .join(format!("{domain}.conf"))
    }

    pub fn site_enabled_path(&self, domain: &str) -> PathBuf {
        self.web
            .nginx_dir
            .join("sites-enabled")
            .join(format!("{domain}.conf"))
    }

    // ── PHP runtime ────────────────────────────────────────────────

    pub fn php_fpm_dir(&self) -> PathBuf {
        self.php
            .fpm_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("/etc/php/{}/fpm", self.php.version)))
    }

    pub fn php_pool_path(&self) -> PathBuf {
        self.php_fpm_dir().join("pool.d").join("www.conf")
    }

    pub fn php_socket(&self) -> String {
        format!("/run/php/php{}-fpm.sock", self.php.version)
    }

    pub fn php_fpm_binary(&self) -> String {
        format!("php-fpm{}", self.php.version)
    }

    // ── TLS ────────────────────────────────────────────────────────

    pub fn certificate_path(&self, domain: &str) -> PathBuf {
        self.tls.live_dir.join(domain).join("fullchain.pem")
    }

    pub fn certificate_key_path(&self, domain: &str) -> PathBuf {
        self.tls.live_dir.join(domain).join("privkey.pem")
    }

    pub fn has_certificate(&self, domain: &str) -> bool {
        self.certificate_path(domain).is_file()
    }

    // ── Subsystems ─────────────────────────────────────────────────

    /// systemd unit name for a subsystem.
    pub fn service_name(&self, subsystem: Subsystem) -> String {
        match subsystem {
            Subsystem::WebServer => self.web.service.clone(),
            Subsystem::Runtime => self.php_fpm_binary(),
            Subsystem::Database => self.database.service.clone(),
            Subsystem::Cache => self.cache.service.clone(),
        }
    }

    /// Generated global config file for a subsystem.
    pub fn config_path(&self, subsystem: Subsystem) -> PathBuf {
        match subsystem {
            Subsystem::WebServer => self.nginx_conf_path(),
            Subsystem::Runtime => self.php_pool_path(),
            Subsystem::Database => self.database.config_path.clone(),
            Subsystem::Cache => self.cache.config_path.clone(),
        }
    }

    /// A config with every managed path rooted under `root` (for tests and dry runs).
    pub fn rooted_at(root: &Path) -> Self {
        let mut config = Self::default();
        config.paths = PathsConfig {
            state_dir: root.join("state"),
            web_root: root.join("www"),
            backup_dir: root.join("backups"),
        };
        config.web.nginx_dir = root.join("nginx");
        config.php.fpm_dir = Some(root.join("php-fpm"));
        config.database.config_path = root.join("mysql").join("60-pressgrid.cnf");
        config.cache.config_path = root.join("redis").join("redis.conf");
        config.tls.live_dir = root.join("letsencrypt").join("live");
        config
    }
}
