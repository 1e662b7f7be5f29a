//! Recording host double for workflow tests.
//!
//! Every tool call is appended to a shared log as `verb:argument` and
//! succeeds unless a failure prefix registered with [`FakeHost::fail`]
//! matches it. Tools that would produce files (downloads, dumps, archives,
//! certificates) create small placeholder files so later steps see them.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use press_core::Subsystem;

use crate::host::{
    AppInstaller, Archiver, CertificateClient, ConfigValidator, Connectivity, DatabaseClient, Host,
    PackageManager, ServiceManager, ToolError, WordPressSettings,
};

#[derive(Debug, Default)]
struct Recorded {
    calls: Vec<String>,
    failures: Vec<String>,
    sql: Vec<String>,
    installed: HashSet<String>,
    active: HashSet<String>,
    enabled: HashSet<String>,
}

#[derive(Debug, Clone)]
pub struct FakeHost {
    state: Arc<Mutex<Recorded>>,
    has_cli: bool,
    live_dir: Option<PathBuf>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            has_cli: true,
            live_dir: None,
        }
    }

    /// Pretend the WordPress CLI is missing (plain archive fallback).
    pub fn without_cli(mut self) -> Self {
        self.has_cli = false;
        self
    }

    /// Write issued certificates under `live_dir`, as the ACME client would.
    pub fn with_live_dir(mut self, live_dir: impl Into<PathBuf>) -> Self {
        self.live_dir = Some(live_dir.into());
        self
    }

    /// Make every call whose key starts with `prefix` fail.
    pub fn fail(&self, prefix: &str) {
        self.lock().failures.push(prefix.to_string());
    }

    /// Mark packages as already installed.
    pub fn preinstall(&self, packages: &[&str]) {
        self.lock().installed.extend(packages.iter().map(|p| p.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn called(&self, key: &str) -> bool {
        self.lock().calls.iter().any(|c| c == key)
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// SQL scripts passed to the database client, in order.
    pub fn sql(&self) -> Vec<String> {
        self.lock().sql.clone()
    }

    pub fn clear(&self) {
        self.lock().calls.clear();
        self.lock().sql.clear();
    }

    /// A [`Host`] whose every tool is this double.
    pub fn host(&self) -> Host {
        Host {
            packages: Box::new(self.clone()),
            services: Box::new(self.clone()),
            validator: Box::new(self.clone()),
            database: Box::new(self.clone()),
            certificates: Box::new(self.clone()),
            installer: Box::new(self.clone()),
            archiver: Box::new(self.clone()),
            network: Box::new(self.clone()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, key: String) -> Result<(), ToolError> {
        let mut state = self.lock();
        let failing = state.failures.iter().any(|f| key.starts_with(f.as_str()));
        state.calls.push(key.clone());
        if failing {
            return Err(ToolError::Failed {
                command: key,
                code: 1,
                stderr: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

fn subsystem_key(subsystem: Subsystem) -> &'static str {
    match subsystem {
        Subsystem::WebServer => "web_server",
        Subsystem::Runtime => "runtime",
        Subsystem::Database => "database",
        Subsystem::Cache => "cache",
    }
}

fn placeholder(path: &Path, content: &str) -> Result<(), ToolError> {
    let io_err = |e: std::io::Error| ToolError::Unavailable(format!("{}: {e}", path.display()));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, content).map_err(io_err)
}

impl PackageManager for FakeHost {
    fn install(&self, packages: &[String]) -> Result<(), ToolError> {
        self.record(format!("install:{}", packages.join(" ")))?;
        self.lock().installed.extend(packages.iter().cloned());
        Ok(())
    }

    fn is_installed(&self, package: &str) -> Result<bool, ToolError> {
        Ok(self.lock().installed.contains(package))
    }
}

impl ServiceManager for FakeHost {
    fn start(&self, service: &str) -> Result<(), ToolError> {
        self.record(format!("start:{service}"))?;
        self.lock().active.insert(service.to_string());
        Ok(())
    }

    fn enable(&self, service: &str) -> Result<(), ToolError> {
        self.record(format!("enable:{service}"))?;
        self.lock().enabled.insert(service.to_string());
        Ok(())
    }

    fn restart(&self, service: &str) -> Result<(), ToolError> {
        self.record(format!("restart:{service}"))?;
        self.lock().active.insert(service.to_string());
        Ok(())
    }

    fn reload(&self, service: &str) -> Result<(), ToolError> {
        self.record(format!("reload:{service}"))
    }

    fn is_active(&self, service: &str) -> Result<bool, ToolError> {
        Ok(self.lock().active.contains(service))
    }

    fn is_enabled(&self, service: &str) -> Result<bool, ToolError> {
        Ok(self.lock().enabled.contains(service))
    }
}

impl ConfigValidator for FakeHost {
    fn validate(&self, subsystem: Subsystem) -> Result<(), ToolError> {
        self.record(format!("validate:{}", subsystem_key(subsystem)))
    }
}

impl DatabaseClient for FakeHost {
    fn execute(&self, sql: &str) -> Result<(), ToolError> {
        self.record("execute".to_string())?;
        self.lock().sql.push(sql.to_string());
        Ok(())
    }

    fn dump(&self, database: &str, dest: &Path) -> Result<(), ToolError> {
        self.record(format!("dump:{database}"))?;
        placeholder(dest, &format!("-- dump of {database}\n"))
    }
}

impl CertificateClient for FakeHost {
    fn issue(&self, domain: &str, aliases: &[String], email: &str, _webroot: &Path) -> Result<(), ToolError> {
        let mut names = vec![domain.to_string()];
        names.extend(aliases.iter().cloned());
        self.record(format!("issue:{} <{email}>", names.join(",")))?;
        if let Some(live) = &self.live_dir {
            placeholder(&live.join(domain).join("fullchain.pem"), "CERTIFICATE\n")?;
            placeholder(&live.join(domain).join("privkey.pem"), "KEY\n")?;
        }
        Ok(())
    }

    fn renew(&self) -> Result<(), ToolError> {
        self.record("renew".to_string())
    }
}

impl AppInstaller for FakeHost {
    fn has_cli(&self) -> bool {
        self.has_cli
    }

    fn download(&self, dest: &Path) -> Result<(), ToolError> {
        self.record(format!("download:{}", dest.display()))?;
        placeholder(&dest.join("index.php"), "<?php\n")
    }

    fn download_archive(&self, dest: &Path) -> Result<(), ToolError> {
        self.record(format!("download_archive:{}", dest.display()))?;
        placeholder(&dest.join("index.php"), "<?php\n")?;
        placeholder(
            &dest.join("wp-config-sample.php"),
            "<?php\n\
             define( 'DB_NAME', 'database_name_here' );\n\
             define( 'DB_USER', 'username_here' );\n\
             define( 'DB_PASSWORD', 'password_here' );\n\
             define( 'AUTH_KEY',         'put your unique phrase here' );\n\
             define( 'SECURE_AUTH_KEY',  'put your unique phrase here' );\n",
        )
    }

    fn configure(&self, dest: &Path, settings: &WordPressSettings) -> Result<(), ToolError> {
        self.record(format!("configure:{}", settings.url))?;
        placeholder(
            &dest.join("wp-config.php"),
            &format!("<?php\ndefine( 'DB_NAME', '{}' );\n", settings.db_name),
        )
    }

    fn set_owner(&self, dest: &Path, user: &str) -> Result<(), ToolError> {
        self.record(format!("set_owner:{user}:{}", dest.display()))
    }
}

impl Archiver for FakeHost {
    fn archive(&self, source_dir: &Path, dest: &Path) -> Result<(), ToolError> {
        self.record(format!("archive:{}", source_dir.display()))?;
        placeholder(dest, "fake tarball\n")
    }
}

impl Connectivity for FakeHost {
    fn check(&self) -> Result<(), ToolError> {
        self.record("connectivity".to_string())
    }
}
