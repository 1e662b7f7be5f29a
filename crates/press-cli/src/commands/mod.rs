pub mod allocation;
pub mod config;
pub mod install;
pub mod site;
pub mod status;
pub mod tls;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use press_core::{MIN_RAM_MB, PressConfig, ResourceProbe, ResourceSnapshot, SystemProbe, compute_allocation};
use press_provision::preconditions::{OS_RELEASE_PATH, check_resources, require_root};
use press_provision::{Host, NewSite, Provisioner, StalePolicy};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Text,
    Json,
}

/// Everything the CLI and the menu can ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Install,
    Tune,
    Status { format: Format },
    Allocation { format: Format, cpus: Option<u32>, ram: Option<u64> },
    SiteAdd { site: NewSite, policy: StalePolicy },
    SiteList { format: Format },
    SiteRemove { domain: String },
    SiteReset { domain: String },
    SiteBackup { domain: Option<String> },
    VhostReconfigure { domain: Option<String> },
    TlsIssue { domain: String, email: Option<String> },
    TlsRenew,
    ConfigInit { path: Option<PathBuf>, force: bool },
    ConfigShow,
}

impl Operation {
    /// Operations that change the host need root; reports do not.
    pub fn requires_root(&self) -> bool {
        !matches!(
            self,
            Operation::Status { .. }
                | Operation::Allocation { .. }
                | Operation::SiteList { .. }
                | Operation::ConfigShow
        )
    }

    /// Operations that write configuration derived from the allocation
    /// plan. `Install` checks the floors itself, ahead of the OS check.
    pub fn applies_plan(&self) -> bool {
        matches!(
            self,
            Operation::Tune
                | Operation::SiteAdd { .. }
                | Operation::VhostReconfigure { .. }
                | Operation::TlsIssue { .. }
        )
    }
}

/// One invocation: configuration, the resources probed at startup, and the
/// provisioner built for the resulting plan.
pub struct Session {
    config_path: Option<PathBuf>,
    snapshot: ResourceSnapshot,
    euid: u32,
    os_release: PathBuf,
    provisioner: Provisioner,
}

impl Session {
    /// Load config, probe the host, and wire up the real system tools.
    ///
    /// With `lenient`, an explicitly named config file that does not exist
    /// yet falls back to defaults (for `config init`).
    pub fn from_system(config_path: Option<&Path>, lenient: bool) -> anyhow::Result<Self> {
        let config = match config_path {
            Some(path) if lenient && !path.exists() => PressConfig::default(),
            _ => PressConfig::load(config_path).context("failed to load configuration")?,
        };
        let snapshot = SystemProbe::new(&config.paths.web_root)
            .snapshot()
            .context("failed to probe host resources")?;
        // SAFETY: geteuid has no preconditions and cannot fail.
        let euid = unsafe { libc::geteuid() };
        let host = Host::system(&config);
        let mut session = Self::new(config, host, snapshot, euid);
        session.config_path = config_path.map(Path::to_path_buf);
        Ok(session)
    }

    pub fn new(config: PressConfig, host: Host, snapshot: ResourceSnapshot, euid: u32) -> Self {
        let plan = compute_allocation(&snapshot);
        Self {
            config_path: None,
            snapshot,
            euid,
            os_release: PathBuf::from(OS_RELEASE_PATH),
            provisioner: Provisioner::new(host, config, plan),
        }
    }

    #[cfg(test)]
    pub fn with_os_release(mut self, path: impl Into<PathBuf>) -> Self {
        self.os_release = path.into();
        self
    }

    pub fn config(&self) -> &PressConfig {
        self.provisioner.config()
    }

    pub fn provisioner(&self) -> &Provisioner {
        &self.provisioner
    }

    /// Run one operation, writing its report to `out`.
    pub fn execute(&self, op: Operation, out: &mut dyn Write) -> anyhow::Result<()> {
        if op.requires_root() {
            require_root(self.euid)?;
        }
        if op.applies_plan() {
            check_resources(&self.snapshot, &self.config().requirements)?;
        }
        tracing::debug!(?op, "executing");

        match op {
            Operation::Install => install::install(self, &self.os_release, out),
            Operation::Tune => install::tune(self, out),
            Operation::Status { format } => status::status(self, format, out),
            Operation::Allocation { format, cpus, ram } => {
                let snapshot = ResourceSnapshot::new(
                    cpus.unwrap_or(self.snapshot.cpu_cores),
                    ram.unwrap_or(self.snapshot.total_ram_mb),
                    self.snapshot.available_disk_gb,
                );
                if snapshot.total_ram_mb < MIN_RAM_MB {
                    anyhow::bail!(
                        "{} MB of RAM is below the {MIN_RAM_MB} MB minimum; no plan exists for it",
                        snapshot.total_ram_mb
                    );
                }
                allocation::report(&snapshot, format, out)
            }
            Operation::SiteAdd { site, policy } => site::add(self, &site, policy, out),
            Operation::SiteList { format } => site::list(self, format, out),
            Operation::SiteRemove { domain } => site::remove(self, &domain, out),
            Operation::SiteReset { domain } => site::reset(self, &domain, out),
            Operation::SiteBackup { domain } => site::backup(self, domain.as_deref(), out),
            Operation::VhostReconfigure { domain } => site::reconfigure(self, domain.as_deref(), out),
            Operation::TlsIssue { domain, email } => tls::issue(self, &domain, email.as_deref(), out),
            Operation::TlsRenew => tls::renew(self, out),
            Operation::ConfigInit { path, force } => {
                let target = path
                    .or_else(|| self.config_path.clone())
                    .unwrap_or_else(|| PathBuf::from(press_core::config::DEFAULT_CONFIG_PATH));
                config::init(&target, force, out)
            }
            Operation::ConfigShow => config::show(self.config(), out),
        }
    }
}

pub(crate) fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> anyhow::Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::{session, text};
    use super::*;
    use press_provision::testing::FakeHost;

    #[test]
    fn reports_do_not_need_root() {
        assert!(!Operation::Status { format: Format::Text }.requires_root());
        assert!(!Operation::ConfigShow.requires_root());
        assert!(Operation::Tune.requires_root());
        assert!(Operation::SiteRemove { domain: "a.test".into() }.requires_root());
    }

    #[test]
    fn mutating_operation_as_user_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeHost::new();
        let s = session(dir.path(), &fake, 1000);
        let err = s.execute(Operation::Tune, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("must run as root"));
        assert!(fake.calls().is_empty());
    }

    fn small_session(root: &std::path::Path, fake: &FakeHost) -> Session {
        Session::new(
            PressConfig::rooted_at(root),
            fake.host(),
            ResourceSnapshot::new(1, 256, 40),
            0,
        )
    }

    #[test]
    fn plan_is_never_applied_below_the_ram_floor() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeHost::new();
        let s = small_session(dir.path(), &fake);

        for op in [
            Operation::Tune,
            Operation::VhostReconfigure { domain: None },
            Operation::SiteAdd {
                site: NewSite {
                    domain: "a.test".into(),
                    title: None,
                    admin_user: "admin".into(),
                    admin_email: "ops@a.test".into(),
                },
                policy: StalePolicy::Abort,
            },
        ] {
            let err = s.execute(op, &mut Vec::new()).unwrap_err();
            assert!(err.to_string().contains("below the 512 MB minimum"), "{err}");
        }
        assert!(fake.calls().is_empty());
        assert!(!s.config().registry_path().exists());
    }

    #[test]
    fn allocation_refuses_ram_below_the_floor() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path(), &FakeHost::new(), 1000);
        let err = s
            .execute(
                Operation::Allocation {
                    format: Format::Text,
                    cpus: None,
                    ram: Some(256),
                },
                &mut Vec::new(),
            )
            .unwrap_err();
        assert!(err.to_string().contains("below the 512 MB minimum"));

        let small = small_session(dir.path(), &FakeHost::new());
        let op = Operation::Allocation {
            format: Format::Text,
            cpus: None,
            ram: None,
        };
        assert!(small.execute(op, &mut Vec::new()).is_err());
    }

    #[test]
    fn allocation_overrides_apply_to_probed_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path(), &FakeHost::new(), 1000);
        let mut out = Vec::new();
        s.execute(
            Operation::Allocation {
                format: Format::Json,
                cpus: Some(4),
                ram: Some(8192),
            },
            &mut out,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text(out)).unwrap();
        assert_eq!(value["plan"]["db_buffer_pool_mb"], 3686);
        assert_eq!(value["snapshot"]["available_disk_gb"], 40);
    }
}
