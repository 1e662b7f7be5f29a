//! First-time host setup.

use press_core::{ResourceSnapshot, Subsystem};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ProvisionError, ProvisionResult, ToolContext};
use crate::preconditions::{OsRelease, check_connectivity, check_os, check_resources};
use crate::provisioner::Provisioner;
use crate::tune::TuneOutcome;

/// A group of packages installed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSet {
    pub name: &'static str,
    pub packages: Vec<String>,
    /// Failure of a required set aborts the bootstrap; optional sets only warn.
    pub required: bool,
}

pub fn package_sets(php_version: &str) -> Vec<PackageSet> {
    let php: Vec<String> = ["fpm", "mysql", "curl", "gd", "mbstring", "xml", "zip", "intl", "redis"]
        .iter()
        .map(|ext| format!("php{php_version}-{ext}"))
        .collect();
    let owned = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();

    vec![
        PackageSet {
            name: "web",
            packages: owned(&["nginx"]),
            required: true,
        },
        PackageSet {
            name: "database",
            packages: owned(&["mariadb-server", "mariadb-client"]),
            required: true,
        },
        PackageSet {
            name: "php",
            packages: php,
            required: true,
        },
        PackageSet {
            name: "cache",
            packages: owned(&["redis-server"]),
            required: true,
        },
        PackageSet {
            name: "tools",
            packages: owned(&["curl", "tar", "certbot"]),
            required: true,
        },
        PackageSet {
            name: "monitoring",
            packages: owned(&["htop", "iotop", "sysstat"]),
            required: false,
        },
    ]
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    /// Packages newly installed.
    pub installed: Vec<String>,
    /// Optional sets that failed to install.
    pub skipped_sets: Vec<String>,
    pub tuning: Vec<TuneOutcome>,
    pub services: Vec<String>,
}

impl Provisioner {
    /// Check the host, install the stack, write configuration for the plan,
    /// and enable and start every service.
    ///
    /// Safe to rerun: installed packages are skipped and unchanged configs
    /// are left alone.
    pub fn bootstrap(&self, snapshot: &ResourceSnapshot, os: &OsRelease) -> ProvisionResult<BootstrapReport> {
        let requirements = &self.config.requirements;
        check_resources(snapshot, requirements)?;
        check_os(os, &requirements.supported_os)?;
        check_connectivity(&self.host)?;

        let _lock = self.run_lock()?;
        let mut report = BootstrapReport::default();

        for set in package_sets(&self.config.php.version) {
            let mut missing = Vec::new();
            for package in &set.packages {
                let installed = self
                    .host
                    .packages
                    .is_installed(package)
                    .step(format!("package query for {package}"))?;
                if !installed {
                    missing.push(package.clone());
                }
            }
            if missing.is_empty() {
                continue;
            }

            match self.host.packages.install(&missing) {
                Ok(()) => {
                    info!(set = set.name, count = missing.len(), "packages installed");
                    report.installed.extend(missing);
                }
                Err(e) if !set.required => {
                    warn!(set = set.name, error = %e, "optional packages skipped");
                    report.skipped_sets.push(set.name.to_string());
                }
                Err(source) => {
                    return Err(ProvisionError::Tool {
                        action: format!("{} package install", set.name),
                        source,
                    });
                }
            }
        }

        report.tuning = self.apply_plan()?;

        for subsystem in Subsystem::ALL {
            let service = self.service(subsystem);
            self.host
                .services
                .enable(&service)
                .step(format!("{service} enable"))?;
            self.host
                .services
                .start(&service)
                .step(format!("{service} start"))?;
            report.services.push(service);
        }
        info!(tier = self.plan.tier.label(), "bootstrap complete");
        Ok(report)
    }
}
