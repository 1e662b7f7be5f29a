//! Checks that must pass before anything on the host is changed.

use std::path::Path;

use press_core::config::{OsRequirement, RequirementsConfig};
use press_core::ResourceSnapshot;
use semver::Version;
use tracing::{debug, info};

use crate::error::{ProvisionError, ProvisionResult};
use crate::host::Host;

pub const OS_RELEASE_PATH: &str = "/etc/os-release";

pub fn require_root(euid: u32) -> ProvisionResult<()> {
    if euid != 0 {
        return Err(ProvisionError::Precondition(format!(
            "must run as root (effective uid is {euid})"
        )));
    }
    Ok(())
}

/// RAM and free disk against the configured floors.
pub fn check_resources(snapshot: &ResourceSnapshot, requirements: &RequirementsConfig) -> ProvisionResult<()> {
    if snapshot.total_ram_mb < requirements.min_ram_mb {
        return Err(ProvisionError::Precondition(format!(
            "{} MB of RAM is below the {} MB minimum",
            snapshot.total_ram_mb, requirements.min_ram_mb
        )));
    }
    if snapshot.available_disk_gb < requirements.min_disk_gb {
        return Err(ProvisionError::Precondition(format!(
            "{} GB of free disk is below the {} GB minimum",
            snapshot.available_disk_gb, requirements.min_disk_gb
        )));
    }
    debug!(ram_mb = snapshot.total_ram_mb, disk_gb = snapshot.available_disk_gb, "resources ok");
    Ok(())
}

/// Distribution identity from os-release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsRelease {
    pub id: String,
    pub version_id: String,
}

impl OsRelease {
    pub fn parse(text: &str) -> Option<Self> {
        let mut id = None;
        let mut version_id = None;
        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'').to_string();
            match key.trim() {
                "ID" => id = Some(value),
                "VERSION_ID" => version_id = Some(value),
                _ => {}
            }
        }
        Some(Self {
            id: id?,
            version_id: version_id?,
        })
    }

    pub fn read(path: &Path) -> ProvisionResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ProvisionError::io(path, e))?;
        Self::parse(&text).ok_or_else(|| {
            ProvisionError::Precondition(format!("{} has no ID or VERSION_ID", path.display()))
        })
    }
}

/// `22.04` → 22.4.0, `12` → 12.0.0. Leading zeros are dropped, which keeps
/// ordering intact for distribution release numbers.
fn release_version(value: &str) -> Option<Version> {
    let mut parts = value.split('.').map(|p| p.parse::<u64>());
    let major = parts.next()?.ok()?;
    let minor = match parts.next() {
        Some(p) => p.ok()?,
        None => 0,
    };
    let patch = match parts.next() {
        Some(p) => p.ok()?,
        None => 0,
    };
    Some(Version::new(major, minor, patch))
}

pub fn check_os(release: &OsRelease, supported: &[OsRequirement]) -> ProvisionResult<()> {
    let unsupported = || {
        let accepted: Vec<String> = supported
            .iter()
            .map(|r| format!("{} {}+", r.id, r.min_version))
            .collect();
        ProvisionError::Precondition(format!(
            "unsupported OS {} {} (supported: {})",
            release.id,
            release.version_id,
            accepted.join(", ")
        ))
    };

    let Some(requirement) = supported.iter().find(|r| r.id == release.id) else {
        return Err(unsupported());
    };
    let (Some(found), Some(minimum)) = (
        release_version(&release.version_id),
        release_version(&requirement.min_version),
    ) else {
        return Err(unsupported());
    };
    if found < minimum {
        return Err(unsupported());
    }
    info!(os = %release.id, version = %release.version_id, "operating system supported");
    Ok(())
}

pub fn check_connectivity(host: &Host) -> ProvisionResult<()> {
    host.network
        .check()
        .map_err(|e| ProvisionError::Precondition(format!("no network connectivity: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;

    #[test]
    fn root_is_required() {
        assert!(require_root(0).is_ok());
        assert!(matches!(require_root(1000), Err(ProvisionError::Precondition(_))));
    }

    #[test]
    fn resource_floors() {
        let req = RequirementsConfig::default();
        assert!(check_resources(&ResourceSnapshot::new(1, 512, 5), &req).is_ok());
        assert!(check_resources(&ResourceSnapshot::new(1, 511, 50), &req).is_err());
        assert!(check_resources(&ResourceSnapshot::new(4, 8192, 4), &req).is_err());
    }

    #[test]
    fn parses_os_release() {
        let text = "NAME=\"Ubuntu\"\nVERSION_ID=\"24.04\"\nID=ubuntu\nID_LIKE=debian\n";
        let release = OsRelease::parse(text).unwrap();
        assert_eq!(release.id, "ubuntu");
        assert_eq!(release.version_id, "24.04");
        assert_eq!(OsRelease::parse("NAME=Arch\nID=arch\n"), None);
    }

    #[test]
    fn os_versions_compare_numerically() {
        let supported = RequirementsConfig::default().supported_os;
        let os = |id: &str, v: &str| OsRelease {
            id: id.into(),
            version_id: v.into(),
        };
        assert!(check_os(&os("ubuntu", "22.04"), &supported).is_ok());
        assert!(check_os(&os("ubuntu", "24.10"), &supported).is_ok());
        assert!(check_os(&os("ubuntu", "20.04"), &supported).is_err());
        assert!(check_os(&os("debian", "12"), &supported).is_ok());
        assert!(check_os(&os("debian", "11"), &supported).is_err());
        assert!(check_os(&os("fedora", "40"), &supported).is_err());
        assert!(check_os(&os("debian", "trixie"), &supported).is_err());
    }

    #[test]
    fn connectivity_failure_is_a_precondition() {
        let fake = FakeHost::new();
        fake.fail("connectivity");
        assert!(matches!(
            check_connectivity(&fake.host()),
            Err(ProvisionError::Precondition(_))
        ));
    }
}
