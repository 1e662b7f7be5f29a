//! Service state and configuration drift against the current plan.

use std::fs;
use std::io;
use std::path::PathBuf;

use press_core::Subsystem;
use press_render::{planned_settings, read_setting};
use serde::Serialize;

use crate::error::{ProvisionError, ProvisionResult, ToolContext};
use crate::provisioner::Provisioner;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingStatus {
    pub key: &'static str,
    pub planned: String,
    /// `None` when the key is absent or the file is missing.
    pub live: Option<String>,
}

impl SettingStatus {
    pub fn drifted(&self) -> bool {
        self.live.as_deref() != Some(self.planned.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubsystemStatus {
    pub subsystem: Subsystem,
    pub service: String,
    pub active: bool,
    pub enabled: bool,
    pub config_path: PathBuf,
    pub config_present: bool,
    pub settings: Vec<SettingStatus>,
}

impl SubsystemStatus {
    pub fn drifted(&self) -> bool {
        self.settings.iter().any(SettingStatus::drifted)
    }
}

impl Provisioner {
    /// Read-only report: one entry per subsystem.
    pub fn status(&self) -> ProvisionResult<Vec<SubsystemStatus>> {
        Subsystem::ALL
            .into_iter()
            .map(|subsystem| self.subsystem_status(subsystem))
            .collect()
    }

    fn subsystem_status(&self, subsystem: Subsystem) -> ProvisionResult<SubsystemStatus> {
        let service = self.service(subsystem);
        let active = self
            .host
            .services
            .is_active(&service)
            .step(format!("{service} state query"))?;
        let enabled = self
            .host
            .services
            .is_enabled(&service)
            .step(format!("{service} state query"))?;

        let config_path = self.config.config_path(subsystem);
        let content = match fs::read_to_string(&config_path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(ProvisionError::io(&config_path, e)),
        };

        let settings = planned_settings(subsystem, &self.plan)
            .into_iter()
            .map(|planned| SettingStatus {
                key: planned.key,
                live: content.as_deref().and_then(|c| read_setting(c, planned.key)),
                planned: planned.value,
            })
            .collect();

        Ok(SubsystemStatus {
            subsystem,
            service,
            active,
            enabled,
            config_present: content.is_some(),
            config_path,
            settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use press_core::{PressConfig, ResourceSnapshot, compute_allocation};

    use super::*;
    use crate::testing::FakeHost;

    fn provisioner(root: &Path, fake: &FakeHost, ram: u64) -> Provisioner {
        let plan = compute_allocation(&ResourceSnapshot::new(2, ram, 40));
        Provisioner::new(fake.host(), PressConfig::rooted_at(root), plan)
    }

    #[test]
    fn missing_configs_all_drift() {
        let dir = tempfile::tempdir().unwrap();
        let report = provisioner(dir.path(), &FakeHost::new(), 2048).status().unwrap();
        assert_eq!(report.len(), 4);
        assert!(report.iter().all(|s| !s.config_present && s.drifted() && !s.active));
    }

    #[test]
    fn tuned_host_has_no_drift_until_plan_changes() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeHost::new();
        provisioner(dir.path(), &fake, 2048).tune().unwrap();

        let report = provisioner(dir.path(), &fake, 2048).status().unwrap();
        assert!(report.iter().all(|s| !s.drifted()));

        let bigger = provisioner(dir.path(), &fake, 8192).status().unwrap();
        let db = bigger.iter().find(|s| s.subsystem == Subsystem::Database).unwrap();
        let pool = db.settings.iter().find(|s| s.key == "innodb_buffer_pool_size").unwrap();
        assert_eq!(pool.live.as_deref(), Some("800M"));
        assert_eq!(pool.planned, "3686M");
        assert!(pool.drifted());
    }

    #[test]
    fn hand_edit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeHost::new();
        let p = provisioner(dir.path(), &fake, 2048);
        p.tune().unwrap();
        let cache = p.config().config_path(Subsystem::Cache);
        let edited = fs::read_to_string(&cache).unwrap().replace("maxmemory 128mb", "maxmemory 1gb");
        fs::write(&cache, edited).unwrap();

        let report = p.status().unwrap();
        let cache_status = report.iter().find(|s| s.subsystem == Subsystem::Cache).unwrap();
        assert!(cache_status.drifted());
        assert!(cache_status.active);
    }
}
