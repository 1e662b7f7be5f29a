//! Regenerate subsystem configuration from the plan.

use std::path::PathBuf;

use press_core::Subsystem;
use press_render::{Applied, ConfigTarget, render};
use serde::Serialize;
use tracing::info;

use crate::error::{ProvisionResult, ToolContext};
use crate::provisioner::Provisioner;

/// What happened to one subsystem during tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TuneOutcome {
    pub subsystem: Subsystem,
    pub path: PathBuf,
    pub changed: bool,
    pub backup: Option<PathBuf>,
    /// `reload` or `restart` when the service was told about the change.
    pub service_action: Option<&'static str>,
}

impl Provisioner {
    /// Write all four global configs for the current plan, validating each
    /// and signalling only the services whose file changed.
    ///
    /// Stops at the first rejected file; that file is restored and earlier
    /// subsystems keep their new configuration.
    pub fn tune(&self) -> ProvisionResult<Vec<TuneOutcome>> {
        let _lock = self.run_lock()?;
        self.apply_plan()
    }

    pub(crate) fn apply_plan(&self) -> ProvisionResult<Vec<TuneOutcome>> {
        info!(tier = self.plan.tier.label(), "applying allocation plan");
        Subsystem::ALL
            .into_iter()
            .map(|subsystem| self.apply_subsystem(subsystem))
            .collect()
    }

    fn apply_subsystem(&self, subsystem: Subsystem) -> ProvisionResult<TuneOutcome> {
        let target = ConfigTarget::for_subsystem(subsystem);
        let path = target.path(&self.config);
        let content = render(&target, &self.plan, &self.config);

        let applied = self.writer.apply_validated(&path, &content, || {
            self.host.validator.validate(subsystem).map_err(|e| e.to_string())
        })?;

        let backup = match &applied {
            Applied::Written { backup } => backup.clone(),
            Applied::Unchanged => None,
        };
        let service_action = if applied.changed() {
            Some(self.signal(subsystem)?)
        } else {
            None
        };

        Ok(TuneOutcome {
            subsystem,
            changed: applied.changed(),
            path,
            backup,
            service_action,
        })
    }

    /// nginx and PHP-FPM pick up new config gracefully; MariaDB and Redis
    /// only read theirs at startup.
    fn signal(&self, subsystem: Subsystem) -> ProvisionResult<&'static str> {
        let service = self.service(subsystem);
        match subsystem {
            Subsystem::WebServer | Subsystem::Runtime => {
                self.host
                    .services
                    .reload(&service)
                    .step(format!("{service} reload"))?;
                info!(%service, "reloaded");
                Ok("reload")
            }
            Subsystem::Database | Subsystem::Cache => {
                self.host
                    .services
                    .restart(&service)
                    .step(format!("{service} restart"))?;
                info!(%service, "restarted");
                Ok("restart")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use press_core::{PressConfig, ResourceSnapshot, compute_allocation};

    use super::*;
    use crate::ProvisionError;
    use crate::testing::FakeHost;

    fn provisioner(root: &std::path::Path, fake: &FakeHost, ram: u64) -> Provisioner {
        let plan = compute_allocation(&ResourceSnapshot::new(2, ram, 40));
        Provisioner::new(fake.host(), PressConfig::rooted_at(root), plan)
    }

    #[test]
    fn first_tune_writes_everything_and_signals_services() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeHost::new();
        let outcomes = provisioner(dir.path(), &fake, 4096).tune().unwrap();

        assert_eq!(outcomes.len(), 4);
        assert!(outcomes.iter().all(|o| o.changed && o.backup.is_none()));
        assert!(fake.called("reload:nginx"));
        assert!(fake.called("reload:php-fpm8.3"));
        assert!(fake.called("restart:mariadb"));
        assert!(fake.called("restart:redis-server"));
    }

    #[test]
    fn retune_with_same_plan_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeHost::new();
        let p = provisioner(dir.path(), &fake, 4096);
        p.tune().unwrap();
        fake.clear();

        let outcomes = p.tune().unwrap();
        assert!(outcomes.iter().all(|o| !o.changed && o.service_action.is_none()));
        assert_eq!(fake.count("reload:"), 0);
        assert_eq!(fake.count("validate:"), 0);
    }

    #[test]
    fn changed_plan_backs_up_previous_files() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeHost::new();
        provisioner(dir.path(), &fake, 2048).tune().unwrap();
        let outcomes = provisioner(dir.path(), &fake, 8192).tune().unwrap();

        let db = outcomes.iter().find(|o| o.subsystem == Subsystem::Database).unwrap();
        let backup = db.backup.as_ref().unwrap();
        assert!(fs::read_to_string(backup).unwrap().contains("innodb_buffer_pool_size = 800M"));
    }

    #[test]
    fn rejected_runtime_config_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeHost::new();
        provisioner(dir.path(), &fake, 2048).tune().unwrap();
        let pool = PressConfig::rooted_at(dir.path()).php_pool_path();
        let before = fs::read_to_string(&pool).unwrap();

        fake.fail("validate:runtime");
        let err = provisioner(dir.path(), &fake, 8192).tune().unwrap_err();
        assert!(matches!(err, ProvisionError::Render(_)));
        assert_eq!(fs::read_to_string(&pool).unwrap(), before);
    }
}
