use press_core::{AllocationPlan, PressConfig, Subsystem};
use press_render::ConfigWriter;
use press_state::file::FileLock;
use press_state::{CredentialStore, SiteRecord, SiteRegistry};

use crate::error::ProvisionResult;
use crate::host::Host;

/// Entry point for every workflow that changes the host.
///
/// Holds the plan computed for this invocation; workflows never re-probe.
/// Mutating workflows take an exclusive run lock in the state directory, so
/// two invocations never interleave config writes or service restarts.
#[derive(Debug)]
pub struct Provisioner {
    pub(crate) host: Host,
    pub(crate) config: PressConfig,
    pub(crate) plan: AllocationPlan,
    pub(crate) registry: SiteRegistry,
    pub(crate) credentials: CredentialStore,
    pub(crate) writer: ConfigWriter,
}

impl Provisioner {
    pub fn new(host: Host, config: PressConfig, plan: AllocationPlan) -> Self {
        Self {
            registry: SiteRegistry::open(config.registry_path()),
            credentials: CredentialStore::open(config.credentials_path()),
            writer: ConfigWriter::new(),
            host,
            config,
            plan,
        }
    }

    pub fn config(&self) -> &PressConfig {
        &self.config
    }

    pub fn plan(&self) -> &AllocationPlan {
        &self.plan
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    pub fn list_sites(&self) -> ProvisionResult<Vec<SiteRecord>> {
        Ok(self.registry.list_all()?)
    }

    /// Serialize mutating workflows. Not reentrant: public workflows take
    /// it once and call lock-free internals.
    pub(crate) fn run_lock(&self) -> ProvisionResult<FileLock> {
        Ok(FileLock::acquire(&self.config.paths.state_dir.join("pressgrid.run"))?)
    }

    pub(crate) fn service(&self, subsystem: Subsystem) -> String {
        self.config.service_name(subsystem)
    }
}
