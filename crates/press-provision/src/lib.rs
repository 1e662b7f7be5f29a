//! press-provision — provisioning workflows for a single WordPress host.
//!
//! Every side effect outside the state directory and generated config files
//! goes through a capability trait in [`host`], so the workflows in
//! [`Provisioner`] run unchanged against the real system
//! ([`host::system`]) or a recording double (`testing::FakeHost`).

pub mod backup;
pub mod error;
pub mod host;
pub mod install;
pub mod preconditions;
pub mod provisioner;
pub mod site;
pub mod sql;
pub mod status;
pub mod tls;
pub mod tune;
pub mod vhost;
pub mod wordpress;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backup::{ArtifactInfo, BackupManifest};
pub use error::{ProvisionError, ProvisionResult};
pub use host::{Host, ToolError, WordPressSettings};
pub use install::{BootstrapReport, PackageSet};
pub use preconditions::OsRelease;
pub use provisioner::Provisioner;
pub use site::{NewSite, SiteReport, StalePolicy};
pub use status::{SettingStatus, SubsystemStatus};
pub use tune::TuneOutcome;
pub use vhost::VhostOutcome;
pub use wordpress::InstallMethod;
