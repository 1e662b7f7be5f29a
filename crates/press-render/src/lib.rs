//! press-render — configuration files from an allocation plan.
//!
//! Rendering is pure: the same plan and config always produce byte-identical
//! text (no timestamps in the output), so reapplying a plan is a no-op.
//! [`ConfigWriter`] puts rendered text on disk with a timestamped backup of
//! the previous file and rolls back when validation fails.

pub mod settings;
pub mod templates;
pub mod writer;

use std::path::PathBuf;

use press_core::{AllocationPlan, PressConfig, Subsystem};
use thiserror::Error;

pub use settings::{PlannedSetting, planned_settings, read_setting};
pub use writer::{Applied, ConfigWriter};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    State(#[from] press_state::StateError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("validation of {path} failed, previous version restored: {reason}")]
    Rejected { path: PathBuf, reason: String },
}

/// A generated configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigTarget {
    /// nginx.conf
    WebGlobal,
    /// Server block for one hosted site.
    WebSite { domain: String, tls: bool },
    /// PHP-FPM pool.
    Runtime,
    /// MariaDB server drop-in.
    Database,
    /// redis.conf
    Cache,
}

impl ConfigTarget {
    /// The global target for a subsystem.
    pub fn for_subsystem(subsystem: Subsystem) -> Self {
        match subsystem {
            Subsystem::WebServer => ConfigTarget::WebGlobal,
            Subsystem::Runtime => ConfigTarget::Runtime,
            Subsystem::Database => ConfigTarget::Database,
            Subsystem::Cache => ConfigTarget::Cache,
        }
    }

    pub fn subsystem(&self) -> Subsystem {
        match self {
            ConfigTarget::WebGlobal | ConfigTarget::WebSite { .. } => Subsystem::WebServer,
            ConfigTarget::Runtime => Subsystem::Runtime,
            ConfigTarget::Database => Subsystem::Database,
            ConfigTarget::Cache => Subsystem::Cache,
        }
    }

    /// Where the target lives on disk.
    pub fn path(&self, config: &PressConfig) -> PathBuf {
        match self {
            ConfigTarget::WebSite { domain, .. } => config.site_available_path(domain),
            other => config.config_path(other.subsystem()),
        }
    }
}

/// Render the full text of `target` for `plan`.
pub fn render(target: &ConfigTarget, plan: &AllocationPlan, config: &PressConfig) -> String {
    match target {
        ConfigTarget::WebGlobal => templates::nginx::global(plan, config),
        ConfigTarget::WebSite { domain, tls } => templates::nginx::site(domain, *tls, plan, config),
        ConfigTarget::Runtime => templates::php::pool(plan, config),
        ConfigTarget::Database => templates::mariadb::server(plan),
        ConfigTarget::Cache => templates::redis::server(plan),
    }
}
