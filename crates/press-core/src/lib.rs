//! Core types for pressgrid: resource snapshots, the allocation engine,
//! site identity derivation, secret generation, and `press.toml`.

pub mod allocation;
pub mod config;
pub mod probe;
pub mod secret;
pub mod site;
pub mod types;

pub use allocation::compute_allocation;
pub use config::PressConfig;
pub use probe::{ProbeError, ResourceProbe, SystemProbe};
pub use site::{DomainError, SiteIdentity};
pub use types::*;
