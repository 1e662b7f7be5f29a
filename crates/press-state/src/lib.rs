//! press-state — flat-file state for pressgrid.
//!
//! Two human-editable stores live in the state directory:
//!
//! - [`SiteRegistry`]: one `domain|database_name|database_user|created_at`
//!   line per hosted site.
//! - [`CredentialStore`]: an append-only, owner-only log of generated secrets.
//!
//! # Consistency
//!
//! Every read-modify-write cycle holds an exclusive advisory `flock` on a
//! sidecar `<file>.lock`, and rewrites go through a temp file in the same
//! directory followed by a rename. Concurrent invocations on one host
//! serialize instead of corrupting the files. Plain reads take no lock.

pub mod credentials;
pub mod error;
pub mod file;
pub mod registry;
pub mod types;

pub use credentials::CredentialStore;
pub use error::{StateError, StateResult};
pub use registry::SiteRegistry;
pub use types::*;
