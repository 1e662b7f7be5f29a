//! Text templates, one module per service.

pub mod mariadb;
pub mod nginx;
pub mod php;
pub mod redis;

/// First line of every generated file.
pub(crate) fn banner(comment: &str, tier: press_core::Tier) -> String {
    format!(
        "{comment} Managed by pressgrid; regenerated from the host allocation plan ({}).\n\
         {comment} Local edits are overwritten on the next tune.\n",
        tier.label()
    )
}
