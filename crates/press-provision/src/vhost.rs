//! Per-site server blocks: write, enable, validate, reload.

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::Path;

use press_core::Subsystem;
use press_render::{ConfigTarget, render};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ProvisionError, ProvisionResult, ToolContext};
use crate::provisioner::Provisioner;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VhostOutcome {
    pub domain: String,
    pub tls: bool,
    pub changed: bool,
}

impl Provisioner {
    /// Regenerate the server block of one registered site, or of all of them.
    pub fn reconfigure_vhosts(&self, domain: Option<&str>) -> ProvisionResult<Vec<VhostOutcome>> {
        let _lock = self.run_lock()?;
        let domains: Vec<String> = match domain {
            Some(d) => {
                let domain = press_core::site::validate_domain(d)?;
                if !self.registry.contains(&domain)? {
                    return Err(ProvisionError::SiteNotFound(domain));
                }
                vec![domain]
            }
            None => self
                .registry
                .list_all()?
                .into_iter()
                .map(|r| r.domain)
                .collect(),
        };

        domains.iter().map(|d| self.install_vhost(d)).collect()
    }

    /// Write and enable the server block for `domain`, using TLS when a
    /// certificate is present. The web server is validated and reloaded
    /// only if something changed; a rejected block is rolled back.
    pub(crate) fn install_vhost(&self, domain: &str) -> ProvisionResult<VhostOutcome> {
        let tls = self.config.has_certificate(domain);
        let target = ConfigTarget::WebSite {
            domain: domain.to_string(),
            tls,
        };
        let path = target.path(&self.config);
        let content = render(&target, &self.plan, &self.config);

        let applied = self.writer.apply(&path, &content)?;
        let linked = self.enable_vhost(domain, &path)?;
        let changed = applied.changed() || linked;

        if changed {
            if let Err(source) = self.host.validator.validate(Subsystem::WebServer) {
                warn!(%domain, error = %source, "server block rejected, rolling back");
                if linked {
                    remove_if_present(&self.config.site_enabled_path(domain))?;
                }
                self.writer.restore(&path, &applied)?;
                return Err(ProvisionError::Tool {
                    action: format!("web server validation for {domain}"),
                    source,
                });
            }
            let service = self.service(Subsystem::WebServer);
            self.host
                .services
                .reload(&service)
                .step(format!("{service} reload"))?;
            info!(%domain, tls, "server block installed");
        } else {
            debug!(%domain, "server block unchanged");
        }

        Ok(VhostOutcome {
            domain: domain.to_string(),
            tls,
            changed,
        })
    }

    /// Link sites-enabled to sites-available. Returns whether a link was created.
    fn enable_vhost(&self, domain: &str, available: &Path) -> ProvisionResult<bool> {
        let enabled = self.config.site_enabled_path(domain);
        if fs::symlink_metadata(&enabled).is_ok() {
            return Ok(false);
        }
        if let Some(parent) = enabled.parent() {
            fs::create_dir_all(parent).map_err(|e| ProvisionError::io(parent, e))?;
        }
        symlink(available, &enabled).map_err(|e| ProvisionError::io(&enabled, e))?;
        debug!(link = %enabled.display(), "server block enabled");
        Ok(true)
    }

    /// Remove a site's server block and its link. Missing files are fine.
    pub(crate) fn remove_vhost(&self, domain: &str) -> ProvisionResult<bool> {
        let unlinked = remove_if_present(&self.config.site_enabled_path(domain))?;
        let removed = remove_if_present(&self.config.site_available_path(domain))?;
        Ok(unlinked || removed)
    }
}

fn remove_if_present(path: &Path) -> ProvisionResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(ProvisionError::io(path, e)),
    }
}
