//! Certificate issuance and renewal.

use std::io;

use press_core::Subsystem;
use tracing::info;

use crate::error::{ProvisionError, ProvisionResult, ToolContext};
use crate::provisioner::Provisioner;
use crate::vhost::VhostOutcome;

impl Provisioner {
    /// Obtain a certificate for `domain` and `www.<domain>`, then switch the
    /// site's server block to HTTPS.
    ///
    /// `email` falls back to `[tls].email`; one of them must be non-empty.
    pub fn issue_certificate(&self, domain: &str, email: Option<&str>) -> ProvisionResult<VhostOutcome> {
        let domain = press_core::site::validate_domain(domain)?;
        let email = email
            .or(self.config.tls.email.as_deref())
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(ProvisionError::MissingInput("certificate contact email"))?;

        let _lock = self.run_lock()?;
        if !self.registry.contains(&domain)? {
            return Err(ProvisionError::SiteNotFound(domain));
        }

        let aliases = [format!("www.{domain}")];
        let webroot = self.config.site_root(&domain);
        self.host
            .certificates
            .issue(&domain, &aliases, email, &webroot)
            .step(format!("certificate issuance for {domain}"))?;

        let certificate = self.config.certificate_path(&domain);
        if !certificate.is_file() {
            return Err(ProvisionError::io(
                certificate,
                io::Error::new(io::ErrorKind::NotFound, "certificate client reported success but wrote no certificate"),
            ));
        }
        info!(%domain, "certificate issued");
        self.install_vhost(&domain)
    }

    /// Renew every certificate that is due and reload the web server.
    pub fn renew_certificates(&self) -> ProvisionResult<()> {
        let _lock = self.run_lock()?;
        self.host.certificates.renew().step("certificate renewal")?;
        let service = self.service(Subsystem::WebServer);
        self.host
            .services
            .reload(&service)
            .step(format!("{service} reload"))?;
        info!("certificates renewed");
        Ok(())
    }
}
