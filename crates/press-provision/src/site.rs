//! Site lifecycle: add, remove, reset.

use std::fs;
use std::path::PathBuf;

use press_core::secret::{DEFAULT_SECRET_LEN, generate_secret};
use press_core::{SiteIdentity, Subsystem};
use press_state::{SiteRecord, StateError};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ProvisionError, ProvisionResult, ToolContext};
use crate::host::WordPressSettings;
use crate::provisioner::Provisioner;
use crate::sql;
use crate::wordpress::{self, InstallMethod};

/// Operator input for a new site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSite {
    pub domain: String,
    /// Defaults to the domain.
    pub title: Option<String>,
    pub admin_user: String,
    pub admin_email: String,
}

/// What to do when a domain has leftovers from an incomplete run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalePolicy {
    /// Leave everything as found and fail with [`ProvisionError::StaleSite`].
    #[default]
    Abort,
    /// Tear the leftovers down, then provision from scratch.
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteReport {
    pub domain: String,
    pub url: String,
    pub database_name: String,
    pub database_user: String,
    pub site_root: PathBuf,
    pub install_method: InstallMethod,
    pub admin_user: String,
    /// Where the generated passwords were recorded.
    pub credentials: PathBuf,
}

impl Provisioner {
    /// Provision a WordPress site end to end.
    ///
    /// Input is validated before the host is touched. A failure after the
    /// database step leaves the partial site in place without a registry
    /// entry; the next attempt reports it as stale.
    pub fn add_site(&self, site: &NewSite, policy: StalePolicy) -> ProvisionResult<SiteReport> {
        let identity = SiteIdentity::derive(&site.domain)?;
        let admin_user = site.admin_user.trim();
        if admin_user.is_empty() {
            return Err(ProvisionError::MissingInput("admin user"));
        }
        let admin_email = site.admin_email.trim();
        if admin_email.is_empty() {
            return Err(ProvisionError::MissingInput("admin email"));
        }
        if !admin_email.contains('@') {
            return Err(ProvisionError::InvalidInput {
                field: "admin email",
                reason: format!("{admin_email} is not an email address"),
            });
        }

        let _lock = self.run_lock()?;
        let domain = identity.domain.as_str();
        if let Some(path) = self.stale_state(&identity)? {
            match policy {
                StalePolicy::Abort => {
                    return Err(ProvisionError::StaleSite {
                        domain: domain.to_string(),
                        path,
                    });
                }
                StalePolicy::Reset => {
                    warn!(%domain, path = %path.display(), "resetting stale site state");
                    self.teardown(&identity)?;
                }
            }
        }

        info!(%domain, database = %identity.database_name, "provisioning site");
        let db_password = generate_secret(DEFAULT_SECRET_LEN);
        self.host
            .database
            .execute(&sql::create_site_database(&identity, &db_password))
            .step("database setup")?;

        let site_root = self.config.site_root(domain);
        fs::create_dir_all(&site_root).map_err(|e| ProvisionError::io(&site_root, e))?;
        let url = format!("http://{domain}");
        let settings = WordPressSettings {
            url: url.clone(),
            title: site.title.clone().unwrap_or_else(|| domain.to_string()),
            db_name: identity.database_name.clone(),
            db_user: identity.database_user.clone(),
            db_password,
            admin_user: admin_user.to_string(),
            admin_password: generate_secret(DEFAULT_SECRET_LEN),
            admin_email: admin_email.to_string(),
        };
        let install_method = wordpress::install(&self.host, &site_root, &settings)?;
        self.host
            .installer
            .set_owner(&site_root, &self.config.web.user)
            .step("site ownership")?;
        self.install_vhost(domain)?;

        self.registry
            .add(domain, &identity.database_name, &identity.database_user)?;
        self.credentials
            .append(domain, &credential_fields(&settings, install_method))?;
        info!(%domain, "site provisioned");

        Ok(SiteReport {
            domain: domain.to_string(),
            url,
            database_name: identity.database_name,
            database_user: identity.database_user,
            site_root,
            install_method,
            admin_user: settings.admin_user,
            credentials: self.credentials.path().to_path_buf(),
        })
    }

    /// Remove a registered site: database, account, files, server block,
    /// and finally the registry entry. Returns the removed record.
    pub fn remove_site(&self, domain: &str) -> ProvisionResult<SiteRecord> {
        let domain = press_core::site::validate_domain(domain)?;
        let _lock = self.run_lock()?;
        let record = match self.registry.find(&domain) {
            Ok(record) => record,
            Err(StateError::NotFound(d)) => return Err(ProvisionError::SiteNotFound(d)),
            Err(e) => return Err(e.into()),
        };
        self.teardown(&SiteIdentity {
            domain: record.domain.clone(),
            database_name: record.database_name.clone(),
            database_user: record.database_user.clone(),
        })?;
        info!(%domain, "site removed");
        Ok(record)
    }

    /// Destroy whatever exists for `domain`, registered or not.
    pub fn reset_site(&self, domain: &str) -> ProvisionResult<()> {
        let derived = SiteIdentity::derive(domain)?;
        let _lock = self.run_lock()?;
        let identity = match self.registry.find(&derived.domain) {
            Ok(record) => SiteIdentity {
                domain: record.domain,
                database_name: record.database_name,
                database_user: record.database_user,
            },
            Err(StateError::NotFound(_)) => derived,
            Err(e) => return Err(e.into()),
        };
        self.teardown(&identity)?;
        info!(domain = %identity.domain, "site reset");
        Ok(())
    }

    /// Leftovers that a fresh provisioning run would collide with.
    ///
    /// A registered site whose files exist is a duplicate, not stale.
    fn stale_state(&self, identity: &SiteIdentity) -> ProvisionResult<Option<PathBuf>> {
        let domain = identity.domain.as_str();
        let site_root = self.config.site_root(domain);
        let registered = self.registry.contains(domain)?;
        if registered {
            if site_root.exists() {
                return Err(ProvisionError::DuplicateSite(domain.to_string()));
            }
            return Ok(Some(self.registry.path().to_path_buf()));
        }
        if site_root.exists() {
            return Ok(Some(site_root));
        }
        let vhost = self.config.site_available_path(domain);
        if vhost.exists() {
            return Ok(Some(vhost));
        }
        Ok(None)
    }

    /// Drop the database and account, delete files and server block, and
    /// unregister. Each step tolerates already-missing objects.
    fn teardown(&self, identity: &SiteIdentity) -> ProvisionResult<()> {
        let domain = identity.domain.as_str();
        self.host
            .database
            .execute(&sql::drop_site_database(identity))
            .step("database removal")?;

        let site_root = self.config.site_root(domain);
        if site_root.exists() {
            fs::remove_dir_all(&site_root).map_err(|e| ProvisionError::io(&site_root, e))?;
        }

        if self.remove_vhost(domain)? {
            let service = self.service(Subsystem::WebServer);
            self.host
                .services
                .reload(&service)
                .step(format!("{service} reload"))?;
        }

        if self.registry.contains(domain)? {
            self.registry.remove(domain)?;
        }
        Ok(())
    }
}

fn credential_fields(settings: &WordPressSettings, method: InstallMethod) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("url", settings.url.clone()),
        ("database_name", settings.db_name.clone()),
        ("database_user", settings.db_user.clone()),
        ("database_password", settings.db_password.clone()),
    ];
    match method {
        InstallMethod::Cli => {
            fields.push(("admin_user", settings.admin_user.clone()));
            fields.push(("admin_password", settings.admin_password.clone()));
            fields.push(("admin_email", settings.admin_email.clone()));
        }
        InstallMethod::Archive => {
            fields.push(("admin_setup", format!("{}/wp-admin/install.php", settings.url)));
        }
    }
    fields
}
