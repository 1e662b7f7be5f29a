//! WordPress download and first-run configuration.

use std::fs;
use std::path::Path;

use press_core::secret::generate_secret;
use press_state::file::atomic_write;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ProvisionError, ProvisionResult, ToolContext};
use crate::host::{Host, WordPressSettings};

/// wp-config.php holds the database password.
const WP_CONFIG_MODE: u32 = 0o640;
const SALT_PLACEHOLDER: &str = "put your unique phrase here";
const SALT_LEN: usize = 64;

/// How a site's WordPress files were put in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallMethod {
    /// Downloaded, configured and installed by the WordPress CLI.
    Cli,
    /// Release archive with a generated wp-config.php; the admin account is
    /// created in the browser on first visit.
    Archive,
}

/// Put WordPress into `site_root` and configure it for `settings`.
pub fn install(host: &Host, site_root: &Path, settings: &WordPressSettings) -> ProvisionResult<InstallMethod> {
    if host.installer.has_cli() {
        host.installer.download(site_root).step("WordPress download")?;
        host.installer
            .configure(site_root, settings)
            .step("WordPress configuration")?;
        info!(url = %settings.url, "WordPress installed with the CLI");
        return Ok(InstallMethod::Cli);
    }

    warn!("WordPress CLI not found, falling back to the release archive");
    host.installer
        .download_archive(site_root)
        .step("WordPress archive download")?;
    let sample_path = site_root.join("wp-config-sample.php");
    let sample = fs::read_to_string(&sample_path).map_err(|e| ProvisionError::io(&sample_path, e))?;
    let config = render_wp_config(&sample, settings);
    atomic_write(&site_root.join("wp-config.php"), config.as_bytes(), WP_CONFIG_MODE)?;
    info!(url = %settings.url, "WordPress unpacked, finish setup in the browser");
    Ok(InstallMethod::Archive)
}

/// Fill the stock wp-config-sample.php with database settings and fresh salts.
pub fn render_wp_config(sample: &str, settings: &WordPressSettings) -> String {
    let filled = sample
        .replace("database_name_here", &settings.db_name)
        .replace("username_here", &settings.db_user)
        .replace("password_here", &settings.db_password);

    let mut out = String::with_capacity(filled.len());
    let mut rest = filled.as_str();
    while let Some(pos) = rest.find(SALT_PLACEHOLDER) {
        out.push_str(&rest[..pos]);
        out.push_str(&generate_secret(SALT_LEN));
        rest = &rest[pos + SALT_PLACEHOLDER.len()..];
    }
    out.push_str(rest);
    out
}
