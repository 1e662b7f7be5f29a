use std::io::Write;

use press_provision::{NewSite, StalePolicy};

use super::{Format, Session, write_json};
use crate::output;

pub fn add(session: &Session, site: &NewSite, policy: StalePolicy, out: &mut dyn Write) -> anyhow::Result<()> {
    let report = session.provisioner().add_site(site, policy)?;
    write!(out, "{}", output::format_site_report(&report))?;
    Ok(())
}

pub fn list(session: &Session, format: Format, out: &mut dyn Write) -> anyhow::Result<()> {
    let sites = session.provisioner().list_sites()?;
    match format {
        Format::Json => write_json(out, &sites),
        Format::Text => {
            write!(out, "{}", output::format_sites(&sites))?;
            Ok(())
        }
    }
}

pub fn remove(session: &Session, domain: &str, out: &mut dyn Write) -> anyhow::Result<()> {
    let record = session.provisioner().remove_site(domain)?;
    writeln!(
        out,
        "✓ Removed {} (database {} dropped)",
        record.domain, record.database_name
    )?;
    Ok(())
}

pub fn reset(session: &Session, domain: &str, out: &mut dyn Write) -> anyhow::Result<()> {
    session.provisioner().reset_site(domain)?;
    writeln!(out, "✓ Reset {domain}")?;
    Ok(())
}

pub fn backup(session: &Session, domain: Option<&str>, out: &mut dyn Write) -> anyhow::Result<()> {
    let manifests = match domain {
        Some(domain) => vec![session.provisioner().backup_site(domain)?],
        None => session.provisioner().backup_all()?,
    };
    if manifests.is_empty() {
        writeln!(out, "No sites registered.")?;
    }
    for manifest in &manifests {
        write!(out, "{}", output::format_backup(manifest))?;
    }
    Ok(())
}

pub fn reconfigure(session: &Session, domain: Option<&str>, out: &mut dyn Write) -> anyhow::Result<()> {
    let outcomes = session.provisioner().reconfigure_vhosts(domain)?;
    write!(out, "{}", output::format_vhosts(&outcomes))?;
    Ok(())
}
