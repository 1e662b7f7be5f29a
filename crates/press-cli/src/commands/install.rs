use std::io::Write;
use std::path::Path;

use press_provision::OsRelease;

use super::Session;
use crate::output;

pub fn install(session: &Session, os_release: &Path, out: &mut dyn Write) -> anyhow::Result<()> {
    let os = OsRelease::read(os_release)?;
    let report = session.provisioner().bootstrap(&session.snapshot, &os)?;
    write!(out, "{}", output::format_bootstrap(&report))?;
    Ok(())
}

pub fn tune(session: &Session, out: &mut dyn Write) -> anyhow::Result<()> {
    let outcomes = session.provisioner().tune()?;
    write!(out, "{}", output::format_tune(&outcomes))?;
    Ok(())
}
