use std::io::Write;

use super::{Format, Session, write_json};
use crate::output;

pub fn status(session: &Session, format: Format, out: &mut dyn Write) -> anyhow::Result<()> {
    let report = session.provisioner().status()?;
    match format {
        Format::Json => write_json(out, &report),
        Format::Text => {
            write!(out, "{}", output::format_status(&report))?;
            Ok(())
        }
    }
}
