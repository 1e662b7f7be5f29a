use std::io::Write;

use super::Session;

pub fn issue(session: &Session, domain: &str, email: Option<&str>, out: &mut dyn Write) -> anyhow::Result<()> {
    let outcome = session.provisioner().issue_certificate(domain, email)?;
    writeln!(out, "✓ Certificate issued, https://{} is live", outcome.domain)?;
    Ok(())
}

pub fn renew(session: &Session, out: &mut dyn Write) -> anyhow::Result<()> {
    session.provisioner().renew_certificates()?;
    writeln!(out, "✓ Certificates renewed")?;
    Ok(())
}
