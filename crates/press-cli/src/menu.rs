//! Numbered interactive console over the same operations as the CLI.

use std::io::{self, BufRead, Write};

use press_provision::{NewSite, ProvisionError, StalePolicy};

use crate::commands::{Format, Operation, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Install,
    Tune,
    Status,
    Allocation,
    ListSites,
    AddSite,
    RemoveSite,
    BackupSite,
    BackupAll,
    IssueCertificate,
    RenewCertificates,
    ReconfigureVhosts,
    Quit,
}

const ITEMS: [(Choice, &str); 13] = [
    (Choice::Install, "Install and configure the stack"),
    (Choice::Tune, "Retune services for this host"),
    (Choice::Status, "Service status and drift"),
    (Choice::Allocation, "Allocation plan"),
    (Choice::ListSites, "List sites"),
    (Choice::AddSite, "Add a site"),
    (Choice::RemoveSite, "Remove a site"),
    (Choice::BackupSite, "Back up a site"),
    (Choice::BackupAll, "Back up all sites"),
    (Choice::IssueCertificate, "Issue a TLS certificate"),
    (Choice::RenewCertificates, "Renew TLS certificates"),
    (Choice::ReconfigureVhosts, "Regenerate server blocks"),
    (Choice::Quit, "Quit"),
];

/// Map a typed menu number (or `q`) to a choice.
pub fn parse_choice(input: &str) -> Option<Choice> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") {
        return Some(Choice::Quit);
    }
    let n: usize = input.parse().ok()?;
    ITEMS.get(n.checked_sub(1)?).map(|(choice, _)| *choice)
}

struct Prompter<R, W> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    /// `None` on end of input.
    fn line(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(buf.trim().to_string()))
    }

    fn ask(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.out, "{label}: ")?;
        self.out.flush()?;
        self.line()
    }

    fn ask_or(&mut self, label: &str, default: &str) -> io::Result<Option<String>> {
        Ok(self
            .ask(&format!("{label} [{default}]"))?
            .map(|v| if v.is_empty() { default.to_string() } else { v }))
    }

    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.ask(&format!("{question} [y/N]"))?;
        Ok(matches!(answer.as_deref(), Some("y" | "Y" | "yes")))
    }

    fn show_menu(&mut self) -> io::Result<()> {
        writeln!(self.out, "\npressgrid")?;
        for (i, (_, label)) in ITEMS.iter().enumerate() {
            let key = if i + 1 == ITEMS.len() { "q".to_string() } else { (i + 1).to_string() };
            writeln!(self.out, "  {key:>2}) {label}")?;
        }
        write!(self.out, "> ")?;
        self.out.flush()
    }

    /// Gather the inputs for `choice`. `None` when cancelled.
    fn operation(&mut self, choice: Choice) -> io::Result<Option<Operation>> {
        let op = match choice {
            Choice::Install => Operation::Install,
            Choice::Tune => Operation::Tune,
            Choice::Status => Operation::Status { format: Format::Text },
            Choice::Allocation => Operation::Allocation {
                format: Format::Text,
                cpus: None,
                ram: None,
            },
            Choice::ListSites => Operation::SiteList { format: Format::Text },
            Choice::AddSite => {
                let Some(domain) = self.ask("Domain")? else { return Ok(None) };
                let Some(admin_email) = self.ask("Admin email")? else { return Ok(None) };
                let Some(admin_user) = self.ask_or("Admin user", "admin")? else { return Ok(None) };
                let Some(title) = self.ask_or("Site title", &domain)? else { return Ok(None) };
                Operation::SiteAdd {
                    site: NewSite {
                        domain,
                        title: Some(title),
                        admin_user,
                        admin_email,
                    },
                    policy: StalePolicy::Abort,
                }
            }
            Choice::RemoveSite => {
                let Some(domain) = self.ask("Domain")? else { return Ok(None) };
                if !self.confirm(&format!("Remove {domain}, its files and its database?"))? {
                    return Ok(None);
                }
                Operation::SiteRemove { domain }
            }
            Choice::BackupSite => {
                let Some(domain) = self.ask("Domain")? else { return Ok(None) };
                Operation::SiteBackup { domain: Some(domain) }
            }
            Choice::BackupAll => Operation::SiteBackup { domain: None },
            Choice::IssueCertificate => {
                let Some(domain) = self.ask("Domain")? else { return Ok(None) };
                let Some(email) = self.ask("Contact email (blank for [tls].email)")? else {
                    return Ok(None);
                };
                Operation::TlsIssue {
                    domain,
                    email: Some(email).filter(|e| !e.is_empty()),
                }
            }
            Choice::RenewCertificates => Operation::TlsRenew,
            Choice::ReconfigureVhosts => Operation::VhostReconfigure { domain: None },
            Choice::Quit => return Ok(None),
        };
        Ok(Some(op))
    }
}

fn is_stale(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<ProvisionError>(), Some(ProvisionError::StaleSite { .. }))
}

/// Run the console until `q` or end of input. Failed operations are
/// reported and the menu continues.
pub fn run<R: BufRead, W: Write>(session: &Session, input: R, out: W) -> anyhow::Result<()> {
    let mut prompter = Prompter { input, out };
    loop {
        prompter.show_menu()?;
        let Some(line) = prompter.line()? else { break };
        let Some(choice) = parse_choice(&line) else {
            writeln!(prompter.out, "Unknown choice: {line}")?;
            continue;
        };
        if choice == Choice::Quit {
            break;
        }
        let Some(op) = prompter.operation(choice)? else {
            writeln!(prompter.out, "Cancelled.")?;
            continue;
        };

        let result = match session.execute(op.clone(), &mut prompter.out) {
            Err(err) if is_stale(&err) => {
                writeln!(prompter.out, "{err}")?;
                match op {
                    Operation::SiteAdd { site, .. }
                        if prompter.confirm("Delete the leftovers and start over?")? =>
                    {
                        let retry = Operation::SiteAdd {
                            site,
                            policy: StalePolicy::Reset,
                        };
                        session.execute(retry, &mut prompter.out)
                    }
                    _ => {
                        writeln!(prompter.out, "Cancelled.")?;
                        Ok(())
                    }
                }
            }
            other => other,
        };
        if let Err(err) = result {
            writeln!(prompter.out, "✗ {err:#}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use press_provision::testing::FakeHost;

    use super::*;
    use crate::commands::test_support::session;

    fn drive(session: &Session, script: &str) -> String {
        let mut out = Vec::new();
        run(session, script.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn choices() {
        assert_eq!(parse_choice("1"), Some(Choice::Install));
        assert_eq!(parse_choice(" 6 "), Some(Choice::AddSite));
        assert_eq!(parse_choice("Q"), Some(Choice::Quit));
        assert_eq!(parse_choice("13"), Some(Choice::Quit));
        assert_eq!(parse_choice("0"), None);
        assert_eq!(parse_choice("14"), None);
        assert_eq!(parse_choice("add"), None);
    }

    #[test]
    fn add_site_through_the_menu() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path(), &FakeHost::new(), 0);
        let out = drive(&s, "6\na.test\nops@a.test\n\n\n5\nq\n");
        assert!(out.contains("✓ Provisioned http://a.test"));
        assert!(out.contains("wp_a_test"));
    }

    #[test]
    fn stale_site_prompts_for_reset() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeHost::new();
        let s = session(dir.path(), &fake, 0);
        fs::create_dir_all(s.config().site_root("a.test")).unwrap();

        let out = drive(&s, "6\na.test\nops@a.test\n\n\ny\nq\n");
        assert!(out.contains("stale state for a.test"));
        assert!(out.contains("✓ Provisioned http://a.test"));
        assert!(fake.sql()[0].starts_with("DROP DATABASE"));
    }

    #[test]
    fn declined_reset_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeHost::new();
        let s = session(dir.path(), &fake, 0);
        fs::create_dir_all(s.config().site_root("a.test")).unwrap();

        let out = drive(&s, "6\na.test\nops@a.test\n\n\nn\n");
        assert!(out.contains("Cancelled."));
        assert!(fake.calls().is_empty());
        assert!(s.provisioner().list_sites().unwrap().is_empty());
    }

    #[test]
    fn errors_do_not_end_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path(), &FakeHost::new(), 0);
        let out = drive(&s, "7\nghost.test\ny\n4\nq\n");
        assert!(out.contains("✗ site not found: ghost.test"));
        assert!(out.contains("pressgrid Allocation Plan"));
    }

    #[test]
    fn end_of_input_exits_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path(), &FakeHost::new(), 0);
        let out = drive(&s, "6\na.test\n");
        assert!(out.contains("Cancelled."));
    }
}
