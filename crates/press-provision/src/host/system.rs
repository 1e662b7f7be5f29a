//! Host tools backed by the stock Debian/Ubuntu binaries.

use std::fs::{self, File};
use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Duration;

use press_core::{PressConfig, Subsystem};
use tracing::debug;

use super::{
    AppInstaller, Archiver, CertificateClient, ConfigValidator, Connectivity, DatabaseClient, Host,
    PackageManager, ServiceManager, ToolError, WordPressSettings,
};

const WORDPRESS_ARCHIVE_URL: &str = "https://wordpress.org/latest.tar.gz";
const CONNECTIVITY_HOST: &str = "api.wordpress.org:443";
const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(5);

impl Host {
    /// Tools for the machine we are running on.
    pub fn system(config: &PressConfig) -> Self {
        Self {
            packages: Box::new(Apt),
            services: Box::new(Systemd),
            validator: Box::new(SyntaxCheck {
                nginx_conf: config.nginx_conf_path(),
                php_fpm: config.php_fpm_binary(),
            }),
            database: Box::new(MariaDb),
            certificates: Box::new(Certbot),
            installer: Box::new(WpCli),
            archiver: Box::new(Tar),
            network: Box::new(TcpProbe {
                target: CONNECTIVITY_HOST.to_string(),
            }),
        }
    }
}

// ── Process helpers ────────────────────────────────────────────────

fn describe(cmd: &Command) -> String {
    let mut line = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

fn check(command: String, output: Output) -> Result<Output, ToolError> {
    if output.status.success() {
        return Ok(output);
    }
    Err(ToolError::Failed {
        command,
        code: output.status.code().unwrap_or(-1),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Run to completion; non-zero exit is an error.
fn run(cmd: &mut Command) -> Result<Output, ToolError> {
    let command = describe(cmd);
    debug!(%command, "running");
    let output = cmd.stdin(Stdio::null()).output().map_err(|source| ToolError::Spawn {
        command: command.clone(),
        source,
    })?;
    check(command, output)
}

/// Run and report only whether the command succeeded.
fn probe(cmd: &mut Command) -> Result<bool, ToolError> {
    let command = describe(cmd);
    debug!(%command, "probing");
    let status = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|source| ToolError::Spawn { command, source })?;
    Ok(status.success())
}

/// Run and hand back the output whatever the exit status.
fn query(cmd: &mut Command) -> Result<Output, ToolError> {
    let command = describe(cmd);
    debug!(%command, "querying");
    cmd.stdin(Stdio::null())
        .output()
        .map_err(|source| ToolError::Spawn { command, source })
}

/// Run with `input` on stdin. Secrets travel this way so they stay out of
/// the process list, the logs and error messages.
fn run_with_input(cmd: &mut Command, input: &[u8]) -> Result<Output, ToolError> {
    let command = describe(cmd);
    debug!(%command, "running");
    let spawn_err = |source: std::io::Error| ToolError::Spawn {
        command: command.clone(),
        source,
    };
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_err)?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input).map_err(spawn_err)?;
    }
    let output = child.wait_with_output().map_err(spawn_err)?;
    check(command, output)
}

// ── Packages and services ──────────────────────────────────────────

struct Apt;

impl PackageManager for Apt {
    fn install(&self, packages: &[String]) -> Result<(), ToolError> {
        if packages.is_empty() {
            return Ok(());
        }
        run(Command::new("apt-get")
            .args(["install", "-y", "-q", "--no-install-recommends"])
            .args(packages)
            .env("DEBIAN_FRONTEND", "noninteractive"))?;
        Ok(())
    }

    fn is_installed(&self, package: &str) -> Result<bool, ToolError> {
        let output = query(Command::new("dpkg-query").args(["-W", "-f=${Status}", package]))?;
        Ok(output.status.success() && String::from_utf8_lossy(&output.stdout).contains("install ok installed"))
    }
}

struct Systemd;

impl Systemd {
    fn action(&self, verb: &str, service: &str) -> Result<(), ToolError> {
        run(Command::new("systemctl").args([verb, service]))?;
        Ok(())
    }
}

impl ServiceManager for Systemd {
    fn start(&self, service: &str) -> Result<(), ToolError> {
        self.action("start", service)
    }

    fn enable(&self, service: &str) -> Result<(), ToolError> {
        self.action("enable", service)
    }

    fn restart(&self, service: &str) -> Result<(), ToolError> {
        self.action("restart", service)
    }

    fn reload(&self, service: &str) -> Result<(), ToolError> {
        self.action("reload", service)
    }

    fn is_active(&self, service: &str) -> Result<bool, ToolError> {
        probe(Command::new("systemctl").args(["is-active", "--quiet", service]))
    }

    fn is_enabled(&self, service: &str) -> Result<bool, ToolError> {
        probe(Command::new("systemctl").args(["is-enabled", "--quiet", service]))
    }
}

// ── Validation ─────────────────────────────────────────────────────

struct SyntaxCheck {
    nginx_conf: PathBuf,
    php_fpm: String,
}

impl ConfigValidator for SyntaxCheck {
    fn validate(&self, subsystem: Subsystem) -> Result<(), ToolError> {
        match subsystem {
            Subsystem::WebServer => {
                run(Command::new("nginx").arg("-t").arg("-q").arg("-c").arg(&self.nginx_conf))?;
            }
            Subsystem::Runtime => {
                run(Command::new(&self.php_fpm).arg("-t"))?;
            }
            // No offline checker; a bad file shows up on restart.
            Subsystem::Database | Subsystem::Cache => {}
        }
        Ok(())
    }
}

// ── Database ───────────────────────────────────────────────────────

/// `mysql`/`mysqldump` as root over the local socket.
struct MariaDb;

impl DatabaseClient for MariaDb {
    fn execute(&self, sql: &str) -> Result<(), ToolError> {
        run_with_input(Command::new("mysql").args(["--batch", "--silent"]), sql.as_bytes())?;
        Ok(())
    }

    fn dump(&self, database: &str, dest: &Path) -> Result<(), ToolError> {
        let mut cmd = Command::new("mysqldump");
        cmd.args(["--single-transaction", "--routines", "--triggers", database]);
        let command = describe(&cmd);
        let file = File::create(dest).map_err(|source| ToolError::Spawn {
            command: command.clone(),
            source,
        })?;
        debug!(%command, dest = %dest.display(), "dumping database");
        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::from(file))
            .output()
            .map_err(|source| ToolError::Spawn {
                command: command.clone(),
                source,
            })?;
        check(command, output)?;
        Ok(())
    }
}

// ── Certificates ───────────────────────────────────────────────────

struct Certbot;

impl CertificateClient for Certbot {
    fn issue(&self, domain: &str, aliases: &[String], email: &str, webroot: &Path) -> Result<(), ToolError> {
        let mut cmd = Command::new("certbot");
        cmd.args(["certonly", "--webroot", "--non-interactive", "--agree-tos", "--keep-until-expiring"])
            .arg("--email")
            .arg(email)
            .arg("-w")
            .arg(webroot)
            .arg("--cert-name")
            .arg(domain)
            .arg("-d")
            .arg(domain);
        for alias in aliases {
            cmd.arg("-d").arg(alias);
        }
        run(&mut cmd)?;
        Ok(())
    }

    fn renew(&self) -> Result<(), ToolError> {
        run(Command::new("certbot").args(["renew", "--non-interactive", "--quiet"]))?;
        Ok(())
    }
}

// ── WordPress ──────────────────────────────────────────────────────

struct WpCli;

impl AppInstaller for WpCli {
    fn has_cli(&self) -> bool {
        probe(Command::new("wp").args(["--allow-root", "--version"])).unwrap_or(false)
    }

    fn download(&self, dest: &Path) -> Result<(), ToolError> {
        run(Command::new("wp")
            .args(["core", "download", "--allow-root"])
            .arg(format!("--path={}", dest.display())))?;
        Ok(())
    }

    fn download_archive(&self, dest: &Path) -> Result<(), ToolError> {
        let archive = dest.join(".wordpress-latest.tar.gz");
        run(Command::new("curl")
            .args(["-fsSL", "--retry", "2", "-o"])
            .arg(&archive)
            .arg(WORDPRESS_ARCHIVE_URL))?;
        let extracted = run(Command::new("tar")
            .arg("-xzf")
            .arg(&archive)
            .arg("-C")
            .arg(dest)
            .arg("--strip-components=1"));
        let _ = fs::remove_file(&archive);
        extracted.map(|_| ())
    }

    fn configure(&self, dest: &Path, settings: &WordPressSettings) -> Result<(), ToolError> {
        let path = format!("--path={}", dest.display());
        run_with_input(
            Command::new("wp")
                .args(["config", "create", "--allow-root", "--dbhost=localhost", "--prompt=dbpass"])
                .arg(&path)
                .arg(format!("--dbname={}", settings.db_name))
                .arg(format!("--dbuser={}", settings.db_user)),
            format!("{}\n", settings.db_password).as_bytes(),
        )?;
        run_with_input(
            Command::new("wp")
                .args(["core", "install", "--allow-root", "--skip-email", "--prompt=admin_password"])
                .arg(&path)
                .arg(format!("--url={}", settings.url))
                .arg(format!("--title={}", settings.title))
                .arg(format!("--admin_user={}", settings.admin_user))
                .arg(format!("--admin_email={}", settings.admin_email)),
            format!("{}\n", settings.admin_password).as_bytes(),
        )?;
        Ok(())
    }

    fn set_owner(&self, dest: &Path, user: &str) -> Result<(), ToolError> {
        run(Command::new("chown")
            .arg("-R")
            .arg(format!("{user}:{user}"))
            .arg(dest))?;
        Ok(())
    }
}

// ── Archives and network ───────────────────────────────────────────

struct Tar;

impl Archiver for Tar {
    fn archive(&self, source_dir: &Path, dest: &Path) -> Result<(), ToolError> {
        let (Some(parent), Some(name)) = (source_dir.parent(), source_dir.file_name()) else {
            return Err(ToolError::Unavailable(format!(
                "cannot archive {}: not a named directory",
                source_dir.display()
            )));
        };
        run(Command::new("tar")
            .arg("-czf")
            .arg(dest)
            .arg("-C")
            .arg(parent)
            .arg(name))?;
        Ok(())
    }
}

struct TcpProbe {
    target: String,
}

impl Connectivity for TcpProbe {
    fn check(&self) -> Result<(), ToolError> {
        let unreachable = |reason: String| ToolError::Unavailable(format!("cannot reach {}: {reason}", self.target));
        let addrs = self
            .target
            .to_socket_addrs()
            .map_err(|e| unreachable(e.to_string()))?;

        let mut last = String::from("no addresses resolved");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, CONNECTIVITY_TIMEOUT) {
                Ok(_) => {
                    debug!(%addr, "connectivity ok");
                    return Ok(());
                }
                Err(e) => last = e.to_string(),
            }
        }
        Err(unreachable(last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_joins_program_and_args() {
        let mut cmd = Command::new("systemctl");
        cmd.args(["reload", "nginx"]);
        assert_eq!(describe(&cmd), "systemctl reload nginx");
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let err = run(&mut Command::new("pressgrid-no-such-binary")).unwrap_err();
        assert!(matches!(err, ToolError::Spawn { ref command, .. } if command == "pressgrid-no-such-binary"));
    }

    #[test]
    fn non_zero_exit_carries_code_and_stderr() {
        let err = run(Command::new("sh").args(["-c", "echo broken >&2; exit 3"])).unwrap_err();
        match err {
            ToolError::Failed { code, stderr, .. } => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn input_reaches_stdin_not_the_command_line() {
        let err = run_with_input(
            Command::new("sh").args(["-c", "read pw; [ \"$pw\" = s3cret ] && exit 4; exit 0"]),
            b"s3cret\n",
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::Failed { code: 4, .. }));
        assert!(!err.to_string().contains("s3cret"));
    }

    #[test]
    fn wordpress_secrets_stay_out_of_errors() {
        let dir = tempfile::tempdir().unwrap();
        let settings = WordPressSettings {
            url: "http://a.test".into(),
            title: "a.test".into(),
            db_name: "wp_a_test".into(),
            db_user: "wp_a_test".into(),
            db_password: "DbPassw0rdValue".into(),
            admin_user: "admin".into(),
            admin_password: "AdminPassw0rdValue".into(),
            admin_email: "ops@a.test".into(),
        };
        // No WordPress in the directory, so this fails whether or not wp is installed.
        let err = WpCli.configure(&dir.path().join("missing"), &settings).unwrap_err();
        let text = err.to_string();
        assert!(!text.contains("DbPassw0rdValue"), "{text}");
        assert!(!text.contains("AdminPassw0rdValue"), "{text}");
    }

    #[test]
    fn query_returns_output_on_failure() {
        let output = query(Command::new("sh").args(["-c", "echo partial; exit 1"])).unwrap();
        assert!(!output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "partial");
    }

    #[test]
    fn database_and_cache_always_validate() {
        let check = SyntaxCheck {
            nginx_conf: PathBuf::from("/nonexistent/nginx.conf"),
            php_fpm: "php-fpm0.0".to_string(),
        };
        assert!(check.validate(Subsystem::Database).is_ok());
        assert!(check.validate(Subsystem::Cache).is_ok());
    }

    #[test]
    fn archive_writes_tarball() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("a.test");
        fs::create_dir_all(&site).unwrap();
        fs::write(site.join("index.php"), "<?php").unwrap();
        let dest = dir.path().join("files.tar.gz");
        Tar.archive(&site, &dest).unwrap();
        assert!(fs::metadata(&dest).unwrap().len() > 0);
    }
}
