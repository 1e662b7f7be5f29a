use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod menu;
mod output;

use commands::{Format, Operation, Session};
use press_provision::{NewSite, StalePolicy};

#[derive(Parser)]
#[command(
    name = "press",
    about = "pressgrid — single-server WordPress provisioning",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Config file (default: $PRESSGRID_CONFIG, then /etc/pressgrid/press.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the host, install the stack, and apply the allocation plan
    Install,
    /// Regenerate service configuration from the current allocation plan
    Tune,
    /// Show service state and configuration drift
    Status {
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Show probed resources and the resulting allocation plan
    Allocation {
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Override the detected CPU core count
        #[arg(long)]
        cpus: Option<u32>,
        /// Override the detected RAM in MB
        #[arg(long)]
        ram: Option<u64>,
    },
    /// Manage hosted sites
    Site {
        #[command(subcommand)]
        action: SiteAction,
    },
    /// Regenerate server blocks for one site, or all sites
    Vhost { domain: Option<String> },
    /// Manage TLS certificates
    Tls {
        #[command(subcommand)]
        action: TlsAction,
    },
    /// Manage press.toml
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Interactive console
    Menu,
}

#[derive(Subcommand)]
enum SiteAction {
    /// Provision a new WordPress site
    Add {
        domain: String,
        #[arg(long)]
        admin_email: String,
        #[arg(long, default_value = "admin")]
        admin_user: String,
        /// Site title (default: the domain)
        #[arg(long)]
        title: Option<String>,
        /// Tear down leftovers of an earlier failed attempt first
        #[arg(long)]
        reset: bool,
    },
    /// List registered sites
    List {
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Remove a site, its database, and its files
    Remove { domain: String },
    /// Destroy whatever exists for a domain, registered or not
    Reset { domain: String },
    /// Back up one site, or every site when no domain is given
    Backup { domain: Option<String> },
}

#[derive(Subcommand)]
enum TlsAction {
    /// Issue a certificate for a site and switch it to HTTPS
    Issue {
        domain: String,
        /// Contact email (default: [tls].email)
        #[arg(long)]
        email: Option<String>,
    },
    /// Renew due certificates
    Renew,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a press.toml with every default spelled out
    Init {
        /// Target file (default: the --config path, then /etc/pressgrid/press.toml)
        #[arg(short, long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

impl Commands {
    /// `None` for the interactive menu, which produces operations itself.
    fn into_operation(self) -> Option<Operation> {
        let op = match self {
            Commands::Install => Operation::Install,
            Commands::Tune => Operation::Tune,
            Commands::Status { format } => Operation::Status { format },
            Commands::Allocation { format, cpus, ram } => Operation::Allocation { format, cpus, ram },
            Commands::Site { action } => match action {
                SiteAction::Add {
                    domain,
                    admin_email,
                    admin_user,
                    title,
                    reset,
                } => Operation::SiteAdd {
                    site: NewSite {
                        domain,
                        title,
                        admin_user,
                        admin_email,
                    },
                    policy: if reset { StalePolicy::Reset } else { StalePolicy::Abort },
                },
                SiteAction::List { format } => Operation::SiteList { format },
                SiteAction::Remove { domain } => Operation::SiteRemove { domain },
                SiteAction::Reset { domain } => Operation::SiteReset { domain },
                SiteAction::Backup { domain } => Operation::SiteBackup { domain },
            },
            Commands::Vhost { domain } => Operation::VhostReconfigure { domain },
            Commands::Tls { action } => match action {
                TlsAction::Issue { domain, email } => Operation::TlsIssue { domain, email },
                TlsAction::Renew => Operation::TlsRenew,
            },
            Commands::Config { action } => match action {
                ConfigAction::Init { path, force } => Operation::ConfigInit { path, force },
                ConfigAction::Show => Operation::ConfigShow,
            },
            Commands::Menu => return None,
        };
        Some(op)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "press=debug" } else { "press=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.parse()?)
        )
        .with_writer(std::io::stderr)
        .init();

    let operation = cli.command.into_operation();
    let lenient = matches!(operation, Some(Operation::ConfigInit { .. }));
    let session = Session::from_system(cli.config.as_deref(), lenient)?;
    let mut stdout = std::io::stdout().lock();

    match operation {
        Some(op) => session.execute(op, &mut stdout),
        None => {
            let stdin = std::io::stdin().lock();
            menu::run(&session, stdin, &mut stdout)
        }
    }
}
