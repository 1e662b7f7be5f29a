//! Human-readable report formatting.

use press_core::{AllocationPlan, ResourceSnapshot, megabytes};
use press_provision::{
    BackupManifest, BootstrapReport, InstallMethod, SiteReport, SubsystemStatus, TuneOutcome, VhostOutcome,
};
use press_state::{SiteRecord, TIMESTAMP_FORMAT};

fn header(out: &mut String, title: &str, rows: &[(&str, String)]) {
    out.push_str("\n╔══════════════════════════════════════════╗\n");
    out.push_str(&format!("║  {title:<40}║\n"));
    out.push_str("╠══════════════════════════════════════════╣\n");
    for (label, value) in rows {
        out.push_str(&format!("║  {label:<10}{value:<30}║\n"));
    }
    out.push_str("╚══════════════════════════════════════════╝\n\n");
}

pub fn format_allocation(snapshot: &ResourceSnapshot, plan: &AllocationPlan) -> String {
    let mut out = String::new();
    header(
        &mut out,
        "pressgrid Allocation Plan",
        &[
            ("CPU:", format!("{} cores", snapshot.cpu_cores)),
            ("RAM:", format!("{} MB", snapshot.total_ram_mb)),
            ("Disk:", format!("{} GB free", snapshot.available_disk_gb)),
            ("Tier:", plan.tier.label().to_string()),
        ],
    );

    out.push_str("Web server:\n");
    out.push_str(&format!("  worker_processes      {}\n", plan.web_worker_count));
    out.push_str(&format!("  client_max_body_size  {}\n\n", megabytes(plan.upload_max_mb)));

    out.push_str("PHP runtime:\n");
    out.push_str(&format!("  pm.max_children       {}\n", plan.runtime_max_children));
    out.push_str(&format!("  pm.start_servers      {}\n", plan.runtime_start_servers));
    out.push_str(&format!("  pm.min_spare_servers  {}\n", plan.runtime_min_spare));
    out.push_str(&format!("  pm.max_spare_servers  {}\n", plan.runtime_max_spare));
    out.push_str(&format!("  memory_limit          {}\n", megabytes(plan.runtime_memory_limit_mb)));
    out.push_str(&format!("  upload_max_filesize   {}\n", megabytes(plan.upload_max_mb)));
    out.push_str(&format!("  post_max_size         {}\n\n", megabytes(plan.post_max_mb)));

    out.push_str("Database:\n");
    out.push_str(&format!("  buffer_pool           {}\n", megabytes(plan.db_buffer_pool_mb)));
    out.push_str(&format!("  log_file              {}\n", megabytes(plan.db_log_file_mb)));
    out.push_str(&format!("  max_connections       {}\n\n", plan.db_max_connections));

    out.push_str("Cache:\n");
    out.push_str(&format!("  maxmemory             {}mb\n", plan.cache_max_memory_mb));
    out
}

pub fn format_status(report: &[SubsystemStatus]) -> String {
    let mut out = String::new();
    for status in report {
        let state = match (status.active, status.enabled) {
            (true, true) => "running",
            (true, false) => "running (not enabled)",
            (false, true) => "stopped (enabled)",
            (false, false) => "stopped",
        };
        let marker = if status.drifted() { "⚠️ " } else { "✅" };
        out.push_str(&format!(
            "{marker} {} [{}] {state}\n",
            status.subsystem.label(),
            status.service
        ));
        if !status.config_present {
            out.push_str(&format!("     {} is missing\n", status.config_path.display()));
        }
        for setting in status.settings.iter().filter(|s| s.drifted()) {
            out.push_str(&format!(
                "     {}: live {} / planned {}\n",
                setting.key,
                setting.live.as_deref().unwrap_or("unset"),
                setting.planned
            ));
        }
    }
    out
}

pub fn format_sites(sites: &[SiteRecord]) -> String {
    if sites.is_empty() {
        return "No sites registered.\n".to_string();
    }
    let width = sites.iter().map(|s| s.domain.len()).max().unwrap_or(0).max(6);
    let mut out = format!("{:<width$}  {:<32}  CREATED\n", "DOMAIN", "DATABASE");
    for site in sites {
        out.push_str(&format!(
            "{:<width$}  {:<32}  {}\n",
            site.domain,
            site.database_name,
            site.created_at.format(TIMESTAMP_FORMAT)
        ));
    }
    out
}

pub fn format_site_report(report: &SiteReport) -> String {
    let mut out = format!("✓ Provisioned {}\n", report.url);
    out.push_str(&format!("  Files:       {}\n", report.site_root.display()));
    out.push_str(&format!(
        "  Database:    {} (user {})\n",
        report.database_name, report.database_user
    ));
    match report.install_method {
        InstallMethod::Cli => {
            out.push_str(&format!("  Admin user:  {}\n", report.admin_user));
        }
        InstallMethod::Archive => {
            out.push_str(&format!("  Admin setup: {}/wp-admin/install.php\n", report.url));
        }
    }
    out.push_str(&format!("  Credentials: {}\n", report.credentials.display()));
    out
}

pub fn format_tune(outcomes: &[TuneOutcome]) -> String {
    let mut out = String::new();
    for outcome in outcomes {
        if !outcome.changed {
            out.push_str(&format!("  = {} unchanged\n", outcome.path.display()));
            continue;
        }
        out.push_str(&format!("  ✓ {} written", outcome.path.display()));
        if let Some(action) = outcome.service_action {
            out.push_str(&format!(" ({action})"));
        }
        out.push('\n');
        if let Some(backup) = &outcome.backup {
            out.push_str(&format!("    previous: {}\n", backup.display()));
        }
    }
    out
}

pub fn format_bootstrap(report: &BootstrapReport) -> String {
    let mut out = String::new();
    if report.installed.is_empty() {
        out.push_str("Packages: all present\n");
    } else {
        out.push_str(&format!("Packages installed ({}):\n", report.installed.len()));
        for package in &report.installed {
            out.push_str(&format!("  • {package}\n"));
        }
    }
    for set in &report.skipped_sets {
        out.push_str(&format!("⚠️  optional set '{set}' skipped\n"));
    }
    out.push_str("\nConfiguration:\n");
    out.push_str(&format_tune(&report.tuning));
    out.push_str(&format!("\nServices enabled: {}\n", report.services.join(", ")));
    out
}

pub fn format_backup(manifest: &BackupManifest) -> String {
    format!(
        "✓ {} → {}\n  {} {} bytes sha256:{}\n  {} {} bytes sha256:{} ({} files)\n",
        manifest.domain,
        manifest.directory.display(),
        manifest.database.file,
        manifest.database.bytes,
        manifest.database.sha256,
        manifest.files.file,
        manifest.files.bytes,
        manifest.files.sha256,
        manifest.file_count,
    )
}

pub fn format_vhosts(outcomes: &[VhostOutcome]) -> String {
    if outcomes.is_empty() {
        return "No sites registered.\n".to_string();
    }
    outcomes
        .iter()
        .map(|o| {
            let scheme = if o.tls { "https" } else { "http" };
            let state = if o.changed { "updated" } else { "unchanged" };
            format!("  {scheme}://{} {state}\n", o.domain)
        })
        .collect()
}
