//! Shared types used across pressgrid crates.

use serde::{Deserialize, Serialize};

/// Smallest amount of RAM a host may have before provisioning is refused.
pub const MIN_RAM_MB: u64 = 512;

/// Host resources captured once per invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Logical CPU cores.
    pub cpu_cores: u32,
    /// Total physical memory in MiB.
    pub total_ram_mb: u64,
    /// Free space on the web root filesystem in GiB.
    pub available_disk_gb: u64,
}

impl ResourceSnapshot {
    pub fn new(cpu_cores: u32, total_ram_mb: u64, available_disk_gb: u64) -> Self {
        Self {
            cpu_cores,
            total_ram_mb,
            available_disk_gb,
        }
    }
}

/// RAM bucket selecting a fixed bundle of allocation constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Below 2 GiB.
    Small,
    /// 2 GiB up to (not including) 4 GiB.
    Medium,
    /// 4 GiB up to (not including) 8 GiB.
    Large,
    /// 8 GiB and above.
    XLarge,
}

impl Tier {
    pub fn for_ram(total_ram_mb: u64) -> Self {
        match total_ram_mb {
            m if m < 2048 => Tier::Small,
            m if m < 4096 => Tier::Medium,
            m if m < 8192 => Tier::Large,
            _ => Tier::XLarge,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Small => "small (<2 GB)",
            Tier::Medium => "medium (2-4 GB)",
            Tier::Large => "large (4-8 GB)",
            Tier::XLarge => "xlarge (8 GB+)",
        }
    }
}

/// Tuning values for the web server, database, PHP runtime, and cache.
///
/// Always produced by [`crate::compute_allocation`]; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub tier: Tier,
    pub web_worker_count: u32,
    pub runtime_max_children: u32,
    pub runtime_start_servers: u32,
    pub runtime_min_spare: u32,
    pub runtime_max_spare: u32,
    pub runtime_memory_limit_mb: u64,
    pub upload_max_mb: u64,
    pub post_max_mb: u64,
    pub db_buffer_pool_mb: u64,
    pub db_log_file_mb: u64,
    pub db_max_connections: u32,
    pub cache_max_memory_mb: u64,
}

/// One of the four independently configured services on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    WebServer,
    Runtime,
    Database,
    Cache,
}

impl Subsystem {
    pub const ALL: [Subsystem; 4] = [
        Subsystem::WebServer,
        Subsystem::Runtime,
        Subsystem::Database,
        Subsystem::Cache,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Subsystem::WebServer => "web server",
            Subsystem::Runtime => "php runtime",
            Subsystem::Database => "database",
            Subsystem::Cache => "cache",
        }
    }
}

/// Format a MiB quantity the way PHP and MariaDB expect it (`256M`).
pub fn megabytes(value: u64) -> String {
    format!("{value}M")
}
