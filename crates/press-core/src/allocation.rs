//! Resource allocation engine.
//!
//! Maps a [`ResourceSnapshot`] to an [`AllocationPlan`] covering all four
//! subsystems at once, so that no single service is sized in isolation.
//!
//! # Tier table
//!
//! | System RAM   | max_children | memory_limit | upload_max | buffer_pool | cache_max |
//! |--------------|--------------|--------------|------------|-------------|-----------|
//! | < 2 GB       | 10           | 256M         | 64M        | 400M        | 128M      |
//! | 2-4 GB       | 20           | 256M         | 128M       | 800M        | 128M      |
//! | 4-8 GB       | 30           | 384M         | 256M       | 1800M       | 256M      |
//! | 8 GB+        | 60           | 512M         | 512M       | 45% of RAM  | 512M      |
//!
//! Process-manager spare counts scale with CPU cores; the top tier uses one
//! step larger multipliers.

use crate::types::{AllocationPlan, ResourceSnapshot, Tier};

/// Fixed constants selected by a tier.
struct TierProfile {
    max_children: u32,
    memory_limit_mb: u64,
    upload_max_mb: u64,
    cache_max_mb: u64,
    /// (start_servers, min_spare, max_spare) per core.
    spare_multipliers: (u32, u32, u32),
}

impl TierProfile {
    fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Small => TierProfile {
                max_children: 10,
                memory_limit_mb: 256,
                upload_max_mb: 64,
                cache_max_mb: 128,
                spare_multipliers: (2, 1, 3),
            },
            Tier::Medium => TierProfile {
                max_children: 20,
                memory_limit_mb: 256,
                upload_max_mb: 128,
                cache_max_mb: 128,
                spare_multipliers: (2, 1, 3),
            },
            Tier::Large => TierProfile {
                max_children: 30,
                memory_limit_mb: 384,
                upload_max_mb: 256,
                cache_max_mb: 256,
                spare_multipliers: (2, 1, 3),
            },
            Tier::XLarge => TierProfile {
                max_children: 60,
                memory_limit_mb: 512,
                upload_max_mb: 512,
                cache_max_mb: 512,
                spare_multipliers: (3, 2, 4),
            },
        }
    }
}

/// InnoDB buffer pool size for a tier. The top tier takes 45% of RAM.
fn buffer_pool_mb(tier: Tier, total_ram_mb: u64) -> u64 {
    match tier {
        Tier::Small => 400,
        Tier::Medium => 800,
        Tier::Large => 1800,
        Tier::XLarge => total_ram_mb * 45 / 100,
    }
}

/// Compute the allocation plan for a host.
///
/// Total over every snapshot: callers reject hosts below
/// [`crate::MIN_RAM_MB`] before calling.
pub fn compute_allocation(snapshot: &ResourceSnapshot) -> AllocationPlan {
    let tier = Tier::for_ram(snapshot.total_ram_mb);
    let profile = TierProfile::for_tier(tier);
    let cores = snapshot.cpu_cores;
    let (start_mult, min_mult, max_mult) = profile.spare_multipliers;

    let runtime_start_servers = cores.saturating_mul(start_mult).max(2);
    let runtime_min_spare = cores.saturating_mul(min_mult).max(1);
    let runtime_max_spare = cores.saturating_mul(max_mult).max(3);

    let db_buffer_pool_mb = buffer_pool_mb(tier, snapshot.total_ram_mb);

    AllocationPlan {
        tier,
        web_worker_count: cores,
        runtime_max_children: profile.max_children,
        runtime_start_servers,
        runtime_min_spare,
        runtime_max_spare,
        runtime_memory_limit_mb: profile.memory_limit_mb,
        upload_max_mb: profile.upload_max_mb,
        post_max_mb: profile.upload_max_mb + 8,
        db_buffer_pool_mb,
        db_log_file_mb: db_buffer_pool_mb / 4,
        db_max_connections: profile.max_children + 50,
        cache_max_memory_mb: profile.cache_max_mb,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(cpu: u32, ram: u64) -> AllocationPlan {
        compute_allocation(&ResourceSnapshot::new(cpu, ram, 20))
    }

    #[test]
    fn small_host_scenario() {
        let p = plan(2, 1024);
        assert_eq!(p.tier, Tier::Small);
        assert_eq!(p.runtime_max_children, 10);
        assert_eq!(p.runtime_memory_limit_mb, 256);
        assert_eq!(p.upload_max_mb, 64);
        assert_eq!(p.db_buffer_pool_mb, 400);
        assert_eq!(p.cache_max_memory_mb, 128);
        assert_eq!(p.runtime_start_servers, 4);
        assert_eq!(p.runtime_min_spare, 2);
        assert_eq!(p.runtime_max_spare, 6);
        assert_eq!(p.post_max_mb, 72);
        assert_eq!(p.db_log_file_mb, 100);
        assert_eq!(p.db_max_connections, 60);
        assert_eq!(p.web_worker_count, 2);
    }

    #[test]
    fn xlarge_host_scenario() {
        let p = plan(4, 8192);
        assert_eq!(p.tier, Tier::XLarge);
        assert_eq!(p.runtime_max_children, 60);
        assert_eq!(p.runtime_memory_limit_mb, 512);
        assert_eq!(p.upload_max_mb, 512);
        assert_eq!(p.db_buffer_pool_mb, 3686);
        assert_eq!(p.cache_max_memory_mb, 512);
        assert_eq!(p.runtime_start_servers, 12);
        assert_eq!(p.runtime_min_spare, 8);
        assert_eq!(p.runtime_max_spare, 16);
        assert_eq!(p.post_max_mb, 520);
        assert_eq!(p.db_log_file_mb, 921);
        assert_eq!(p.db_max_connections, 110);
    }

    #[test]
    fn tier_boundaries_are_exclusive_upper_bounds() {
        assert_eq!(Tier::for_ram(2047), Tier::Small);
        assert_eq!(Tier::for_ram(2048), Tier::Medium);
        assert_eq!(Tier::for_ram(4095), Tier::Medium);
        assert_eq!(Tier::for_ram(4096), Tier::Large);
        assert_eq!(Tier::for_ram(8191), Tier::Large);
        assert_eq!(Tier::for_ram(8192), Tier::XLarge);
    }

    #[test]
    fn medium_and_large_tiers() {
        let m = plan(2, 3072);
        assert_eq!(m.runtime_max_children, 20);
        assert_eq!(m.upload_max_mb, 128);
        assert_eq!(m.db_buffer_pool_mb, 800);
        assert_eq!(m.db_log_file_mb, 200);

        let l = plan(2, 6144);
        assert_eq!(l.runtime_max_children, 30);
        assert_eq!(l.runtime_memory_limit_mb, 384);
        assert_eq!(l.db_buffer_pool_mb, 1800);
        assert_eq!(l.cache_max_memory_mb, 256);
        assert_eq!(l.db_log_file_mb, 450);
    }

    #[test]
    fn buffer_pool_is_floor_of_45_percent_above_8gb() {
        for ram in [8192_u64, 8193, 12_000, 16_384, 32_768, 65_537, 131_071] {
            let p = plan(8, ram);
            let expected = (ram as f64 * 0.45).floor() as u64;
            assert_eq!(p.db_buffer_pool_mb, expected, "ram={ram}");
        }
    }

    #[test]
    fn derived_fields_hold_across_tiers() {
        for ram in (512..20_000).step_by(487) {
            for cpu in [1, 2, 3, 8, 32] {
                let p = plan(cpu, ram);
                assert_eq!(p.post_max_mb, p.upload_max_mb + 8);
                assert_eq!(p.db_log_file_mb, p.db_buffer_pool_mb / 4);
                assert_eq!(p.db_max_connections, p.runtime_max_children + 50);
            }
        }
    }

    #[test]
    fn spare_floors_hold_for_single_core() {
        for ram in [512, 2048, 4096, 8192] {
            let p = plan(1, ram);
            assert!(p.runtime_start_servers >= 2);
            assert!(p.runtime_min_spare >= 1);
            assert!(p.runtime_max_spare >= 3);
        }
        let p = plan(1, 1024);
        assert_eq!(
            (p.runtime_start_servers, p.runtime_min_spare, p.runtime_max_spare),
            (2, 1, 3)
        );
    }

    #[test]
    fn floors_apply_even_without_cores() {
        let p = plan(0, 1024);
        assert_eq!(p.runtime_start_servers, 2);
        assert_eq!(p.runtime_min_spare, 1);
        assert_eq!(p.runtime_max_spare, 3);
    }

    #[test]
    fn same_snapshot_same_plan() {
        let snapshot = ResourceSnapshot::new(6, 12_288, 80);
        assert_eq!(compute_allocation(&snapshot), compute_allocation(&snapshot));
    }
}
