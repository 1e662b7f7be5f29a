//! Redis object cache.

use press_core::AllocationPlan;

use super::banner;

pub fn server(plan: &AllocationPlan) -> String {
    format!(
        "{banner}\
bind 127.0.0.1 ::1
protected-mode yes
port 6379
tcp-keepalive 300
timeout 0

daemonize no
supervised systemd
pidfile /run/redis/redis-server.pid
loglevel notice
logfile /var/log/redis/redis-server.log
dir /var/lib/redis

maxmemory {maxmemory}mb
maxmemory-policy allkeys-lru

save \"\"
appendonly no
",
        banner = banner("#", plan.tier),
        maxmemory = plan.cache_max_memory_mb,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use press_core::{ResourceSnapshot, compute_allocation};

    #[test]
    fn server_sets_maxmemory() {
        let plan = compute_allocation(&ResourceSnapshot::new(2, 6144, 20));
        let text = server(&plan);
        assert!(text.contains("maxmemory 256mb\n"));
        assert!(text.contains("maxmemory-policy allkeys-lru\n"));
    }
}
