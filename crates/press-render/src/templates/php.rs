//! PHP-FPM pool.

use press_core::{AllocationPlan, PressConfig, megabytes};

use super::banner;

pub fn pool(plan: &AllocationPlan, config: &PressConfig) -> String {
    format!(
        "{banner}\
[www]
user = {user}
group = {user}

listen = {socket}
listen.owner = {user}
listen.group = {user}
listen.mode = 0660

pm = dynamic
pm.max_children = {max_children}
pm.start_servers = {start}
pm.min_spare_servers = {min_spare}
pm.max_spare_servers = {max_spare}
pm.max_requests = 500
pm.process_idle_timeout = 10s

request_terminate_timeout = 300

php_admin_value[memory_limit] = {memory_limit}
php_admin_value[upload_max_filesize] = {upload}
php_admin_value[post_max_size] = {post}
php_admin_value[max_execution_time] = 300
php_admin_value[max_input_vars] = 3000
php_admin_flag[expose_php] = off
",
        banner = banner(";", plan.tier),
        user = config.web.user,
        socket = config.php_socket(),
        max_children = plan.runtime_max_children,
        start = plan.runtime_start_servers,
        min_spare = plan.runtime_min_spare,
        max_spare = plan.runtime_max_spare,
        memory_limit = megabytes(plan.runtime_memory_limit_mb),
        upload = megabytes(plan.upload_max_mb),
        post = megabytes(plan.post_max_mb),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use press_core::{ResourceSnapshot, compute_allocation};

    #[test]
    fn pool_carries_plan_values() {
        let plan = compute_allocation(&ResourceSnapshot::new(4, 8192, 50));
        let text = pool(&plan, &PressConfig::default());
        assert!(text.contains("pm.max_children = 60\n"));
        assert!(text.contains("pm.start_servers = 12\n"));
        assert!(text.contains("pm.min_spare_servers = 8\n"));
        assert!(text.contains("pm.max_spare_servers = 16\n"));
        assert!(text.contains("php_admin_value[memory_limit] = 512M\n"));
        assert!(text.contains("php_admin_value[post_max_size] = 520M\n"));
        assert!(text.contains("listen = /run/php/php8.3-fpm.sock\n"));
    }
}
