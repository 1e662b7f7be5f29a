//! MariaDB server drop-in.

use press_core::{AllocationPlan, megabytes};

use super::banner;

pub fn server(plan: &AllocationPlan) -> String {
    format!(
        "{banner}\
[mysqld]
bind-address = 127.0.0.1
skip-name-resolve

max_connections = {max_connections}
max_allowed_packet = {packet}

innodb_buffer_pool_size = {buffer_pool}
innodb_log_file_size = {log_file}
innodb_flush_log_at_trx_commit = 2
innodb_flush_method = O_DIRECT
innodb_file_per_table = 1

character-set-server = utf8mb4
collation-server = utf8mb4_unicode_ci

slow_query_log = 1
slow_query_log_file = /var/log/mysql/slow.log
long_query_time = 2
",
        banner = banner("#", plan.tier),
        max_connections = plan.db_max_connections,
        packet = megabytes(plan.post_max_mb),
        buffer_pool = megabytes(plan.db_buffer_pool_mb),
        log_file = megabytes(plan.db_log_file_mb),
    )
}
