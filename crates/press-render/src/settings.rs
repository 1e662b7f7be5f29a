//! Key settings per subsystem, for comparing live files against the plan.

use press_core::{AllocationPlan, Subsystem, megabytes};
use regex::Regex;
use serde::Serialize;

/// A directive the templates set from the plan, with its planned value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedSetting {
    pub key: &'static str,
    pub value: String,
}

fn setting(key: &'static str, value: impl ToString) -> PlannedSetting {
    PlannedSetting {
        key,
        value: value.to_string(),
    }
}

/// The plan-driven directives of a subsystem's global config, in file order.
pub fn planned_settings(subsystem: Subsystem, plan: &AllocationPlan) -> Vec<PlannedSetting> {
    match subsystem {
        Subsystem::WebServer => vec![
            setting("worker_processes", plan.web_worker_count),
            setting("client_max_body_size", megabytes(plan.upload_max_mb)),
        ],
        Subsystem::Runtime => vec![
            setting("pm.max_children", plan.runtime_max_children),
            setting("pm.start_servers", plan.runtime_start_servers),
            setting("pm.min_spare_servers", plan.runtime_min_spare),
            setting("pm.max_spare_servers", plan.runtime_max_spare),
            setting("php_admin_value[memory_limit]", megabytes(plan.runtime_memory_limit_mb)),
            setting("php_admin_value[upload_max_filesize]", megabytes(plan.upload_max_mb)),
            setting("php_admin_value[post_max_size]", megabytes(plan.post_max_mb)),
        ],
        Subsystem::Database => vec![
            setting("max_connections", plan.db_max_connections),
            setting("innodb_buffer_pool_size", megabytes(plan.db_buffer_pool_mb)),
            setting("innodb_log_file_size", megabytes(plan.db_log_file_mb)),
        ],
        Subsystem::Cache => vec![setting(
            "maxmemory",
            format!("{}mb", plan.cache_max_memory_mb),
        )],
    }
}

/// Read the effective value of `key` from config text.
///
/// Understands `key value;` (nginx), `key value` (redis) and `key = value`
/// (PHP-FPM, MariaDB). Commented lines are ignored and the last occurrence
/// wins, matching how the services themselves resolve repeats.
pub fn read_setting(content: &str, key: &str) -> Option<String> {
    let pattern = format!(r"(?m)^[ \t]*{}(?:[ \t]*=[ \t]*|[ \t]+)([^\s;#]+)", regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    re.captures_iter(content)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigTarget, render};
    use press_core::{PressConfig, ResourceSnapshot, compute_allocation};

    #[test]
    fn reads_each_syntax() {
        assert_eq!(read_setting("    worker_processes 4;\n", "worker_processes").as_deref(), Some("4"));
        assert_eq!(read_setting("maxmemory 256mb\nmaxmemory-policy allkeys-lru\n", "maxmemory").as_deref(), Some("256mb"));
        assert_eq!(read_setting("pm.max_children = 30\n", "pm.max_children").as_deref(), Some("30"));
        assert_eq!(
            read_setting("php_admin_value[memory_limit] = 384M\n", "php_admin_value[memory_limit]").as_deref(),
            Some("384M")
        );
    }

    #[test]
    fn ignores_comments_and_takes_last() {
        let content = "# max_connections = 10\nmax_connections = 100\nmax_connections = 150\n";
        assert_eq!(read_setting(content, "max_connections").as_deref(), Some("150"));
        assert_eq!(read_setting("; pm.max_children = 5\n", "pm.max_children"), None);
    }

    #[test]
    fn rendered_files_match_their_planned_settings() {
        let config = PressConfig::default();
        let plan = compute_allocation(&ResourceSnapshot::new(3, 5000, 40));
        for subsystem in Subsystem::ALL {
            let text = render(&ConfigTarget::for_subsystem(subsystem), &plan, &config);
            for planned in planned_settings(subsystem, &plan) {
                assert_eq!(
                    read_setting(&text, planned.key).as_deref(),
                    Some(planned.value.as_str()),
                    "{subsystem:?} {}",
                    planned.key
                );
            }
        }
    }
}
