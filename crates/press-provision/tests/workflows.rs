//! End-to-end site workflows against the recording host.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use press_core::{PressConfig, ResourceSnapshot, compute_allocation};
use press_provision::testing::FakeHost;
use press_provision::{InstallMethod, NewSite, ProvisionError, Provisioner, StalePolicy};

fn provisioner(root: &Path, fake: &FakeHost) -> Provisioner {
    let plan = compute_allocation(&ResourceSnapshot::new(4, 8192, 80));
    Provisioner::new(fake.host(), PressConfig::rooted_at(root), plan)
}

fn new_site(domain: &str) -> NewSite {
    NewSite {
        domain: domain.to_string(),
        title: Some("Blog".to_string()),
        admin_user: "editor".to_string(),
        admin_email: "ops@example.com".to_string(),
    }
}

#[test]
fn add_site_provisions_everything() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeHost::new();
    let p = provisioner(dir.path(), &fake);

    let report = p.add_site(&new_site("Blog.Example.com."), StalePolicy::Abort).unwrap();
    assert_eq!(report.domain, "blog.example.com");
    assert_eq!(report.database_name, "wp_blog_example_com");
    assert_eq!(report.install_method, InstallMethod::Cli);

    let sql = fake.sql();
    assert_eq!(sql.len(), 1);
    assert!(sql[0].contains("CREATE DATABASE IF NOT EXISTS `wp_blog_example_com`"));

    let config = p.config();
    assert!(config.site_root("blog.example.com").join("wp-config.php").is_file());
    assert!(fs::symlink_metadata(config.site_enabled_path("blog.example.com")).is_ok());
    assert!(fake.called(&format!(
        "set_owner:www-data:{}",
        config.site_root("blog.example.com").display()
    )));

    let sites = p.list_sites().unwrap();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].database_user, "wp_blog_example_com");

    let log_path = config.credentials_path();
    let log = fs::read_to_string(&log_path).unwrap();
    assert!(log.starts_with("## blog.example.com\n"));
    assert!(log.contains("database_password: "));
    assert!(log.contains("admin_user: editor\n"));
    assert_eq!(fs::metadata(&log_path).unwrap().permissions().mode() & 0o777, 0o600);
}

#[test]
fn duplicate_site_is_rejected_without_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeHost::new();
    let p = provisioner(dir.path(), &fake);
    p.add_site(&new_site("a.test"), StalePolicy::Abort).unwrap();
    let log_before = fs::read_to_string(p.config().credentials_path()).unwrap();
    fake.clear();

    let err = p.add_site(&new_site("a.test"), StalePolicy::Reset).unwrap_err();
    assert!(matches!(err, ProvisionError::DuplicateSite(ref d) if d == "a.test"));
    assert!(fake.calls().is_empty());
    assert_eq!(p.list_sites().unwrap().len(), 1);
    assert_eq!(fs::read_to_string(p.config().credentials_path()).unwrap(), log_before);
}

#[test]
fn stale_directory_under_abort_writes_no_state() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeHost::new();
    let p = provisioner(dir.path(), &fake);
    let leftover = p.config().site_root("a.test");
    fs::create_dir_all(&leftover).unwrap();
    fs::write(leftover.join("index.php"), "<?php").unwrap();

    let err = p.add_site(&new_site("a.test"), StalePolicy::Abort).unwrap_err();
    match err {
        ProvisionError::StaleSite { domain, path } => {
            assert_eq!(domain, "a.test");
            assert_eq!(path, leftover);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(fake.calls().is_empty());
    assert!(!p.config().registry_path().exists());
    assert!(!p.config().credentials_path().exists());
    assert!(leftover.join("index.php").exists());
}

#[test]
fn stale_directory_under_reset_is_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeHost::new();
    let p = provisioner(dir.path(), &fake);
    let leftover = p.config().site_root("a.test");
    fs::create_dir_all(&leftover).unwrap();
    fs::write(leftover.join("half-done.txt"), "x").unwrap();

    p.add_site(&new_site("a.test"), StalePolicy::Reset).unwrap();
    let sql = fake.sql();
    assert!(sql[0].starts_with("DROP DATABASE IF EXISTS `wp_a_test`"));
    assert!(sql[1].starts_with("CREATE DATABASE"));
    assert!(!leftover.join("half-done.txt").exists());
    assert_eq!(p.list_sites().unwrap().len(), 1);
}

#[test]
fn failed_install_leaves_site_unregistered() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeHost::new();
    fake.fail("configure:");
    let p = provisioner(dir.path(), &fake);

    let err = p.add_site(&new_site("a.test"), StalePolicy::Abort).unwrap_err();
    assert!(matches!(err, ProvisionError::Tool { .. }));
    assert!(p.list_sites().unwrap().is_empty());
    assert!(!p.config().credentials_path().exists());

    // The partial site is now stale.
    let again = p.add_site(&new_site("a.test"), StalePolicy::Abort).unwrap_err();
    assert!(matches!(again, ProvisionError::StaleSite { .. }));
}

#[test]
fn remove_site_drops_database_and_entry() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeHost::new();
    let p = provisioner(dir.path(), &fake);
    p.add_site(&new_site("a.test"), StalePolicy::Abort).unwrap();
    p.add_site(&new_site("b.test"), StalePolicy::Abort).unwrap();

    let removed = p.remove_site("a.test").unwrap();
    assert_eq!(removed.database_name, "wp_a_test");

    let sql = fake.sql();
    let drop = sql.last().unwrap();
    assert!(drop.contains("DROP DATABASE IF EXISTS `wp_a_test`"));
    assert!(drop.contains("DROP USER IF EXISTS 'wp_a_test'@'localhost'"));

    let remaining: Vec<String> = p.list_sites().unwrap().into_iter().map(|r| r.domain).collect();
    assert_eq!(remaining, vec!["b.test"]);
    assert!(!p.config().site_root("a.test").exists());
    assert!(!p.config().site_available_path("a.test").exists());

    assert!(matches!(p.remove_site("a.test"), Err(ProvisionError::SiteNotFound(_))));
}

#[test]
fn credential_log_keeps_history_across_reprovisioning() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeHost::new();
    let p = provisioner(dir.path(), &fake);
    p.add_site(&new_site("a.test"), StalePolicy::Abort).unwrap();
    p.remove_site("a.test").unwrap();
    p.add_site(&new_site("a.test"), StalePolicy::Abort).unwrap();

    let log = fs::read_to_string(p.config().credentials_path()).unwrap();
    assert_eq!(log.matches("## a.test\n").count(), 2);
}

#[test]
fn backup_all_covers_every_site() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeHost::new();
    let p = provisioner(dir.path(), &fake);
    p.add_site(&new_site("a.test"), StalePolicy::Abort).unwrap();
    p.add_site(&new_site("b.test"), StalePolicy::Abort).unwrap();

    let manifests = p.backup_all().unwrap();
    assert_eq!(manifests.len(), 2);
    for manifest in &manifests {
        assert!(manifest.directory.starts_with(p.config().site_backup_dir(&manifest.domain)));
        assert_eq!(manifest.database.sha256.len(), 64);
        assert!(manifest.file_count >= 1);
    }
}

#[test]
fn vhost_reconfigure_after_plan_change() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeHost::new();
    let p = provisioner(dir.path(), &fake);
    p.add_site(&new_site("a.test"), StalePolicy::Abort).unwrap();

    let unchanged = p.reconfigure_vhosts(None).unwrap();
    assert!(unchanged.iter().all(|o| !o.changed));

    let smaller = Provisioner::new(
        fake.host(),
        PressConfig::rooted_at(dir.path()),
        compute_allocation(&ResourceSnapshot::new(1, 1024, 80)),
    );
    let changed = smaller.reconfigure_vhosts(Some("a.test")).unwrap();
    assert!(changed[0].changed);
    let block = fs::read_to_string(p.config().site_available_path("a.test")).unwrap();
    assert!(block.contains("client_max_body_size 64M;"));
}
