//! SQL scripts for per-site database objects.

use press_core::SiteIdentity;

/// Site accounts connect over the local socket only.
const ACCOUNT_HOST: &str = "localhost";

fn identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

fn account(user: &str) -> String {
    format!("{}@{}", literal(user), literal(ACCOUNT_HOST))
}

/// Create the site database and its account, granting the account full
/// rights on that database only.
///
/// Safe to rerun: an existing account gets the new password.
pub fn create_site_database(identity: &SiteIdentity, password: &str) -> String {
    let db = identifier(&identity.database_name);
    let account = account(&identity.database_user);
    let password = literal(password);
    format!(
        "CREATE DATABASE IF NOT EXISTS {db} CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci;\n\
         CREATE USER IF NOT EXISTS {account} IDENTIFIED BY {password};\n\
         ALTER USER {account} IDENTIFIED BY {password};\n\
         GRANT ALL PRIVILEGES ON {db}.* TO {account};\n\
         FLUSH PRIVILEGES;\n"
    )
}

/// Drop the site database and account. Missing objects are not an error.
pub fn drop_site_database(identity: &SiteIdentity) -> String {
    format!(
        "DROP DATABASE IF EXISTS {};\n\
         DROP USER IF EXISTS {};\n\
         FLUSH PRIVILEGES;\n",
        identifier(&identity.database_name),
        account(&identity.database_user),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> SiteIdentity {
        SiteIdentity::derive("blog.example.com").unwrap()
    }

    #[test]
    fn create_grants_on_site_database_only() {
        let sql = create_site_database(&identity(), "s3cret");
        assert!(sql.contains("CREATE DATABASE IF NOT EXISTS `wp_blog_example_com`"));
        assert!(sql.contains("CREATE USER IF NOT EXISTS 'wp_blog_example_com'@'localhost' IDENTIFIED BY 's3cret';"));
        assert!(sql.contains("GRANT ALL PRIVILEGES ON `wp_blog_example_com`.* TO 'wp_blog_example_com'@'localhost';"));
    }

    #[test]
    fn drop_is_idempotent_sql() {
        let sql = drop_site_database(&identity());
        assert!(sql.contains("DROP DATABASE IF EXISTS `wp_blog_example_com`;"));
        assert!(sql.contains("DROP USER IF EXISTS 'wp_blog_example_com'@'localhost';"));
    }

    #[test]
    fn quoting_escapes_delimiters() {
        assert_eq!(identifier("a`b"), "`a``b`");
        assert_eq!(literal("it's"), "'it''s'");
        assert_eq!(literal(r"a\b"), r"'a\\b'");
    }
}
