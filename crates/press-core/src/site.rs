//! Domain validation and database identity derivation for hosted sites.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// MariaDB limits database names to 64 characters.
const MAX_DATABASE_NAME: usize = 64;
/// MariaDB accounts created for sites stay within the MySQL-compatible 32.
const MAX_DATABASE_USER: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain name is empty")]
    Empty,
    #[error("domain name is longer than 253 characters")]
    TooLong,
    #[error("invalid domain name: {0}")]
    Invalid(String),
}

fn domain_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$")
            .expect("domain pattern is valid")
    })
}

/// Normalize and validate an operator-supplied domain.
///
/// Surrounding whitespace and a trailing dot are dropped and the name is
/// lower-cased. Schemes, paths, ports and wildcards are rejected.
pub fn validate_domain(input: &str) -> Result<String, DomainError> {
    let domain = input.trim().trim_end_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return Err(DomainError::Empty);
    }
    if domain.len() > 253 {
        return Err(DomainError::TooLong);
    }
    if !domain_pattern().is_match(&domain) {
        return Err(DomainError::Invalid(input.trim().to_string()));
    }
    Ok(domain)
}

/// Database objects belonging to one hosted site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteIdentity {
    pub domain: String,
    pub database_name: String,
    pub database_user: String,
}

impl SiteIdentity {
    /// Derive the identity for a domain. Deterministic: the same domain
    /// always maps to the same database and user.
    pub fn derive(domain: &str) -> Result<Self, DomainError> {
        let domain = validate_domain(domain)?;
        let slug: String = domain
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let base = format!("wp_{slug}");
        Ok(Self {
            database_name: truncate(&base, MAX_DATABASE_NAME),
            database_user: truncate(&base, MAX_DATABASE_USER),
            domain,
        })
    }
}

fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
