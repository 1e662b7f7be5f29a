//! Record types stored in the state files.

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};

/// Timestamp layout used in both state files.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time truncated to whole seconds.
pub fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

// ── Site registry ─────────────────────────────────────────────────

/// A provisioned site and the database objects it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub domain: String,
    pub database_name: String,
    pub database_user: String,
    pub created_at: NaiveDateTime,
}

impl SiteRecord {
    pub const FIELD_SEPARATOR: char = '|';

    pub fn new(
        domain: &str,
        database_name: &str,
        database_user: &str,
        created_at: NaiveDateTime,
    ) -> StateResult<Self> {
        check_registry_field("domain", domain)?;
        check_registry_field("database_name", database_name)?;
        check_registry_field("database_user", database_user)?;
        Ok(Self {
            domain: domain.to_string(),
            database_name: database_name.to_string(),
            database_user: database_user.to_string(),
            created_at,
        })
    }

    /// Render as a registry line (without the trailing newline).
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.domain,
            self.database_name,
            self.database_user,
            self.created_at.format(TIMESTAMP_FORMAT)
        )
    }

    /// Parse a registry line. Returns `None` for anything malformed.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.split(Self::FIELD_SEPARATOR);
        let domain = parts.next()?.trim();
        let database_name = parts.next()?.trim();
        let database_user = parts.next()?.trim();
        let created_at = parts.next()?.trim();
        if parts.next().is_some() || domain.is_empty() {
            return None;
        }
        let created_at = NaiveDateTime::parse_from_str(created_at, TIMESTAMP_FORMAT).ok()?;
        Some(Self {
            domain: domain.to_string(),
            database_name: database_name.to_string(),
            database_user: database_user.to_string(),
            created_at,
        })
    }
}

fn check_registry_field(field: &'static str, value: &str) -> StateResult<()> {
    if value.trim().is_empty() {
        return Err(StateError::invalid(field, "must not be empty"));
    }
    if value.trim() != value {
        return Err(StateError::invalid(
            field,
            format!("{value:?} has leading or trailing whitespace"),
        ));
    }
    if value.contains(SiteRecord::FIELD_SEPARATOR) || value.contains(['\n', '\r']) {
        return Err(StateError::invalid(
            field,
            format!("{value:?} contains '|' or a line break"),
        ));
    }
    if value.starts_with('#') {
        return Err(StateError::invalid(field, "must not start with '#'"));
    }
    Ok(())
}

// ── Credential log ────────────────────────────────────────────────

/// One block in the credential log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialEntry {
    /// Domain or system secret name the fields belong to.
    pub subject: String,
    /// Ordered `label: value` pairs.
    pub fields: Vec<(String, String)>,
    pub created_at: NaiveDateTime,
}

impl CredentialEntry {
    pub const SEPARATOR: &'static str = "----------------------------------------";

    pub fn new<L, V>(subject: &str, fields: &[(L, V)], created_at: NaiveDateTime) -> StateResult<Self>
    where
        L: AsRef<str>,
        V: AsRef<str>,
    {
        if subject.trim().is_empty() || subject.contains(['\n', '\r']) {
            return Err(StateError::invalid("subject", format!("{subject:?}")));
        }
        if fields.is_empty() {
            return Err(StateError::invalid("fields", "at least one field is required"));
        }
        let mut owned = Vec::with_capacity(fields.len());
        for (label, value) in fields {
            let (label, value) = (label.as_ref(), value.as_ref());
            if label.trim().is_empty() || label.contains([':', '\n', '\r']) {
                return Err(StateError::invalid("label", format!("{label:?}")));
            }
            if value.contains(['\n', '\r']) {
                return Err(StateError::invalid(
                    "value",
                    format!("value for {label:?} contains a line break"),
                ));
            }
            owned.push((label.to_string(), value.to_string()));
        }
        Ok(Self {
            subject: subject.to_string(),
            fields: owned,
            created_at,
        })
    }

    /// Render the block appended to the log.
    pub fn to_block(&self) -> String {
        let mut out = format!("## {}\n", self.subject);
        out.push_str(&format!(
            "created_at: {}\n",
            self.created_at.format(TIMESTAMP_FORMAT)
        ));
        for (label, value) in &self.fields {
            out.push_str(&format!("{label}: {value}\n"));
        }
        out.push_str(Self::SEPARATOR);
        out.push('\n');
        out
    }
}
