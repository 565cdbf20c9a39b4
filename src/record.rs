//! Record types
//!
//! Wire types for the remote athletes collection. Field names (`id`, `name`,
//! `country`) are the wire contract and round-trip unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Server-assigned record identifier
///
/// Backends differ on whether ids are JSON numbers or strings, so both are
/// kept in the form the server sent them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(u64),
    Text(String),
}

impl RecordId {
    /// Parse an id typed by a user (CLI argument, form field)
    ///
    /// Digits become a numeric id, anything else stays textual.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<u64>() {
            Ok(n) => RecordId::Number(n),
            Err(_) => RecordId::Text(raw.to_string()),
        }
    }

    /// Path segment for `DELETE {endpoint}/{id}`
    pub fn to_path_segment(&self) -> String {
        match self {
            RecordId::Number(n) => n.to_string(),
            RecordId::Text(s) => urlencoding::encode(s).into_owned(),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        RecordId::Number(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

/// A single athlete in the remote collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    pub country: String,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, name: &str, country: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            country: country.to_string(),
        }
    }
}

/// Creation payload, `{name, country}` on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Draft {
    pub name: String,
    pub country: String,
}

impl Draft {
    pub fn new(name: &str, country: &str) -> Self {
        Self {
            name: name.to_string(),
            country: country.to_string(),
        }
    }

    /// Presence check run before any network call
    pub fn validate(&self) -> Result<(), SyncError> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.country.trim().is_empty() {
            missing.push("country");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SyncError::InvalidDraft(format!(
                "missing {}",
                missing.join(" and ")
            )))
        }
    }

    /// Copy with surrounding whitespace removed from both fields
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            country: self.country.trim().to_string(),
        }
    }
}
