//! Bulk CSV pipelines
//!
//! Import parses an untrusted upload and reports per-row outcomes; export
//! streams persisted rows back out with a fixed, versioned header.

pub mod csv_table;
pub mod export;
pub mod import;

use std::fmt;
use std::str::FromStr;

pub use csv_table::{CsvError, CsvTable, HeaderIndex};
pub use export::{CsvRecord, ExportHandle, EXPORT_VERSION};
pub use import::{ImportReport, ImportRow, ImportStore, RowError};

/// Entity types that support bulk transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Accounts,
    Opportunities,
}

impl Entity {
    pub fn as_str(self) -> &'static str {
        match self {
            Entity::Accounts => "accounts",
            Entity::Opportunities => "opportunities",
        }
    }

    /// Download name used in `Content-Disposition`.
    pub fn file_name(self) -> String {
        format!("{}.csv", self.as_str())
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity '{0}' (expected accounts or opportunities)")]
pub struct UnknownEntity(pub String);

impl FromStr for Entity {
    type Err = UnknownEntity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accounts" => Ok(Entity::Accounts),
            "opportunities" => Ok(Entity::Opportunities),
            _ => Err(UnknownEntity(s.to_owned())),
        }
    }
}
