use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_VERSION_TABLE: &str = "schema_migration_version";
pub const DEFAULT_METADATA_TABLE: &str = "metadata";
pub const DEFAULT_VERSION_KEY: &str = "schema_version";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub versioning: VersioningConfig,
}

/// How to open the SQLite database whose version is tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    pub journal_mode: JournalMode,
    pub foreign_keys: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5_000,
            journal_mode: JournalMode::Wal,
            foreign_keys: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    #[default]
    Wal,
    Off,
}

impl JournalMode {
    pub fn as_pragma(self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
            JournalMode::Off => "OFF",
        }
    }
}

/// Which storage strategy holds the migration version, and where.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersioningConfig {
    pub strategy: VersionStrategy,
    /// Table name. Defaults depend on the strategy.
    pub table: Option<String>,
    /// Row key, only used by the key-value strategy.
    pub key: Option<String>,
}

impl VersioningConfig {
    pub fn table_name(&self) -> &str {
        match (&self.table, self.strategy) {
            (Some(table), _) => table,
            (None, VersionStrategy::KeyValue) => DEFAULT_METADATA_TABLE,
            (None, _) => DEFAULT_VERSION_TABLE,
        }
    }

    pub fn key_name(&self) -> &str {
        self.key.as_deref().unwrap_or(DEFAULT_VERSION_KEY)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStrategy {
    /// Dedicated single-row table.
    #[default]
    Table,
    /// SQLite `PRAGMA user_version`.
    Pragma,
    /// One row in a shared key/value metadata table.
    KeyValue,
}

impl VersionStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            VersionStrategy::Table => "table",
            VersionStrategy::Pragma => "pragma",
            VersionStrategy::KeyValue => "key_value",
        }
    }
}

impl fmt::Display for VersionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(VersionStrategy::Table),
            "pragma" | "user_version" => Ok(VersionStrategy::Pragma),
            "key_value" | "key-value" | "kv" => Ok(VersionStrategy::KeyValue),
            other => Err(format!(
                "unknown version strategy '{other}' (expected table, pragma or key_value)"
            )),
        }
    }
}
