use dbversion_common::Result;
use rusqlite::{Connection, Transaction};

use crate::manager::VersionManager;
use crate::sqlite::{sqlite_error, version_from_integer};
use crate::version::MigrationVersion;

/// Stores the version in SQLite's `user_version` header field.
///
/// The field always exists and starts at 0, so there is nothing to create.
/// Writes go through the journal like any other page and are undone by a
/// rollback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PragmaVersionManager;

impl VersionManager for PragmaVersionManager {
    fn name(&self) -> &'static str {
        "pragma"
    }

    fn version(&self, conn: &Connection) -> Result<MigrationVersion> {
        let value: i64 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .map_err(|e| sqlite_error("failed to read user_version", e))?;
        version_from_integer("PRAGMA user_version", value)
    }

    fn set_version(&self, tx: &Transaction<'_>, version: MigrationVersion) -> Result<()> {
        tx.pragma_update(None, "user_version", version)
            .map_err(|e| sqlite_error("failed to write user_version", e))
    }
}
