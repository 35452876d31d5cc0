use dbversion_common::{Error, Result};
use dbversion_config::model::DEFAULT_VERSION_TABLE;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Transaction, params};

use crate::manager::VersionManager;
use crate::sqlite::{
    check_layout, initialize, sqlite_error, unexpected_value, validate_identifier,
    version_from_integer,
};
use crate::version::MigrationVersion;

const REQUIRED_COLUMNS: &[&str] = &["id", "version"];

/// Stores the version in a dedicated single-row table.
///
/// ```sql
/// CREATE TABLE schema_migration_version (
///     id INTEGER PRIMARY KEY CHECK (id = 1),
///     version INTEGER NOT NULL CHECK (version >= 0)
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableVersionManager {
    table: String,
}

impl TableVersionManager {
    pub fn new(table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_identifier(&table)?;
        Ok(Self { table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Whether the table exists. An existing table with the wrong shape is corrupt.
    fn exists(&self, conn: &Connection) -> Result<bool> {
        check_layout(conn, &self.table, REQUIRED_COLUMNS, "id")
    }

    fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL CHECK (version >= 0)
            );
            INSERT OR IGNORE INTO \"{table}\" (id, version) VALUES (1, 0);",
            table = self.table
        ))
        .map_err(|e| sqlite_error("failed to create version table", e))
    }
}

impl Default for TableVersionManager {
    fn default() -> Self {
        Self {
            table: DEFAULT_VERSION_TABLE.to_string(),
        }
    }
}

impl VersionManager for TableVersionManager {
    fn name(&self) -> &'static str {
        "table"
    }

    fn version(&self, conn: &Connection) -> Result<MigrationVersion> {
        if !self.exists(conn)? {
            initialize(conn, |conn| self.create(conn))?;
        }

        let value: Option<Value> = conn
            .query_row(
                &format!("SELECT version FROM \"{}\" WHERE id = 1", self.table),
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| sqlite_error("failed to read migration version", e))?;

        let source = format!("table '{}'", self.table);
        match value {
            Some(Value::Integer(v)) => version_from_integer(&source, v),
            Some(other) => Err(unexpected_value(&source, &other)),
            None => Err(Error::Corrupt(format!("{source} has no version row"))),
        }
    }

    fn set_version(&self, tx: &Transaction<'_>, version: MigrationVersion) -> Result<()> {
        if !self.exists(tx)? {
            self.create(tx)?;
        }

        tx.execute(
            &format!(
                "INSERT INTO \"{}\" (id, version) VALUES (1, ?1)
                 ON CONFLICT (id) DO UPDATE SET version = excluded.version",
                self.table
            ),
            params![version],
        )
        .map_err(|e| sqlite_error("failed to write migration version", e))?;

        Ok(())
    }
}
