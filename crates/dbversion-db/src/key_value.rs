use dbversion_common::{Error, Result};
use dbversion_config::model::{DEFAULT_METADATA_TABLE, DEFAULT_VERSION_KEY};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Transaction, params};

use crate::manager::VersionManager;
use crate::sqlite::{
    check_layout, initialize, sqlite_error, unexpected_value, validate_identifier,
    version_from_integer,
};
use crate::version::MigrationVersion;

const MAX_KEY_LEN: usize = 256;
const REQUIRED_COLUMNS: &[&str] = &["key", "value"];

/// Stores the version as one row of a general-purpose `key`/`value` table.
///
/// The table may hold other application settings. A table that exists but
/// has no row for the version key reads as version 0, and the row is seeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueVersionManager {
    table: String,
    key: String,
}

impl KeyValueVersionManager {
    pub fn new(table: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        let table = table.into();
        let key = key.into();
        validate_identifier(&table)?;
        if key.trim().is_empty() {
            return Err(Error::Config("version key cannot be empty".into()));
        }
        if key.len() > MAX_KEY_LEN {
            return Err(Error::Config(format!(
                "version key too long ({} > {MAX_KEY_LEN})",
                key.len()
            )));
        }
        Ok(Self { table, key })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn exists(&self, conn: &Connection) -> Result<bool> {
        check_layout(conn, &self.table, REQUIRED_COLUMNS, "key")
    }

    fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            );",
            self.table
        ))
        .map_err(|e| sqlite_error("failed to create metadata table", e))?;

        self.seed(conn)
    }

    fn seed(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO \"{}\" (key, value) VALUES (?1, '0')",
                self.table
            ),
            params![self.key],
        )
        .map_err(|e| sqlite_error("failed to seed version key", e))?;

        Ok(())
    }

    fn read(&self, conn: &Connection) -> Result<Option<Value>> {
        conn.query_row(
            &format!("SELECT value FROM \"{}\" WHERE key = ?1", self.table),
            params![self.key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| sqlite_error("failed to read migration version", e))
    }
}

impl Default for KeyValueVersionManager {
    fn default() -> Self {
        Self {
            table: DEFAULT_METADATA_TABLE.to_string(),
            key: DEFAULT_VERSION_KEY.to_string(),
        }
    }
}

impl VersionManager for KeyValueVersionManager {
    fn name(&self) -> &'static str {
        "key_value"
    }

    fn version(&self, conn: &Connection) -> Result<MigrationVersion> {
        if !self.exists(conn)? {
            initialize(conn, |conn| self.create(conn))?;
        }

        let mut value = self.read(conn)?;
        if value.is_none() {
            initialize(conn, |conn| self.seed(conn))?;
            value = self.read(conn)?;
        }

        let source = format!("key '{}' in table '{}'", self.key, self.table);
        match value {
            None => Err(Error::Corrupt(format!("{source} could not be seeded"))),
            Some(Value::Integer(v)) => version_from_integer(&source, v),
            Some(Value::Text(text)) => {
                let parsed = text.trim().parse::<i64>();
                match parsed {
                    Ok(v) => version_from_integer(&source, v),
                    Err(_) => Err(unexpected_value(&source, &Value::Text(text))),
                }
            }
            Some(other) => Err(unexpected_value(&source, &other)),
        }
    }

    fn set_version(&self, tx: &Transaction<'_>, version: MigrationVersion) -> Result<()> {
        if !self.exists(tx)? {
            self.create(tx)?;
        }

        tx.execute(
            &format!(
                "INSERT INTO \"{}\" (key, value) VALUES (?1, ?2)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value",
                self.table
            ),
            params![self.key, version.to_string()],
        )
        .map_err(|e| sqlite_error("failed to write migration version", e))?;

        Ok(())
    }
}
