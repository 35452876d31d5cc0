use std::path::Path;
use std::time::Duration;

use dbversion_common::Result;
use dbversion_config::DatabaseConfig;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::sqlite::sqlite_error;

/// Open the database at `db_path` and apply the connection settings.
pub fn open(db_path: &Path, config: &DatabaseConfig) -> Result<Connection> {
    info!("opening database at {}", db_path.display());
    let conn =
        Connection::open(db_path).map_err(|e| sqlite_error("failed to open database", e))?;
    configure(&conn, config)?;
    Ok(conn)
}

pub fn open_in_memory(config: &DatabaseConfig) -> Result<Connection> {
    let conn = Connection::open_in_memory()
        .map_err(|e| sqlite_error("failed to open in-memory database", e))?;
    configure(&conn, config)?;
    Ok(conn)
}

fn configure(conn: &Connection, config: &DatabaseConfig) -> Result<()> {
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|e| sqlite_error("failed to set busy timeout", e))?;

    let requested = config.journal_mode.as_pragma();
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", requested, |row| row.get(0))
        .map_err(|e| sqlite_error("failed to set journal_mode", e))?;
    if !mode.eq_ignore_ascii_case(requested) {
        // In-memory databases only support MEMORY or OFF.
        debug!("requested journal_mode {requested}, database uses {mode}");
    }

    conn.pragma_update(None, "foreign_keys", config.foreign_keys)
        .map_err(|e| sqlite_error("failed to set foreign_keys", e))?;

    Ok(())
}
