use dbversion_common::{Error, Result};
use rusqlite::types::Value;
use rusqlite::{
    Connection, ErrorCode, OptionalExtension, Transaction, TransactionBehavior, params,
};

use crate::version::MigrationVersion;

const MAX_IDENTIFIER_LEN: usize = 128;

/// Map a rusqlite error onto the crate's error kinds, prefixed with `context`.
pub(crate) fn sqlite_error(context: &str, e: rusqlite::Error) -> Error {
    let message = format!("{context}: {e}");
    match &e {
        rusqlite::Error::SqliteFailure(err, _) => match err.code {
            ErrorCode::ConstraintViolation => Error::Constraint(message),
            ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase => Error::Corrupt(message),
            _ => Error::Database(message),
        },
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => Error::Corrupt(message),
        _ => Error::Database(message),
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub(crate) fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Config("table name cannot be empty".into()));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::Config(format!(
            "table name too long ({} > {MAX_IDENTIFIER_LEN})",
            name.len()
        )));
    }

    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !starts_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::Config(format!(
            "invalid table name '{name}': use letters, digits and underscores"
        )));
    }
    if name.to_ascii_lowercase().starts_with("sqlite_") {
        return Err(Error::Config(format!(
            "table name '{name}' uses the reserved sqlite_ prefix"
        )));
    }
    Ok(())
}

/// Column names of `table`, or `None` if nothing by that name exists.
///
/// A view or index that holds the name is [`Error::Corrupt`].
#[cfg(test)]
pub(crate) fn table_columns(conn: &Connection, table: &str) -> Result<Option<Vec<String>>> {
    let columns = table_info(conn, table)?;
    Ok(columns.map(|columns| columns.into_iter().map(|(name, _)| name).collect()))
}

/// `(name, pk)` pairs from `pragma_table_info`, where `pk` is the column's
/// position in the primary key or 0.
fn table_info(conn: &Connection, table: &str) -> Result<Option<Vec<(String, i64)>>> {
    let kind: Option<String> = conn
        .query_row(
            "SELECT type FROM sqlite_master
             WHERE name = ?1 COLLATE NOCASE AND type IN ('table', 'view', 'index')
             LIMIT 1",
            params![table],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| sqlite_error("failed to look up version table", e))?;

    match kind.as_deref() {
        None => return Ok(None),
        Some("table") => {}
        Some(other) => {
            return Err(Error::Corrupt(format!(
                "'{table}' is a {other}, expected a table"
            )));
        }
    }

    let mut stmt = conn
        .prepare("SELECT name, pk FROM pragma_table_info(?1)")
        .map_err(|e| sqlite_error("failed to prepare table_info query", e))?;
    let columns = stmt
        .query_map(params![table], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(|e| sqlite_error("failed to inspect version table", e))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| sqlite_error("failed to read table_info row", e))?;

    Ok(Some(columns))
}

/// Whether `table` exists in a shape the upsert can write to.
///
/// An existing table must have every `required` column, and `key_column`
/// must be its sole primary key or carry a single-column unique index.
/// Anything else is [`Error::Corrupt`].
pub(crate) fn check_layout(
    conn: &Connection,
    table: &str,
    required: &[&str],
    key_column: &str,
) -> Result<bool> {
    let Some(columns) = table_info(conn, table)? else {
        return Ok(false);
    };

    for name in required {
        if !columns.iter().any(|(c, _)| c.eq_ignore_ascii_case(name)) {
            return Err(Error::Corrupt(format!(
                "table '{table}' exists but has no '{name}' column"
            )));
        }
    }

    let pk_columns: Vec<&str> = columns
        .iter()
        .filter(|(_, pk)| *pk > 0)
        .map(|(name, _)| name.as_str())
        .collect();
    let sole_pk = matches!(pk_columns.as_slice(), [only] if only.eq_ignore_ascii_case(key_column));

    if !sole_pk && !has_unique_index(conn, table, key_column)? {
        return Err(Error::Corrupt(format!(
            "table '{table}' has no primary key or unique index on '{key_column}'"
        )));
    }
    Ok(true)
}

fn has_unique_index(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    conn.query_row(
        "SELECT count(*) > 0 FROM pragma_index_list(?1) AS il
         WHERE il.\"unique\" = 1
           AND il.partial = 0
           AND (SELECT count(*) FROM pragma_index_info(il.name)) = 1
           AND (SELECT name FROM pragma_index_info(il.name)) = ?2 COLLATE NOCASE",
        params![table, column],
        |row| row.get(0),
    )
    .map_err(|e| sqlite_error("failed to inspect version table indexes", e))
}

/// Run `init` so metadata creation is atomic.
///
/// Outside a transaction this takes the write lock up front with
/// `BEGIN IMMEDIATE`, so racing first callers queue on the busy handler
/// instead of failing on lock upgrade. Inside the caller's transaction the
/// work simply joins it.
pub(crate) fn initialize<F>(conn: &Connection, init: F) -> Result<()>
where
    F: FnOnce(&Connection) -> Result<()>,
{
    if !conn.is_autocommit() {
        return init(conn);
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(|e| sqlite_error("failed to begin metadata transaction", e))?;
    init(&*tx)?;
    tx.commit()
        .map_err(|e| sqlite_error("failed to commit version metadata", e))
}

pub(crate) fn version_from_integer(source: &str, value: i64) -> Result<MigrationVersion> {
    MigrationVersion::try_from(value).map_err(|_| {
        Error::Corrupt(format!(
            "{source} holds {value}, outside 0..={}",
            MigrationVersion::MAX
        ))
    })
}

pub(crate) fn unexpected_value(source: &str, value: &Value) -> Error {
    match value {
        Value::Text(text) => Error::Corrupt(format!("{source} holds non-integer text '{text}'")),
        other => Error::Corrupt(format!(
            "{source} holds a {} value, expected an integer",
            other.data_type()
        )),
    }
}
