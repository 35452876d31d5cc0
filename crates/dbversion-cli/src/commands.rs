use anyhow::{Context, Result, bail};
use dbversion_config::AppConfig;
use dbversion_db::{MigrationVersion, VersionManager, connection, manager_for};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct VersionReport<'a> {
    version: MigrationVersion,
    strategy: &'a str,
}

pub fn get(config: &AppConfig, json: bool) -> Result<()> {
    let conn = open(config)?;
    let manager = manager_for(&config.versioning)?;

    let version = read_version(&conn, manager.as_ref())?;
    print_report(manager.name(), version, json)
}

/// Write `version` inside an immediate transaction and commit it.
///
/// The current version is read in the same transaction, so the downgrade
/// check cannot race another writer.
pub fn set(
    config: &AppConfig,
    version: MigrationVersion,
    allow_downgrade: bool,
    json: bool,
) -> Result<()> {
    let mut conn = open(config)?;
    let manager = manager_for(&config.versioning)?;
    let previous = apply_version(&mut conn, manager.as_ref(), version, allow_downgrade)?;

    info!(
        from = %previous,
        to = %version,
        strategy = manager.name(),
        "migration version updated"
    );
    print_report(manager.name(), version, json)
}

fn open(config: &AppConfig) -> Result<Connection> {
    let path = config
        .database
        .path
        .as_deref()
        .context("no database given: pass --db or set database.path in the config file")?;
    let conn = connection::open(path, &config.database)
        .with_context(|| format!("failed to open {}", path.display()))?;
    Ok(conn)
}

fn read_version(conn: &Connection, manager: &dyn VersionManager) -> Result<MigrationVersion> {
    manager
        .version(conn)
        .with_context(|| format!("failed to read version ({} strategy)", manager.name()))
}

/// Returns the version that was replaced.
fn apply_version(
    conn: &mut Connection,
    manager: &dyn VersionManager,
    version: MigrationVersion,
    allow_downgrade: bool,
) -> Result<MigrationVersion> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("failed to begin transaction")?;

    let current = read_version(&tx, manager)?;
    if version < current {
        if !allow_downgrade {
            bail!(
                "refusing to lower migration version from {current} to {version} \
                 (pass --allow-downgrade to force)"
            );
        }
        warn!("lowering migration version from {current} to {version}");
    }

    manager
        .set_version(&tx, version)
        .with_context(|| format!("failed to record version {version}"))?;
    tx.commit().context("failed to commit version update")?;

    Ok(current)
}

fn print_report(strategy: &str, version: MigrationVersion, json: bool) -> Result<()> {
    if json {
        let report = VersionReport { version, strategy };
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!("{version}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbversion_config::VersionStrategy;

    fn v(n: u32) -> MigrationVersion {
        MigrationVersion::new(n).unwrap()
    }

    fn config_for(dir: &tempfile::TempDir, strategy: VersionStrategy) -> AppConfig {
        let mut config = AppConfig::default();
        config.database.path = Some(dir.path().join("app.db"));
        config.versioning.strategy = strategy;
        config
    }

    #[test]
    fn set_then_get_through_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&dir, VersionStrategy::KeyValue);

        set(&config, v(4), false, true).unwrap();

        let conn = open(&config).unwrap();
        let manager = manager_for(&config.versioning).unwrap();
        assert_eq!(read_version(&conn, manager.as_ref()).unwrap(), v(4));
        get(&config, false).unwrap();
    }

    #[test]
    fn downgrade_requires_flag() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&dir, VersionStrategy::Table);
        let mut conn = open(&config).unwrap();
        let manager = manager_for(&config.versioning).unwrap();

        assert_eq!(
            apply_version(&mut conn, manager.as_ref(), v(5), false).unwrap(),
            MigrationVersion::ZERO
        );

        let err = apply_version(&mut conn, manager.as_ref(), v(2), false).unwrap_err();
        assert!(err.to_string().contains("--allow-downgrade"));
        assert_eq!(read_version(&conn, manager.as_ref()).unwrap(), v(5));

        assert_eq!(
            apply_version(&mut conn, manager.as_ref(), v(2), true).unwrap(),
            v(5)
        );
        assert_eq!(read_version(&conn, manager.as_ref()).unwrap(), v(2));
    }

    #[test]
    fn missing_database_path_is_reported() {
        let err = get(&AppConfig::default(), false).unwrap_err();
        assert!(err.to_string().contains("no database given"));
    }

    #[test]
    fn report_serializes_version_as_number() {
        let report = VersionReport {
            version: v(3),
            strategy: "pragma",
        };
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"version":3,"strategy":"pragma"}"#
        );
    }
}
