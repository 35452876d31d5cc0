mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dbversion_config::{AppConfig, ConfigLoader, VersionStrategy};
use dbversion_db::MigrationVersion;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "dbversion",
    version,
    about = "Inspect and update the migration version of a SQLite database"
)]
struct Cli {
    /// Config file (.yml, .yaml or .toml)
    #[arg(short, long, env = "DBVERSION_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Database file, overrides `database.path`
    #[arg(long, env = "DBVERSION_DB", global = true)]
    db: Option<PathBuf>,

    /// Storage strategy: table, pragma or key_value
    #[arg(long, global = true)]
    strategy: Option<VersionStrategy>,

    /// Table holding the version
    #[arg(long, global = true)]
    table: Option<String>,

    /// Row key for the key_value strategy
    #[arg(long, global = true)]
    key: Option<String>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the current migration version
    Get,
    /// Record a new migration version in a single transaction
    Set {
        #[arg(value_name = "VERSION")]
        target: MigrationVersion,

        /// Allow setting a version lower than the current one
        #[arg(long)]
        allow_downgrade: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = resolve_config(&cli)?;
    match cli.command {
        Command::Get => commands::get(&config, cli.json),
        Command::Set {
            target,
            allow_downgrade,
        } => commands::set(&config, target, allow_downgrade, cli.json),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the config file, then apply command-line overrides.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = ConfigLoader::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;

    if let Some(db) = &cli.db {
        config.database.path = Some(db.clone());
    }
    if let Some(strategy) = cli.strategy {
        config.versioning.strategy = strategy;
    }
    if let Some(table) = &cli.table {
        config.versioning.table = Some(table.clone());
    }
    if let Some(key) = &cli.key {
        config.versioning.key = Some(key.clone());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::path::Path;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_set_with_global_flags() {
        let cli = Cli::try_parse_from([
            "dbversion",
            "set",
            "12",
            "--allow-downgrade",
            "--db",
            "app.db",
            "--strategy",
            "kv",
        ])
        .unwrap();

        assert_eq!(cli.strategy, Some(VersionStrategy::KeyValue));
        match cli.command {
            Command::Set {
                target,
                allow_downgrade,
            } => {
                assert_eq!(target.get(), 12);
                assert!(allow_downgrade);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_negative_version() {
        assert!(Cli::try_parse_from(["dbversion", "set", "--", "-1"]).is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "dbversion",
            "get",
            "--db",
            "other.db",
            "--strategy",
            "table",
            "--table",
            "versions",
        ])
        .unwrap();

        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.database.path.as_deref(), Some(Path::new("other.db")));
        assert_eq!(config.versioning.strategy, VersionStrategy::Table);
        assert_eq!(config.versioning.table_name(), "versions");
    }
}
