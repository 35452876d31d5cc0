//! Migration version storage for SQLite databases.
//!
//! A migration runner reads the current version with
//! [`VersionManager::version`], applies pending migrations inside a
//! transaction and records the new version with
//! [`VersionManager::set_version`] before committing.

pub mod connection;
pub mod key_value;
pub mod manager;
pub mod pragma;
mod sqlite;
pub mod strategy;
pub mod table;
pub mod version;

pub use key_value::KeyValueVersionManager;
pub use manager::VersionManager;
pub use pragma::PragmaVersionManager;
pub use strategy::manager_for;
pub use table::TableVersionManager;
pub use version::MigrationVersion;
