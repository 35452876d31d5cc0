use dbversion_common::Result;
use dbversion_config::{VersionStrategy, VersioningConfig};

use crate::key_value::KeyValueVersionManager;
use crate::manager::VersionManager;
use crate::pragma::PragmaVersionManager;
use crate::table::TableVersionManager;

/// Build the version manager selected by `config`.
///
/// `table` and `key` are ignored by strategies that do not use them.
pub fn manager_for(config: &VersioningConfig) -> Result<Box<dyn VersionManager>> {
    let manager: Box<dyn VersionManager> = match config.strategy {
        VersionStrategy::Table => Box::new(TableVersionManager::new(config.table_name())?),
        VersionStrategy::Pragma => Box::new(PragmaVersionManager),
        VersionStrategy::KeyValue => Box::new(KeyValueVersionManager::new(
            config.table_name(),
            config.key_name(),
        )?),
    };
    Ok(manager)
}
