use std::path::Path;

use dbversion_common::{Error, Result};
use tracing::debug;

use crate::model::AppConfig;

/// Supported on-disk configuration formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "yml" | "yaml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            other => Err(Error::Config(format!(
                "unsupported config extension: '{other}' ({})",
                path.display()
            ))),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: &Path) -> Result<AppConfig> {
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let config = Self::parse(&contents, format)?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` when given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<AppConfig> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(AppConfig::default()),
        }
    }

    pub fn parse(contents: &str, format: ConfigFormat) -> Result<AppConfig> {
        match format {
            ConfigFormat::Yaml => serde_yaml::from_str(contents)
                .map_err(|e| Error::Config(format!("YAML parse error: {e}"))),
            ConfigFormat::Toml => {
                toml::from_str(contents).map_err(|e| Error::Config(format!("TOML parse error: {e}")))
            }
        }
    }
}
