//! # Config Loader
//!
//! Loads `config.toml`, writing a commented default file on first run. Every
//! section and field is optional in the file; missing values take defaults.

use crate::constants::{
    DEFAULT_CACHE_TTL_MINUTES, DEFAULT_MAX_WORKERS, DEFAULT_PROMPT_MAX_LENGTH,
};
use crate::core::paths::{self, PathError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    #[error("Failed to parse '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Persist entries to disk between sessions.
    pub enabled: bool,
    pub ttl_minutes: u64,
    /// Disk tier location; `~` and `$VARS` are expanded.
    pub dir: String,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_minutes: DEFAULT_CACHE_TTL_MINUTES,
            dir: "~/.cache/netscope".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    pub max_workers: usize,
    /// Regions queried when none are set at runtime. Empty means the inventory's own list.
    pub regions: Vec<String>,
    pub inventory: String,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            regions: Vec::new(),
            inventory: "~/.config/netscope/inventory.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// `netscope>vpc:1>rt:2> `
    #[default]
    Short,
    /// `netscope>vpc:prod>route-table:main> `
    Long,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSection {
    pub style: PromptStyle,
    pub max_length: usize,
}

impl Default for PromptSection {
    fn default() -> Self {
        Self {
            style: PromptStyle::Short,
            max_length: DEFAULT_PROMPT_MAX_LENGTH,
        }
    }
}

/// The whole `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub cache: CacheSection,
    pub provider: ProviderSection,
    pub prompt: PromptSection,
}

impl ShellConfig {
    pub fn ttl_seconds(&self) -> u64 {
        self.cache.ttl_minutes.saturating_mul(60)
    }

    /// The expanded disk tier directory, or `None` when persistence is off.
    pub fn cache_dir(&self) -> Result<Option<PathBuf>, ConfigError> {
        if !self.cache.enabled {
            return Ok(None);
        }
        Ok(Some(paths::expand_path(&self.cache.dir)?))
    }

    pub fn inventory_path(&self) -> Result<PathBuf, ConfigError> {
        Ok(paths::expand_path(&self.provider.inventory)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.max_workers == 0 {
            return Err(ConfigError::Invalid(
                "provider.max_workers must be at least 1".to_string(),
            ));
        }
        if self.cache.ttl_minutes == 0 {
            return Err(ConfigError::Invalid(
                "cache.ttl_minutes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reads the config at `path`, or at the default location when `None`.
/// A missing file is created with defaults.
///
/// # Errors
/// Returns an error if the file cannot be read, parsed, or created.
pub fn load_or_create(path: Option<&Path>) -> Result<ShellConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => paths::default_config_path()?,
    };

    if !path.exists() {
        log::debug!("No config at '{}'. Writing defaults.", path.display());
        let config = ShellConfig::default();
        save(&path, &config)?;
        return Ok(config);
    }

    let content = fs::read_to_string(&path)?;
    let config: ShellConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;
    config.validate()?;
    log::debug!("Loaded config from '{}'", path.display());
    Ok(config)
}

pub fn save(path: &Path, config: &ShellConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        paths::ensure_dir(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
