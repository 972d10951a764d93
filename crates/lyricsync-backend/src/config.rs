use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use lyricsync_bridge::config::Config;
use lyricsync_engine::{CorrectionStore, CorrectionsConfig};
use tokio::{
    fs::{OpenOptions, create_dir_all, read_to_string},
    io::AsyncWriteExt,
};

/// Errors that can occur while loading or saving configuration files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to determine the user's configuration or data directories. This
    /// usually occurs when required environment variables are missing (e.g.,
    /// `$HOME` on Unix or `%APPDATA%` on Windows).
    #[error("failed to obtain user's directories")]
    DirectoriesNotFound,
    /// An I/O error occurred while reading or writing a file.
    #[error("failed to read config: {0}")]
    IoError(#[from] std::io::Error),
    /// The file contains invalid TOML or does not match the expected structure.
    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] toml::de::Error),
    /// Failed to serialize to TOML.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Locations of the files the backend reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    /// Application configuration, pretty TOML.
    pub config_file: PathBuf,
    /// Learned corrections, pretty TOML.
    pub corrections_file: PathBuf,
}

impl ConfigPaths {
    /// Resolves the platform configuration and data directories.
    pub fn from_project_dirs() -> Result<Self, ConfigError> {
        let dirs =
            ProjectDirs::from("dev", "lyricsync", "lyricsync").ok_or(ConfigError::DirectoriesNotFound)?;
        Ok(Self {
            config_file: dirs.config_dir().join("config.toml"),
            corrections_file: dirs.data_dir().join("corrections.toml"),
        })
    }

    /// Keeps both files in `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            config_file: dir.join("config.toml"),
            corrections_file: dir.join("corrections.toml"),
        }
    }
}

/// Loads the application configuration, writing the defaults on first run.
pub async fn load_config(paths: &ConfigPaths) -> Result<Config, ConfigError> {
    let config_path = &paths.config_file;
    log::info!("Loading configuration from {config_path:?}");
    if config_path.exists() {
        let contents = read_to_string(config_path).await?;
        let config: Config = toml::from_str(&contents)?;
        return Ok(config);
    }

    let config = Config::default();
    if let Some(parent) = config_path.parent() {
        create_dir_all(parent).await?;
    }

    let contents = toml::to_string_pretty(&config)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(config_path)
        .await?;
    file.write_all(contents.as_bytes()).await?;
    file.sync_all().await?;

    Ok(config)
}

/// Saves the configuration, overwriting any existing file.
pub async fn save_config(paths: &ConfigPaths, config: &Config) -> Result<(), ConfigError> {
    let contents = toml::to_string_pretty(config)?;
    overwrite(&paths.config_file, &contents).await
}

/// Loads learned corrections. A missing file yields an empty store.
pub async fn load_corrections(
    paths: &ConfigPaths,
    config: CorrectionsConfig,
) -> Result<CorrectionStore, ConfigError> {
    let corrections_path = &paths.corrections_file;
    if !corrections_path.exists() {
        return Ok(CorrectionStore::new(config));
    }

    log::info!("Loading corrections from {corrections_path:?}");
    let contents = read_to_string(corrections_path).await?;
    let store: CorrectionStore = toml::from_str(&contents)?;
    Ok(store.with_config(config))
}

pub async fn save_corrections(
    paths: &ConfigPaths,
    store: &CorrectionStore,
) -> Result<(), ConfigError> {
    let contents = toml::to_string_pretty(store)?;
    overwrite(&paths.corrections_file, &contents).await
}

async fn overwrite(path: &Path, contents: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).await?;
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .await?;
    file.write_all(contents.as_bytes()).await?;
    file.sync_all().await?;

    Ok(())
}
