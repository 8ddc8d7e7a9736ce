//! Service configuration

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub store: StoreConfig,
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Fully-qualified root URI every relative path resolves under.
    pub root: String,

    /// Directory under the root holding one JSON document per user.
    pub users_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: "cumulus://main/".to_string(),
            users_dir: "user_data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Local staging directory shared by every download.
    pub staging_dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
        }
    }
}

fn default_staging_dir() -> PathBuf {
    ProjectDirs::from("com", "Cumulus", "Cumulus")
        .map(|dirs| dirs.data_dir().join("downloads"))
        .unwrap_or_else(|| PathBuf::from("./downloads"))
}

impl ServiceConfig {
    /// Fully-qualified URI of the users directory.
    pub fn users_dir_uri(&self) -> String {
        cumulus_store::join(&self.store.root, &self.store.users_dir)
    }

    /// Load configuration from file
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::info!("configuration loaded from {:?}", config_path);
            Ok(config)
        } else {
            tracing::info!("using default configuration");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        tracing::info!("configuration saved to {:?}", config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("com", "Cumulus", "Cumulus")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }
}
