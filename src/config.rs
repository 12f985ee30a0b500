use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::download::{
    DEFAULT_MAX_CONCURRENT, DEFAULT_METADATA_ENDPOINT, DEFAULT_REFERER, DEFAULT_USER_AGENT,
    DownloaderConfig,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    #[serde(default = "default_metadata_endpoint")]
    pub metadata_endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_referer")]
    pub referer: String,
    #[serde(default = "default_metadata_timeout_secs")]
    pub metadata_timeout_secs: u64,
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

// Default value functions
fn default_output_dir() -> String {
    "lectures".to_string()
}
fn default_max_concurrent_downloads() -> u8 {
    DEFAULT_MAX_CONCURRENT as u8
}
fn default_metadata_endpoint() -> String {
    DEFAULT_METADATA_ENDPOINT.to_string()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_referer() -> String {
    DEFAULT_REFERER.to_string()
}
fn default_metadata_timeout_secs() -> u64 {
    15
}
fn default_download_timeout_secs() -> u64 {
    60
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            metadata_endpoint: default_metadata_endpoint(),
            user_agent: default_user_agent(),
            referer: default_referer(),
            metadata_timeout_secs: default_metadata_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

impl Config {
    /// Settings for the download pipeline derived from this config.
    pub fn downloader_config(&self) -> DownloaderConfig {
        DownloaderConfig {
            metadata_endpoint: self.network.metadata_endpoint.clone(),
            user_agent: self.network.user_agent.clone(),
            referer: self.network.referer.clone(),
            metadata_timeout: Duration::from_secs(self.network.metadata_timeout_secs),
            download_timeout: Duration::from_secs(self.network.download_timeout_secs),
            max_concurrent: self.general.max_concurrent_downloads as usize,
        }
    }
}

pub struct ConfigManager {
    config_dir: PathBuf,
    config_file: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Load the config from the platform config directory, creating a
    /// default one on first run
    pub fn new() -> Result<Self> {
        let project_dirs = ProjectDirs::from("", "", "delos-dl")
            .context("Failed to determine config directory")?;

        Self::from_path(project_dirs.config_dir().join("config.toml"))
    }

    /// Load the config from an explicit file, creating it with defaults if it
    /// does not exist yet
    pub fn from_path(config_file: impl Into<PathBuf>) -> Result<Self> {
        let config_file = config_file.into();
        let config_dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;
        }

        let config = if config_file.exists() {
            Self::load_config(&config_file)?
        } else {
            let default_config = Config::default();
            Self::save_config(&config_file, &default_config)?;
            default_config
        };

        Ok(Self {
            config_dir,
            config_file,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn save(&self) -> Result<()> {
        Self::save_config(&self.config_file, &self.config)
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Restore defaults and write them to disk
    pub fn reset(&mut self) -> Result<()> {
        self.config = Config::default();
        self.save()
    }

    fn load_config(config_file: &Path) -> Result<Config> {
        let content = fs::read_to_string(config_file)
            .with_context(|| format!("Failed to read config file: {:?}", config_file))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_file))?;

        Ok(config)
    }

    fn save_config(config_file: &Path, config: &Config) -> Result<()> {
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(config_file, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_file))?;

        Ok(())
    }

    /// Write a default config next to the active one, or to `output`
    pub fn create_sample_config(&self, output: Option<&Path>) -> Result<PathBuf> {
        let sample_file = match output {
            Some(path) => path.to_path_buf(),
            None => self.config_dir.join("config.sample.toml"),
        };
        Self::save_config(&sample_file, &Config::default())?;
        Ok(sample_file)
    }

    pub fn validate(&self) -> Result<()> {
        let general = &self.config.general;
        let network = &self.config.network;

        if general.max_concurrent_downloads == 0 {
            anyhow::bail!("max_concurrent_downloads must be greater than 0");
        }

        if general.output_dir.trim().is_empty() {
            anyhow::bail!("output_dir cannot be empty");
        }

        if network.metadata_endpoint.trim().is_empty() {
            anyhow::bail!("metadata_endpoint cannot be empty");
        }

        url::Url::parse(&network.metadata_endpoint).with_context(|| {
            format!(
                "metadata_endpoint is not a valid URL: {}",
                network.metadata_endpoint
            )
        })?;

        if network.metadata_timeout_secs == 0 || network.download_timeout_secs == 0 {
            anyhow::bail!("timeouts must be greater than 0 seconds");
        }

        Ok(())
    }
}
