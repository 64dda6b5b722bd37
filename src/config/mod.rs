//! Configuration loading

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::client::DEFAULT_API_BASE;
use crate::auth::{AuthConfig, DEFAULT_AUTH_BASE, DEFAULT_CLIENT_ID};

/// Poll every five minutes unless told otherwise.
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 300_000;

/// Application configuration (`config.toml`). Every field is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Milliseconds between fetch cycles
    pub update_interval_ms: Option<u64>,
    /// Where the credential record lives
    pub token_file: Option<PathBuf>,
    /// tado resource API base URL
    pub api_base: Option<String>,
    /// tado identity provider base URL
    pub auth_base: Option<String>,
    /// OAuth2 client id used for the refresh grant
    pub client_id: Option<String>,
}

impl Config {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "tado-poller", "tado-poller")
            .context("Could not determine config directory")
    }

    /// Get config file path
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Default token file location, under the platform data directory
    pub fn default_token_file() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("tokens.json"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load configuration from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn update_interval_ms(&self) -> u64 {
        self.update_interval_ms.unwrap_or(DEFAULT_UPDATE_INTERVAL_MS)
    }

    pub fn token_file(&self) -> Result<PathBuf> {
        match &self.token_file {
            Some(path) => Ok(path.clone()),
            None => Self::default_token_file(),
        }
    }

    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(
            self.client_id.as_deref().unwrap_or(DEFAULT_CLIENT_ID),
            self.auth_base.as_deref().unwrap_or(DEFAULT_AUTH_BASE),
        )
    }
}
