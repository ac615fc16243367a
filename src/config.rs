//! Configuration Management
//!
//! Handles persistent configuration storage for the `maas` CLI.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding the configured MAAS url
pub const URL_ENV: &str = "MAAS_URL";
/// Environment variable overriding the configured API key
pub const API_KEY_ENV: &str = "MAAS_API_KEY";

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// MAAS base url, e.g. `http://maas:5240/MAAS`
    #[serde(default)]
    pub url: Option<String>,
    /// API key (`consumer:key:secret`)
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub output: Option<OutputFormat>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("maas-client").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from a specific file; missing or unreadable
    /// files give the default configuration
    pub fn load_from(path: &std::path::Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective url (CLI > environment > config)
    pub fn effective_url(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| std::env::var(URL_ENV).ok().filter(|v| !v.is_empty()))
            .or_else(|| self.url.clone())
    }

    /// Get effective API key (CLI > environment > config)
    pub fn effective_api_key(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|v| !v.is_empty()))
            .or_else(|| self.api_key.clone())
    }

    /// Get effective output format (CLI > config > json)
    pub fn effective_output(&self, cli: Option<OutputFormat>) -> OutputFormat {
        cli.or(self.output).unwrap_or_default()
    }

    /// Store connection settings and save
    pub fn set_login(&mut self, url: &str, api_key: &str) -> Result<()> {
        self.url = Some(url.to_string());
        self.api_key = Some(api_key.to_string());
        self.save()
    }
}
