use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{location::DEFAULT_LOCATION, model::Coordinates};

pub const DEFAULT_API_URL: &str = "https://weather-app-pma-assessment-production.up.railway.app";
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_IP_LOCATOR_URL: &str = "https://ipapi.co/json/";
pub const DEFAULT_USER_AGENT: &str = "WeatherApp/1.0";

/// Overrides `api_url` when set to a non-empty value.
pub const API_URL_ENV: &str = "WEATHER_API_URL";

/// Top-level configuration stored on disk. Every field is optional; accessors
/// fall back to the built-in defaults.
///
/// Example TOML:
/// api_url = "http://localhost:8000"
/// default_location = "Accra"
/// position = "5.6037,-0.187"
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub api_url: Option<String>,
    pub default_location: Option<String>,
    pub geocoder_url: Option<String>,
    pub ip_locator_url: Option<String>,
    pub user_agent: Option<String>,
    /// Device position as "lat,lon". Terminals have no GPS, so this stands in for it.
    pub position: Option<String>,
}

impl Config {
    pub fn api_url(&self) -> &str {
        non_empty(&self.api_url).unwrap_or(DEFAULT_API_URL)
    }

    pub fn default_location(&self) -> &str {
        non_empty(&self.default_location).unwrap_or(DEFAULT_LOCATION)
    }

    pub fn geocoder_url(&self) -> &str {
        non_empty(&self.geocoder_url).unwrap_or(DEFAULT_GEOCODER_URL)
    }

    pub fn ip_locator_url(&self) -> &str {
        non_empty(&self.ip_locator_url).unwrap_or(DEFAULT_IP_LOCATOR_URL)
    }

    pub fn user_agent(&self) -> &str {
        non_empty(&self.user_agent).unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Parsed `position`, if one is configured.
    pub fn position(&self) -> Result<Option<Coordinates>> {
        non_empty(&self.position)
            .map(|p| p.parse::<Coordinates>().with_context(|| format!("Invalid `position` in config: {p}")))
            .transpose()
    }

    /// Apply the value of [`API_URL_ENV`], if any.
    pub fn with_env_override(mut self, api_url: Option<String>) -> Self {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_url = Some(url);
        }
        self
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let cfg = Self::load_from(&path)?;

        Ok(cfg.with_env_override(std::env::var(API_URL_ENV).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-dashboard", "weatherdash")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
