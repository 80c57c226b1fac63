use super::error::ConfigError;
use super::search::LookbackBounds;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://connect.bcm.mr/api/cours_change_reference";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36";
pub const DEFAULT_REFERER: &str = "https://www.bcm.mr/money-rate-table";
pub const DEFAULT_QUOTES: [&str; 3] = ["USD", "EUR", "CNY"];
pub const DEFAULT_TIMEOUT_SECS: u64 = 25;
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;
pub const DEFAULT_MAX_LOOKBACK_DAYS: i64 = 365;

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_referer() -> String {
    DEFAULT_REFERER.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_quotes() -> Vec<String> {
    DEFAULT_QUOTES.iter().map(|q| q.to_string()).collect()
}

fn default_lookback_days() -> i64 {
    DEFAULT_LOOKBACK_DAYS
}

fn default_max_lookback_days() -> i64 {
    DEFAULT_MAX_LOOKBACK_DAYS
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_referer")]
    pub referer: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            api_base: default_api_base(),
            user_agent: default_user_agent(),
            referer: default_referer(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default = "default_quotes")]
    pub quotes: Vec<String>,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    #[serde(default = "default_max_lookback_days")]
    pub max_lookback_days: i64,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            source: SourceConfig::default(),
            quotes: default_quotes(),
            lookback_days: default_lookback_days(),
            max_lookback_days: default_max_lookback_days(),
            data_path: None,
        }
    }
}

/// Values supplied on the command line or through the environment.
/// Each one, when set, wins over the config file.
#[derive(Debug, Clone, Default)]
pub struct FetchOverrides {
    pub quotes: Option<Vec<String>>,
    pub api_base: Option<String>,
    pub to_date: Option<String>,
    pub lookback_days: Option<i64>,
    pub max_lookback_days: Option<i64>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Connection settings for the rate source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    pub api_base: String,
    pub user_agent: String,
    pub referer: String,
    pub timeout: Duration,
}

/// Fully validated parameters of one fetch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub quotes: Vec<String>,
    pub source: SourceSettings,
    pub to_date: NaiveDate,
    pub bounds: LookbackBounds,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Loads `path` if given, else the default config file when it exists,
    /// else the built-in defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }
        match Self::default_config_path() {
            Ok(default_path) if default_path.exists() => Self::load_from_path(&default_path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("mr", "bcm", "mrufx")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("mr", "bcm", "mrufx")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Merges `overrides` over this config and validates the result.
    /// `today` is the target date when none is given.
    pub fn fetch_settings(
        &self,
        overrides: &FetchOverrides,
        today: NaiveDate,
    ) -> Result<FetchSettings, ConfigError> {
        let api_base = overrides
            .api_base
            .as_deref()
            .unwrap_or(&self.source.api_base)
            .trim()
            .to_string();
        if api_base.is_empty() {
            return Err(ConfigError::MissingApiBase);
        }
        reqwest::Url::parse(&api_base).map_err(|e| ConfigError::InvalidApiBase {
            url: api_base.clone(),
            reason: e.to_string(),
        })?;

        let to_date = match overrides.to_date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| ConfigError::InvalidTargetDate(raw.to_string()))?,
            _ => today,
        };

        let bounds = LookbackBounds::new(
            overrides.lookback_days.unwrap_or(self.lookback_days),
            overrides.max_lookback_days.unwrap_or(self.max_lookback_days),
        )?;

        let quotes = overrides
            .quotes
            .as_ref()
            .unwrap_or(&self.quotes)
            .iter()
            .map(|q| q.trim().to_uppercase())
            .filter(|q| !q.is_empty())
            .collect();

        Ok(FetchSettings {
            quotes,
            source: SourceSettings {
                api_base,
                user_agent: overrides
                    .user_agent
                    .clone()
                    .unwrap_or_else(|| self.source.user_agent.clone()),
                referer: overrides
                    .referer
                    .clone()
                    .unwrap_or_else(|| self.source.referer.clone()),
                timeout: Duration::from_secs(
                    overrides.timeout_secs.unwrap_or(self.source.timeout_secs),
                ),
            },
            to_date,
            bounds,
        })
    }
}
