use crate::domain::ranking::RankingMode;
use crate::time_utils;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
    #[error("invalid ranking mode: {0}")]
    InvalidRankingMode(String),
    #[error("invalid PORT: {0}")]
    InvalidPort(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_addr: String,
    pub seed_path: Option<PathBuf>,
    pub default_timezone: String,
    pub ranking_mode: RankingMode,
    pub reconcile_cron: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            seed_path: None,
            default_timezone: "UTC".to_string(),
            ranking_mode: RankingMode::Sequential,
            reconcile_cron: "0 0 * * * *".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let bind_addr = match get("BIND_ADDR") {
            Some(addr) => addr,
            None => {
                let port = get("PORT").unwrap_or_else(|| "3000".to_string());
                port.trim()
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
                format!("0.0.0.0:{}", port.trim())
            }
        };

        let default_timezone = match get("DEFAULT_TIMEZONE") {
            Some(raw) => time_utils::normalize_timezone(&raw).ok_or(ConfigError::InvalidTimezone(raw))?,
            None => defaults.default_timezone,
        };

        let ranking_mode = match get("RANKING_MODE") {
            Some(raw) => {
                RankingMode::try_from(raw.as_str()).map_err(|_| ConfigError::InvalidRankingMode(raw))?
            }
            None => defaults.ranking_mode,
        };

        Ok(Self {
            bind_addr,
            seed_path: get("SEED_PATH").map(PathBuf::from),
            default_timezone,
            ranking_mode,
            reconcile_cron: get("RECONCILE_CRON").unwrap_or(defaults.reconcile_cron),
        })
    }
}
