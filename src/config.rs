use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DATA_PATH_VAR: &str = "BILLING_LENS_DATA";
pub const CACHE_TTL_VAR: &str = "BILLING_LENS_CACHE_TTL_SECS";
pub const LOOKBACK_VAR: &str = "BILLING_LENS_LOOKBACK_DAYS";

/// Dashboard settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Line-item source file (`.csv`, `.json` or `.parquet`).
    pub data_path: PathBuf,
    /// How long a loaded table is reused before the source is read again.
    pub cache_ttl_secs: u64,
    /// Length of the default date range, ending at the newest line item.
    pub lookback_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{var}: '{value}' is not a valid whole number")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/example__line_item_enhanced.csv"),
            cache_ttl_secs: 600,
            lookback_days: 365,
        }
    }
}

impl DashboardConfig {
    /// Load from environment variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            data_path: lookup(DATA_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            cache_ttl_secs: parse_var(&lookup, CACHE_TTL_VAR)?.unwrap_or(defaults.cache_ttl_secs),
            lookback_days: parse_var(&lookup, LOOKBACK_VAR)?.unwrap_or(defaults.lookback_days),
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError { var, value }),
    }
}
