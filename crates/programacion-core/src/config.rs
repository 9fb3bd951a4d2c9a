//! Runtime configuration from environment variables.

use thiserror::Error;

use crate::formatters::{FormatterConfig, DEFAULT_YEAR};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_FETCH_LIMIT: usize = 2000;
pub const DEFAULT_PENDING_WINDOW_MS: i64 = 3000;

pub const ENV_API_URL: &str = "PROGRAMACION_API_URL";
pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_FETCH_LIMIT: &str = "PROGRAMACION_FETCH_LIMIT";
pub const ENV_PENDING_WINDOW_MS: &str = "PROGRAMACION_PENDING_WINDOW_MS";
pub const ENV_YEAR: &str = "PROGRAMACION_YEAR";

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the spreadsheet export service.
    pub api_url: String,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    /// Maximum rows in the initial bulk load.
    pub fetch_limit: usize,
    /// How long a locally written row ignores its own change echoes.
    pub pending_window_ms: i64,
    pub year: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            supabase_url: None,
            supabase_anon_key: None,
            fetch_limit: DEFAULT_FETCH_LIMIT,
            pending_window_ms: DEFAULT_PENDING_WINDOW_MS,
            year: DEFAULT_YEAR,
        }
    }
}

impl Config {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            api_url: get(ENV_API_URL).unwrap_or(defaults.api_url),
            supabase_url: get(ENV_SUPABASE_URL),
            supabase_anon_key: get(ENV_SUPABASE_ANON_KEY),
            fetch_limit: parse_or(ENV_FETCH_LIMIT, get(ENV_FETCH_LIMIT), defaults.fetch_limit)?,
            pending_window_ms: parse_or(
                ENV_PENDING_WINDOW_MS,
                get(ENV_PENDING_WINDOW_MS),
                defaults.pending_window_ms,
            )?,
            year: parse_or(ENV_YEAR, get(ENV_YEAR), defaults.year)?,
        })
    }

    pub fn formatter_config(&self) -> FormatterConfig {
        FormatterConfig { year: self.year }
    }

    pub fn pending_window(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.pending_window_ms)
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> ConfigResult<T> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value,
        }),
    }
}
