use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_HTTP_CLIENT_TIMEOUT_SECONDS: i64 = 10;
const DEFAULT_SCHEDULER_INTERVAL_SECONDS: i64 = 30;
const DEFAULT_CACHE_MAX_ITEMS: usize = 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub database_max_connections: u32,
    pub exchange_api_base_url: String,
    pub exchange_api_key: String,
    pub http_client_timeout: Duration,
    pub scheduler_interval: Duration,
    pub cache_max_items: usize,
    pub log_level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let database_max_connections = env_map
            .get("DATABASE_MAX_CONNECTIONS")
            .map(|s| s.as_str())
            .unwrap_or("5")
            .parse::<u32>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "DATABASE_MAX_CONNECTIONS".to_string(),
                    "must be a valid u32".to_string(),
                )
            })?;

        let exchange_api_base_url = env_map
            .get("EXCHANGE_API_BASE_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("EXCHANGE_API_BASE_URL".to_string()))?;

        let exchange_api_key = env_map
            .get("EXCHANGE_API_KEY")
            .cloned()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnv("EXCHANGE_API_KEY".to_string()))?;

        let http_client_timeout = parse_seconds(
            &env_map,
            "HTTP_CLIENT_TIMEOUT_SECONDS",
            DEFAULT_HTTP_CLIENT_TIMEOUT_SECONDS,
        )?;

        let scheduler_interval = parse_seconds(
            &env_map,
            "SCHEDULER_INTERVAL_SECONDS",
            DEFAULT_SCHEDULER_INTERVAL_SECONDS,
        )?;

        let cache_max_items = match env_map.get("CACHE_MAX_ITEMS") {
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                ConfigError::InvalidValue(
                    "CACHE_MAX_ITEMS".to_string(),
                    "must be a valid usize".to_string(),
                )
            })?,
            None => DEFAULT_CACHE_MAX_ITEMS,
        };

        let log_level = env_map
            .get("LOG_LEVEL")
            .cloned()
            .unwrap_or_else(|| "info".to_string());

        Ok(Config {
            port,
            database_path,
            database_max_connections,
            exchange_api_base_url,
            exchange_api_key,
            http_client_timeout,
            scheduler_interval,
            cache_max_items,
            log_level,
        })
    }
}

/// Parses a whole-seconds duration key. Absent or non-positive values fall
/// back to the default.
fn parse_seconds(
    env_map: &HashMap<String, String>,
    key: &str,
    default_seconds: i64,
) -> Result<Duration, ConfigError> {
    let seconds = match env_map.get(key) {
        Some(raw) => raw.parse::<i64>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), "must be a valid i64".to_string())
        })?,
        None => default_seconds,
    };

    let seconds = if seconds <= 0 { default_seconds } else { seconds };
    Ok(Duration::from_secs(seconds as u64))
}
