use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_EC_STATION_LIST_URL: &str =
    "https://dd.weather.gc.ca/observations/doc/swob-xml_station_list.csv";
pub const DEFAULT_EC_SWOB_BASE_URL: &str = "https://dd.weather.gc.ca/observations/swob-ml/latest";
pub const DEFAULT_DATA_GARRISON_BASE_URL: &str = "https://datagarrison.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Defaults for CLI arguments
    pub cache_dir: Option<PathBuf>,
    pub destination: Option<String>,

    // HTTP transport
    pub http_timeout_seconds: u64,
    pub http_user_agent: String,

    // Source endpoints
    pub ec_station_list_url: String,
    pub ec_swob_base_url: String,
    pub data_garrison_base_url: String,

    // Logging
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: None,
            destination: None,
            http_timeout_seconds: 300,
            http_user_agent: format!("transloader/{}", env!("CARGO_PKG_VERSION")),
            ec_station_list_url: DEFAULT_EC_STATION_LIST_URL.to_string(),
            ec_swob_base_url: DEFAULT_EC_SWOB_BASE_URL.to_string(),
            data_garrison_base_url: DEFAULT_DATA_GARRISON_BASE_URL.to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and a `.env` file, if any).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a numeric variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Ok(Self {
            cache_dir: env::var("TRANSLOADER_CACHE").ok().map(PathBuf::from),
            destination: env::var("TRANSLOADER_DESTINATION").ok(),

            http_timeout_seconds: parse_var("HTTP_TIMEOUT_SECONDS", defaults.http_timeout_seconds)?,
            http_user_agent: env::var("HTTP_USER_AGENT").unwrap_or(defaults.http_user_agent),

            ec_station_list_url: env::var("EC_STATION_LIST_URL")
                .unwrap_or(defaults.ec_station_list_url),
            ec_swob_base_url: env::var("EC_SWOB_BASE_URL").unwrap_or(defaults.ec_swob_base_url),
            data_garrison_base_url: env::var("DATA_GARRISON_BASE_URL")
                .unwrap_or(defaults.data_garrison_base_url),

            log_format: LogFormat::from_str(
                &env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            ),
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: `{1}`")]
    Invalid(&'static str, String),
}
