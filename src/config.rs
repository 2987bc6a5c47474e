use std::time::Duration;

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Ergast-compatible race data API (no trailing slash).
    pub ergast_base_url: String,
    /// Nominatim-compatible geocoder.
    pub geocode_base_url: String,
    /// Open-Meteo-compatible historical weather archive.
    pub weather_base_url: String,
    pub user_agent: String,
    /// Directory the default output files are written to.
    pub data_dir: String,
    /// Pause after every external request.
    pub request_delay: Duration,
    pub first_season: i32,
    pub last_season: i32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            ergast_base_url: env_or("ERGAST_BASE_URL", "https://api.jolpi.ca/ergast/f1"),
            geocode_base_url: env_or("GEOCODE_BASE_URL", "https://nominatim.openstreetmap.org"),
            weather_base_url: env_or("WEATHER_BASE_URL", "https://archive-api.open-meteo.com"),
            user_agent: env_or("HARVEST_USER_AGENT", "F1-Weather-Data-Collector"),
            data_dir: env_or("DATA_DIR", "./data"),
            request_delay: Duration::from_millis(parse_env("REQUEST_DELAY_MS", 1000)),
            first_season: parse_env("FIRST_SEASON", 1950),
            last_season: parse_env("LAST_SEASON", 2024),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .map(|v| v.trim_end_matches('/').to_string())
        .unwrap_or_else(|_| default.to_string())
}

/// Parse a numeric env var, falling back to `default` (with a warning) when
/// the value is present but malformed.
fn parse_env<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("{}='{}' is not valid, defaulting to {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
