//! Open-Meteo historical weather archive client.
//!
//! Fetches one day of hourly observations for a coordinate and turns them into
//! exactly 24 `HourlySample`s. Gaps in the archive are filled with fixed
//! defaults so downstream interpolation always sees a complete day.
//! See: https://open-meteo.com/en/docs/historical-weather-api

use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::AppError;
use crate::helpers::mean;
use crate::services::geocode::Coordinates;
use crate::services::interpolate::HourlySample;
use crate::services::throttle::Throttle;

/// Substituted for a missing air temperature (°C).
pub const DEFAULT_AIR_TEMP_C: f64 = 20.0;
/// Substituted for a missing track (0 cm soil) temperature (°C).
pub const DEFAULT_TRACK_TEMP_C: f64 = 25.0;
/// Substituted for a missing relative humidity (%).
pub const DEFAULT_HUMIDITY_PCT: f64 = 60.0;
/// Substituted for a missing 10 m wind speed (km/h).
pub const DEFAULT_WIND_SPEED_KMH: f64 = 10.0;

const HOURS_PER_DAY: u32 = 24;

const HOURLY_VARIABLES: &str =
    "temperature_2m,soil_temperature_0cm,relative_humidity_2m,wind_speed_10m";

/// Client for the Open-Meteo archive API.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    base_url: String,
    throttle: Throttle,
}

/// Whole-day means of the four weather fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaceWeatherSummary {
    pub air_temp: f64,
    pub track_temp: f64,
    pub humidity: f64,
    pub wind_speed: f64,
}

// --- Open-Meteo JSON response types ---

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    hourly: Option<ArchiveHourly>,
}

#[derive(Debug, Default, Deserialize)]
struct ArchiveHourly {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    soil_temperature_0cm: Vec<Option<f64>>,
    #[serde(default)]
    relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
}

impl WeatherClient {
    pub fn new(base_url: &str, user_agent: &str, throttle: Throttle) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::InternalError(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            throttle,
        })
    }

    /// Hourly samples for `date` at `at`. `Ok(None)` when the archive has no
    /// data for that place and day.
    pub async fn fetch_hourly(
        &self,
        at: Coordinates,
        date: NaiveDate,
    ) -> Result<Option<Vec<HourlySample>>, AppError> {
        let url = format!("{}/v1/archive", self.base_url);
        let day = date.format("%Y-%m-%d").to_string();
        let result = self
            .client
            .get(&url)
            .query(&[
                ("latitude", at.lat.to_string()),
                ("longitude", at.lon.to_string()),
                ("start_date", day.clone()),
                ("end_date", day),
                ("hourly", HOURLY_VARIABLES.to_string()),
            ])
            .send()
            .await;
        self.throttle.pause().await;

        let response = result.map_err(|e| {
            AppError::ExternalServiceError(format!("Open-Meteo request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Open-Meteo returned HTTP {}",
                response.status()
            )));
        }

        let body: ArchiveResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Open-Meteo JSON parse error: {}", e))
        })?;

        Ok(body.hourly.as_ref().and_then(hourly_samples))
    }
}

/// Build the 24 samples of a day, defaulting every missing value.
///
/// Returns `None` when the response has no time axis at all.
fn hourly_samples(hourly: &ArchiveHourly) -> Option<Vec<HourlySample>> {
    if hourly.time.is_empty() {
        return None;
    }
    let value = |series: &[Option<f64>], hour: u32, default: f64| {
        series
            .get(hour as usize)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
            .unwrap_or(default)
    };

    Some(
        (0..HOURS_PER_DAY)
            .map(|hour| HourlySample {
                hour,
                air_temp: value(&hourly.temperature_2m, hour, DEFAULT_AIR_TEMP_C),
                track_temp: value(&hourly.soil_temperature_0cm, hour, DEFAULT_TRACK_TEMP_C),
                humidity: value(&hourly.relative_humidity_2m, hour, DEFAULT_HUMIDITY_PCT),
                wind_speed: value(&hourly.wind_speed_10m, hour, DEFAULT_WIND_SPEED_KMH),
            })
            .collect(),
    )
}

/// Whole-day mean of each field. `None` for an empty day.
pub fn summarize_day(samples: &[HourlySample]) -> Option<RaceWeatherSummary> {
    Some(RaceWeatherSummary {
        air_temp: mean(samples.iter().map(|s| s.air_temp))?,
        track_temp: mean(samples.iter().map(|s| s.track_temp))?,
        humidity: mean(samples.iter().map(|s| s.humidity))?,
        wind_speed: mean(samples.iter().map(|s| s.wind_speed))?,
    })
}
