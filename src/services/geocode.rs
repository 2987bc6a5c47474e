//! Nominatim geocoder: circuit locality name → coordinates.
//!
//! Nominatim's usage policy requires an identifying User-Agent and at most
//! one request per second, which the shared throttle already guarantees.

use serde::Deserialize;

use crate::errors::AppError;
use crate::services::throttle::Throttle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone)]
pub struct GeocodeClient {
    client: reqwest::Client,
    base_url: String,
    throttle: Throttle,
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

impl GeocodeClient {
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

    /// Coordinates of the best match for `city`, `Ok(None)` if there is none.
    pub async fn locate(&self, city: &str) -> Result<Option<Coordinates>, AppError> {
        let url = format!("{}/search", self.base_url);
        let result = self
            .client
            .get(&url)
            .query(&[("city", city), ("format", "json")])
            .send()
            .await;
        self.throttle.pause().await;

        let response = result.map_err(|e| {
            AppError::ExternalServiceError(format!("Geocoding request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Geocoder returned HTTP {} for '{}'",
                response.status(),
                city
            )));
        }

        let places: Vec<Place> = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Geocoder JSON parse error: {}", e))
        })?;

        Ok(places.first().and_then(|place| {
            match (place.lat.trim().parse(), place.lon.trim().parse()) {
                (Ok(lat), Ok(lon)) => Some(Coordinates { lat, lon }),
                _ => {
                    tracing::warn!(
                        "Geocoder returned malformed coordinates for '{}': lat='{}' lon='{}'",
                        city,
                        place.lat,
                        place.lon
                    );
                    None
                }
            }
        }))
    }
}
