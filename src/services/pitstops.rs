//! Per-driver pit-stop aggregation.
//!
//! Stops whose duration cannot be parsed still count towards `total_stops`
//! but are left out of the mean.

use serde::Serialize;

use crate::helpers::mean;
use crate::services::duration::parse_duration;
use crate::store::models::RaceKey;

/// A pit stop as published by the race source, before parsing.
#[derive(Debug, Clone)]
pub struct RawPitStop {
    pub driver_id: String,
    pub lap: u32,
    pub duration: Option<String>,
}

/// A single stop with its parsed duration (`None` when unparseable).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitStopEvent {
    pub lap: u32,
    pub seconds: Option<f64>,
}

/// One driver's stops in one race.
#[derive(Debug, Clone)]
pub struct DriverPitSummary {
    pub race: RaceKey,
    pub driver_id: String,
    pub total_stops: usize,
    /// Mean over successfully parsed durations; `None` if there are none.
    pub avg_stop_seconds: Option<f64>,
    /// Stops in source order.
    pub stops: Vec<PitStopEvent>,
}

/// Summarise `driver_id`'s stops out of the whole race's pit-stop list.
pub fn summarize_driver_stops(
    race: &RaceKey,
    driver_id: &str,
    pit_stops: &[RawPitStop],
) -> DriverPitSummary {
    let stops: Vec<PitStopEvent> = pit_stops
        .iter()
        .filter(|p| p.driver_id == driver_id)
        .map(|p| PitStopEvent {
            lap: p.lap,
            seconds: match parse_duration(p.duration.as_deref()) {
                Ok(secs) => Some(secs),
                Err(e) => {
                    tracing::warn!(
                        "{} round {}: {} lap {} pit stop skipped in average: {}",
                        race.season,
                        race.round,
                        driver_id,
                        p.lap,
                        e
                    );
                    None
                }
            },
        })
        .collect();

    DriverPitSummary {
        race: race.clone(),
        driver_id: driver_id.to_string(),
        total_stops: stops.len(),
        avg_stop_seconds: mean(stops.iter().filter_map(|s| s.seconds)),
        stops,
    }
}
