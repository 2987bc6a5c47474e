use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::services::interpolate::LapWeather;
use crate::services::open_meteo::RaceWeatherSummary;
use crate::services::pitstops::DriverPitSummary;

/// Identifies one race session. Every race-level CSV row starts with these
/// five columns so files can be joined on them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RaceKey {
    pub season: i32,
    pub round: u32,
    pub circuit: String,
    pub date: NaiveDate,
    /// Start time (UTC). Not published for most pre-2005 races.
    pub time: Option<NaiveTime>,
}

/// Header names of the join columns, in file order.
pub const RACE_KEY_COLUMNS: [&str; 5] = ["Season", "Round", "Circuit", "Date", "Time (UTC)"];

/// A race as listed in a season schedule.
#[derive(Debug, Clone)]
pub struct ScheduledRace {
    pub key: RaceKey,
    pub race_name: String,
    pub locality: String,
    pub country: String,
}

/// Serde adapter rendering an absent start time as the `Unknown` sentinel.
pub mod race_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const UNKNOWN: &str = "Unknown";

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => s.collect_str(&t.format("%H:%M:%SZ")),
            None => s.serialize_str(UNKNOWN),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(crate::helpers::parse_race_time(Some(&raw)))
    }
}

// ---------------------------------------------------------------------------
// CSV rows
// ---------------------------------------------------------------------------

/// One race of a season schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRow {
    #[serde(rename = "Season")]
    pub season: i32,
    #[serde(rename = "Round")]
    pub round: u32,
    #[serde(rename = "Race Name")]
    pub race_name: String,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Time (UTC)", with = "race_time")]
    pub time: Option<NaiveTime>,
    #[serde(rename = "Circuit")]
    pub circuit: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Country")]
    pub country: String,
}

impl From<&ScheduledRace> for ScheduleRow {
    fn from(race: &ScheduledRace) -> Self {
        Self {
            season: race.key.season,
            round: race.key.round,
            race_name: race.race_name.clone(),
            date: race.key.date,
            time: race.key.time,
            circuit: race.key.circuit.clone(),
            location: race.locality.clone(),
            country: race.country.clone(),
        }
    }
}

/// Classified result of one driver in one race.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(rename = "Season")]
    pub season: i32,
    #[serde(rename = "Round")]
    pub round: u32,
    #[serde(rename = "Circuit")]
    pub circuit: String,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Time (UTC)", with = "race_time")]
    pub time: Option<NaiveTime>,
    #[serde(rename = "Race Name")]
    pub race_name: String,
    #[serde(rename = "Driver Id")]
    pub driver_id: String,
    #[serde(rename = "Driver")]
    pub driver: String,
    #[serde(rename = "Constructor")]
    pub constructor: String,
    #[serde(rename = "Laps")]
    pub laps: Option<u32>,
    /// As published: a number, or e.g. "R"/"D" on some mirrors.
    #[serde(rename = "Position")]
    pub position: String,
}

/// One driver's pit-stop summary for one race. `PitStops` holds the per-lap
/// detail as a JSON array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PitStopRow {
    #[serde(rename = "Season")]
    pub season: i32,
    #[serde(rename = "Round")]
    pub round: u32,
    #[serde(rename = "Circuit")]
    pub circuit: String,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Time (UTC)", with = "race_time")]
    pub time: Option<NaiveTime>,
    #[serde(rename = "Race Name")]
    pub race_name: String,
    #[serde(rename = "Driver Id")]
    pub driver_id: String,
    #[serde(rename = "Driver")]
    pub driver: String,
    #[serde(rename = "Constructor")]
    pub constructor: String,
    #[serde(rename = "Laps")]
    pub laps: Option<u32>,
    #[serde(rename = "Position")]
    pub position: String,
    #[serde(rename = "TotalPitStops")]
    pub total_pit_stops: usize,
    #[serde(rename = "AvgPitStopTime")]
    pub avg_pit_stop_time: Option<f64>,
    #[serde(rename = "PitStops")]
    pub pit_stops: String,
}

impl PitStopRow {
    /// Race key and driver come from the summary; the remaining columns from
    /// the driver's result.
    pub fn new(
        result: &ResultRow,
        summary: &DriverPitSummary,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            season: summary.race.season,
            round: summary.race.round,
            circuit: summary.race.circuit.clone(),
            date: summary.race.date,
            time: summary.race.time,
            race_name: result.race_name.clone(),
            driver_id: summary.driver_id.clone(),
            driver: result.driver.clone(),
            constructor: result.constructor.clone(),
            laps: result.laps,
            position: result.position.clone(),
            total_pit_stops: summary.total_stops,
            avg_pit_stop_time: summary.avg_stop_seconds,
            pit_stops: serde_json::to_string(&summary.stops)?,
        })
    }
}

/// Interpolated weather for one lap of one race.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LapWeatherRow {
    #[serde(rename = "Season")]
    pub season: i32,
    #[serde(rename = "Round")]
    pub round: u32,
    #[serde(rename = "Circuit")]
    pub circuit: String,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Time (UTC)", with = "race_time")]
    pub time: Option<NaiveTime>,
    #[serde(rename = "Lap")]
    pub lap: u32,
    #[serde(rename = "Air Temperature (°C)")]
    pub air_temp: f64,
    #[serde(rename = "Track Temperature (°C)")]
    pub track_temp: f64,
    #[serde(rename = "Humidity (%)")]
    pub humidity: f64,
    #[serde(rename = "Wind Speed (km/h)")]
    pub wind_speed: f64,
}

impl LapWeatherRow {
    pub fn new(key: &RaceKey, lap: &LapWeather) -> Self {
        Self {
            season: key.season,
            round: key.round,
            circuit: key.circuit.clone(),
            date: key.date,
            time: key.time,
            lap: lap.lap,
            air_temp: lap.air_temp,
            track_temp: lap.track_temp,
            humidity: lap.humidity,
            wind_speed: lap.wind_speed,
        }
    }
}

/// Whole-day mean weather for one race.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceWeatherRow {
    #[serde(rename = "Season")]
    pub season: i32,
    #[serde(rename = "Round")]
    pub round: u32,
    #[serde(rename = "Circuit")]
    pub circuit: String,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Time (UTC)", with = "race_time")]
    pub time: Option<NaiveTime>,
    #[serde(rename = "Air Temperature (°C)")]
    pub air_temp: f64,
    #[serde(rename = "Track Temperature (°C)")]
    pub track_temp: f64,
    #[serde(rename = "Humidity (%)")]
    pub humidity: f64,
    #[serde(rename = "Wind Speed (km/h)")]
    pub wind_speed: f64,
}

impl RaceWeatherRow {
    pub fn new(key: &RaceKey, summary: &RaceWeatherSummary) -> Self {
        Self {
            season: key.season,
            round: key.round,
            circuit: key.circuit.clone(),
            date: key.date,
            time: key.time,
            air_temp: summary.air_temp,
            track_temp: summary.track_temp,
            humidity: summary.humidity,
            wind_speed: summary.wind_speed,
        }
    }
}

/// A unit of work that was skipped, and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingRow {
    #[serde(rename = "Stage")]
    pub stage: String,
    #[serde(rename = "Season")]
    pub season: i32,
    #[serde(rename = "Round")]
    pub round: Option<u32>,
    #[serde(rename = "Reason")]
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Resume keys
// ---------------------------------------------------------------------------

/// Key read back from each row already present in an output file. Units whose
/// key is present are skipped on re-run.
pub trait ResumeKey: serde::de::DeserializeOwned + Eq + std::hash::Hash {}

/// Season-level unit (schedule files).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct SeasonKey {
    #[serde(rename = "Season")]
    pub season: i32,
}

impl ResumeKey for SeasonKey {}

/// Race-level unit: (season, round, circuit, date). Start time is left out so
/// a mirror that starts publishing times does not invalidate earlier rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct RaceUnitKey {
    #[serde(rename = "Season")]
    pub season: i32,
    #[serde(rename = "Round")]
    pub round: u32,
    #[serde(rename = "Circuit")]
    pub circuit: String,
    #[serde(rename = "Date")]
    pub date: NaiveDate,
}

impl ResumeKey for RaceUnitKey {}

impl From<&RaceKey> for RaceUnitKey {
    fn from(key: &RaceKey) -> Self {
        Self {
            season: key.season,
            round: key.round,
            circuit: key.circuit.clone(),
            date: key.date,
        }
    }
}
