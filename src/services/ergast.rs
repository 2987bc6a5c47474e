//! Ergast-compatible F1 data client.
//!
//! Fetches season schedules, race results and pit stops. ergast.com itself
//! is retired; the default base URL points at the jolpica mirror, which
//! serves the same JSON under `/ergast/f1`.
//! See: https://github.com/jolpica/jolpica-f1/blob/main/docs/README.md

use serde::Deserialize;

use crate::errors::AppError;
use crate::helpers::{parse_race_date, parse_race_time};
use crate::services::pitstops::RawPitStop;
use crate::services::throttle::Throttle;
use crate::store::models::{RaceKey, ResultRow, ScheduledRace};

/// Rows per page; the mirror rejects anything above 100.
const PAGE_LIMIT: u32 = 100;

/// Client for the Ergast race data API.
#[derive(Debug, Clone)]
pub struct ErgastClient {
    client: reqwest::Client,
    base_url: String,
    throttle: Throttle,
}

/// A season schedule plus the races that could not be read.
#[derive(Debug, Default)]
pub struct Schedule {
    pub races: Vec<ScheduledRace>,
    /// Round (when readable) and reason of every malformed race.
    pub rejected: Vec<(Option<u32>, AppError)>,
}

impl Schedule {
    /// No race at all, readable or not.
    pub fn is_empty(&self) -> bool {
        self.races.is_empty() && self.rejected.is_empty()
    }
}

/// Results of one race, keyed by the schedule entry they belong to.
#[derive(Debug, Clone)]
pub struct RaceResults {
    pub race: ScheduledRace,
    pub results: Vec<ResultRow>,
}

impl RaceResults {
    /// Race distance in laps: the most laps completed by any classified
    /// driver. `None` when no result carries a lap count.
    pub fn total_laps(&self) -> Option<u32> {
        self.results.iter().filter_map(|r| r.laps).max()
    }
}

// --- Ergast JSON response types ---

#[derive(Debug, Deserialize)]
struct ErgastResponse {
    #[serde(rename = "MRData")]
    mr_data: MrData,
}

#[derive(Debug, Deserialize)]
struct MrData {
    #[serde(default)]
    total: Option<String>,
    #[serde(rename = "RaceTable")]
    race_table: RaceTable,
}

#[derive(Debug, Deserialize)]
struct RaceTable {
    #[serde(rename = "Races", default)]
    races: Vec<ErgastRace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErgastRace {
    season: String,
    round: String,
    race_name: String,
    #[serde(rename = "Circuit")]
    circuit: ErgastCircuit,
    date: String,
    time: Option<String>,
    #[serde(rename = "Results", default)]
    results: Vec<ErgastResult>,
    #[serde(rename = "PitStops", default)]
    pit_stops: Vec<ErgastPitStop>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErgastCircuit {
    circuit_name: String,
    #[serde(rename = "Location", default)]
    location: ErgastLocation,
}

#[derive(Debug, Default, Deserialize)]
struct ErgastLocation {
    #[serde(default)]
    locality: String,
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct ErgastResult {
    position: String,
    laps: Option<String>,
    #[serde(rename = "Driver")]
    driver: ErgastDriver,
    #[serde(rename = "Constructor")]
    constructor: ErgastConstructor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErgastDriver {
    driver_id: String,
    given_name: String,
    family_name: String,
}

#[derive(Debug, Deserialize)]
struct ErgastConstructor {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErgastPitStop {
    driver_id: String,
    lap: String,
    duration: Option<String>,
}

impl ErgastClient {
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

    /// Season schedule. Races with a malformed round or date are returned
    /// separately in `rejected`.
    pub async fn fetch_schedule(&self, season: i32) -> Result<Schedule, AppError> {
        let races = self.fetch_races(&format!("{}.json", season)).await?;
        let mut schedule = Schedule::default();
        for race in &races {
            match scheduled_race(race) {
                Ok(r) => schedule.races.push(r),
                Err(e) => {
                    tracing::warn!("{} schedule: rejecting '{}': {}", season, race.race_name, e);
                    schedule
                        .rejected
                        .push((race.round.trim().parse().ok(), e));
                }
            }
        }
        Ok(schedule)
    }

    /// Classified results of one race.
    pub async fn fetch_results(&self, season: i32, round: u32) -> Result<RaceResults, AppError> {
        let races = self
            .fetch_races(&format!("{}/{}/results.json", season, round))
            .await?;
        let race = races.into_iter().next().ok_or_else(|| {
            AppError::NotFound(format!("no results for {} round {}", season, round))
        })?;
        let scheduled = scheduled_race(&race)?;
        let results = race
            .results
            .iter()
            .map(|r| result_row(&scheduled, r))
            .collect();
        Ok(RaceResults {
            race: scheduled,
            results,
        })
    }

    /// Pit stops of one race. An empty list is normal: the API has no pit
    /// stop data before roughly 2011.
    pub async fn fetch_pit_stops(
        &self,
        season: i32,
        round: u32,
    ) -> Result<Vec<RawPitStop>, AppError> {
        let races = self
            .fetch_races(&format!("{}/{}/pitstops.json", season, round))
            .await?;
        Ok(races
            .into_iter()
            .flat_map(|race| race.pit_stops)
            .filter_map(|p| match p.lap.trim().parse() {
                Ok(lap) => Some(RawPitStop {
                    driver_id: p.driver_id,
                    lap,
                    duration: p.duration,
                }),
                Err(_) => {
                    tracing::warn!(
                        "{} round {}: dropping pit stop of {} with lap '{}'",
                        season,
                        round,
                        p.driver_id,
                        p.lap
                    );
                    None
                }
            })
            .collect())
    }

    /// Fetch every page of `path`, merging pages that continue the same race.
    async fn fetch_races(&self, path: &str) -> Result<Vec<ErgastRace>, AppError> {
        let mut races: Vec<ErgastRace> = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.fetch_page(path, offset).await?;
            let total = page
                .total
                .as_deref()
                .and_then(|t| t.parse::<u32>().ok())
                .unwrap_or(0);

            for race in page.race_table.races {
                match races.last_mut() {
                    Some(last) if last.season == race.season && last.round == race.round => {
                        last.results.extend(race.results);
                        last.pit_stops.extend(race.pit_stops);
                    }
                    _ => races.push(race),
                }
            }

            offset += PAGE_LIMIT;
            if offset >= total {
                return Ok(races);
            }
        }
    }

    async fn fetch_page(&self, path: &str, offset: u32) -> Result<MrData, AppError> {
        let url = format!("{}/{}", self.base_url, path);
        let result = self
            .client
            .get(&url)
            .query(&[("limit", PAGE_LIMIT), ("offset", offset)])
            .send()
            .await;
        self.throttle.pause().await;

        let response = result
            .map_err(|e| AppError::ExternalServiceError(format!("Ergast request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalServiceError(format!(
                "Ergast returned HTTP {} for {}",
                response.status(),
                path
            )));
        }

        let body: ErgastResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("Ergast JSON parse error: {}", e))
        })?;
        Ok(body.mr_data)
    }
}

/// Build the schedule entry (and race key) from an API race object.
fn scheduled_race(race: &ErgastRace) -> Result<ScheduledRace, AppError> {
    let season = race.season.trim().parse().map_err(|_| {
        AppError::BadRequest(format!("malformed season '{}'", race.season))
    })?;
    let round = race
        .round
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("malformed round '{}'", race.round)))?;
    let date = parse_race_date(&race.date)
        .ok_or_else(|| AppError::BadRequest(format!("malformed date '{}'", race.date)))?;

    Ok(ScheduledRace {
        key: RaceKey {
            season,
            round,
            circuit: race.circuit.circuit_name.clone(),
            date,
            time: parse_race_time(race.time.as_deref()),
        },
        race_name: race.race_name.clone(),
        locality: race.circuit.location.locality.clone(),
        country: race.circuit.location.country.clone(),
    })
}

fn result_row(race: &ScheduledRace, result: &ErgastResult) -> ResultRow {
    ResultRow {
        season: race.key.season,
        round: race.key.round,
        circuit: race.key.circuit.clone(),
        date: race.key.date,
        time: race.key.time,
        race_name: race.race_name.clone(),
        driver_id: result.driver.driver_id.clone(),
        driver: format!("{} {}", result.driver.given_name, result.driver.family_name),
        constructor: result.constructor.name.clone(),
        laps: result.laps.as_deref().and_then(|l| l.trim().parse().ok()),
        position: result.position.clone(),
    }
}
