//! Harvest pipelines, one per subcommand.
//!
//! Every pipeline walks the season range in order. The unit of work is a
//! season for the schedule and a single race for everything else. A unit is
//! fetched, transformed and appended (and flushed) before the next one
//! starts. A failed unit is logged, recorded in the missing-unit log and
//! skipped; only failures writing the local files end a run.
//!
//! Resumability: each output sink reads its completed keys back on open, and
//! a completed unit is skipped before any request for it is made.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::Path;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::ergast::ErgastClient;
use crate::services::geocode::{Coordinates, GeocodeClient};
use crate::services::interpolate::{interpolate_lap_weather, HourlySample};
use crate::services::open_meteo::{summarize_day, WeatherClient};
use crate::services::pitstops::summarize_driver_stops;
use crate::services::throttle::Throttle;
use crate::store::models::{
    LapWeatherRow, PitStopRow, RaceUnitKey, RaceWeatherRow, ResultRow, ScheduleRow,
    ScheduledRace, SeasonKey,
};
use crate::store::sink::{CsvSink, MissingLog};

// ---------------------------------------------------------------------------
// Stages and run accounting
// ---------------------------------------------------------------------------

/// One harvesting pipeline. The name doubles as the `Stage` column of the
/// missing-unit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Schedule,
    Results,
    PitStops,
    LapWeather,
    RaceWeather,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Schedule => "schedule",
            Stage::Results => "results",
            Stage::PitStops => "pit-stops",
            Stage::LapWeather => "lap-weather",
            Stage::RaceWeather => "race-weather",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome counters of one pipeline run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Units fetched and appended by this run.
    pub completed: usize,
    /// Units already present in the output before this run.
    pub skipped: usize,
    /// Units recorded in the missing-unit log.
    pub missing: usize,
    /// Data rows appended.
    pub rows: usize,
}

// ---------------------------------------------------------------------------
// Harvester
// ---------------------------------------------------------------------------

/// Owns the three source clients and the missing-unit log for one process.
pub struct Harvester {
    ergast: ErgastClient,
    geocoder: GeocodeClient,
    weather: WeatherClient,
    missing: MissingLog,
    /// Geocoder answers by locality, including misses, for the whole run.
    places: HashMap<String, Option<Coordinates>>,
}

impl Harvester {
    pub fn new(config: &AppConfig, missing_log: &Path) -> Result<Self, AppError> {
        let throttle = Throttle::new(config.request_delay);
        tracing::debug!("Pausing {:?} after every request", throttle.delay());
        Ok(Self {
            ergast: ErgastClient::new(&config.ergast_base_url, &config.user_agent, throttle)?,
            geocoder: GeocodeClient::new(&config.geocode_base_url, &config.user_agent, throttle)?,
            weather: WeatherClient::new(&config.weather_base_url, &config.user_agent, throttle)?,
            missing: MissingLog::open(missing_log)?,
            places: HashMap::new(),
        })
    }

    /// Run `stage` over `seasons`, appending to `output`.
    pub async fn run(
        &mut self,
        stage: Stage,
        seasons: RangeInclusive<i32>,
        output: &Path,
    ) -> Result<RunSummary, AppError> {
        tracing::info!(
            "{}: seasons {}-{} → {}",
            stage,
            seasons.start(),
            seasons.end(),
            output.display()
        );

        let summary = match stage {
            Stage::Schedule => self.run_schedule(seasons, output).await?,
            _ => self.run_races(stage, seasons, output).await?,
        };

        tracing::info!(
            "{}: {} unit(s) written ({} rows), {} already done, {} missing",
            stage,
            summary.completed,
            summary.rows,
            summary.skipped,
            summary.missing
        );
        Ok(summary)
    }

    async fn run_schedule(
        &mut self,
        seasons: RangeInclusive<i32>,
        output: &Path,
    ) -> Result<RunSummary, AppError> {
        let mut sink = CsvSink::<SeasonKey>::open(output)?;
        let mut summary = RunSummary::default();

        for season in seasons {
            let key = SeasonKey { season };
            if sink.is_completed(&key) {
                tracing::debug!("schedule: {} already written, skipping", season);
                summary.skipped += 1;
                continue;
            }

            let schedule = match self.ergast.fetch_schedule(season).await {
                Ok(schedule) if schedule.is_empty() => {
                    let e = AppError::NotFound(format!("no races scheduled in {}", season));
                    self.skip_unit(Stage::Schedule, season, None, e, &mut summary)?;
                    continue;
                }
                Ok(schedule) => schedule,
                Err(e) => {
                    self.skip_unit(Stage::Schedule, season, None, e, &mut summary)?;
                    continue;
                }
            };

            for (round, e) in schedule.rejected {
                self.skip_unit(Stage::Schedule, season, round, e, &mut summary)?;
            }

            let rows: Vec<ScheduleRow> = schedule.races.iter().map(ScheduleRow::from).collect();
            sink.append(key, &rows)?;
            tracing::info!("schedule: {} → {} race(s)", season, rows.len());
            summary.completed += 1;
            summary.rows += rows.len();
        }
        Ok(summary)
    }

    async fn run_races(
        &mut self,
        stage: Stage,
        seasons: RangeInclusive<i32>,
        output: &Path,
    ) -> Result<RunSummary, AppError> {
        let mut sink = CsvSink::<RaceUnitKey>::open(output)?;
        let mut summary = RunSummary::default();

        for season in seasons {
            let schedule = match self.ergast.fetch_schedule(season).await {
                Ok(schedule) if schedule.is_empty() => {
                    let e = AppError::NotFound(format!("no races scheduled in {}", season));
                    self.skip_unit(stage, season, None, e, &mut summary)?;
                    continue;
                }
                Ok(schedule) => schedule,
                Err(e) => {
                    self.skip_unit(stage, season, None, e, &mut summary)?;
                    continue;
                }
            };

            for (round, e) in schedule.rejected {
                self.skip_unit(stage, season, round, e, &mut summary)?;
            }
            let races = schedule.races;

            for race in &races {
                let key = RaceUnitKey::from(&race.key);
                if sink.is_completed(&key) {
                    tracing::debug!(
                        "{}: {} round {} already written, skipping",
                        stage,
                        season,
                        race.key.round
                    );
                    summary.skipped += 1;
                    continue;
                }

                let outcome = match stage {
                    Stage::Results => append_unit(&mut sink, key, self.result_rows(race).await),
                    Stage::PitStops => {
                        append_unit(&mut sink, key, self.pit_stop_rows(race).await)
                    }
                    Stage::LapWeather => {
                        append_unit(&mut sink, key, self.lap_weather_rows(race).await)
                    }
                    Stage::RaceWeather => {
                        append_unit(&mut sink, key, self.race_weather_rows(race).await)
                    }
                    Stage::Schedule => Err(AppError::BadRequest(
                        "schedule is harvested per season, not per race".to_string(),
                    )),
                };

                match outcome {
                    Ok(rows) => {
                        tracing::info!(
                            "{}: {} round {} ({}) → {} row(s)",
                            stage,
                            season,
                            race.key.round,
                            race.key.circuit,
                            rows
                        );
                        summary.completed += 1;
                        summary.rows += rows;
                    }
                    Err(e) => {
                        self.skip_unit(stage, season, Some(race.key.round), e, &mut summary)?
                    }
                }
            }
        }
        Ok(summary)
    }

    /// Log and record a failed unit. Local file errors are returned instead.
    fn skip_unit(
        &mut self,
        stage: Stage,
        season: i32,
        round: Option<u32>,
        err: AppError,
        summary: &mut RunSummary,
    ) -> Result<(), AppError> {
        if err.is_fatal() {
            tracing::error!("{}: cannot write output: {}", stage, err);
            return Err(err);
        }

        match round {
            Some(round) => tracing::warn!("{}: skipping {} round {}: {}", stage, season, round, err),
            None => tracing::warn!("{}: skipping season {}: {}", stage, season, err),
        }
        self.missing
            .record(stage.as_str(), season, round, &err.to_string())?;
        summary.missing += 1;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Per-race units
    // -----------------------------------------------------------------------

    async fn result_rows(&self, race: &ScheduledRace) -> Result<Vec<ResultRow>, AppError> {
        let race_results = self
            .ergast
            .fetch_results(race.key.season, race.key.round)
            .await?;
        Ok(race_results.results)
    }

    /// One row per classified driver, including drivers without stops.
    async fn pit_stop_rows(&self, race: &ScheduledRace) -> Result<Vec<PitStopRow>, AppError> {
        let race_results = self
            .ergast
            .fetch_results(race.key.season, race.key.round)
            .await?;
        let pit_stops = self
            .ergast
            .fetch_pit_stops(race.key.season, race.key.round)
            .await?;

        if pit_stops.is_empty() {
            tracing::debug!(
                "pit-stops: no pit stop data for {} round {}",
                race.key.season,
                race.key.round
            );
        }

        race_results
            .results
            .iter()
            .map(|result| {
                let summary =
                    summarize_driver_stops(&race_results.race.key, &result.driver_id, &pit_stops);
                PitStopRow::new(result, &summary).map_err(AppError::from)
            })
            .collect()
    }

    async fn lap_weather_rows(
        &mut self,
        race: &ScheduledRace,
    ) -> Result<Vec<LapWeatherRow>, AppError> {
        let total_laps = self
            .ergast
            .fetch_results(race.key.season, race.key.round)
            .await?
            .total_laps()
            .filter(|&laps| laps > 0)
            .ok_or_else(|| AppError::NotFound("unknown lap count".to_string()))?;

        let samples = self.race_day_weather(race).await?;
        Ok(interpolate_lap_weather(&samples, total_laps)
            .iter()
            .map(|lap| LapWeatherRow::new(&race.key, lap))
            .collect())
    }

    async fn race_weather_rows(
        &mut self,
        race: &ScheduledRace,
    ) -> Result<Vec<RaceWeatherRow>, AppError> {
        let samples = self.race_day_weather(race).await?;
        let summary = summarize_day(&samples)
            .ok_or_else(|| AppError::NotFound("empty weather day".to_string()))?;
        Ok(vec![RaceWeatherRow::new(&race.key, &summary)])
    }

    /// The 24 hourly samples of race day at the circuit's locality.
    async fn race_day_weather(
        &mut self,
        race: &ScheduledRace,
    ) -> Result<Vec<HourlySample>, AppError> {
        let at = self.locate(&race.locality).await?.ok_or_else(|| {
            AppError::NotFound(format!("no coordinates for '{}'", race.locality))
        })?;

        self.weather
            .fetch_hourly(at, race.key.date)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "no hourly weather for {} on {}",
                    race.locality, race.key.date
                ))
            })
    }

    async fn locate(&mut self, locality: &str) -> Result<Option<Coordinates>, AppError> {
        let locality = locality.trim();
        if locality.is_empty() {
            return Err(AppError::BadRequest("circuit has no locality".to_string()));
        }
        if let Some(known) = self.places.get(locality) {
            return Ok(*known);
        }

        let found = self.geocoder.locate(locality).await?;
        self.places.insert(locality.to_string(), found);
        Ok(found)
    }
}

/// Append one race's rows, passing fetch errors through untouched.
fn append_unit<T: Serialize>(
    sink: &mut CsvSink<RaceUnitKey>,
    key: RaceUnitKey,
    rows: Result<Vec<T>, AppError>,
) -> Result<usize, AppError> {
    let rows = rows?;
    sink.append(key, &rows)?;
    Ok(rows.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::RaceKey;
    use chrono::{NaiveDate, NaiveTime};
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tmp_dir(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("pitlane_pipeline_{}_{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&p);
        fs::create_dir_all(&p).unwrap();
        p
    }

    fn config(server: &MockServer) -> AppConfig {
        AppConfig {
            ergast_base_url: format!("{}/ergast/f1", server.uri()),
            geocode_base_url: server.uri(),
            weather_base_url: server.uri(),
            user_agent: "pitlane-test".to_string(),
            data_dir: std::env::temp_dir().display().to_string(),
            request_delay: Duration::ZERO,
            first_season: 2023,
            last_season: 2023,
        }
    }

    fn envelope(races: serde_json::Value) -> serde_json::Value {
        let total = races.as_array().map(|r| r.len()).unwrap_or(0);
        serde_json::json!({
            "MRData": { "total": total.to_string(), "RaceTable": { "Races": races } }
        })
    }

    fn bahrain_2023() -> serde_json::Value {
        serde_json::json!({
            "season": "2023",
            "round": "1",
            "raceName": "Bahrain Grand Prix",
            "Circuit": {
                "circuitName": "Bahrain International Circuit",
                "Location": { "locality": "Sakhir", "country": "Bahrain" }
            },
            "date": "2023-03-05",
            "time": "15:00:00Z"
        })
    }

    fn bahrain_key() -> RaceUnitKey {
        RaceUnitKey::from(&RaceKey {
            season: 2023,
            round: 1,
            circuit: "Bahrain International Circuit".to_string(),
            date: NaiveDate::from_ymd_opt(2023, 3, 5).unwrap(),
            time: NaiveTime::from_hms_opt(15, 0, 0),
        })
    }

    fn result(driver_id: &str, given: &str, family: &str, laps: &str) -> serde_json::Value {
        serde_json::json!({
            "position": "1",
            "laps": laps,
            "Driver": { "driverId": driver_id, "givenName": given, "familyName": family },
            "Constructor": { "name": "Red Bull" }
        })
    }

    async fn mount_schedule(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/ergast/f1/2023.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope(serde_json::json!([bahrain_2023()]))),
            )
            .mount(server)
            .await;
    }

    async fn mount_results(server: &MockServer) {
        let mut race = bahrain_2023();
        race["Results"] = serde_json::json!([
            result("max_verstappen", "Max", "Verstappen", "57"),
            result("perez", "Sergio", "Pérez", "56")
        ]);
        Mock::given(method("GET"))
            .and(path("/ergast/f1/2023/1/results.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(envelope(serde_json::json!([race]))),
            )
            .mount(server)
            .await;
    }

    async fn mount_weather(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "lat": "26.0325", "lon": "50.5106" }
            ])))
            .mount(server)
            .await;

        let times: Vec<String> = (0..24).map(|h| format!("2023-03-05T{:02}:00", h)).collect();
        let air: Vec<f64> = (0..24).map(|h| 20.0 + f64::from(h) * 0.5).collect();
        Mock::given(method("GET"))
            .and(path("/v1/archive"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "hourly": {
                    "time": times,
                    "temperature_2m": air,
                    "soil_temperature_0cm": vec![30.0; 24],
                    "relative_humidity_2m": vec![40.0; 24],
                    "wind_speed_10m": vec![12.0; 24]
                }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_lap_weather_end_to_end_57_laps() {
        let server = MockServer::start().await;
        mount_schedule(&server).await;
        mount_results(&server).await;
        mount_weather(&server).await;

        let dir = tmp_dir("lap_weather");
        let output = dir.join("lap_weather.csv");
        let mut harvester = Harvester::new(&config(&server), &dir.join("missing.csv")).unwrap();
        let summary = harvester
            .run(Stage::LapWeather, 2023..=2023, &output)
            .await
            .unwrap();

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.rows, 57);

        let mut reader = csv::Reader::from_path(&output).unwrap();
        let rows: Vec<LapWeatherRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 57);
        let laps: Vec<u32> = rows.iter().map(|r| r.lap).collect();
        assert_eq!(laps, (1..=57).collect::<Vec<u32>>());
        assert_eq!(rows[0].air_temp, 20.0);
        assert_eq!(rows[56].air_temp, 31.5);
        assert_eq!(rows[10].track_temp, 30.0);
        assert_eq!(rows[0].circuit, "Bahrain International Circuit");
        assert_eq!(rows[0].time, NaiveTime::from_hms_opt(15, 0, 0));
    }

    #[tokio::test]
    async fn test_completed_race_is_not_fetched_again() {
        let server = MockServer::start().await;
        mount_schedule(&server).await;
        Mock::given(method("GET"))
            .and(path("/ergast/f1/2023/1/results.json"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/archive"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tmp_dir("resume");
        let output = dir.join("lap_weather.csv");
        fs::write(
            &output,
            "Season,Round,Circuit,Date,Time (UTC),Lap,Air Temperature (°C),Track Temperature (°C),Humidity (%),Wind Speed (km/h)\n\
             2023,1,Bahrain International Circuit,2023-03-05,15:00:00Z,1,20.0,30.0,40.0,12.0\n",
        )
        .unwrap();

        let mut harvester = Harvester::new(&config(&server), &dir.join("missing.csv")).unwrap();
        let summary = harvester
            .run(Stage::LapWeather, 2023..=2023, &output)
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.completed, 0);
        assert_eq!(fs::read_to_string(&output).unwrap().lines().count(), 2);
    }

    #[tokio::test]
    async fn test_pit_stops_one_row_per_driver() {
        let server = MockServer::start().await;
        mount_schedule(&server).await;
        mount_results(&server).await;
        let mut race = bahrain_2023();
        race["PitStops"] = serde_json::json!([
            { "driverId": "max_verstappen", "lap": "10", "duration": "23.1" },
            { "driverId": "max_verstappen", "lap": "30", "duration": "bad" },
            { "driverId": "max_verstappen", "lap": "50", "duration": "24.9" }
        ]);
        Mock::given(method("GET"))
            .and(path("/ergast/f1/2023/1/pitstops.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(envelope(serde_json::json!([race]))),
            )
            .mount(&server)
            .await;

        let dir = tmp_dir("pit_stops");
        let output = dir.join("pit_stops.csv");
        let mut harvester = Harvester::new(&config(&server), &dir.join("missing.csv")).unwrap();
        let summary = harvester
            .run(Stage::PitStops, 2023..=2023, &output)
            .await
            .unwrap();
        assert_eq!(summary.rows, 2);

        let mut reader = csv::Reader::from_path(&output).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        let headers = reader.headers().unwrap().clone();
        let col = |name: &str| headers.iter().position(|h| h == name).unwrap();

        assert_eq!(&rows[0][col("Driver Id")], "max_verstappen");
        assert_eq!(&rows[0][col("TotalPitStops")], "3");
        assert_eq!(&rows[0][col("AvgPitStopTime")], "24.0");
        assert_eq!(
            &rows[0][col("PitStops")],
            r#"[{"lap":10,"seconds":23.1},{"lap":30,"seconds":null},{"lap":50,"seconds":24.9}]"#
        );
        assert_eq!(&rows[1][col("Driver Id")], "perez");
        assert_eq!(&rows[1][col("TotalPitStops")], "0");
        assert_eq!(&rows[1][col("AvgPitStopTime")], "");
    }

    #[tokio::test]
    async fn test_failed_race_is_logged_as_missing() {
        let server = MockServer::start().await;
        mount_schedule(&server).await;
        Mock::given(method("GET"))
            .and(path("/ergast/f1/2023/1/results.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = tmp_dir("missing");
        let output = dir.join("results.csv");
        let missing = dir.join("missing.csv");
        let mut harvester = Harvester::new(&config(&server), &missing).unwrap();
        let summary = harvester
            .run(Stage::Results, 2023..=2023, &output)
            .await
            .unwrap();

        assert_eq!(summary.missing, 1);
        assert_eq!(summary.completed, 0);
        let log = fs::read_to_string(&missing).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines[0], "Stage,Season,Round,Reason");
        assert!(lines[1].starts_with("results,2023,1,"));
        assert!(lines[1].contains("503"));

        let sink = CsvSink::<RaceUnitKey>::open(&output).unwrap();
        assert!(!sink.is_completed(&bahrain_key()));
    }

    #[tokio::test]
    async fn test_malformed_schedule_race_is_logged_as_missing() {
        let server = MockServer::start().await;
        let mut bad = bahrain_2023();
        bad["date"] = "sometime in spring".into();
        let mut jeddah = bahrain_2023();
        jeddah["round"] = "2".into();
        jeddah["raceName"] = "Saudi Arabian Grand Prix".into();
        jeddah["Circuit"]["circuitName"] = "Jeddah Corniche Circuit".into();
        jeddah["date"] = "2023-03-19".into();
        Mock::given(method("GET"))
            .and(path("/ergast/f1/2023.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope(serde_json::json!([bad, jeddah.clone()]))),
            )
            .mount(&server)
            .await;
        jeddah["Results"] = serde_json::json!([result("perez", "Sergio", "Pérez", "50")]);
        Mock::given(method("GET"))
            .and(path("/ergast/f1/2023/2/results.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(envelope(serde_json::json!([jeddah]))),
            )
            .mount(&server)
            .await;

        let dir = tmp_dir("malformed_race");
        let output = dir.join("results.csv");
        let missing = dir.join("missing.csv");
        let mut harvester = Harvester::new(&config(&server), &missing).unwrap();
        let summary = harvester
            .run(Stage::Results, 2023..=2023, &output)
            .await
            .unwrap();

        assert_eq!(summary.missing, 1);
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.rows, 1);
        let log = fs::read_to_string(&missing).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("results,2023,1,"));
        assert!(lines[1].contains("sometime in spring"));
        assert!(fs::read_to_string(&output)
            .unwrap()
            .contains("Jeddah Corniche Circuit"));
    }

    #[tokio::test]
    async fn test_schedule_is_fetched_once_per_season() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ergast/f1/2023.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope(serde_json::json!([bahrain_2023()]))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tmp_dir("schedule");
        let output = dir.join("schedule.csv");
        let missing = dir.join("missing.csv");
        for _ in 0..2 {
            let mut harvester = Harvester::new(&config(&server), &missing).unwrap();
            harvester
                .run(Stage::Schedule, 2023..=2023, &output)
                .await
                .unwrap();
        }

        let text = fs::read_to_string(&output).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("2023,1,Bahrain Grand Prix,2023-03-05,15:00:00Z"));
    }

    #[tokio::test]
    async fn test_race_weather_day_means() {
        let server = MockServer::start().await;
        mount_schedule(&server).await;
        mount_weather(&server).await;

        let dir = tmp_dir("race_weather");
        let output = dir.join("race_weather.csv");
        let mut harvester = Harvester::new(&config(&server), &dir.join("missing.csv")).unwrap();
        let summary = harvester
            .run(Stage::RaceWeather, 2023..=2023, &output)
            .await
            .unwrap();
        assert_eq!(summary.rows, 1);

        let mut reader = csv::Reader::from_path(&output).unwrap();
        let rows: Vec<RaceWeatherRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        // 20.0 + 0.5 * mean(0..24) = 20.0 + 0.5 * 11.5
        assert_eq!(rows[0].air_temp, 25.75);
        assert_eq!(rows[0].humidity, 40.0);
        assert_eq!(rows[0].wind_speed, 12.0);
    }

    #[tokio::test]
    async fn test_unknown_locality_is_missing() {
        let server = MockServer::start().await;
        mount_schedule(&server).await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tmp_dir("no_place");
        let missing = dir.join("missing.csv");
        let mut harvester = Harvester::new(&config(&server), &missing).unwrap();
        let summary = harvester
            .run(Stage::RaceWeather, 2023..=2023, &dir.join("race_weather.csv"))
            .await
            .unwrap();

        assert_eq!(summary.missing, 1);
        assert!(fs::read_to_string(&missing).unwrap().contains("Sakhir"));
    }
}
