//! Command-line interface for pitlane-harvest.
//!
//! One subcommand per harvesting pipeline plus `join` for combining outputs.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::join::{left_join, JoinSummary};
use crate::services::pipeline::{Harvester, RunSummary, Stage};

/// File name of the missing-unit log when `--missing-log` is not given.
const MISSING_LOG_FILE: &str = "missing_units.csv";

#[derive(Parser)]
#[command(name = "pitlane-harvest")]
#[command(version, about = "Harvest F1 schedules, results, pit stops and race-day weather into CSV", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Season schedules, one row per race
    Schedule(HarvestArgs),

    /// Race results, one row per driver
    Results(HarvestArgs),

    /// Per-driver pit stop counts and average stop time
    PitStops(HarvestArgs),

    /// Hourly race-day weather interpolated onto laps
    LapWeather(HarvestArgs),

    /// Whole-day weather means per race
    RaceWeather(HarvestArgs),

    /// Left-join two race-level CSV files on Season, Round, Circuit, Date, Time (UTC)
    Join {
        /// Left input; every row is kept
        #[arg(value_name = "LEFT")]
        left: PathBuf,

        /// Right input
        #[arg(value_name = "RIGHT")]
        right: PathBuf,

        /// Output file (overwritten)
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct HarvestArgs {
    /// First season (defaults to FIRST_SEASON)
    #[arg(long)]
    pub from: Option<i32>,

    /// Last season, inclusive (defaults to LAST_SEASON)
    #[arg(long)]
    pub to: Option<i32>,

    /// Output CSV; appended to, completed units are skipped
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Log of skipped units (defaults to missing_units.csv next to the output)
    #[arg(long)]
    pub missing_log: Option<PathBuf>,
}

impl Commands {
    /// The pipeline and its arguments, `None` for `join`.
    pub fn harvest(&self) -> Option<(Stage, &HarvestArgs)> {
        match self {
            Commands::Schedule(args) => Some((Stage::Schedule, args)),
            Commands::Results(args) => Some((Stage::Results, args)),
            Commands::PitStops(args) => Some((Stage::PitStops, args)),
            Commands::LapWeather(args) => Some((Stage::LapWeather, args)),
            Commands::RaceWeather(args) => Some((Stage::RaceWeather, args)),
            Commands::Join { .. } => None,
        }
    }
}

/// Run one harvesting pipeline with CLI overrides applied to `config`.
pub async fn run_harvest(
    stage: Stage,
    args: &HarvestArgs,
    config: &AppConfig,
) -> Result<RunSummary, AppError> {
    let from = args.from.unwrap_or(config.first_season);
    let to = args.to.unwrap_or(config.last_season);
    if from > to {
        return Err(AppError::BadRequest(format!(
            "season range {}..{} is empty",
            from, to
        )));
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&config.data_dir, stage));
    let missing_log = args
        .missing_log
        .clone()
        .unwrap_or_else(|| sibling(&output, MISSING_LOG_FILE));

    let mut harvester = Harvester::new(config, &missing_log)?;
    harvester.run(stage, from..=to, &output).await
}

pub fn run_join(left: &Path, right: &Path, output: &Path) -> Result<JoinSummary, AppError> {
    left_join(left, right, output)
}

fn default_output(data_dir: &str, stage: Stage) -> PathBuf {
    Path::new(data_dir).join(format!("{}.csv", stage.as_str().replace('-', "_")))
}

fn sibling(path: &Path, file_name: &str) -> PathBuf {
    match path.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}
