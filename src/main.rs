// pitlane-harvest v0.1
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;
mod errors;
mod helpers;
mod services;
mod store;

use cli::{Cli, Commands};
use config::AppConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize tracing; LOG_FORMAT=json switches to one JSON object per line
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pitlane_harvest=info".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    let outcome = match &cli.command {
        Commands::Join {
            left,
            right,
            output,
        } => cli::run_join(left, right, output).map(|_| ()),
        command => match command.harvest() {
            Some((stage, args)) => cli::run_harvest(stage, args, &config).await.map(|_| ()),
            None => Ok(()),
        },
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
