//! Render one HTML report from one or more k6 results files.

use std::path::PathBuf;

use clap::Parser;
use k6report::{
    config::{self, Config},
    render, run,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error("Failed to load k6report config: {0}")]
    Config(#[from] config::Error),
    #[error(transparent)]
    Run(#[from] run::Error),
    #[error(transparent)]
    Render(#[from] render::Error),
    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// k6 results files to read, replacing any listed in the config file
    inputs: Vec<PathBuf>,

    /// path on disk to a YAML configuration file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// path on disk to write the HTML report
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// heading of the HTML report
    #[clap(long)]
    title: Option<String>,

    /// token removed from file names when deriving display names
    #[clap(long)]
    name_prefix: Option<String>,

    /// path on disk to additionally write the computed report as JSON
    #[clap(long)]
    json_output: Option<PathBuf>,
}

fn get_config(args: Args) -> Result<Config, Error> {
    let mut config = match &args.config {
        Some(path) => config::load_config_from_path(path)?,
        None => Config::default(),
    };
    if !args.inputs.is_empty() {
        config.inputs = args.inputs;
    }
    if let Some(output) = args.output {
        config.output = output;
    }
    if let Some(title) = args.title {
        config.title = title;
    }
    if let Some(name_prefix) = args.name_prefix {
        config.name_prefix = name_prefix;
    }
    if let Some(json_output) = args.json_output {
        config.json_output = Some(json_output);
    }
    Ok(config)
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .finish()
        .init();

    let version = env!("CARGO_PKG_VERSION");
    info!("Starting k6report {version} run.");

    let config = get_config(Args::parse())?;
    let report = run::build_report(&config)?;

    let html = render::render(&report, &config.title)?;
    render::write_report(&config.output, &html)?;
    info!("Report successfully generated to {}", config.output.display());

    if let Some(json_output) = &config.json_output {
        let json = serde_json::to_string_pretty(&report)?;
        render::write_report(json_output, &json)?;
        info!("Report data written to {}", json_output.display());
    }

    if !report.thresholds.duration.passed || !report.thresholds.failure_rate.passed {
        warn!(
            duration = report.thresholds.duration.status(),
            failure_rate = report.thresholds.failure_rate.status(),
            "Thresholds not met"
        );
    }
    Ok(())
}
