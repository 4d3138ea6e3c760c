//! Alert Agent - batch entry point for the decision engine
//!
//! 1. Loads rules (preset + optional file/env overrides)
//! 2. Restores alert history from disk
//! 3. Evaluates every metrics record in the input file
//! 4. Journals decisions to CSV/JSON Lines and saves history

use alert_engine::{
    config::{load_overrides, RulesConfig},
    journal::AlertJournal,
    presets::Preset,
    runner::BatchRunner,
    store::HistoryStore,
};
use chrono::Utc;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Days covered by the closing summary report
const SUMMARY_DAYS: i64 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Alert Agent...");

    let config = load_config()?;
    info!(
        "Preset: {}, Input: {}, Output: {}",
        config.preset,
        config.input.display(),
        config.output_dir.display()
    );

    let overrides = load_overrides(config.rules_file.as_deref())?;
    let rules = RulesConfig::build(config.preset, Some(&overrides))?;

    let journal = AlertJournal::new(&config.output_dir);
    let store = HistoryStore::new(&config.history_path);
    let mut runner = BatchRunner::open(rules, journal, store).await?;

    let report = runner.run_file(&config.input).await?;
    info!(
        "Processed {} records: {} alerts, {} suppressed, {} no signal, {} skipped",
        report.processed, report.alerts, report.suppressed, report.no_signal, report.skipped
    );

    for (name, value) in runner.engine().stats().as_counters() {
        info!(metric = name, value, "engine_stat");
    }

    let summary = AlertJournal::new(&config.output_dir)
        .summary(Utc::now(), SUMMARY_DAYS)
        .await?;
    println!("{}", summary);

    Ok(())
}

/// Configuration loaded from environment
#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub preset: Preset,
    pub rules_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub history_path: PathBuf,
}

fn load_config() -> anyhow::Result<Config> {
    let input = std::env::var("ALERT_INPUT")
        .map(PathBuf::from)
        .map_err(|_| anyhow::anyhow!("ALERT_INPUT environment variable required"))?;

    let preset = match std::env::var("ALERT_PRESET") {
        Ok(raw) => raw.parse::<Preset>()?,
        Err(_) => Preset::Moderate,
    };

    let rules_file = std::env::var("ALERT_RULES_FILE").ok().map(PathBuf::from);

    let output_dir = std::env::var("ALERT_OUTPUT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./outputs"));

    let history_path = std::env::var("ALERT_HISTORY_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| output_dir.join("alert_history.json"));

    Ok(Config {
        input,
        preset,
        rules_file,
        output_dir,
        history_path,
    })
}
