//! # rank-field
//!
//! Ranks a tournament field from JSON round and approach tables.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use player_ranking::logging::initialize_logging_with_config;
use player_ranking::{
    ApproachRow, RankingConfig, RankingEngine, RankingReport, RosterEntry, RoundRow,
};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

/// Rank a tournament field from historical round data
#[derive(Parser)]
#[command(name = "rank-field")]
#[command(about = "Rank a tournament field from historical round data")]
struct Cli {
    /// Roster JSON: [{"competitor_id", "name"}]
    #[arg(long)]
    roster: PathBuf,

    /// Historical round table JSON
    #[arg(long)]
    rounds: PathBuf,

    /// Approach-skill table JSON
    #[arg(long)]
    approach: Option<PathBuf>,

    /// Ranking configuration TOML; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only print the top N players
    #[arg(long)]
    top: Option<usize>,

    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    #[arg(long, default_value = "info")]
    log_level: String,

    /// compact, pretty or json
    #[arg(long, default_value = "compact")]
    log_format: String,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_table(report: &RankingReport, top: usize) {
    println!(
        "{:>4}  {:<28} {:>8} {:>8} {:>7} {:>8} {:>6}  {}",
        "Rank", "Player", "Score", "WAR", "PastPf", "Final", "Cov", "Tier"
    );
    println!("{}", "=".repeat(89));
    for player in report.players.iter().take(top) {
        println!(
            "{:>4}  {:<28} {:>8.3} {:>8.3} {:>7.2} {:>8.3} {:>5.0}%  {:?}",
            player.rank,
            player.name,
            player.refined_weighted_score,
            player.war,
            player.past_performance_multiplier,
            player.final_score,
            player.data_coverage * 100.0,
            player.tier
        );
    }
    let summary = &report.summary;
    println!("{}", "=".repeat(89));
    println!(
        "Field: {}  Without rounds: {}  Baseline: {}  Moderate: {}  Stat fallbacks: {}",
        summary.field_size,
        summary.players_without_rounds,
        summary.baseline_replaced,
        summary.moderate_tier,
        summary.stats_fallbacks
    );
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => RankingConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => RankingConfig::default(),
    }
    .apply_env_overrides();

    let roster: Vec<RosterEntry> = read_json(&cli.roster)?;
    let rounds: Vec<RoundRow> = read_json(&cli.rounds)?;
    let approach: Vec<ApproachRow> = match &cli.approach {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    info!(
        "Loaded {} roster entries, {} rounds, {} approach rows",
        roster.len(),
        rounds.len(),
        approach.len()
    );

    let engine = RankingEngine::new(config).context("Invalid ranking configuration")?;
    let mut report = engine.rank(&roster, &rounds, &approach)?;

    let top = cli.top.unwrap_or(report.players.len());
    match cli.format {
        OutputFormat::Table => print_table(&report, top),
        OutputFormat::Json => {
            report.players.truncate(top);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_logging_with_config(&cli.log_level, &cli.log_format)?;

    if let Err(e) = run(&cli) {
        error!("Ranking failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}
