//! Powerball CLI - one-shot draw lookups

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use powerball_feed::normalize::format_usd;
use powerball_feed::scraper::SourceSet;
use powerball_feed::store::{ingest, seed_reconciler, JsonFileStore};
use powerball_feed::validator::validate;
use powerball_feed::{Draw, FallbackOrchestrator, PipelineConfig};

#[derive(Parser)]
#[command(name = "powerball")]
#[command(author, version, about = "Powerball draw lookup CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print draws as JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    /// Append fetched draws to a JSON store
    #[arg(long, global = true)]
    save: Option<PathBuf>,

    /// Do not save synthetic draws
    #[arg(long, global = true)]
    real_only: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the most recent draw
    Latest,

    /// Fetch the most recent N draws, newest first
    History {
        /// Number of draws
        #[arg(short, long, default_value_t = 10)]
        count: usize,
    },

    /// Probe each source once and report whether it is usable
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    powerball_feed::init_logging();
    let cli = Cli::parse();
    let config = PipelineConfig::from_env();

    match cli.command {
        Commands::Latest => {
            let orchestrator = build_orchestrator(&config, cli.save.as_deref())?;
            let pb = spinner("Fetching latest draw...");
            let draw = orchestrator.fetch_latest_draw().await;
            pb.finish_and_clear();

            output(std::slice::from_ref(&draw), cli.json)?;
            if let Some(path) = &cli.save {
                save(path, vec![draw], cli.real_only)?;
            }
        }
        Commands::History { count } => {
            let orchestrator = build_orchestrator(&config, cli.save.as_deref())?;
            let pb = spinner(&format!("Fetching {} draws...", count));
            let draws = orchestrator.fetch_historical_draws(count).await;
            pb.finish_and_clear();

            output(&draws, cli.json)?;
            if let Some(path) = &cli.save {
                save(path, draws, cli.real_only)?;
            }
        }
        Commands::Sources => probe_sources(&config).await?,
    }

    Ok(())
}

/// Orchestrator seeded from the store (when saving) so numbering continues
fn build_orchestrator(
    config: &PipelineConfig,
    store_path: Option<&Path>,
) -> Result<FallbackOrchestrator> {
    let orchestrator =
        FallbackOrchestrator::from_config(config).context("Failed to build draw sources")?;
    let Some(path) = store_path else {
        return Ok(orchestrator);
    };

    let store = JsonFileStore::open(path)
        .with_context(|| format!("Failed to open draw store {:?}", path))?;
    let reconciler = seed_reconciler(&store, config.seed_draw_number)?;
    Ok(orchestrator.with_reconciler(Arc::new(reconciler)))
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn output(draws: &[Draw], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(draws)?);
        return Ok(());
    }

    println!(
        "{:>6}  {:<10}  {:<20}  {:>3}  {:>16}  {:>4}  {}",
        "Draw".bold(),
        "Date".bold(),
        "White balls".bold(),
        "PB".bold(),
        "Jackpot".bold(),
        "Win".bold(),
        "Source".bold()
    );
    println!("{}", "-".repeat(84));

    for draw in draws {
        let balls = draw
            .white_balls
            .iter()
            .map(|b| format!("{:02}", b))
            .collect::<Vec<_>>()
            .join(" ");
        let source = if draw.is_mock() {
            draw.source.to_string().yellow()
        } else {
            draw.source.to_string().green()
        };
        println!(
            "{:>6}  {:<10}  {:<20}  {:>3}  {:>16}  {:>4}  {}",
            draw.draw_number,
            draw.draw_date.format("%Y-%m-%d").to_string(),
            balls,
            format!("{:02}", draw.powerball).red().bold(),
            format_usd(draw.jackpot_amount),
            draw.winners,
            source
        );
    }

    let mock = draws.iter().filter(|d| d.is_mock()).count();
    if mock > 0 {
        println!();
        println!(
            "{} {} of {} draws are synthetic",
            "Warning:".yellow().bold(),
            mock,
            draws.len()
        );
    }

    Ok(())
}

fn save(path: &Path, draws: Vec<Draw>, real_only: bool) -> Result<()> {
    let store = JsonFileStore::open(path)
        .with_context(|| format!("Failed to open draw store {:?}", path))?;
    let summary = ingest(&store, draws, real_only)
        .with_context(|| format!("Failed to save draws to {:?}", path))?;

    println!();
    println!(
        "{}: {} inserted, {} already stored, {} synthetic skipped",
        "Saved".green(),
        summary.inserted,
        summary.duplicates,
        summary.skipped_mock
    );
    Ok(())
}

/// Single un-retried fetch per source, parsed and validated
async fn probe_sources(config: &PipelineConfig) -> Result<()> {
    let set = SourceSet::live(config).context("Failed to build draw sources")?;

    println!("{}", "Source health".cyan().bold());
    println!();

    for source in &set.latest {
        let start = Instant::now();
        let result = source.fetch().await.and_then(validate);
        let elapsed = start.elapsed().as_millis();

        match result {
            Ok(candidate) => println!(
                "  {:<24} {} ({} ms, draw {})",
                source.name(),
                "OK".green().bold(),
                elapsed,
                candidate
                    .draw_number()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "unnumbered".to_string())
            ),
            Err(e) => println!(
                "  {:<24} {} [{}] {}",
                source.name(),
                "FAIL".red().bold(),
                e.kind(),
                e
            ),
        }
    }

    Ok(())
}
