//! Watcher daemon: polls for the latest draw and stores new ones

use anyhow::{Context, Result};
use powerball_feed::store::{ingest, seed_reconciler, JsonFileStore};
use powerball_feed::{init_logging, FallbackOrchestrator, PipelineConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = PipelineConfig::from_env();
    let store_path = std::env::var("PB_STORE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data/draws.json"));
    let interval_secs: u64 = std::env::var("PB_POLL_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3600);
    let keep_mock = std::env::var("PB_STORE_MOCK")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let store = JsonFileStore::open(&store_path)
        .with_context(|| format!("Failed to open draw store {:?}", store_path))?;

    // Continue numbering from whatever is already stored
    let reconciler = Arc::new(seed_reconciler(&store, config.seed_draw_number)?);
    let seed = reconciler.latest();

    let cancel = CancellationToken::new();
    let orchestrator = FallbackOrchestrator::from_config(&config)
        .context("Failed to build draw sources")?
        .with_reconciler(reconciler)
        .with_cancellation(cancel.clone());

    info!(
        "Watching for new draws every {}s, storing to {:?} (high-water mark {})",
        interval_secs, store_path, seed
    );

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, shutting down");
            shutdown.cancel();
        }
    });

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let draw = orchestrator.fetch_latest_draw().await;
        if cancel.is_cancelled() {
            break;
        }
        if draw.is_mock() {
            warn!("Draw sources degraded, latest result is synthetic");
        }

        match ingest(&store, [draw], !keep_mock) {
            Ok(summary) => info!(
                "Poll complete: {} inserted, {} already stored, {} synthetic skipped",
                summary.inserted, summary.duplicates, summary.skipped_mock
            ),
            Err(e) => error!("Failed to store draw: {}", e),
        }
    }

    info!("Watcher stopped");
    Ok(())
}
