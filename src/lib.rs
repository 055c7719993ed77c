//! Powerball Feed - draw acquisition pipeline
//!
//! This library provides:
//! - Source clients for the California Lottery API, its draw page, and
//!   powerball.com (home page and previous results)
//! - Normalization and validation of scraped draws
//! - Bounded retry and ordered fallback across sources
//! - Draw number reconciliation for sources that omit it
//! - A synthetic fallback generator whose output is always tagged `mock_data`
//!
//! # Example
//!
//! ```no_run
//! use powerball_feed::{FallbackOrchestrator, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = FallbackOrchestrator::from_config(&PipelineConfig::from_env())?;
//!
//!     let draw = orchestrator.fetch_latest_draw().await;
//!     if draw.is_mock() {
//!         println!("All sources down, got synthetic draw");
//!     }
//!     println!("{} {:?} PB {}", draw.draw_date, draw.white_balls, draw.powerball);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod enhance;
pub mod error;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod reconciler;
pub mod retry;
pub mod scraper;
pub mod store;
pub mod synthetic;
pub mod validator;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::{ErrorKind, FetchError};
pub use models::{Draw, PrizeTier, Provenance, RawCandidate, SourceTag};
pub use orchestrator::FallbackOrchestrator;
pub use reconciler::DrawNumberReconciler;
pub use retry::{Backoff, RetryPolicy};
pub use store::{DrawStore, JsonFileStore, MemoryStore};
pub use synthetic::MockDrawGenerator;

/// Install the fmt subscriber with the level from `LOG_LEVEL` (default INFO)
pub fn init_logging() {
    let level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|v| v.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::INFO);

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::warn!("Logging subscriber already installed");
    }
}
