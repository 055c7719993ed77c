//! Draw sources
//!
//! Four concrete clients share one capability: produce zero-or-one candidate
//! draw per call (or one page of candidates for historical backfill).
//!
//! | Client | Tag | Transport |
//! |---|---|---|
//! | [`CaApiSource`] | `ca_api` | JSON past-draws API |
//! | [`CaWebSource`] | `ca_web` | draw-card HTML page |
//! | [`PowerballMainSource`] | `powerball.com` | home page HTML |
//! | [`PowerballHistorySource`] | `powerball.com` | previous-results HTML |
//!
//! # Example
//!
//! ```no_run
//! use powerball_feed::scraper::{CaApiSource, DrawSource, HttpFetcher};
//! use powerball_feed::PipelineConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::default();
//!     let http = Arc::new(HttpFetcher::new(&config)?);
//!     let api = CaApiSource::new(http, &config);
//!
//!     let candidate = api.fetch().await?;
//!     println!("{:?}", candidate.white_balls);
//!     Ok(())
//! }
//! ```

mod ca_api;
mod ca_web;
mod client;
mod powerball;

pub use ca_api::{parse_api_page, CaApiSource};
pub use ca_web::{parse_ca_web, CaWebSource};
pub use client::HttpFetcher;
pub use powerball::{
    parse_powerball_history, parse_powerball_main, PowerballHistorySource, PowerballMainSource,
};

use crate::config::PipelineConfig;
use crate::error::FetchError;
use crate::models::RawCandidate;
use async_trait::async_trait;
use scraper::{ElementRef, Selector};
use std::sync::Arc;

/// A source that can report the most recent draw
#[async_trait]
pub trait DrawSource: Send + Sync {
    /// Name used in logs and retry errors
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> Result<RawCandidate, FetchError>;
}

/// A source that can page through past draws, newest first
#[async_trait]
pub trait HistorySource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch one page (1-based). An empty page means no more data.
    ///
    /// `page_size` is a request hint. Sources with a fixed native page size
    /// return their whole page.
    async fn fetch_page(&self, page: u32, page_size: usize)
        -> Result<Vec<RawCandidate>, FetchError>;
}

/// The live source set, in priority order
pub struct SourceSet {
    /// Tried in order by `fetch_latest_draw`
    pub latest: Vec<Arc<dyn DrawSource>>,
    /// Paged in order by `fetch_historical_draws`
    pub history: Vec<Arc<dyn HistorySource>>,
    /// Consulted to backfill partial latest draws
    pub enrichers: Vec<Arc<dyn DrawSource>>,
}

impl SourceSet {
    /// Build the production sources sharing one HTTP client
    pub fn live(config: &PipelineConfig) -> Result<Self, FetchError> {
        let http = Arc::new(HttpFetcher::new(config)?);

        let api = Arc::new(CaApiSource::new(Arc::clone(&http), config));
        let ca_web = Arc::new(CaWebSource::new(Arc::clone(&http), config));
        let main = Arc::new(PowerballMainSource::new(Arc::clone(&http), config));
        let history = Arc::new(PowerballHistorySource::new(http, config));

        let latest: Vec<Arc<dyn DrawSource>> =
            vec![api.clone(), ca_web, main.clone(), history.clone()];
        let paged: Vec<Arc<dyn HistorySource>> = vec![api, history];
        let mut enrichers: Vec<Arc<dyn DrawSource>> = Vec::new();
        if config.enrich {
            enrichers.push(main);
        }

        Ok(Self {
            latest,
            history: paged,
            enrichers,
        })
    }
}

/// Compile a CSS selector, mapping failures to a parse error
pub(crate) fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|e| FetchError::parse(format!("bad selector {}: {}", css, e)))
}

/// Whitespace-collapsed text of an element
pub(crate) fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first match of `css` under `element`
pub(crate) fn first_text(element: &ElementRef, css: &str) -> Result<Option<String>, FetchError> {
    let sel = selector(css)?;
    Ok(element.select(&sel).next().map(|e| element_text(&e)))
}

/// Integers from every match of `css` under `element`, in document order
pub(crate) fn numbers_in(element: &ElementRef, css: &str) -> Result<Vec<u32>, FetchError> {
    let sel = selector(css)?;
    Ok(element
        .select(&sel)
        .filter_map(|e| element_text(&e).parse::<u32>().ok())
        .collect())
}
