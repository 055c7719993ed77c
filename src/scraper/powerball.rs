//! powerball.com main page and previous-results page
//!
//! Neither page exposes a draw number; the orchestrator derives one.

use super::{first_text, numbers_in, selector, DrawSource, HistorySource, HttpFetcher};
use crate::config::PipelineConfig;
use crate::error::FetchError;
use crate::models::{RawCandidate, SourceTag};
use crate::normalize::{parse_currency, parse_draw_date, parse_winners, split_numbers};
use async_trait::async_trait;
use scraper::{ElementRef, Html};
use std::sync::Arc;

/// Parse one draw block (`.draw-date`, `.number` x6, `.jackpot-amount`,
/// optional `.winner-info`)
fn parse_draw_block(block: &ElementRef) -> Result<RawCandidate, FetchError> {
    let date_text = first_text(block, ".draw-date")?
        .ok_or_else(|| FetchError::parse("draw block has no date"))?;
    let draw_date = parse_draw_date(&date_text)?;

    let numbers = numbers_in(block, ".number")?;
    let (white_balls, powerball) = split_numbers(&numbers)?;

    let jackpot_amount = first_text(block, ".jackpot-amount")?
        .map(|t| parse_currency(&t))
        .unwrap_or(0.0);
    let winners = first_text(block, ".winner-info")?
        .map(|t| parse_winners(&t))
        .unwrap_or(0);

    Ok(RawCandidate {
        draw_number: None,
        draw_date,
        white_balls,
        powerball,
        jackpot_amount,
        winners,
        source: SourceTag::PowerballCom,
        prize_breakdown: None,
    })
}

/// Parse the current draw from the powerball.com home page
pub fn parse_powerball_main(html: &str) -> Result<RawCandidate, FetchError> {
    let document = Html::parse_document(html);
    parse_draw_block(&document.root_element())
}

/// Parse every `.draw-result` block on a previous-results page, newest first.
///
/// Malformed blocks are skipped. A page with blocks but none usable is a
/// parse error; a page with no blocks at all is an empty result.
pub fn parse_powerball_history(html: &str) -> Result<Vec<RawCandidate>, FetchError> {
    let document = Html::parse_document(html);
    let block_selector = selector(".draw-result")?;

    let mut draws = Vec::new();
    let mut last_err = None;
    for block in document.select(&block_selector) {
        match parse_draw_block(&block) {
            Ok(c) => draws.push(c),
            Err(e) => {
                tracing::warn!("Skipping powerball.com history entry: {}", e);
                last_err = Some(e);
            }
        }
    }

    match last_err {
        Some(e) if draws.is_empty() => Err(e),
        _ => Ok(draws),
    }
}

/// Secondary scraper for the powerball.com home page
pub struct PowerballMainSource {
    http: Arc<HttpFetcher>,
    url: String,
}

impl PowerballMainSource {
    pub fn new(http: Arc<HttpFetcher>, config: &PipelineConfig) -> Self {
        Self {
            http,
            url: config.powerball_url.clone(),
        }
    }
}

#[async_trait]
impl DrawSource for PowerballMainSource {
    fn name(&self) -> &'static str {
        "powerball.com main"
    }

    async fn fetch(&self) -> Result<RawCandidate, FetchError> {
        let html = self.http.get_html(&self.url).await?;
        parse_powerball_main(&html)
    }
}

/// Secondary scraper for the powerball.com previous-results list
pub struct PowerballHistorySource {
    http: Arc<HttpFetcher>,
    url: String,
}

impl PowerballHistorySource {
    pub fn new(http: Arc<HttpFetcher>, config: &PipelineConfig) -> Self {
        Self {
            http,
            url: config.powerball_history_url.clone(),
        }
    }

    /// Page 1 is the bare URL; later pages add `pg=N`
    fn build_url(&self, page: u32) -> String {
        if page <= 1 {
            return self.url.clone();
        }
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}pg={}", self.url, sep, page)
    }
}

#[async_trait]
impl DrawSource for PowerballHistorySource {
    fn name(&self) -> &'static str {
        "powerball.com history"
    }

    async fn fetch(&self) -> Result<RawCandidate, FetchError> {
        let html = self.http.get_html(&self.url).await?;
        parse_powerball_history(&html)?
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::parse("no draw results on history page"))
    }
}

#[async_trait]
impl HistorySource for PowerballHistorySource {
    fn name(&self) -> &'static str {
        "powerball.com history"
    }

    /// The site serves a fixed number of draws per page; `page_size` is
    /// ignored and the whole page is returned.
    async fn fetch_page(
        &self,
        page: u32,
        _page_size: usize,
    ) -> Result<Vec<RawCandidate>, FetchError> {
        let html = self.http.get_html(&self.build_url(page)).await?;
        parse_powerball_history(&html)
    }
}
