//! California Lottery Powerball page (current draw card)

use super::{first_text, numbers_in, selector, DrawSource, HttpFetcher};
use crate::config::PipelineConfig;
use crate::error::FetchError;
use crate::models::{RawCandidate, SourceTag};
use crate::normalize::{extract_int, parse_currency, parse_draw_date, parse_winners, split_numbers};
use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;

/// Parse the first draw card on the CA Powerball page.
///
/// Card layout:
/// - `.draw-card--header time`: long-form date ("Saturday, April 5, 2025")
/// - `.draw-card--draw-number`: "Draw #1203" (optional)
/// - `.winning-number` x6: five white balls then the powerball
/// - `.draw-card--prize-amount`: jackpot text
/// - `.has-winners`: present only when the jackpot was hit
pub fn parse_ca_web(html: &str) -> Result<RawCandidate, FetchError> {
    let document = Html::parse_document(html);

    let card_selector = selector(".draw-cards .draw-card")?;
    let card = document
        .select(&card_selector)
        .next()
        .ok_or_else(|| FetchError::parse("could not find draw card"))?;

    let date_text = first_text(&card, ".draw-card--header time")?
        .ok_or_else(|| FetchError::parse("draw card has no date"))?;
    let draw_date = parse_draw_date(&date_text)?;

    let draw_number = first_text(&card, ".draw-card--draw-number")?
        .as_deref()
        .and_then(extract_int);

    let numbers = numbers_in(&card, ".winning-number")?;
    let (white_balls, powerball) = split_numbers(&numbers)?;

    let jackpot_amount = first_text(&card, ".draw-card--prize-amount")?
        .map(|t| parse_currency(&t))
        .unwrap_or(0.0);
    let winners = first_text(&card, ".has-winners")?
        .map(|t| parse_winners(&t))
        .unwrap_or(0);

    Ok(RawCandidate {
        draw_number,
        draw_date,
        white_balls,
        powerball,
        jackpot_amount,
        winners,
        source: SourceTag::CaWeb,
        prize_breakdown: None,
    })
}

/// Primary HTML scraper
pub struct CaWebSource {
    http: Arc<HttpFetcher>,
    url: String,
}

impl CaWebSource {
    pub fn new(http: Arc<HttpFetcher>, config: &PipelineConfig) -> Self {
        Self {
            http,
            url: config.ca_web_url.clone(),
        }
    }
}

#[async_trait]
impl DrawSource for CaWebSource {
    fn name(&self) -> &'static str {
        "ca_web"
    }

    async fn fetch(&self) -> Result<RawCandidate, FetchError> {
        let html = self.http.get_html(&self.url).await?;
        parse_ca_web(&html)
    }
}
