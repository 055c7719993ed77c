//! California Lottery past-draws API

use super::{DrawSource, HistorySource, HttpFetcher};
use crate::config::PipelineConfig;
use crate::error::FetchError;
use crate::models::{PrizeTier, RawCandidate, SourceTag};
use crate::normalize::{format_usd, parse_currency, parse_draw_date, parse_winners, split_numbers};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Jackpot tier key in the `Prizes` map
const JACKPOT_TIER: &str = "1";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PastDrawsResponse {
    #[serde(default)]
    previous_draws: Vec<ApiDraw>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiDraw {
    #[serde(default, alias = "drawNumber")]
    draw_number: Option<Lenient>,
    #[serde(default)]
    draw_date: String,
    #[serde(default)]
    winning_numbers: HashMap<String, ApiNumber>,
    #[serde(default)]
    prizes: HashMap<String, ApiPrize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiNumber {
    number: Lenient,
    #[serde(default)]
    is_special: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiPrize {
    #[serde(default)]
    prize_type_description: Option<String>,
    #[serde(default)]
    count: Option<Lenient>,
    #[serde(default)]
    amount: Option<Lenient>,
}

/// The API is inconsistent about quoting numbers
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Lenient {
    Int(u64),
    Float(f64),
    Text(String),
}

impl Lenient {
    fn as_u32(&self) -> Option<u32> {
        match self {
            Lenient::Int(n) => u32::try_from(*n).ok(),
            Lenient::Float(f) if f.fract() == 0.0 && *f >= 0.0 => Some(*f as u32),
            Lenient::Float(_) => None,
            Lenient::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_amount(&self) -> f64 {
        match self {
            Lenient::Int(n) => *n as f64,
            Lenient::Float(f) if f.is_finite() && *f >= 0.0 => *f,
            Lenient::Float(_) => 0.0,
            Lenient::Text(s) => parse_currency(s),
        }
    }

    fn as_count(&self) -> u32 {
        match self {
            Lenient::Text(s) => parse_winners(s),
            other => other.as_u32().unwrap_or(0),
        }
    }
}

/// Sort map entries by their numeric key ("10" after "9")
fn by_numeric_key<T>(map: &HashMap<String, T>) -> Vec<(&String, &T)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by_key(|(k, _)| (k.parse::<u32>().unwrap_or(u32::MAX), k.to_string()));
    entries
}

fn parse_api_draw(draw: &ApiDraw) -> Result<RawCandidate, FetchError> {
    let draw_date = parse_draw_date(&draw.draw_date)?;

    let mut regular = Vec::with_capacity(5);
    let mut special = None;
    for (slot, n) in by_numeric_key(&draw.winning_numbers) {
        let value = n
            .number
            .as_u32()
            .ok_or_else(|| FetchError::parse(format!("non-numeric ball in slot {}", slot)))?;
        if n.is_special && special.is_none() {
            special = Some(value);
        } else {
            regular.push(value);
        }
    }

    let (white_balls, powerball) = match special {
        Some(pb) if regular.len() >= 5 => (regular[..5].to_vec(), pb),
        Some(_) => {
            return Err(FetchError::parse(format!(
                "expected 5 white balls, found {}",
                regular.len()
            )))
        }
        // No flagged slot: slots 0-4 are white, slot 5 is the powerball
        None => split_numbers(&regular)?,
    };

    let jackpot = draw.prizes.get(JACKPOT_TIER);
    let jackpot_amount = jackpot
        .and_then(|p| p.amount.as_ref())
        .map(Lenient::as_amount)
        .unwrap_or(0.0);
    let winners = jackpot
        .and_then(|p| p.count.as_ref())
        .map(Lenient::as_count)
        .unwrap_or(0);

    let prize_breakdown = if draw.prizes.is_empty() {
        None
    } else {
        Some(
            by_numeric_key(&draw.prizes)
                .into_iter()
                .map(|(key, prize)| PrizeTier {
                    tier: prize
                        .prize_type_description
                        .clone()
                        .unwrap_or_else(|| format!("Tier {}", key)),
                    winners: prize.count.as_ref().map(Lenient::as_count).unwrap_or(0),
                    prize: format_usd(prize.amount.as_ref().map(Lenient::as_amount).unwrap_or(0.0)),
                })
                .collect(),
        )
    };

    Ok(RawCandidate {
        draw_number: draw.draw_number.as_ref().and_then(Lenient::as_u32),
        draw_date,
        white_balls,
        powerball,
        jackpot_amount,
        winners,
        source: SourceTag::CaApi,
        prize_breakdown,
    })
}

/// Parse one page of the past-draws API.
///
/// Entries that fail to parse are skipped with a warning. A page that had
/// entries but none usable is a parse error.
pub fn parse_api_page(body: &str) -> Result<Vec<RawCandidate>, FetchError> {
    let response: PastDrawsResponse = serde_json::from_str(body)?;
    parse_response(response)
}

fn parse_response(response: PastDrawsResponse) -> Result<Vec<RawCandidate>, FetchError> {
    let total = response.previous_draws.len();
    let mut candidates = Vec::with_capacity(total);
    let mut last_err = None;

    for draw in &response.previous_draws {
        match parse_api_draw(draw) {
            Ok(c) => candidates.push(c),
            Err(e) => {
                tracing::warn!("Skipping CA API draw {:?}: {}", draw.draw_number, e);
                last_err = Some(e);
            }
        }
    }

    match last_err {
        Some(e) if candidates.is_empty() => Err(e),
        _ => Ok(candidates),
    }
}

/// Structured API client
pub struct CaApiSource {
    http: Arc<HttpFetcher>,
    base_url: String,
    referer: String,
    page_size: usize,
}

impl CaApiSource {
    pub fn new(http: Arc<HttpFetcher>, config: &PipelineConfig) -> Self {
        Self {
            http,
            base_url: config.ca_api_base.trim_end_matches('/').to_string(),
            referer: config.ca_web_url.clone(),
            page_size: config.page_size,
        }
    }

    /// Build URL for one page of past draws
    fn build_url(&self, page: u32, page_size: usize) -> String {
        format!("{}/{}/{}", self.base_url, page, page_size)
    }

    async fn get_page(&self, page: u32, page_size: usize) -> Result<Vec<RawCandidate>, FetchError> {
        let url = self.build_url(page, page_size);
        let response: PastDrawsResponse = self.http.get_json(&url, Some(&self.referer)).await?;
        parse_response(response)
    }
}

#[async_trait]
impl DrawSource for CaApiSource {
    fn name(&self) -> &'static str {
        "ca_api"
    }

    async fn fetch(&self) -> Result<RawCandidate, FetchError> {
        self.get_page(1, self.page_size)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::parse("CA API returned no draws"))
    }
}

#[async_trait]
impl HistorySource for CaApiSource {
    fn name(&self) -> &'static str {
        "ca_api"
    }

    async fn fetch_page(
        &self,
        page: u32,
        page_size: usize,
    ) -> Result<Vec<RawCandidate>, FetchError> {
        self.get_page(page, page_size).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const PAGE: &str = r#"{
        "PreviousDraws": [
            {
                "DrawNumber": 1203,
                "DrawDate": "2025-04-05T00:00:00",
                "WinningNumbers": {
                    "0": {"Number": "4", "IsSpecial": false},
                    "1": {"Number": "18", "IsSpecial": false},
                    "2": {"Number": "27", "IsSpecial": false},
                    "3": {"Number": "40", "IsSpecial": false},
                    "4": {"Number": "61", "IsSpecial": false},
                    "5": {"Number": "12", "IsSpecial": true}
                },
                "Prizes": {
                    "1": {"PrizeTypeDescription": "5 + Powerball", "Count": 0, "Amount": 167000000},
                    "2": {"PrizeTypeDescription": "5", "Count": 3, "Amount": 1000000},
                    "10": {"PrizeTypeDescription": "Powerball", "Count": 410022, "Amount": 4}
                }
            },
            {
                "DrawNumber": "1202",
                "DrawDate": "04/02/2025",
                "WinningNumbers": {
                    "0": {"Number": 9},
                    "1": {"Number": 13},
                    "2": {"Number": 31},
                    "3": {"Number": 50},
                    "4": {"Number": 66},
                    "5": {"Number": 2}
                },
                "Prizes": {}
            }
        ]
    }"#;

    #[test]
    fn test_parse_api_page() {
        let draws = parse_api_page(PAGE).unwrap();
        assert_eq!(draws.len(), 2);

        let first = &draws[0];
        assert_eq!(first.draw_number, Some(1203));
        assert_eq!(first.draw_date, NaiveDate::from_ymd_opt(2025, 4, 5).unwrap());
        assert_eq!(first.white_balls, vec![4, 18, 27, 40, 61]);
        assert_eq!(first.powerball, 12);
        assert_eq!(first.jackpot_amount, 167_000_000.0);
        assert_eq!(first.winners, 0);
        assert_eq!(first.source, SourceTag::CaApi);

        let tiers = first.prize_breakdown.as_ref().unwrap();
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0].tier, "5 + Powerball");
        assert_eq!(tiers[1].winners, 3);
        assert_eq!(tiers[1].prize, "$1,000,000");
        assert_eq!(tiers[2].tier, "Powerball");
    }

    #[test]
    fn test_unflagged_slots_use_position() {
        let draws = parse_api_page(PAGE).unwrap();
        let second = &draws[1];
        assert_eq!(second.draw_number, Some(1202));
        assert_eq!(second.draw_date, NaiveDate::from_ymd_opt(2025, 4, 2).unwrap());
        assert_eq!(second.white_balls, vec![9, 13, 31, 50, 66]);
        assert_eq!(second.powerball, 2);
        assert!(second.prize_breakdown.is_none());
    }

    #[test]
    fn test_short_numbers_is_parse_error() {
        let body = r#"{"PreviousDraws": [{
            "DrawNumber": 5,
            "DrawDate": "2025-04-05T00:00:00",
            "WinningNumbers": {"0": {"Number": 1}, "1": {"Number": 2}}
        }]}"#;
        assert!(matches!(parse_api_page(body), Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_bad_entry_skipped_when_others_parse() {
        let body = r#"{"PreviousDraws": [
            {"DrawNumber": 7, "DrawDate": "sometime", "WinningNumbers": {}},
            {"DrawNumber": 6, "DrawDate": "2025-04-05",
             "WinningNumbers": {"0": {"Number": 1}, "1": {"Number": 2}, "2": {"Number": 3},
                                "3": {"Number": 4}, "4": {"Number": 5}, "5": {"Number": 6}}}
        ]}"#;
        let draws = parse_api_page(body).unwrap();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].draw_number, Some(6));
    }

    #[test]
    fn test_empty_page() {
        assert!(parse_api_page(r#"{"PreviousDraws": []}"#).unwrap().is_empty());
        assert!(parse_api_page("{}").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(parse_api_page("<html>"), Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_lenient_text_amount() {
        assert_eq!(Lenient::Text("$1.5 Million".into()).as_amount(), 1_500_000.0);
        assert_eq!(Lenient::Text("None".into()).as_count(), 0);
        assert_eq!(Lenient::Float(12.0).as_u32(), Some(12));
        assert_eq!(Lenient::Float(12.5).as_u32(), None);
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(4.0), "$4");
        assert_eq!(format_usd(1_000.0), "$1,000");
        assert_eq!(format_usd(167_000_000.0), "$167,000,000");
    }

    #[test]
    fn test_build_url() {
        let config = PipelineConfig::default();
        let http = Arc::new(HttpFetcher::new(&config).unwrap());
        let source = CaApiSource::new(http, &config);
        assert_eq!(
            source.build_url(2, 20),
            "https://www.calottery.com/api/DrawGameApi/DrawGamePastDrawResults/12/2/20"
        );
    }
}
