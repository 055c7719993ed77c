//! Pipeline configuration
//!
//! Defaults match the live sources; every field can be overridden from the
//! environment with [`PipelineConfig::from_env`].

use crate::retry::{Backoff, RetryPolicy};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_CA_API_BASE: &str =
    "https://www.calottery.com/api/DrawGameApi/DrawGamePastDrawResults/12";
const DEFAULT_CA_WEB_URL: &str = "https://www.calottery.com/draw-games/powerball";
const DEFAULT_POWERBALL_URL: &str = "https://www.powerball.com";
const DEFAULT_POWERBALL_HISTORY_URL: &str = "https://www.powerball.com/previous-results";

/// Acquisition pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// CA API base; pages are requested as `{base}/{page}/{per_page}`
    pub ca_api_base: String,
    pub ca_web_url: String,
    pub powerball_url: String,
    pub powerball_history_url: String,
    /// Per-request deadline in seconds
    pub timeout_secs: u64,
    /// Attempts per latest-draw source call
    pub max_retries: u32,
    /// Attempts per history page request
    pub history_max_retries: u32,
    /// Attempts per enrichment lookup
    pub enrich_max_retries: u32,
    /// Delay between attempts in milliseconds
    pub retry_delay_ms: u64,
    pub exponential_backoff: bool,
    /// Page size for historical requests
    pub page_size: usize,
    /// Jittered delay between history pages
    pub page_delay_min_ms: u64,
    pub page_delay_max_ms: u64,
    /// Minimum spacing between requests to one host
    pub request_interval_ms: u64,
    /// Initial high-water mark for draw numbering
    pub seed_draw_number: u32,
    /// Backfill jackpot/winners on partial latest draws
    pub enrich: bool,
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ca_api_base: DEFAULT_CA_API_BASE.to_string(),
            ca_web_url: DEFAULT_CA_WEB_URL.to_string(),
            powerball_url: DEFAULT_POWERBALL_URL.to_string(),
            powerball_history_url: DEFAULT_POWERBALL_HISTORY_URL.to_string(),
            timeout_secs: 15,
            max_retries: 3,
            history_max_retries: 3,
            enrich_max_retries: 1,
            retry_delay_ms: 2000,
            exponential_backoff: false,
            page_size: 20,
            page_delay_min_ms: 1000,
            page_delay_max_ms: 2000,
            request_interval_ms: 500,
            seed_draw_number: 0,
            enrich: true,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Build a configuration from `PB_*` environment variables.
    ///
    /// Unset variables keep their defaults; unparseable ones are logged and
    /// ignored.
    pub fn from_env() -> Self {
        let d = Self::default();

        Self {
            ca_api_base: env_string("PB_CA_API_BASE", d.ca_api_base),
            ca_web_url: env_string("PB_CA_WEB_URL", d.ca_web_url),
            powerball_url: env_string("PB_POWERBALL_URL", d.powerball_url),
            powerball_history_url: env_string("PB_POWERBALL_HISTORY_URL", d.powerball_history_url),
            timeout_secs: env_parse("PB_TIMEOUT_SECS", d.timeout_secs),
            max_retries: env_parse("PB_MAX_RETRIES", d.max_retries).max(1),
            history_max_retries: env_parse("PB_HISTORY_MAX_RETRIES", d.history_max_retries).max(1),
            enrich_max_retries: env_parse("PB_ENRICH_MAX_RETRIES", d.enrich_max_retries).max(1),
            retry_delay_ms: env_parse("PB_RETRY_DELAY_MS", d.retry_delay_ms),
            exponential_backoff: std::env::var("PB_RETRY_BACKOFF")
                .map(|v| v.eq_ignore_ascii_case("exponential"))
                .unwrap_or(d.exponential_backoff),
            page_size: env_parse("PB_PAGE_SIZE", d.page_size).max(1),
            page_delay_min_ms: env_parse("PB_PAGE_DELAY_MIN_MS", d.page_delay_min_ms),
            page_delay_max_ms: env_parse("PB_PAGE_DELAY_MAX_MS", d.page_delay_max_ms),
            request_interval_ms: env_parse("PB_REQUEST_INTERVAL_MS", d.request_interval_ms),
            seed_draw_number: env_parse("PB_SEED_DRAW_NUMBER", d.seed_draw_number),
            enrich: env_parse("PB_ENRICH", d.enrich),
            user_agent: env_string("PB_USER_AGENT", d.user_agent),
        }
    }

    /// Retry policy for latest-draw source calls
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.backoff())
    }

    /// Retry policy for history page requests
    pub fn history_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.history_max_retries, self.backoff())
    }

    /// Retry policy for enrichment lookups
    pub fn enrich_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.enrich_max_retries, self.backoff())
    }

    fn backoff(&self) -> Backoff {
        let base = Duration::from_millis(self.retry_delay_ms);
        if self.exponential_backoff {
            Backoff::Exponential {
                base,
                max: base * 8,
            }
        } else {
            Backoff::Fixed(base)
        }
    }

    /// Inter-page delay bounds, normalized so min <= max
    pub fn page_delay_range(&self) -> (Duration, Duration) {
        let lo = self.page_delay_min_ms.min(self.page_delay_max_ms);
        let hi = self.page_delay_min_ms.max(self.page_delay_max_ms);
        (Duration::from_millis(lo), Duration::from_millis(hi))
    }
}

fn env_string(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
