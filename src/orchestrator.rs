//! Ordered source fallback
//!
//! `fetch_latest_draw` and `fetch_historical_draws` never return an error.
//! Every failure is absorbed by falling through to the next source, and the
//! synthetic generator is the unconditional last step. Callers that need real
//! data must check [`Draw::is_mock`](crate::models::Draw::is_mock) (or the
//! `source` tag) and treat an all-mock result as "service degraded".

use crate::enhance::{enhance, needs_enrichment};
use crate::error::FetchError;
use crate::models::{next_draw_day, Draw, RawCandidate};
use crate::reconciler::DrawNumberReconciler;
use crate::retry::RetryPolicy;
use crate::scraper::{DrawSource, HistorySource, SourceSet};
use crate::synthetic::MockDrawGenerator;
use crate::validator::{validate, ValidCandidate};
use chrono::{Duration as DateDuration, NaiveDate, Utc};
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Draw acquisition pipeline.
///
/// Within one call, sources are tried strictly in priority order with no
/// fan-out. Many calls may run concurrently on a shared orchestrator; the
/// only shared mutable state is the reconciler's high-water mark.
pub struct FallbackOrchestrator {
    sources: Vec<Arc<dyn DrawSource>>,
    history_sources: Vec<Arc<dyn HistorySource>>,
    enrichers: Vec<Arc<dyn DrawSource>>,
    retry: RetryPolicy,
    history_retry: RetryPolicy,
    enrich_retry: RetryPolicy,
    reconciler: Arc<DrawNumberReconciler>,
    mock: MockDrawGenerator,
    page_size: usize,
    page_delay: (Duration, Duration),
    cancel: CancellationToken,
}

impl FallbackOrchestrator {
    pub fn new(sources: Vec<Arc<dyn DrawSource>>, retry: RetryPolicy) -> Self {
        Self {
            sources,
            history_sources: Vec::new(),
            enrichers: Vec::new(),
            history_retry: retry.clone(),
            enrich_retry: RetryPolicy::immediate(1),
            retry,
            reconciler: Arc::new(DrawNumberReconciler::new()),
            mock: MockDrawGenerator::new(),
            page_size: 20,
            page_delay: (Duration::from_secs(1), Duration::from_secs(2)),
            cancel: CancellationToken::new(),
        }
    }

    /// Orchestrator over the live sources described by `config`
    pub fn from_config(config: &crate::PipelineConfig) -> Result<Self, FetchError> {
        let set = SourceSet::live(config)?;
        Ok(Self::new(set.latest, config.retry_policy())
            .with_history_retry(config.history_retry_policy())
            .with_enrich_retry(config.enrich_retry_policy())
            .with_history_sources(set.history)
            .with_enrichers(set.enrichers)
            .with_reconciler(Arc::new(DrawNumberReconciler::with_latest(
                config.seed_draw_number,
            )))
            .with_page_size(config.page_size)
            .with_page_delay(config.page_delay_range()))
    }

    pub fn with_history_sources(mut self, sources: Vec<Arc<dyn HistorySource>>) -> Self {
        self.history_sources = sources;
        self
    }

    pub fn with_enrichers(mut self, enrichers: Vec<Arc<dyn DrawSource>>) -> Self {
        self.enrichers = enrichers;
        self
    }

    /// Retry policy for history pages (defaults to the latest-draw policy)
    pub fn with_history_retry(mut self, retry: RetryPolicy) -> Self {
        self.history_retry = retry;
        self
    }

    /// Retry policy for enrichment lookups (defaults to a single attempt)
    pub fn with_enrich_retry(mut self, retry: RetryPolicy) -> Self {
        self.enrich_retry = retry;
        self
    }

    pub fn with_reconciler(mut self, reconciler: Arc<DrawNumberReconciler>) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn with_mock(mut self, mock: MockDrawGenerator) -> Self {
        self.mock = mock;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_page_delay(mut self, (min, max): (Duration, Duration)) -> Self {
        self.page_delay = (min.min(max), min.max(max));
        self
    }

    /// Cancelling `cancel` aborts in-flight requests and retry loops
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn reconciler(&self) -> &Arc<DrawNumberReconciler> {
        &self.reconciler
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Call one source under the retry policy and validate its candidate
    async fn try_source(&self, source: &dyn DrawSource) -> Result<ValidCandidate, FetchError> {
        let candidate = self
            .retry
            .run(source.name(), &self.cancel, || source.fetch())
            .await?;
        validate(candidate)
    }

    /// Most recent draw from the highest-priority source that succeeds.
    ///
    /// Never fails: when every source fails (or the call is cancelled) a
    /// `mock_data` draw is returned instead.
    pub async fn fetch_latest_draw(&self) -> Draw {
        tracing::info!("Fetching latest Powerball draw");

        for source in &self.sources {
            if self.cancel.is_cancelled() {
                break;
            }
            tracing::info!("Trying {}", source.name());

            match self.try_source(source.as_ref()).await {
                Ok(valid) => match self.number_latest(valid) {
                    Ok(draw) => {
                        tracing::info!(
                            "Latest draw {} ({}) from {}",
                            draw.draw_number,
                            draw.draw_date,
                            draw.source
                        );
                        return self.enrich(draw).await;
                    }
                    Err(e) => tracing::warn!("{} rejected: {}", source.name(), e),
                },
                Err(FetchError::Cancelled) => break,
                Err(e) => tracing::warn!(
                    "{} failed ({}): {}; falling back",
                    source.name(),
                    e.kind(),
                    e
                ),
            }
        }

        let draw_number = self.reconciler.assign_mock();
        let draw_date = self
            .reconciler
            .latest_date()
            .map(next_draw_day)
            .unwrap_or_else(|| Utc::now().date_naive());
        tracing::error!(
            "All draw sources failed, returning synthetic draw {}",
            draw_number
        );
        self.mock.generate_latest(draw_number, draw_date)
    }

    /// Reconcile the draw number of a latest-draw candidate
    fn number_latest(&self, valid: ValidCandidate) -> Result<Draw, FetchError> {
        match valid.draw_number() {
            Some(n) => {
                self.reconciler.observe(n, valid.draw_date());
                valid.into_draw(n)
            }
            None => {
                let n = self.reconciler.assign_latest(valid.draw_date());
                tracing::info!("Source gave no draw number, assigned {}", n);
                valid.into_draw(n)
            }
        }
    }

    /// Backfill jackpot/winners from the enrichment sources
    async fn enrich(&self, draw: Draw) -> Draw {
        if !needs_enrichment(&draw) {
            return draw;
        }

        for source in &self.enrichers {
            let result = self
                .enrich_retry
                .run(source.name(), &self.cancel, || source.fetch())
                .await
                .and_then(validate);

            match result {
                Ok(valid) => {
                    // matching ignores draw numbers; reuse the draw's own
                    let Ok(secondary) = valid.into_draw(draw.draw_number) else {
                        continue;
                    };
                    let enriched = enhance(&draw, &secondary);
                    if enriched != draw {
                        return enriched;
                    }
                }
                Err(FetchError::Cancelled) => break,
                Err(e) => tracing::debug!("Enrichment from {} failed: {}", source.name(), e),
            }
        }

        draw
    }

    /// Exactly `count` past draws, newest first.
    ///
    /// Pages through the structured API, then the HTML history list, and
    /// fills any shortfall with synthetic draws. A draw without a reported
    /// number gets one less than the draw before it in the batch; only the
    /// first draw of the batch is numbered from the high-water mark.
    pub async fn fetch_historical_draws(&self, count: usize) -> Vec<Draw> {
        tracing::info!("Fetching {} historical Powerball draws", count);
        let mut draws: Vec<Draw> = Vec::with_capacity(count);

        for source in &self.history_sources {
            if draws.len() >= count || self.cancel.is_cancelled() {
                break;
            }
            let before = draws.len();
            self.collect_pages(source.as_ref(), count, &mut draws).await;
            tracing::info!(
                "Collected {} draws from {}",
                draws.len() - before,
                source.name()
            );
        }

        if draws.len() < count {
            let needed = count - draws.len();
            tracing::warn!(
                "Only fetched {} real draws, generating {} synthetic draws",
                draws.len(),
                needed
            );
            let newest = draws
                .last()
                .map(|d| d.draw_date - DateDuration::days(3))
                .unwrap_or_else(|| Utc::now().date_naive());
            let mut previous = draws.last().map(|d| d.draw_number);
            let numbers: Vec<u32> = (draws.len()..count)
                .map(|pos| {
                    let n = self.reconciler.assign_historical(pos, count, previous);
                    previous = Some(n);
                    n
                })
                .collect();
            draws.extend(self.mock.generate_history(newest, &numbers));
        }

        draws.truncate(count);
        draws
    }

    /// Page through one history source until `count` draws are collected,
    /// the source runs dry, or it fails. Draws already collected are kept.
    async fn collect_pages(&self, source: &dyn HistorySource, count: usize, draws: &mut Vec<Draw>) {
        let mut seen: HashSet<NaiveDate> = draws.iter().map(|d| d.draw_date).collect();
        let mut page = 1u32;

        while draws.len() < count {
            if page > 1 && !self.pause_between_pages().await {
                return;
            }

            let result = self
                .history_retry
                .run(source.name(), &self.cancel, || {
                    source.fetch_page(page, self.page_size)
                })
                .await;

            let candidates = match result {
                Ok(c) if c.is_empty() => {
                    tracing::info!("{} has no more draws after page {}", source.name(), page - 1);
                    return;
                }
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(
                        "{} failed on page {} ({}): {}",
                        source.name(),
                        page,
                        e.kind(),
                        e
                    );
                    return;
                }
            };

            let added = self.accept_page(candidates, count, draws, &mut seen);
            if added == 0 {
                tracing::warn!("{} page {} added no new draws, stopping", source.name(), page);
                return;
            }
            page += 1;
        }
    }

    /// Validate and number one page of candidates; returns how many were kept
    fn accept_page(
        &self,
        candidates: Vec<RawCandidate>,
        count: usize,
        draws: &mut Vec<Draw>,
        seen: &mut HashSet<NaiveDate>,
    ) -> usize {
        let mut added = 0;

        for candidate in candidates {
            if draws.len() >= count {
                break;
            }
            if !seen.insert(candidate.draw_date) {
                continue;
            }

            let source = candidate.source;
            let result = validate(candidate).and_then(|valid| match valid.draw_number() {
                Some(n) => {
                    self.reconciler.observe(n, valid.draw_date());
                    valid.into_draw(n)
                }
                None => {
                    let previous = draws.last().map(|d| d.draw_number);
                    let n = self
                        .reconciler
                        .assign_historical(draws.len(), count, previous);
                    valid.into_draw(n)
                }
            });

            match result {
                Ok(draw) => {
                    draws.push(draw);
                    added += 1;
                }
                Err(e) => tracing::warn!("Dropping {} history entry: {}", source.as_str(), e),
            }
        }

        added
    }

    /// Jittered inter-page delay; false when cancelled
    async fn pause_between_pages(&self) -> bool {
        let (min, max) = self.page_delay;
        let delay = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceTag;
    use crate::validator::validate_draw;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn candidate(number: Option<u32>, day: u32, source: SourceTag) -> RawCandidate {
        RawCandidate {
            draw_number: number,
            draw_date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            white_balls: vec![4, 18, 27, 40, 61],
            powerball: 12,
            jackpot_amount: 100_000_000.0,
            winners: 0,
            source,
            prize_breakdown: None,
        }
    }

    #[derive(Clone, Copy)]
    enum Behavior {
        Transient,
        Malformed,
        Invalid,
        Ok(Option<u32>),
    }

    struct FakeSource {
        name: &'static str,
        behavior: Behavior,
        tag: SourceTag,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(name: &'static str, behavior: Behavior, tag: SourceTag) -> Arc<Self> {
            Arc::new(Self {
                name,
                behavior,
                tag,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DrawSource for FakeSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self) -> Result<RawCandidate, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Transient => Err(FetchError::Transient("connection refused".into())),
                Behavior::Malformed => Err(FetchError::parse("no draw card")),
                Behavior::Invalid => {
                    let mut c = candidate(Some(900), 1, self.tag);
                    c.powerball = 40;
                    Ok(c)
                }
                Behavior::Ok(n) => Ok(candidate(n, 29, self.tag)),
            }
        }
    }

    /// Serves `pages` in order, then empty pages (or errors if `fail_after`)
    struct FakeHistory {
        pages: Vec<Vec<RawCandidate>>,
        fail_after: bool,
        calls: AtomicUsize,
    }

    impl FakeHistory {
        fn new(pages: Vec<Vec<RawCandidate>>, fail_after: bool) -> Arc<Self> {
            Arc::new(Self {
                pages,
                fail_after,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl HistorySource for FakeHistory {
        fn name(&self) -> &'static str {
            "fake history"
        }

        async fn fetch_page(
            &self,
            page: u32,
            _page_size: usize,
        ) -> Result<Vec<RawCandidate>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.pages.get(page as usize - 1) {
                Some(p) => Ok(p.clone()),
                None if self.fail_after => Err(FetchError::Transient("timeout".into())),
                None => Ok(Vec::new()),
            }
        }
    }

    /// Draws for March `days`, newest first, numbered from `first_number` down
    fn api_page(days: &[u32], first_number: Option<u32>) -> Vec<RawCandidate> {
        days.iter()
            .enumerate()
            .map(|(i, &d)| {
                let mut c = candidate(first_number.map(|n| n - i as u32), d, SourceTag::CaApi);
                c.white_balls = vec![1, 2, 3, 4, d];
                c
            })
            .collect()
    }

    fn orchestrator(sources: Vec<Arc<dyn DrawSource>>) -> FallbackOrchestrator {
        FallbackOrchestrator::new(sources, RetryPolicy::immediate(3))
            .with_mock(MockDrawGenerator::seeded(1))
            .with_page_delay((Duration::ZERO, Duration::ZERO))
    }

    #[tokio::test]
    async fn test_first_source_wins() {
        let a = FakeSource::new("a", Behavior::Ok(Some(1203)), SourceTag::CaApi);
        let b = FakeSource::new("b", Behavior::Ok(Some(1)), SourceTag::CaWeb);
        let orch = orchestrator(vec![a.clone(), b.clone()]);

        let draw = orch.fetch_latest_draw().await;
        assert_eq!(draw.draw_number, 1203);
        assert_eq!(draw.source.to_string(), "ca_api");
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
        assert_eq!(orch.reconciler().latest(), 1203);
    }

    #[tokio::test]
    async fn test_transient_source_retried_then_fallback() {
        let a = FakeSource::new("a", Behavior::Transient, SourceTag::CaApi);
        let b = FakeSource::new("b", Behavior::Ok(Some(1203)), SourceTag::CaWeb);
        let orch = orchestrator(vec![a.clone(), b.clone()]);

        let draw = orch.fetch_latest_draw().await;
        assert_eq!(draw.source.to_string(), "ca_web");
        assert_eq!(a.calls(), 3);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_parse_error_not_retried() {
        let a = FakeSource::new("a", Behavior::Malformed, SourceTag::CaWeb);
        let b = FakeSource::new("b", Behavior::Ok(Some(7)), SourceTag::PowerballCom);
        let orch = orchestrator(vec![a.clone(), b.clone()]);

        orch.fetch_latest_draw().await;
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_validation_error_falls_through_without_retry() {
        let a = FakeSource::new("a", Behavior::Invalid, SourceTag::CaApi);
        let b = FakeSource::new("b", Behavior::Ok(Some(1203)), SourceTag::CaWeb);
        let orch = orchestrator(vec![a.clone(), b.clone()]);

        let draw = orch.fetch_latest_draw().await;
        assert_eq!(draw.draw_number, 1203);
        assert_eq!(a.calls(), 1);
        // rejected candidate must not move the mark
        assert_eq!(orch.reconciler().latest(), 1203);
    }

    #[tokio::test]
    async fn test_missing_number_assigned_from_mark() {
        let a = FakeSource::new("a", Behavior::Ok(None), SourceTag::PowerballCom);
        let orch = orchestrator(vec![a])
            .with_reconciler(Arc::new(DrawNumberReconciler::with_latest(105)));

        let draw = orch.fetch_latest_draw().await;
        assert_eq!(draw.draw_number, 106);
        assert_eq!(draw.source.to_string(), "powerball.com");
        assert_eq!(orch.reconciler().latest(), 106);
    }

    #[tokio::test]
    async fn test_all_sources_fail_returns_mock() {
        let a = FakeSource::new("a", Behavior::Transient, SourceTag::CaApi);
        let b = FakeSource::new("b", Behavior::Malformed, SourceTag::CaWeb);
        let orch = orchestrator(vec![a.clone(), b.clone()])
            .with_reconciler(Arc::new(DrawNumberReconciler::with_latest(500)));

        let draw = orch.fetch_latest_draw().await;
        assert!(draw.is_mock());
        assert_eq!(draw.draw_number, 501);
        assert!(validate_draw(&draw).is_ok());
        assert_eq!(a.calls(), 3);
        assert_eq!(b.calls(), 1);
        // synthetic draws never move the mark
        assert_eq!(orch.reconciler().latest(), 500);
    }

    #[tokio::test]
    async fn test_mock_latest_dated_after_last_real_draw() {
        let a = FakeSource::new("a", Behavior::Transient, SourceTag::CaApi);
        let reconciler = DrawNumberReconciler::new();
        reconciler.observe(1203, NaiveDate::from_ymd_opt(2025, 3, 29).unwrap());
        let orch = orchestrator(vec![a]).with_reconciler(Arc::new(reconciler));

        let draw = orch.fetch_latest_draw().await;
        assert!(draw.is_mock());
        assert_eq!(draw.draw_number, 1204);
        // Saturday's draw is followed by Monday's
        assert_eq!(draw.draw_date, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
    }

    #[tokio::test]
    async fn test_repeated_unnumbered_latest_keeps_number() {
        let a = FakeSource::new("a", Behavior::Ok(None), SourceTag::PowerballCom);
        let orch = orchestrator(vec![a])
            .with_reconciler(Arc::new(DrawNumberReconciler::with_latest(105)));

        let first = orch.fetch_latest_draw().await;
        let second = orch.fetch_latest_draw().await;
        assert_eq!(first.draw_date, second.draw_date);
        assert_eq!(first.draw_number, 106);
        assert_eq!(second.draw_number, 106);
        assert_eq!(orch.reconciler().latest(), 106);
    }

    #[tokio::test]
    async fn test_unnumbered_latest_matches_earlier_reported_number() {
        let api = FakeSource::new("api", Behavior::Ok(Some(1203)), SourceTag::CaApi);
        let html = FakeSource::new("html", Behavior::Ok(None), SourceTag::PowerballCom);
        let reconciler = Arc::new(DrawNumberReconciler::new());

        let with_api = orchestrator(vec![api]).with_reconciler(Arc::clone(&reconciler));
        assert_eq!(with_api.fetch_latest_draw().await.draw_number, 1203);

        // API down on the next poll; the scraped page shows the same draw
        let html_only = orchestrator(vec![html]).with_reconciler(reconciler);
        assert_eq!(html_only.fetch_latest_draw().await.draw_number, 1203);
    }

    #[tokio::test]
    async fn test_enrichment_and_history_use_their_own_retry_policy() {
        let enricher = FakeSource::new("pb", Behavior::Transient, SourceTag::PowerballCom);
        let history = FakeHistory::new(Vec::new(), true);
        let orch = orchestrator(vec![Arc::new(PartialSource)])
            .with_enrichers(vec![enricher.clone()])
            .with_history_sources(vec![history.clone()])
            .with_history_retry(RetryPolicy::immediate(2));

        let draw = orch.fetch_latest_draw().await;
        assert_eq!(draw.source.to_string(), "ca_web");
        assert_eq!(draw.jackpot_amount, 0.0);
        assert_eq!(enricher.calls(), 1);

        orch.fetch_historical_draws(3).await;
        assert_eq!(history.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_skips_sources() {
        let a = FakeSource::new("a", Behavior::Ok(Some(1203)), SourceTag::CaApi);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let orch = orchestrator(vec![a.clone()]).with_cancellation(cancel);

        let draw = orch.fetch_latest_draw().await;
        assert!(draw.is_mock());
        assert_eq!(a.calls(), 0);
    }

    #[tokio::test]
    async fn test_enrichment_fills_missing_jackpot() {
        let partial = Arc::new(PartialSource);
        let secondary = FakeSource::new("pb", Behavior::Ok(None), SourceTag::PowerballCom);
        let orch = orchestrator(vec![partial]).with_enrichers(vec![secondary.clone()]);

        let draw = orch.fetch_latest_draw().await;
        assert_eq!(draw.draw_number, 1203);
        assert_eq!(draw.jackpot_amount, 100_000_000.0);
        assert_eq!(draw.source.to_string(), "ca_web_enhanced");
        assert_eq!(secondary.calls(), 1);
        // enrichment source never touches the mark
        assert_eq!(orch.reconciler().latest(), 1203);
    }

    struct PartialSource;

    #[async_trait]
    impl DrawSource for PartialSource {
        fn name(&self) -> &'static str {
            "partial"
        }

        async fn fetch(&self) -> Result<RawCandidate, FetchError> {
            let mut c = candidate(Some(1203), 29, SourceTag::CaWeb);
            c.jackpot_amount = 0.0;
            Ok(c)
        }
    }

    #[tokio::test]
    async fn test_history_all_fail_fills_with_mock() {
        let api = FakeHistory::new(Vec::new(), true);
        let orch = orchestrator(Vec::new())
            .with_history_sources(vec![api.clone()])
            .with_reconciler(Arc::new(DrawNumberReconciler::with_latest(2000)));

        let draws = orch.fetch_historical_draws(10).await;
        assert_eq!(draws.len(), 10);
        for (i, draw) in draws.iter().enumerate() {
            assert!(draw.is_mock());
            assert_eq!(draw.source.to_string(), "mock_data");
            assert_eq!(draw.draw_number, 2000 - i as u32);
            assert!(validate_draw(draw).is_ok());
        }
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_history_no_sources_no_mark() {
        let orch = orchestrator(Vec::new());
        let draws = orch.fetch_historical_draws(4).await;
        let numbers: Vec<u32> = draws.iter().map(|d| d.draw_number).collect();
        assert_eq!(numbers, vec![4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn test_history_api_pages_then_html_then_mock() {
        let api = FakeHistory::new(
            vec![api_page(&[29, 27], Some(1203)), api_page(&[25], Some(1201))],
            false,
        );
        let mut html_page = api_page(&[25, 22, 20], None);
        for c in &mut html_page {
            c.source = SourceTag::PowerballCom;
        }
        let html = FakeHistory::new(vec![html_page], false);

        let orch = orchestrator(Vec::new()).with_history_sources(vec![api.clone(), html.clone()]);
        let draws = orch.fetch_historical_draws(7).await;

        assert_eq!(draws.len(), 7);
        let numbers: Vec<u32> = draws.iter().map(|d| d.draw_number).collect();
        let tags: Vec<String> = draws.iter().map(|d| d.source.to_string()).collect();

        // API: 1203, 1202, 1201; HTML skips the 25th (already seen), numbers 22nd and 20th
        assert_eq!(&numbers[..5], &[1203, 1202, 1201, 1200, 1199]);
        assert_eq!(&tags[..5], &["ca_api", "ca_api", "ca_api", "powerball.com", "powerball.com"]);
        assert_eq!(&numbers[5..], &[1198, 1197]);
        assert!(draws[5..].iter().all(|d| d.is_mock()));
        assert!(draws[5].draw_date < draws[4].draw_date);

        // two real pages plus the terminating empty page
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_history_after_outage_polls_has_unique_numbers() {
        let down = FakeSource::new("down", Behavior::Transient, SourceTag::CaApi);
        let api = FakeHistory::new(vec![api_page(&[29, 27, 25], Some(1203))], false);
        let mut html_page = api_page(&[22, 20], None);
        for c in &mut html_page {
            c.source = SourceTag::PowerballCom;
        }
        let html = FakeHistory::new(vec![html_page], false);
        let orch = orchestrator(vec![down])
            .with_history_sources(vec![api, html])
            .with_reconciler(Arc::new(DrawNumberReconciler::with_latest(1203)));

        orch.fetch_latest_draw().await;
        orch.fetch_latest_draw().await;

        let draws = orch.fetch_historical_draws(5).await;
        let numbered: Vec<(u32, String)> = draws
            .iter()
            .map(|d| (d.draw_number, d.source.to_string()))
            .collect();
        assert_eq!(
            numbered,
            vec![
                (1203, "ca_api".to_string()),
                (1202, "ca_api".to_string()),
                (1201, "ca_api".to_string()),
                (1200, "powerball.com".to_string()),
                (1199, "powerball.com".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_history_numbers_follow_batch_not_higher_mark() {
        let api = FakeHistory::new(vec![api_page(&[29, 27], Some(1203))], false);
        let mut html_page = api_page(&[25, 22], None);
        for c in &mut html_page {
            c.source = SourceTag::PowerballCom;
        }
        let html = FakeHistory::new(vec![html_page], false);
        let orch = orchestrator(Vec::new())
            .with_history_sources(vec![api, html])
            .with_reconciler(Arc::new(DrawNumberReconciler::with_latest(1300)));

        let draws = orch.fetch_historical_draws(6).await;
        let numbers: Vec<u32> = draws.iter().map(|d| d.draw_number).collect();
        assert_eq!(numbers, vec![1203, 1202, 1201, 1200, 1199, 1198]);
        assert!(draws[4..].iter().all(|d| d.is_mock()));
        assert_eq!(orch.reconciler().latest(), 1300);
    }

    #[tokio::test]
    async fn test_history_partial_page_failure_keeps_collected() {
        let api = FakeHistory::new(vec![api_page(&[29, 27], Some(1203))], true);
        let orch = orchestrator(Vec::new()).with_history_sources(vec![api]);

        let draws = orch.fetch_historical_draws(5).await;
        assert_eq!(draws.len(), 5);
        assert_eq!(draws[0].draw_number, 1203);
        assert_eq!(draws[1].draw_number, 1202);
        assert!(!draws[1].is_mock());
        assert!(draws[2..].iter().all(|d| d.is_mock()));
        assert_eq!(draws[2].draw_number, 1201);
    }

    #[tokio::test]
    async fn test_history_stops_at_count() {
        let api = FakeHistory::new(
            vec![api_page(&[29, 27, 25], Some(1203)), api_page(&[22], Some(1200))],
            false,
        );
        let orch = orchestrator(Vec::new()).with_history_sources(vec![api.clone()]);

        let draws = orch.fetch_historical_draws(2).await;
        assert_eq!(draws.len(), 2);
        assert!(draws.iter().all(|d| !d.is_mock()));
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_latest_fetches_agree_on_number() {
        let a = FakeSource::new("a", Behavior::Ok(None), SourceTag::PowerballCom);
        let orch = Arc::new(
            orchestrator(vec![a]).with_reconciler(Arc::new(DrawNumberReconciler::with_latest(50))),
        );

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let orch = Arc::clone(&orch);
                tokio::spawn(async move { orch.fetch_latest_draw().await.draw_number })
            })
            .collect();

        let mut numbers = Vec::new();
        for h in handles {
            numbers.push(h.await.unwrap());
        }
        // every call saw the same draw, so one number is handed out
        assert_eq!(numbers, vec![51; 10]);
        assert_eq!(orch.reconciler().latest(), 51);
    }
}
