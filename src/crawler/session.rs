//! Crawl session - main crawl orchestration logic
//!
//! This module contains the control loop that coordinates a crawl:
//! - Opening the base location and classifying views
//! - Waiting out verification gates and unrelated views
//! - Extracting, deduplicating and committing each page's records
//! - Advancing through pages until no further page is reachable
//! - Recovering once from a lost provider session
//!
//! Whatever happens, the gathered records are returned with a status.

use super::dedup::{Deduplicator, PageAdmission};
use super::gate::GateWaiter;
use super::pager::Pager;
use super::pagination::PaginationSnapshot;
use crate::config::Config;
use crate::extract::{PageSummary, RecordExtractor};
use crate::output::{CrawlMetadata, CrawlResult, CrawlStats};
use crate::provider::{View, ViewProvider};
use crate::state::{AbortReason, CrawlState, CrawlStatus, SessionState};
use crate::view::{rewrite_page_param, ViewClassifier, ViewKind};
use crate::ProviderError;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Drives one crawl over a view provider
pub struct CrawlSession<P: ViewProvider> {
    config: Config,
    provider: P,
    classifier: ViewClassifier,
    gate: GateWaiter,
    extractor: RecordExtractor,
    dedup: Deduplicator,
    pager: Pager,
    cancel: CancellationToken,
    state: SessionState,
    stats: CrawlStats,
    last_location: Option<String>,
    recovery_used: bool,
    stale_retries: u32,
    stalled_pages: u32,
    advance_failures: u32,
}

impl<P: ViewProvider> CrawlSession<P> {
    /// Creates a session
    ///
    /// # Arguments
    ///
    /// * `config` - The harvest configuration
    /// * `provider` - The view provider to drive
    pub fn new(config: Config, provider: P) -> Self {
        let classifier = ViewClassifier::new(&config);
        let gate = GateWaiter::new(
            classifier.clone(),
            config.target.base_location.clone(),
            config.crawler.gate_poll_interval(),
            config.crawler.gate_required_clears,
        );

        Self {
            extractor: RecordExtractor::new(&config),
            dedup: Deduplicator::new(&config.vocabulary),
            pager: Pager::new(&config),
            classifier,
            gate,
            config,
            provider,
            cancel: CancellationToken::new(),
            state: SessionState::new(),
            stats: CrawlStats::default(),
            last_location: None,
            recovery_used: false,
            stale_retries: 0,
            stalled_pages: 0,
            advance_failures: 0,
        }
    }

    /// Checks `cancel` at every loop iteration and during waits
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.gate = self.gate.with_cancellation(cancel.clone());
        self.cancel = cancel;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn into_provider(self) -> P {
        self.provider
    }

    /// Runs the crawl to a terminal state
    ///
    /// Crawl-level failures are reported through the result's status; the
    /// records gathered so far are always part of the result.
    pub async fn run(&mut self) -> CrawlResult {
        self.reset();
        let started = Instant::now();
        let mut crawl_state = CrawlState::Initializing;

        tracing::info!("Starting harvest at {}", self.config.target.base_location);

        loop {
            if crawl_state.is_terminal() {
                break;
            }

            if self.cancel.is_cancelled() {
                tracing::info!("Harvest cancelled, keeping {} records", self.state.record_count());
                crawl_state = CrawlState::Aborted(AbortReason::Cancelled);
                break;
            }

            let step = match crawl_state {
                CrawlState::Initializing => self.initialize().await,
                CrawlState::Gating => self.gate().await,
                CrawlState::AwaitingResults => self.await_results().await,
                CrawlState::Extracting => self.extract_page().await,
                CrawlState::Advancing => self.advance().await,
                CrawlState::Completed | CrawlState::Aborted(_) => break,
            };

            let next = match step {
                Ok(next) => next,
                Err(e) => self.recover(e).await,
            };

            tracing::debug!("{} -> {}", crawl_state, next);
            crawl_state = next;
        }

        let status = crawl_state.status().unwrap_or(CrawlStatus::Completed);
        match &status {
            CrawlStatus::Completed => tracing::info!(
                "Harvest completed: {} records from {} pages in {:?}",
                self.state.record_count(),
                self.stats.pages_committed,
                started.elapsed()
            ),
            CrawlStatus::Aborted(reason) => tracing::warn!(
                "Harvest aborted ({}): returning {} records from {} pages",
                reason,
                self.state.record_count(),
                self.stats.pages_committed
            ),
        }

        self.finish(status)
    }

    fn reset(&mut self) {
        self.state = SessionState::new();
        self.stats = CrawlStats::default();
        self.last_location = None;
        self.recovery_used = false;
        self.stale_retries = 0;
        self.stalled_pages = 0;
        self.advance_failures = 0;
    }

    fn finish(&mut self, status: CrawlStatus) -> CrawlResult {
        let state = std::mem::take(&mut self.state);

        let metadata = CrawlMetadata {
            title: state
                .title()
                .map(str::to_string)
                .unwrap_or_else(|| self.config.target.title.clone()),
            status,
            total_results: state.record_count(),
            total_results_claimed: state.claimed_total(),
            total_pages: state.total_pages(),
            location: self
                .last_location
                .clone()
                .unwrap_or_else(|| self.config.target.base_location.clone()),
            crawl_time: chrono::Local::now(),
        };

        CrawlResult {
            metadata,
            records: state.into_records(),
            stats: self.stats.clone(),
        }
    }

    /// Sleeps unless cancelled; returns false when cancelled
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    async fn capture(&mut self) -> Result<View, ProviderError> {
        let view = self.provider.current_view().await?;
        self.last_location = Some(view.location.clone());
        Ok(view)
    }

    /// Classifies the current view and picks the state that handles it
    async fn route(&mut self) -> Result<CrawlState, ProviderError> {
        let view = self.capture().await?;
        let kind = self.classifier.classify(&view);
        tracing::debug!("View at {} classified as {}", view.location, kind);

        Ok(match kind {
            ViewKind::Gate => CrawlState::Gating,
            ViewKind::Results => CrawlState::Extracting,
            ViewKind::Other => CrawlState::AwaitingResults,
        })
    }

    /// One recovery per incident: reload the current page's location
    async fn recover(&mut self, error: ProviderError) -> CrawlState {
        if self.recovery_used {
            tracing::error!("Provider failed again after recovery: {}", error);
            return CrawlState::Aborted(AbortReason::ProviderUnavailable(error.to_string()));
        }
        self.recovery_used = true;

        let last = self
            .last_location
            .as_deref()
            .unwrap_or(&self.config.target.base_location);
        let page = self.state.current_page();
        let location = if page > 1 {
            rewrite_page_param(last, &self.config.target.page_param, page)
        } else {
            last.to_string()
        };
        tracing::warn!("Provider failed ({}), reloading {}", error, location);

        let reloaded = match self.provider.navigate(&location).await {
            Ok(()) => self.route().await,
            Err(e) => Err(e),
        };

        reloaded.unwrap_or_else(|e| {
            tracing::error!("Recovery failed: {}", e);
            CrawlState::Aborted(AbortReason::ProviderUnavailable(e.to_string()))
        })
    }

    async fn initialize(&mut self) -> Result<CrawlState, ProviderError> {
        let base = self.config.target.base_location.clone();
        tracing::info!("Opening {}", base);
        self.provider.navigate(&base).await?;
        self.route().await
    }

    async fn gate(&mut self) -> Result<CrawlState, ProviderError> {
        self.stats.gate_waits += 1;
        tracing::info!("Verification required, please complete it in the browser");

        let cleared = self
            .gate
            .wait_for_clear(&mut self.provider, self.config.crawler.gate_timeout())
            .await;

        if self.cancel.is_cancelled() {
            return Ok(CrawlState::Aborted(AbortReason::Cancelled));
        }

        if !cleared {
            return Ok(CrawlState::Aborted(AbortReason::VerificationTimeout));
        }

        self.route().await
    }

    /// Polls an unrelated view until results or a gate show up
    ///
    /// On timeout the page is extracted anyway.
    async fn await_results(&mut self) -> Result<CrawlState, ProviderError> {
        let timeout = self.config.crawler.results_timeout();
        let deadline = Instant::now() + timeout;
        tracing::info!("Waiting up to {:?} for the results view", timeout);

        loop {
            if !self.pause(self.config.crawler.gate_poll_interval()).await {
                return Ok(CrawlState::Aborted(AbortReason::Cancelled));
            }

            let view = self.capture().await?;
            match self.classifier.classify(&view) {
                ViewKind::Results => return Ok(CrawlState::Extracting),
                ViewKind::Gate => return Ok(CrawlState::Gating),
                ViewKind::Other if Instant::now() >= deadline => {
                    tracing::warn!(
                        "No results view after {:?}, extracting from {} anyway",
                        timeout,
                        view.location
                    );
                    return Ok(CrawlState::Extracting);
                }
                ViewKind::Other => {}
            }
        }
    }

    async fn extract_page(&mut self) -> Result<CrawlState, ProviderError> {
        let page = self.state.current_page();
        if self.state.is_visited(page) {
            tracing::debug!("Page {} already committed, skipping extraction", page);
            return Ok(CrawlState::Advancing);
        }

        let view = self.capture().await?;
        self.note_summary(&view);

        let records = self.extractor.extract(&view, page);
        let extracted = records.len();

        match self.dedup.admit_page(records, &mut self.state) {
            PageAdmission::Stale => {
                self.stats.stale_rereads += 1;
                tracing::warn!("Page {} repeats the previous page's records", page);
                self.retry_stale().await
            }
            PageAdmission::Committed {
                admitted,
                duplicates,
            } => {
                self.state.mark_visited(page);
                self.stats.pages_committed += 1;
                self.stats.records_extracted += extracted;
                self.stats.duplicates_discarded += duplicates;
                self.stale_retries = 0;
                self.stalled_pages = 0;
                self.recovery_used = false;

                tracing::info!(
                    "Page {}{}: {} records, {} new, {} duplicates (total {})",
                    page,
                    self.state
                        .total_pages()
                        .map(|total| format!("/{}", total))
                        .unwrap_or_default(),
                    extracted,
                    admitted,
                    duplicates,
                    self.state.record_count()
                );

                Ok(CrawlState::Advancing)
            }
        }
    }

    /// Re-drives a stale page a bounded number of times, then skips it
    async fn retry_stale(&mut self) -> Result<CrawlState, ProviderError> {
        if self.stale_retries < self.config.crawler.max_stale_retries {
            self.stale_retries += 1;
            if self.pager.reload(&mut self.provider, &self.state).await? {
                return self.route().await;
            }
        }

        let page = self.state.current_page();
        self.state.mark_skipped(page);
        self.stale_retries = 0;
        self.stalled_pages += 1;
        tracing::warn!("Page {} kept repeating earlier records, skipping it", page);

        if self.stalled_pages > self.config.crawler.max_advance_failures {
            tracing::info!(
                "{} consecutive pages repeated earlier records, treating crawl as complete",
                self.stalled_pages
            );
            return Ok(CrawlState::Completed);
        }

        Ok(CrawlState::Advancing)
    }

    fn note_summary(&mut self, view: &View) {
        let summary = PageSummary::from_content(&view.content);

        if let Some(title) = &summary.title {
            self.state.note_title(title);
        }

        if let Some(claimed) = summary.claimed_total {
            self.state.note_claimed_total(claimed);
        }

        let pages = summary.total_pages.or_else(|| {
            PaginationSnapshot::parse(&view.content, &self.config.selectors)
                .and_then(|snapshot| snapshot.authoritative_last_page())
        });

        if let Some(pages) = pages {
            let before = self.state.total_pages();
            self.state.note_total_pages(pages);
            if before != self.state.total_pages() {
                tracing::info!("Total pages: {}", pages);
            }
        }
    }

    async fn advance(&mut self) -> Result<CrawlState, ProviderError> {
        let page = self.state.current_page();

        if let Some(max_pages) = self.config.crawler.max_pages {
            if page >= max_pages {
                tracing::info!("Reached page cap of {}", max_pages);
                return Ok(CrawlState::Completed);
            }
        }

        if self.state.reached_last_page() {
            tracing::info!("All {} pages harvested", page);
            return Ok(CrawlState::Completed);
        }

        if self.pager.advance(&mut self.provider, &mut self.state).await? {
            self.advance_failures = 0;
            tracing::info!("Now on page {}", self.state.current_page());
            return self.route().await;
        }

        self.stats.advance_failures += 1;

        match self.state.total_pages() {
            Some(total) if page < total => {
                self.advance_failures += 1;
                if self.advance_failures > self.config.crawler.max_advance_failures {
                    tracing::error!(
                        "Could not get past page {} of {} after {} attempts",
                        page,
                        total,
                        self.advance_failures
                    );
                    return Ok(CrawlState::Aborted(AbortReason::AdvanceExhausted));
                }

                tracing::warn!(
                    "Advance from page {} of {} failed (attempt {}), retrying",
                    page,
                    total,
                    self.advance_failures
                );
                if !self.pause(self.config.crawler.settle_delay()).await {
                    return Ok(CrawlState::Aborted(AbortReason::Cancelled));
                }
                Ok(CrawlState::Advancing)
            }
            _ => {
                tracing::info!("No further page after page {}", page);
                Ok(CrawlState::Completed)
            }
        }
    }
}
