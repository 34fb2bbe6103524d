//! Page advancing
//!
//! The pager moves the session to its next page:
//! - Stall guard: a target that was already visited is skipped by scanning
//!   forward for an unvisited page the pagination control exposes
//! - Interactive strategy: click the target's number control, or the "next"
//!   control when the target is not rendered, then verify the active page
//!   and that the table repopulated
//! - Fallback strategy: rewrite the location's page parameter and navigate
//! - Regression handling: after any advance the reported active page decides
//!   where the session actually is
//!
//! Only `ProviderError::Unavailable` escapes; every other provider failure is
//! absorbed into the fallback path.

use super::pagination::{NextControl, PaginationSnapshot};
use crate::config::{Config, PagerStrategy, SelectorConfig};
use crate::extract::count_rows;
use crate::provider::{ControlHandle, ControlSpec, ViewProvider};
use crate::state::SessionState;
use crate::view::{page_marker, rewrite_page_param, ViewClassifier, ViewKind};
use crate::{ProviderError, ProviderResult};
use std::time::Duration;

/// Outcome of the interactive strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    /// The control reports this page as active
    Landed(u32),
    /// The "next" control is disabled
    NoFurther,
    /// Nothing confirmed the advance
    Unconfirmed,
}

/// Keeps unavailability, turns every other failure into `None`
fn absorb<T>(result: ProviderResult<T>, action: &str) -> Result<Option<T>, ProviderError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_unavailable() => Err(e),
        Err(e) => {
            tracing::debug!("{} failed: {}", action, e);
            Ok(None)
        }
    }
}

/// Advances a session through pages
#[derive(Debug, Clone)]
pub struct Pager {
    strategy: PagerStrategy,
    classifier: ViewClassifier,
    page_param: String,
    selectors: SelectorConfig,
    verify_attempts: u32,
    verify_interval: Duration,
    settle_delay: Duration,
    stall_horizon: u32,
    /// Cached pagination container, re-located when it goes stale
    container: Option<ControlHandle>,
}

impl Pager {
    pub fn new(config: &Config) -> Self {
        Self {
            strategy: config.crawler.strategy,
            classifier: ViewClassifier::new(config),
            page_param: config.target.page_param.clone(),
            selectors: config.selectors.clone(),
            verify_attempts: config.crawler.verify_attempts.max(1),
            verify_interval: config.crawler.verify_interval(),
            settle_delay: config.crawler.settle_delay(),
            stall_horizon: config.crawler.stall_horizon,
            container: None,
        }
    }

    /// Advances to the next page
    ///
    /// # Arguments
    ///
    /// * `provider` - The view provider to drive
    /// * `state` - Session state; its current page is updated on success
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - A new page was reached and `state.current_page()` points at it
    /// * `Ok(false)` - No further page, or the advance could not be made
    /// * `Err(ProviderError::Unavailable)` - The provider session was lost
    pub async fn advance(
        &mut self,
        provider: &mut dyn ViewProvider,
        state: &mut SessionState,
    ) -> Result<bool, ProviderError> {
        let target = state.current_page() + 1;

        if state.is_visited(target) || state.is_skipped(target) {
            return self.skip_ahead(provider, state, target).await;
        }

        tracing::debug!("Advancing from page {} to {}", state.current_page(), target);
        self.go_to(provider, state, target).await
    }

    /// Re-drives the current page after a stale re-read
    ///
    /// Navigates to the current page's location again, since clicking the
    /// active number control usually does nothing.
    pub async fn reload(
        &mut self,
        provider: &mut dyn ViewProvider,
        state: &SessionState,
    ) -> Result<bool, ProviderError> {
        let page = state.current_page();
        tracing::info!("Re-driving page {}", page);
        tokio::time::sleep(self.settle_delay).await;
        Ok(self.rewrite(provider, page).await?.is_some())
    }

    /// Stall guard: jumps to the first unvisited page within the horizon
    async fn skip_ahead(
        &mut self,
        provider: &mut dyn ViewProvider,
        state: &mut SessionState,
        target: u32,
    ) -> Result<bool, ProviderError> {
        let snapshot = self.snapshot(provider).await?;
        let horizon = target.saturating_add(self.stall_horizon);

        let candidate = (target + 1..=horizon)
            .filter(|page| !state.is_visited(*page) && !state.is_skipped(*page))
            .find(|page| match &snapshot {
                Some(snapshot) => snapshot.shows(*page),
                None => true,
            });

        match candidate {
            Some(page) => {
                tracing::info!(
                    "Page {} already visited, jumping to unvisited page {}",
                    target,
                    page
                );
                self.go_to(provider, state, page).await
            }
            None => {
                tracing::info!(
                    "No unvisited page within {} pages after {}, treating crawl as complete",
                    self.stall_horizon,
                    target
                );
                Ok(false)
            }
        }
    }

    async fn go_to(
        &mut self,
        provider: &mut dyn ViewProvider,
        state: &mut SessionState,
        target: u32,
    ) -> Result<bool, ProviderError> {
        if self.strategy == PagerStrategy::Interactive {
            match self.interactive(provider, state, target).await? {
                Attempt::Landed(page) => return self.settle_on(provider, state, page).await,
                Attempt::NoFurther => {
                    tracing::info!(
                        "Next control is disabled, no page after {}",
                        state.current_page()
                    );
                    return Ok(false);
                }
                Attempt::Unconfirmed => {
                    tracing::info!(
                        "Interactive advance to page {} unconfirmed, rewriting location",
                        target
                    );
                }
            }
        }

        match self.rewrite(provider, target).await? {
            Some(page) => self.settle_on(provider, state, page).await,
            None => {
                tracing::warn!("Could not navigate to page {}", target);
                Ok(false)
            }
        }
    }

    /// Reads the reported active page and decides where the session is
    async fn settle_on(
        &mut self,
        provider: &mut dyn ViewProvider,
        state: &mut SessionState,
        expected: u32,
    ) -> Result<bool, ProviderError> {
        let landed = self
            .snapshot(provider)
            .await?
            .and_then(|snapshot| snapshot.active)
            .unwrap_or(expected);

        if state.is_visited(landed) || state.is_skipped(landed) {
            tracing::info!(
                "Control reports page {} which was already handled, no further distinct pages",
                landed
            );
            return Ok(false);
        }

        if landed != expected {
            tracing::info!(
                "Expected page {} but control reports {}, correcting",
                expected,
                landed
            );
        }

        state.set_current_page(landed);
        Ok(true)
    }

    async fn interactive(
        &mut self,
        provider: &mut dyn ViewProvider,
        state: &SessionState,
        target: u32,
    ) -> Result<Attempt, ProviderError> {
        let Some(snapshot) = self.snapshot(provider).await? else {
            tracing::debug!("No pagination control rendered");
            return Ok(Attempt::Unconfirmed);
        };

        if !self.ensure_container(provider, &snapshot.container).await? {
            return Ok(Attempt::Unconfirmed);
        }

        if !snapshot.shows(target) {
            match snapshot.next {
                Some(NextControl::Disabled) => return Ok(Attempt::NoFurther),
                None => return Ok(Attempt::Unconfirmed),
                Some(NextControl::Enabled) => {}
            }

            let before = snapshot.active.unwrap_or(state.current_page());
            tracing::debug!("Page {} not rendered, clicking next", target);
            let next = ControlSpec::css(self.selectors.next_page.clone());
            if !self.click(provider, &next).await? {
                return Ok(Attempt::Unconfirmed);
            }

            return match self.confirm(provider, |active| active > before).await? {
                Some(active) => Ok(Attempt::Landed(active)),
                None => self.location_confirms(provider, target).await,
            };
        }

        let number = ControlSpec::with_text(self.selectors.page_number.clone(), target.to_string());
        if !self.click(provider, &number).await? {
            return Ok(Attempt::Unconfirmed);
        }

        match self.confirm(provider, |active| active == target).await? {
            Some(active) => Ok(Attempt::Landed(active)),
            None => self.location_confirms(provider, target).await,
        }
    }

    /// Accepts an unverified advance when the location carries the target marker
    async fn location_confirms(
        &mut self,
        provider: &mut dyn ViewProvider,
        target: u32,
    ) -> Result<Attempt, ProviderError> {
        let location = absorb(provider.current_location().await, "Reading location")?;

        match location.and_then(|location| page_marker(&location, &self.page_param)) {
            Some(page) if page == target => {
                tracing::debug!("Location marker confirms page {}", target);
                Ok(Attempt::Landed(target))
            }
            _ => Ok(Attempt::Unconfirmed),
        }
    }

    /// Polls until the active page satisfies `accept` and the table has data rows
    async fn confirm<F>(
        &mut self,
        provider: &mut dyn ViewProvider,
        accept: F,
    ) -> Result<Option<u32>, ProviderError>
    where
        F: Fn(u32) -> bool + Send,
    {
        for attempt in 1..=self.verify_attempts {
            if let Some(view) = absorb(provider.current_view().await, "Capturing view")? {
                let active = PaginationSnapshot::parse(&view.content, &self.selectors)
                    .and_then(|snapshot| snapshot.active);
                let rows = count_rows(&view.content);

                match active {
                    Some(active) if accept(active) && rows > 1 => return Ok(Some(active)),
                    _ => tracing::trace!(
                        "Advance not confirmed yet (attempt {}, active {:?}, rows {})",
                        attempt,
                        active,
                        rows
                    ),
                }
            }

            tokio::time::sleep(self.verify_interval).await;
        }

        Ok(None)
    }

    /// Location rewrite: points the page parameter at `target` and navigates
    ///
    /// Acceptance is optimistic: deployments may normalize the location, so a
    /// missing marker after navigation is not a failure. A marker naming another
    /// page (an out-of-range page redirected back) or a view that left the
    /// results altogether (a login bounce) rejects the advance.
    async fn rewrite(
        &mut self,
        provider: &mut dyn ViewProvider,
        target: u32,
    ) -> Result<Option<u32>, ProviderError> {
        let Some(location) = absorb(provider.current_location().await, "Reading location")? else {
            return Ok(None);
        };

        let rewritten = rewrite_page_param(&location, &self.page_param, target);
        tracing::info!("Navigating to page {} via {}", target, rewritten);

        if absorb(provider.navigate(&rewritten).await, "Navigation")?.is_none() {
            return Ok(None);
        }
        self.container = None;
        tokio::time::sleep(self.settle_delay).await;

        let mut settled = None;
        for _ in 0..self.verify_attempts {
            if let Some(view) = absorb(provider.current_view().await, "Capturing view")? {
                let populated = count_rows(&view.content) > 1;
                settled = Some(view);
                if populated {
                    break;
                }
            }
            tokio::time::sleep(self.verify_interval).await;
        }

        let landed = absorb(provider.current_location().await, "Reading location")?
            .unwrap_or(rewritten);

        match page_marker(&landed, &self.page_param) {
            Some(page) if page == target => {
                tracing::debug!("Location confirms page {}", target);
            }
            Some(page) => {
                tracing::warn!(
                    "Asked for page {} but landed on {} (page {}), no such page",
                    target,
                    landed,
                    page
                );
                return Ok(None);
            }
            None => {
                tracing::debug!("Location {} has no page marker, accepting page {}", landed, target);
            }
        }

        if let Some(view) = settled {
            if self.classifier.classify(&view) == ViewKind::Other {
                tracing::warn!(
                    "Navigating to page {} left the results view for {}",
                    target,
                    view.location
                );
                return Ok(None);
            }
        }

        Ok(Some(target))
    }

    /// Locates and activates a control, then lets the view settle
    async fn click(
        &mut self,
        provider: &mut dyn ViewProvider,
        spec: &ControlSpec,
    ) -> Result<bool, ProviderError> {
        let Some(handle) = absorb(provider.locate_control(spec).await, "Locating control")? else {
            return Ok(false);
        };

        if absorb(provider.activate(&handle).await, "Activating control")?.is_none() {
            return Ok(false);
        }

        tokio::time::sleep(self.settle_delay).await;
        Ok(true)
    }

    /// Makes sure a live handle to the pagination container is cached
    async fn ensure_container(
        &mut self,
        provider: &mut dyn ViewProvider,
        css: &str,
    ) -> Result<bool, ProviderError> {
        if let Some(handle) = &self.container {
            if handle.spec.css == css {
                match provider.element_attribute(handle, "class").await {
                    Ok(_) => return Ok(true),
                    Err(e) if e.is_unavailable() => return Err(e),
                    Err(_) => tracing::debug!("Pagination handle went stale, re-locating"),
                }
            }
        }

        self.container = absorb(
            provider.locate_control(&ControlSpec::css(css)).await,
            "Locating pagination",
        )?;
        Ok(self.container.is_some())
    }

    async fn snapshot(
        &self,
        provider: &mut dyn ViewProvider,
    ) -> Result<Option<PaginationSnapshot>, ProviderError> {
        let view = absorb(provider.current_view().await, "Capturing view")?;
        Ok(view.and_then(|view| PaginationSnapshot::parse(&view.content, &self.selectors)))
    }
}
