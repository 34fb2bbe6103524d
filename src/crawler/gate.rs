//! Verification gate waiting
//!
//! A gate is left to a human (or an external solver); this module only
//! watches the provider until the gate has been gone long enough to trust.

use crate::provider::ViewProvider;
use crate::view::{ViewClassifier, ViewKind};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Log progress every this many polls
const PROGRESS_EVERY: u32 = 5;

/// Waits for verification gates to clear
#[derive(Debug, Clone)]
pub struct GateWaiter {
    classifier: ViewClassifier,
    base_location: String,
    poll_interval: Duration,
    required_clears: u32,
    cancel: CancellationToken,
}

impl GateWaiter {
    pub fn new(
        classifier: ViewClassifier,
        base_location: impl Into<String>,
        poll_interval: Duration,
        required_clears: u32,
    ) -> Self {
        Self {
            classifier,
            base_location: base_location.into(),
            poll_interval,
            required_clears: required_clears.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Stops waiting as soon as `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Polls the provider until the gate clears or `timeout` elapses
    ///
    /// A single non-gate reading is not trusted: `required_clears` consecutive
    /// non-gate polls are needed, and any gate reading resets the count.
    /// The first provider failure triggers one reload of the base location;
    /// polling continues after it, whether or not the reload worked.
    ///
    /// # Returns
    ///
    /// * `true` - The gate cleared
    /// * `false` - The timeout elapsed or the wait was cancelled
    pub async fn wait_for_clear(&self, provider: &mut dyn ViewProvider, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut clears = 0;
        let mut polls = 0;
        let mut recovered = false;

        tracing::info!(
            "Waiting up to {:?} for the verification gate to clear",
            timeout
        );

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Gate wait cancelled after {} polls", polls);
                return false;
            }

            if Instant::now() >= deadline {
                tracing::warn!("Verification gate still present after {:?}", timeout);
                return false;
            }

            polls += 1;
            match provider.current_view().await {
                Ok(view) => {
                    if self.classifier.classify(&view) == ViewKind::Gate {
                        clears = 0;
                    } else {
                        clears += 1;
                        tracing::debug!("Gate not seen ({}/{})", clears, self.required_clears);
                        if clears >= self.required_clears {
                            tracing::info!("Verification gate cleared after {} polls", polls);
                            return true;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Provider failed during gate wait: {}", e);
                    clears = 0;
                    if !recovered {
                        recovered = true;
                        if let Err(e) = provider.navigate(&self.base_location).await {
                            tracing::warn!("Reloading {} failed: {}", self.base_location, e);
                        }
                    }
                }
            }

            if polls % PROGRESS_EVERY == 0 {
                let remaining = deadline.saturating_duration_since(Instant::now());
                tracing::info!(
                    "Still waiting for verification ({} polls, {}s left)",
                    polls,
                    remaining.as_secs()
                );
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}
