//! Crawler module for paginated harvesting
//!
//! This module contains the core crawl loop and its collaborators:
//! - Waiting out verification gates
//! - Deduplicating records within and across pages
//! - Reading pagination controls and advancing pages
//! - Overall session coordination

mod dedup;
mod gate;
mod pager;
mod pagination;
mod session;

pub use dedup::{Deduplicator, Fingerprint, PageAdmission};
pub use gate::GateWaiter;
pub use pager::Pager;
pub use pagination::{NextControl, PaginationSnapshot};
pub use session::CrawlSession;

use crate::config::Config;
use crate::output::CrawlResult;
use crate::provider::ViewProvider;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl
///
/// This is the main entry point for a harvest. It will:
/// 1. Open the base location
/// 2. Wait out any verification gate
/// 3. Extract and deduplicate records page by page
/// 4. Advance until no further page is reachable
///
/// # Arguments
///
/// * `config` - The harvest configuration
/// * `provider` - The view provider to drive
/// * `cancel` - Stops the crawl when cancelled
///
/// # Returns
///
/// The crawl result; aborted crawls still carry every record gathered.
pub async fn harvest<P: ViewProvider>(
    config: Config,
    provider: P,
    cancel: CancellationToken,
) -> CrawlResult {
    CrawlSession::new(config, provider)
        .with_cancellation(cancel)
        .run()
        .await
}
