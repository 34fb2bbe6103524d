//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: Where the crawl loop is (initializing, gating, extracting, advancing, ...)
//! - `CrawlStatus` / `AbortReason`: How a finished crawl ended
//! - `SessionState`: Current page, known totals, visited pages, seen fingerprints and records

mod crawl_state;
mod session_state;

// Re-export main types
pub use crawl_state::{AbortReason, CrawlState, CrawlStatus};
pub use session_state::SessionState;
