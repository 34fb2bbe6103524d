//! Output handler traits and types
//!
//! This module defines the crawl result handed to sinks and the trait
//! interface sinks implement.

use crate::extract::Record;
use crate::state::CrawlStatus;
use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Counters gathered while crawling
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    /// Pages whose records were committed
    pub pages_committed: u32,

    /// Records extracted from committed pages, duplicates included
    pub records_extracted: usize,

    /// Records discarded as duplicates
    pub duplicates_discarded: usize,

    /// Pages that redelivered the previous page's records
    pub stale_rereads: u32,

    /// Advances that did not reach a new page
    pub advance_failures: u32,

    /// Times a verification gate had to be waited out
    pub gate_waits: u32,
}

/// Descriptive metadata of a crawl
#[derive(Debug, Clone, Serialize)]
pub struct CrawlMetadata {
    pub title: String,
    pub status: CrawlStatus,

    /// Number of records gathered
    pub total_results: usize,

    /// Total the site claims to hold, when printed
    pub total_results_claimed: Option<u64>,

    pub total_pages: Option<u32>,

    /// Last location the crawl saw
    pub location: String,

    pub crawl_time: DateTime<Local>,
}

/// Everything a crawl produced
///
/// Returned for completed and aborted crawls alike; `metadata.status`
/// tells them apart.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult {
    pub metadata: CrawlMetadata,
    pub records: Vec<Record>,

    #[serde(skip)]
    pub stats: CrawlStats,
}

impl CrawlResult {
    pub fn status(&self) -> &CrawlStatus {
        &self.metadata.status
    }

    pub fn is_completed(&self) -> bool {
        self.metadata.status.is_completed()
    }
}

/// Trait for output handlers
///
/// Output handlers persist a finished crawl's result.
pub trait OutputHandler {
    /// Writes the result
    ///
    /// # Arguments
    ///
    /// * `result` - The crawl result, completed or aborted
    fn write(&self, result: &CrawlResult) -> OutputResult<()>;

    /// Human-readable description of where output goes
    fn destination(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AbortReason;

    fn create_test_result(status: CrawlStatus) -> CrawlResult {
        CrawlResult {
            metadata: CrawlMetadata {
                title: "企知道".to_string(),
                status,
                total_results: 1,
                total_results_claimed: Some(40),
                total_pages: Some(2),
                location: "https://example.com/batch-query-result?page=2".to_string(),
                crawl_time: Local::now(),
            },
            records: vec![Record::from_pairs(1, [("企业名称", "甲公司")])],
            stats: CrawlStats::default(),
        }
    }

    #[test]
    fn test_result_serializes_metadata_and_records() {
        let result = create_test_result(CrawlStatus::Completed);
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["metadata"]["status"], "completed");
        assert_eq!(value["metadata"]["total_results_claimed"], 40);
        assert_eq!(value["metadata"]["total_pages"], 2);
        assert_eq!(value["records"][0]["企业名称"], "甲公司");
        assert_eq!(value["records"][0]["page"], 1);
        assert!(value.get("stats").is_none());
    }

    #[test]
    fn test_aborted_status_serialized() {
        let result = create_test_result(CrawlStatus::Aborted(AbortReason::VerificationTimeout));
        let value = serde_json::to_value(&result).unwrap();

        assert!(!result.is_completed());
        assert_eq!(value["metadata"]["status"], "aborted: verification_timeout");
    }
}
