//! Output module for crawl results
//!
//! This module handles:
//! - The crawl result structure handed to sinks
//! - Writing results as JSON
//! - Printing crawl statistics to the console

mod json;
pub mod stats;
mod traits;

pub use json::{default_output_path, JsonOutputHandler};
pub use stats::{format_statistics, print_statistics};
pub use traits::{
    CrawlMetadata, CrawlResult, CrawlStats, OutputError, OutputHandler, OutputResult,
};
