//! Console statistics
//!
//! Prints a crawl result's metadata and counters in a formatted manner.

use crate::output::traits::{CrawlResult, CrawlStats};

/// Prints statistics to stdout
///
/// # Arguments
///
/// * `result` - The crawl result to summarize
pub fn print_statistics(result: &CrawlResult) {
    print!("{}", format_statistics(result));
}

/// Formats the statistics block printed by [`print_statistics`]
pub fn format_statistics(result: &CrawlResult) -> String {
    let metadata = &result.metadata;
    let stats = &result.stats;
    let mut out = String::new();

    out.push_str("=== Harvest Statistics ===\n\n");

    out.push_str("Overview:\n");
    out.push_str(&format!("  Title: {}\n", metadata.title));
    out.push_str(&format!("  Status: {}\n", metadata.status));
    out.push_str(&format!("  Last location: {}\n", metadata.location));
    out.push_str(&format!(
        "  Finished at: {}\n",
        metadata.crawl_time.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push('\n');

    out.push_str("Records:\n");
    out.push_str(&format!("  Harvested: {}\n", metadata.total_results));
    match metadata.total_results_claimed {
        Some(claimed) => out.push_str(&format!(
            "  Claimed by site: {} ({:.1}% covered)\n",
            claimed,
            coverage(metadata.total_results, claimed)
        )),
        None => out.push_str("  Claimed by site: unknown\n"),
    }
    out.push_str(&format!("  Extracted: {}\n", stats.records_extracted));
    out.push_str(&format!("  Duplicates discarded: {}\n", stats.duplicates_discarded));
    out.push('\n');

    out.push_str("Pages:\n");
    let total = metadata
        .total_pages
        .map(|pages| pages.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    out.push_str(&format!("  Committed: {} of {}\n", stats.pages_committed, total));
    push_counters(&mut out, stats);

    out
}

fn push_counters(out: &mut String, stats: &CrawlStats) {
    for (label, count) in [
        ("Stale re-reads", stats.stale_rereads),
        ("Advance failures", stats.advance_failures),
        ("Gate waits", stats.gate_waits),
    ] {
        if count > 0 {
            out.push_str(&format!("  {}: {}\n", label, count));
        }
    }
}

fn coverage(harvested: usize, claimed: u64) -> f64 {
    if claimed == 0 {
        return 0.0;
    }
    (harvested as f64 / claimed as f64) * 100.0
}
