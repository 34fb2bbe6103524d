//! Record extraction
//!
//! This module turns a results view into records:
//! - Locating the record container with an ordered strategy chain
//! - Deriving column headers (explicit header, leading keyword row, or defaults)
//! - Skipping decorative rows and header rows repeated mid-table
//! - Decoding cells positionally, with `<field>_link` entries for hyperlinks
//! - Reading page-level facts (title, claimed totals, printed page count)
//!
//! Extraction never fails: structures it cannot make sense of produce no records.

mod locate;
mod record;
mod summary;

pub use locate::{count_rows, LocateStrategy};
pub use record::Record;
pub use summary::{claimed_total, has_record_count, printed_page_count, PageSummary};

pub(crate) use summary::document_text;

use crate::config::{Config, VocabularyConfig};
use crate::provider::View;
use locate::{detached_header, RawRow};
use scraper::Html;
use url::Url;

/// Extracts records from results views
///
/// The extractor remembers which location strategy found the last container
/// and tries it first on the next page; a miss invalidates it.
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    vocabulary: VocabularyConfig,
    base: Option<Url>,
    preferred: Option<LocateStrategy>,
}

impl RecordExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            vocabulary: config.vocabulary.clone(),
            base: Url::parse(&config.target.base_location).ok(),
            preferred: None,
        }
    }

    /// The strategy that found the last container, if any
    pub fn preferred_strategy(&self) -> Option<LocateStrategy> {
        self.preferred
    }

    /// Extracts the records of a view
    ///
    /// # Arguments
    ///
    /// * `view` - The results view
    /// * `page` - Page index stamped on every record
    ///
    /// # Returns
    ///
    /// The decoded records, empty when no container was found
    pub fn extract(&mut self, view: &View, page: u32) -> Vec<Record> {
        let document = Html::parse_document(&view.content);

        let Some((strategy, rows)) = self.locate(&document) else {
            tracing::debug!("No record container found on page {}", page);
            return Vec::new();
        };

        let mut rows = rows.into_iter().peekable();
        let explicit: Vec<RawRow> = std::iter::from_fn(|| rows.next_if(|row| row.in_header)).collect();

        let headers = match explicit.into_iter().next().or_else(|| detached_header(&document)) {
            Some(header) => header.texts().iter().map(|t| t.to_string()).collect(),
            None => match rows.peek() {
                Some(first) if self.is_leading_header(first) => {
                    let header: Vec<String> = first.texts().iter().map(|t| t.to_string()).collect();
                    rows.next();
                    header
                }
                _ => self.vocabulary.default_headers.clone(),
            },
        };

        let mut records = Vec::new();
        let mut skipped_headers = 0;

        for row in rows {
            if row.in_header || row.non_empty_cells() < 2 {
                continue;
            }

            if self.is_repeated_header(&row) {
                skipped_headers += 1;
                continue;
            }

            let record = self.decode(&row, &headers, page);
            if !record.is_empty() {
                records.push(record);
            }
        }

        tracing::debug!(
            "Extracted {} records from page {} via {:?} ({} repeated headers skipped)",
            records.len(),
            page,
            strategy,
            skipped_headers
        );

        records
    }

    /// Runs the strategy chain, preferred strategy first
    fn locate(&mut self, document: &Html) -> Option<(LocateStrategy, Vec<RawRow>)> {
        if let Some(preferred) = self.preferred {
            if let Some(rows) = preferred.rows(document) {
                return Some((preferred, rows));
            }
            tracing::debug!("Cached strategy {:?} missed, invalidating", preferred);
            self.preferred = None;
        }

        let found = LocateStrategy::CHAIN
            .iter()
            .find_map(|strategy| strategy.rows(document).map(|rows| (*strategy, rows)));

        self.preferred = found.as_ref().map(|(strategy, _)| *strategy);
        found
    }

    fn is_short(&self, row: &RawRow) -> bool {
        row.cells
            .iter()
            .all(|cell| cell.text.chars().count() < self.vocabulary.max_header_cell_len)
    }

    /// A leading row that names columns instead of holding data
    fn is_leading_header(&self, row: &RawRow) -> bool {
        let text = row.texts().join(" ");
        let names_columns = self
            .vocabulary
            .primary_header_keywords
            .iter()
            .any(|keyword| text.contains(keyword.as_str()));

        names_columns && !row.has_link() && self.is_short(row)
    }

    /// A header row re-rendered inside the data
    ///
    /// All three must hold: at least 3 keyword matches, no links, short cells.
    fn is_repeated_header(&self, row: &RawRow) -> bool {
        let text = row.texts().join(" ");
        let matches = self
            .vocabulary
            .header_keywords
            .iter()
            .filter(|keyword| text.contains(keyword.as_str()))
            .count();

        matches >= 3 && !row.has_link() && self.is_short(row)
    }

    fn field_name(&self, headers: &[String], index: usize) -> String {
        match headers.get(index) {
            Some(header) if !header.is_empty() => header.clone(),
            _ => format!("{}{}", self.vocabulary.positional_prefix, index + 1),
        }
    }

    fn resolve_link(&self, href: &str) -> String {
        match &self.base {
            Some(base) => base
                .join(href)
                .map(|url| url.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }

    fn decode(&self, row: &RawRow, headers: &[String], page: u32) -> Record {
        let mut record = Record::new(page);

        for (index, cell) in row.cells.iter().enumerate() {
            let name = self.field_name(headers, index);

            if !cell.text.is_empty() {
                record.insert(name.clone(), cell.text.clone());
            }

            if let Some(href) = &cell.link {
                record.insert(
                    format!("{}{}", name, self.vocabulary.link_suffix),
                    self.resolve_link(href),
                );
            }
        }

        record
    }
}
