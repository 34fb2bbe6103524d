use crate::crawler::Fingerprint;
use crate::extract::Record;
use std::collections::{BTreeSet, HashSet};

/// Mutable data owned by one crawl
///
/// - `current_page` starts at 1 and only changes through the pager
/// - a page enters `visited` once its records (possibly none) are committed
/// - `seen` fingerprints are never removed
#[derive(Debug, Clone)]
pub struct SessionState {
    current_page: u32,
    total_pages: Option<u32>,
    claimed_total: Option<u64>,
    title: Option<String>,
    visited: BTreeSet<u32>,
    skipped: BTreeSet<u32>,
    seen: HashSet<Fingerprint>,
    last_admitted: Option<Fingerprint>,
    records: Vec<Record>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            current_page: 1,
            total_pages: None,
            claimed_total: None,
            title: None,
            visited: BTreeSet::new(),
            skipped: BTreeSet::new(),
            seen: HashSet::new(),
            last_admitted: None,
            records: Vec::new(),
        }
    }

    /// State of a session picked up at `current_page` with `visited` already committed
    pub fn resumed_at(current_page: u32, visited: impl IntoIterator<Item = u32>) -> Self {
        Self {
            current_page: current_page.max(1),
            visited: visited.into_iter().collect(),
            ..Self::new()
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub(crate) fn set_current_page(&mut self, page: u32) {
        self.current_page = page.max(1);
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    /// Records a known page count; a known count is never lowered
    pub fn note_total_pages(&mut self, pages: u32) {
        if pages > 0 && self.total_pages.map_or(true, |known| pages > known) {
            self.total_pages = Some(pages);
        }
    }

    pub fn claimed_total(&self) -> Option<u64> {
        self.claimed_total
    }

    pub fn note_claimed_total(&mut self, total: u64) {
        if self.claimed_total.map_or(true, |known| total > known) {
            self.claimed_total = Some(total);
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Keeps the first title seen
    pub fn note_title(&mut self, title: &str) {
        if self.title.is_none() && !title.trim().is_empty() {
            self.title = Some(title.trim().to_string());
        }
    }

    /// Returns true once the known page count has been reached
    pub fn reached_last_page(&self) -> bool {
        self.total_pages
            .is_some_and(|total| self.current_page >= total)
    }

    pub fn is_visited(&self, page: u32) -> bool {
        self.visited.contains(&page)
    }

    /// Pages that were abandoned after repeated stale re-reads
    pub fn is_skipped(&self, page: u32) -> bool {
        self.skipped.contains(&page)
    }

    pub fn visited_pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.visited.iter().copied()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub(crate) fn mark_visited(&mut self, page: u32) {
        self.visited.insert(page);
    }

    pub(crate) fn mark_skipped(&mut self, page: u32) {
        self.skipped.insert(page);
    }

    pub fn has_seen(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains(fingerprint)
    }

    /// Fingerprint of the most recently admitted record
    pub fn last_admitted(&self) -> Option<&Fingerprint> {
        self.last_admitted.as_ref()
    }

    /// Appends a record, registering its fingerprint when it has one
    pub(crate) fn push_record(&mut self, record: Record, fingerprint: Option<Fingerprint>) {
        if let Some(fingerprint) = fingerprint {
            self.seen.insert(fingerprint.clone());
            self.last_admitted = Some(fingerprint);
        } else {
            self.last_admitted = None;
        }
        self.records.push(record);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session() {
        let state = SessionState::new();
        assert_eq!(state.current_page(), 1);
        assert_eq!(state.total_pages(), None);
        assert_eq!(state.visited_count(), 0);
        assert!(!state.reached_last_page());
    }

    #[test]
    fn test_resumed_session() {
        let state = SessionState::resumed_at(5, [5, 6, 7]);
        assert_eq!(state.current_page(), 5);
        assert!(state.is_visited(6));
        assert!(!state.is_visited(8));
        assert_eq!(state.record_count(), 0);
    }

    #[test]
    fn test_total_pages_never_lowered() {
        let mut state = SessionState::new();
        state.note_total_pages(7);
        state.note_total_pages(5);
        assert_eq!(state.total_pages(), Some(7));
        state.note_total_pages(9);
        assert_eq!(state.total_pages(), Some(9));
        state.note_total_pages(0);
        assert_eq!(state.total_pages(), Some(9));
    }

    #[test]
    fn test_reached_last_page() {
        let mut state = SessionState::new();
        state.note_total_pages(2);
        assert!(!state.reached_last_page());
        state.set_current_page(2);
        assert!(state.reached_last_page());
    }

    #[test]
    fn test_first_title_wins() {
        let mut state = SessionState::new();
        state.note_title("  ");
        state.note_title("结果");
        state.note_title("其他");
        assert_eq!(state.title(), Some("结果"));
    }

    #[test]
    fn test_push_record_tracks_fingerprints() {
        let mut state = SessionState::new();
        let fingerprint = Fingerprint::Identifier("91110000X".to_string());

        state.push_record(Record::new(1), Some(fingerprint.clone()));
        assert!(state.has_seen(&fingerprint));
        assert_eq!(state.last_admitted(), Some(&fingerprint));

        state.push_record(Record::new(1), None);
        assert_eq!(state.last_admitted(), None);
        assert!(state.has_seen(&fingerprint));
        assert_eq!(state.record_count(), 2);
    }

    #[test]
    fn test_visited_pages_sorted() {
        let mut state = SessionState::new();
        state.mark_visited(3);
        state.mark_visited(1);
        state.mark_visited(3);
        assert_eq!(state.visited_pages().collect::<Vec<_>>(), vec![1, 3]);
        assert!(state.is_visited(1));
        assert!(!state.is_visited(2));
    }
}
