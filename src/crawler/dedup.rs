//! Record deduplication
//!
//! Records are identified by a fingerprint built from business-identity
//! fields, in this order of preference:
//! 1. The stable identifier (e.g. unified social credit code)
//! 2. The entity name
//! 3. Sequence number plus the first name-like field
//!
//! Records without any of these cannot be deduplicated and are always admitted.

use crate::config::VocabularyConfig;
use crate::extract::Record;
use crate::state::SessionState;

/// Deterministic identity of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fingerprint {
    Identifier(String),
    Name(String),
    Composite { sequence: String, name: String },
}

/// Outcome of admitting one page of records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAdmission {
    /// The page repeats the previous page; nothing was committed
    Stale,

    /// Records were committed
    Committed { admitted: usize, duplicates: usize },
}

/// Suppresses records already seen within and across pages
#[derive(Debug, Clone)]
pub struct Deduplicator {
    identifier_field: String,
    name_field: String,
    sequence_field: String,
    name_hint: String,
    link_suffix: String,
}

impl Deduplicator {
    pub fn new(vocabulary: &VocabularyConfig) -> Self {
        Self {
            identifier_field: vocabulary.identifier_field.clone(),
            name_field: vocabulary.name_field.clone(),
            sequence_field: vocabulary.sequence_field.clone(),
            name_hint: vocabulary.name_hint.clone(),
            link_suffix: vocabulary.link_suffix.clone(),
        }
    }

    /// Computes the fingerprint of a record
    ///
    /// # Returns
    ///
    /// * `Some(Fingerprint)` - The record carries an identity field
    /// * `None` - The record cannot be deduplicated
    pub fn fingerprint(&self, record: &Record) -> Option<Fingerprint> {
        let value = |name: &str| {
            record
                .get(name)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        if let Some(identifier) = value(&self.identifier_field) {
            return Some(Fingerprint::Identifier(identifier));
        }

        if let Some(name) = value(&self.name_field) {
            return Some(Fingerprint::Name(name));
        }

        let sequence = value(&self.sequence_field)?;
        let name = record
            .fields()
            .filter(|(field, _)| {
                field.contains(self.name_hint.as_str()) && !field.ends_with(self.link_suffix.as_str())
            })
            .map(|(_, value)| value.trim())
            .find(|value| !value.is_empty())?;

        Some(Fingerprint::Composite {
            sequence,
            name: name.to_string(),
        })
    }

    /// Admits a single record into the session
    ///
    /// # Returns
    ///
    /// * `true` - The record was novel and has been appended
    /// * `false` - The record duplicated an earlier one and was discarded
    pub fn admit(&self, record: Record, state: &mut SessionState) -> bool {
        let fingerprint = self.fingerprint(&record);

        if let Some(fingerprint) = &fingerprint {
            if state.has_seen(fingerprint) {
                tracing::debug!("Discarding duplicate record {:?}", fingerprint);
                return false;
            }
        }

        state.push_record(record, fingerprint);
        true
    }

    /// Returns true if a page's records are a re-read of the previous page
    ///
    /// The page is stale when its first record matches the last admitted one.
    pub fn is_stale_page(&self, candidates: &[Record], state: &SessionState) -> bool {
        let Some(last) = state.last_admitted() else {
            return false;
        };

        candidates
            .first()
            .and_then(|first| self.fingerprint(first))
            .is_some_and(|first| first == *last)
    }

    /// Admits a whole page of records
    ///
    /// A stale page is rejected as a whole and leaves the session untouched.
    pub fn admit_page(&self, records: Vec<Record>, state: &mut SessionState) -> PageAdmission {
        if self.is_stale_page(&records, state) {
            return PageAdmission::Stale;
        }

        let total = records.len();
        let admitted = records
            .into_iter()
            .map(|record| self.admit(record, state))
            .filter(|admitted| *admitted)
            .count();

        PageAdmission::Committed {
            admitted,
            duplicates: total - admitted,
        }
    }
}
