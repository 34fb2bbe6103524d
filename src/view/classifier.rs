use super::location::{is_login_location, is_results_location};
use super::ViewKind;
use crate::config::Config;
use crate::extract::has_record_count;
use crate::provider::View;
use scraper::{Html, Selector};

/// Classifies views as gate, results or other
///
/// Classification runs in the following priority order:
/// 1. Login locations (always `Other`)
/// 2. Results locations (always `Results`, whatever the content says)
/// 3. Challenge vocabulary or a challenge widget without results evidence (`Gate`)
/// 4. `Other`
///
/// Results evidence is a data row (`table tr td`) or a record-count phrase.
/// Challenge words legitimately show up inside loaded result data, which is why
/// the location wins ties.
#[derive(Debug, Clone)]
pub struct ViewClassifier {
    results_pattern: String,
    login_pattern: String,
    challenge_keywords: Vec<String>,
    challenge_selectors: Vec<Selector>,
    data_row: Option<Selector>,
}

impl ViewClassifier {
    pub fn new(config: &Config) -> Self {
        let challenge_keywords = config
            .vocabulary
            .challenge_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        let challenge_selectors = config
            .selectors
            .challenge
            .iter()
            .filter_map(|css| Selector::parse(css).ok())
            .collect();

        Self {
            results_pattern: config.target.results_pattern.clone(),
            login_pattern: config.target.login_pattern.clone(),
            challenge_keywords,
            challenge_selectors,
            data_row: Selector::parse("table tr td").ok(),
        }
    }

    /// Classifies a view
    ///
    /// # Arguments
    ///
    /// * `view` - The snapshot to classify
    ///
    /// # Returns
    ///
    /// The kind of the view
    pub fn classify(&self, view: &View) -> ViewKind {
        if is_login_location(&view.location, &self.login_pattern) {
            return ViewKind::Other;
        }

        if is_results_location(&view.location, &self.results_pattern) {
            return ViewKind::Results;
        }

        if self.shows_challenge(&view.content) {
            ViewKind::Gate
        } else {
            ViewKind::Other
        }
    }

    fn shows_challenge(&self, content: &str) -> bool {
        let lowered = content.to_lowercase();
        let has_keyword = self
            .challenge_keywords
            .iter()
            .any(|keyword| lowered.contains(keyword.as_str()));

        let document = Html::parse_document(content);
        let has_widget = self
            .challenge_selectors
            .iter()
            .any(|selector| document.select(selector).next().is_some());

        if !has_keyword && !has_widget {
            return false;
        }

        let has_rows = self
            .data_row
            .as_ref()
            .is_some_and(|selector| document.select(selector).next().is_some());

        !has_rows && !has_record_count(&crate::extract::document_text(&document))
    }
}
