//! Pagination widget parsing
//!
//! Reads what the pagination control currently shows: the rendered page
//! numbers, the active page and the state of the "next" control.

use crate::config::SelectorConfig;
use scraper::{ElementRef, Html, Selector};

/// State of the "next page" control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextControl {
    Enabled,
    Disabled,
}

/// What the pagination control shows at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationSnapshot {
    /// Selector that matched the pagination container
    pub container: String,

    /// Rendered page numbers, ascending
    pub numbers: Vec<u32>,

    /// The page reported as active
    pub active: Option<u32>,

    /// The "next" control, if rendered
    pub next: Option<NextControl>,
}

impl PaginationSnapshot {
    /// Parses the pagination control out of a view's markup
    ///
    /// Container selectors are tried in order; returns None when none match.
    pub fn parse(content: &str, selectors: &SelectorConfig) -> Option<Self> {
        let document = Html::parse_document(content);

        let (container_css, container) = selectors.pagination.iter().find_map(|css| {
            let selector = Selector::parse(css).ok()?;
            document
                .select(&selector)
                .next()
                .map(|element| (css.clone(), element))
        })?;

        let mut numbers: Vec<u32> = match Selector::parse(&selectors.page_number) {
            Ok(number) => container.select(&number).filter_map(|e| page_number(&e)).collect(),
            Err(_) => Vec::new(),
        };

        if numbers.is_empty() {
            // Widgets without number classes: any numeric item or link
            if let Ok(items) = Selector::parse("li, a") {
                numbers = container.select(&items).filter_map(|e| page_number(&e)).collect();
            }
        }

        numbers.sort_unstable();
        numbers.dedup();

        let active = Selector::parse(&selectors.active_page).ok().and_then(|active| {
            container
                .select(&active)
                .find_map(|e| page_number(&e))
                .or_else(|| document.select(&active).find_map(|e| page_number(&e)))
        });

        let next = Selector::parse(&selectors.next_page)
            .ok()
            .and_then(|next| document.select(&next).next())
            .map(|element| {
                if is_disabled(&element) {
                    NextControl::Disabled
                } else {
                    NextControl::Enabled
                }
            });

        Some(Self {
            container: container_css,
            numbers,
            active,
            next,
        })
    }

    /// Returns true if `page` has a rendered number control
    pub fn shows(&self, page: u32) -> bool {
        self.numbers.binary_search(&page).is_ok()
    }

    /// Largest rendered page number
    pub fn max_number(&self) -> Option<u32> {
        self.numbers.last().copied()
    }

    /// Returns true if the "next" control is rendered and disabled
    ///
    /// A missing control proves nothing: the selector may simply not match
    /// this widget.
    pub fn is_at_end(&self) -> bool {
        self.next == Some(NextControl::Disabled)
    }

    /// The last page, when the widget makes it certain
    ///
    /// Only trusted when the "next" control is disabled, so every remaining
    /// page is already rendered.
    pub fn authoritative_last_page(&self) -> Option<u32> {
        if self.is_at_end() {
            self.max_number()
        } else {
            None
        }
    }
}

fn page_number(element: &ElementRef) -> Option<u32> {
    element.text().collect::<String>().trim().parse().ok()
}

fn is_disabled(element: &ElementRef) -> bool {
    let value = element.value();
    value.attr("disabled").is_some()
        || value.attr("aria-disabled") == Some("true")
        || value.attr("class").is_some_and(|class| class.contains("disabled"))
}
