//! View classification
//!
//! This module decides what kind of view the provider is showing and hosts
//! the location conventions the rest of the crate relies on.

mod classifier;
mod location;

pub use classifier::ViewClassifier;
pub use location::{is_login_location, is_results_location, page_marker, rewrite_page_param};

use std::fmt;

/// What a view is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// A human-verification challenge stands between the session and the results
    Gate,

    /// The paginated record table
    Results,

    /// Anything else (landing pages, login pages, transient states)
    Other,
}

impl ViewKind {
    /// Returns true if records can be read from this view
    pub fn is_results(&self) -> bool {
        matches!(self, Self::Results)
    }

    /// Returns true if progress must wait for a human
    pub fn is_gate(&self) -> bool {
        matches!(self, Self::Gate)
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gate => "gate",
            Self::Results => "results",
            Self::Other => "other",
        };
        write!(f, "{}", name)
    }
}
