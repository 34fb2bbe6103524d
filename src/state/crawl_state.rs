/// Crawl state machine definitions
///
/// This module defines the states a crawl moves through and how it ends.
use serde::{Serialize, Serializer};
use std::fmt;

/// Why a crawl stopped before running out of pages
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbortReason {
    /// A verification gate did not clear within the timeout
    VerificationTimeout,

    /// The provider session was lost and recovery failed
    ProviderUnavailable(String),

    /// Repeated advance failures while a known page count was unmet
    AdvanceExhausted,

    /// The crawl was cancelled by the user or shutdown
    Cancelled,
}

impl AbortReason {
    /// Short machine-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerificationTimeout => "verification_timeout",
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::AdvanceExhausted => "advance_exhausted",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderUnavailable(message) => write!(f, "{} ({})", self.as_str(), message),
            _ => write!(f, "{}", self.as_str()),
        }
    }
}

/// The final status of a crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlStatus {
    /// No further pages were reachable, or a page cap was hit
    Completed,

    /// The crawl stopped early; gathered records are still returned
    Aborted(AbortReason),
}

impl CrawlStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match self {
            Self::Aborted(reason) => Some(reason),
            Self::Completed => None,
        }
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

impl Serialize for CrawlStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Represents where the crawl loop currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlState {
    // ===== Active States =====
    /// Obtaining and classifying the first view
    Initializing,

    /// Waiting for a verification gate to clear
    Gating,

    /// Waiting for an unrelated view to turn into results
    AwaitingResults,

    /// Reading records from the current page
    Extracting,

    /// Moving to the next page
    Advancing,

    // ===== Terminal States =====
    Completed,

    Aborted(AbortReason),
}

impl CrawlState {
    /// Returns true if the loop has nothing left to do
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted(_))
    }

    /// Converts a terminal state into the crawl's status
    ///
    /// Returns None for active states.
    pub fn status(&self) -> Option<CrawlStatus> {
        match self {
            Self::Completed => Some(CrawlStatus::Completed),
            Self::Aborted(reason) => Some(CrawlStatus::Aborted(reason.clone())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Gating => "gating",
            Self::AwaitingResults => "awaiting_results",
            Self::Extracting => "extracting",
            Self::Advancing => "advancing",
            Self::Completed => "completed",
            Self::Aborted(_) => "aborted",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted(reason) => write!(f, "aborted ({})", reason),
            _ => write!(f, "{}", self.as_str()),
        }
    }
}
