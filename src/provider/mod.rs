//! View providers
//!
//! A view provider owns whatever renders the target site (a browser session,
//! a plain HTTP client, a scripted fixture) and exposes it to the crawl loop as:
//! - snapshots of the current view (location + markup)
//! - navigation to a location
//! - lookup and activation of interactive controls
//!
//! The crawl loop never assumes which rendering technology sits behind it.

mod http;

use crate::ProviderResult;
use async_trait::async_trait;

pub use http::{build_http_client, HttpViewProvider};

/// Immutable snapshot of a rendered view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    /// Location the view was rendered from
    pub location: String,

    /// Rendered markup
    pub content: String,
}

impl View {
    pub fn new(location: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            content: content.into(),
        }
    }
}

/// Describes a control to look up: a CSS selector and an optional exact text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlSpec {
    pub css: String,
    pub text: Option<String>,
}

impl ControlSpec {
    /// Matches the first element selected by `css`
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            text: None,
        }
    }

    /// Matches the first element selected by `css` whose trimmed text equals `text`
    pub fn with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            text: Some(text.into()),
        }
    }
}

/// Opaque reference to a located control
///
/// Handles go stale when the view changes; providers report stale handles
/// as [`crate::ProviderError::NotFound`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlHandle {
    pub id: u64,
    pub spec: ControlSpec,
}

/// The rendering collaborator driven by the crawl loop
#[async_trait]
pub trait ViewProvider: Send {
    /// Captures the current view
    async fn current_view(&mut self) -> ProviderResult<View>;

    /// Navigates to `location`
    async fn navigate(&mut self, location: &str) -> ProviderResult<()>;

    /// Locates a control in the current view
    ///
    /// Fails with `NotFound` when no element matches.
    async fn locate_control(&mut self, spec: &ControlSpec) -> ProviderResult<ControlHandle>;

    /// Activates (clicks) a previously located control
    async fn activate(&mut self, handle: &ControlHandle) -> ProviderResult<()>;

    /// Text content of a located control
    async fn element_text(&mut self, handle: &ControlHandle) -> ProviderResult<String>;

    /// Attribute value of a located control, `None` when the attribute is absent
    async fn element_attribute(
        &mut self,
        handle: &ControlHandle,
        name: &str,
    ) -> ProviderResult<Option<String>>;

    /// The location currently displayed
    async fn current_location(&mut self) -> ProviderResult<String>;
}
