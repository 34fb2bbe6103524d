//! HTTP view provider
//!
//! Renders views by fetching static HTML:
//! - Building the HTTP client with the configured user agent and cookie store
//! - GET requests with retry for timeouts and server errors
//! - Control lookup with CSS selectors against the last fetched document
//! - Activation by following the control's link
//!
//! Controls that carry no link cannot be activated over plain HTTP and are
//! reported as `Unsupported`, which steers the pager to location rewriting.

use super::{ControlHandle, ControlSpec, View, ViewProvider};
use crate::config::UserAgentConfig;
use crate::{ProviderError, ProviderResult};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Delay before retrying a timed out or failed request
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use paged_harvest::config::UserAgentConfig;
/// use paged_harvest::provider::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.agent_string())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Snapshot of a located element, kept until the next navigation
#[derive(Debug, Clone)]
struct LocatedControl {
    text: String,
    attributes: HashMap<String, String>,
    link: Option<String>,
}

/// A [`ViewProvider`] backed by plain HTTP requests
pub struct HttpViewProvider {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
    location: Option<Url>,
    content: String,
    controls: HashMap<u64, LocatedControl>,
    next_handle: u64,
}

impl HttpViewProvider {
    /// Creates a provider with a client built from `config`
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        Ok(Self::with_client(client, config.max_retries))
    }

    pub fn with_client(client: Client, max_retries: u32) -> Self {
        Self {
            client,
            max_retries,
            retry_delay: DEFAULT_RETRY_DELAY,
            location: None,
            content: String::new(),
            controls: HashMap::new(),
            next_handle: 1,
        }
    }

    /// Overrides the delay between retries
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Resolves `location` against the current location
    fn resolve(&self, location: &str) -> ProviderResult<Url> {
        let parsed = match &self.location {
            Some(current) => current.join(location),
            None => Url::parse(location),
        };

        parsed.map_err(|e| ProviderError::Navigation {
            location: location.to_string(),
            message: e.to_string(),
        })
    }

    /// Fetches a URL with retry logic
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 404 | Immediate → Navigation error |
    /// | Other HTTP 4xx | Immediate → Navigation error |
    /// | HTTP 5xx | Retry up to `max_retries` times |
    /// | Timeout | Retry up to `max_retries` times |
    /// | Connection refused | Immediate → Unavailable |
    ///
    /// # Returns
    ///
    /// The final URL after redirects and the response body
    async fn fetch(&self, url: &Url) -> ProviderResult<(Url, String)> {
        let mut attempt = 0;

        loop {
            let failure = match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    let final_url = response.url().clone();

                    if status == StatusCode::NOT_FOUND || status.is_client_error() {
                        return Err(navigation_error(url, format!("HTTP {}", status.as_u16())));
                    }

                    if status.is_success() {
                        let body = response
                            .text()
                            .await
                            .map_err(|e| navigation_error(url, e.to_string()))?;
                        return Ok((final_url, body));
                    }

                    if !status.is_server_error() {
                        return Err(navigation_error(url, format!("HTTP {}", status.as_u16())));
                    }

                    format!("HTTP {}", status.as_u16())
                }
                Err(e) if e.is_timeout() => "Request timeout".to_string(),
                Err(e) if e.is_connect() => {
                    return Err(ProviderError::Unavailable(format!(
                        "Connection to {} failed: {}",
                        url, e
                    )));
                }
                Err(e) => return Err(navigation_error(url, e.to_string())),
            };

            if attempt >= self.max_retries {
                return Err(navigation_error(url, failure));
            }

            attempt += 1;
            tracing::debug!(
                "Retrying {} after {} (attempt {}/{})",
                url,
                failure,
                attempt,
                self.max_retries
            );
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    fn control(&self, handle: &ControlHandle) -> ProviderResult<&LocatedControl> {
        self.controls
            .get(&handle.id)
            .ok_or_else(|| ProviderError::NotFound(format!("stale control '{}'", handle.spec.css)))
    }
}

fn navigation_error(url: &Url, message: String) -> ProviderError {
    ProviderError::Navigation {
        location: url.to_string(),
        message,
    }
}

fn normalized_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(|chunk| chunk.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Finds the first element matching `spec` in `content`
fn find_control(content: &str, spec: &ControlSpec) -> ProviderResult<LocatedControl> {
    let selector = Selector::parse(&spec.css)
        .map_err(|e| ProviderError::InvalidSelector(format!("{}: {:?}", spec.css, e)))?;
    let document = Html::parse_document(content);

    let element = document
        .select(&selector)
        .find(|element| match &spec.text {
            Some(text) => normalized_text(element) == text.trim(),
            None => true,
        })
        .ok_or_else(|| ProviderError::NotFound(spec.css.clone()))?;

    let attributes: HashMap<String, String> = element
        .value()
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    let link = match element.value().attr("href") {
        Some(href) => Some(href.to_string()),
        None => Selector::parse("a[href]").ok().and_then(|anchor| {
            element
                .select(&anchor)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| href.to_string())
        }),
    };

    Ok(LocatedControl {
        text: normalized_text(&element),
        attributes,
        link,
    })
}

#[async_trait]
impl ViewProvider for HttpViewProvider {
    async fn current_view(&mut self) -> ProviderResult<View> {
        let location = self
            .location
            .as_ref()
            .ok_or_else(|| ProviderError::Unavailable("no view loaded".to_string()))?;
        Ok(View::new(location.as_str(), self.content.clone()))
    }

    async fn navigate(&mut self, location: &str) -> ProviderResult<()> {
        let url = self.resolve(location)?;
        tracing::debug!("Fetching {}", url);

        let (final_url, body) = self.fetch(&url).await?;
        self.location = Some(final_url);
        self.content = body;
        self.controls.clear();
        Ok(())
    }

    async fn locate_control(&mut self, spec: &ControlSpec) -> ProviderResult<ControlHandle> {
        let control = find_control(&self.content, spec)?;
        let id = self.next_handle;
        self.next_handle += 1;
        self.controls.insert(id, control);

        Ok(ControlHandle {
            id,
            spec: spec.clone(),
        })
    }

    async fn activate(&mut self, handle: &ControlHandle) -> ProviderResult<()> {
        let link = self.control(handle)?.link.clone();

        match link {
            Some(href) if !href.trim().is_empty() && !href.starts_with("javascript:") => {
                self.navigate(&href).await
            }
            _ => Err(ProviderError::Unsupported(format!(
                "control '{}' has no link to follow",
                handle.spec.css
            ))),
        }
    }

    async fn element_text(&mut self, handle: &ControlHandle) -> ProviderResult<String> {
        Ok(self.control(handle)?.text.clone())
    }

    async fn element_attribute(
        &mut self,
        handle: &ControlHandle,
        name: &str,
    ) -> ProviderResult<Option<String>> {
        Ok(self.control(handle)?.attributes.get(name).cloned())
    }

    async fn current_location(&mut self) -> ProviderResult<String> {
        self.location
            .as_ref()
            .map(|url| url.to_string())
            .ok_or_else(|| ProviderError::Unavailable("no view loaded".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            name: "TestHarvest".to_string(),
            version: "1.0".to_string(),
            contact_url: Some("https://example.com/about".to_string()),
            request_timeout_secs: 5,
            max_retries: 1,
        }
    }

    #[test]
    fn test_build_http_client() {
        let config = create_test_config();
        assert!(build_http_client(&config).is_ok());
    }

    #[test]
    fn test_find_control_by_text() {
        let html = r#"<ul class="el-pager"><li class="number">1</li><li class="number"> 2 </li></ul>"#;
        let control = find_control(html, &ControlSpec::with_text("li.number", "2")).unwrap();
        assert_eq!(control.text, "2");
        assert!(control.link.is_none());
    }

    #[test]
    fn test_find_control_descendant_link() {
        let html = r#"<li class="next"><a href="?page=3">下一页</a></li>"#;
        let control = find_control(html, &ControlSpec::css("li.next")).unwrap();
        assert_eq!(control.link.as_deref(), Some("?page=3"));
    }

    #[test]
    fn test_find_control_missing() {
        let err = find_control("<p>nothing</p>", &ControlSpec::css("li.next")).unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[test]
    fn test_find_control_invalid_selector() {
        let err = find_control("<p></p>", &ControlSpec::css("li[[")).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidSelector(_)));
    }

    #[tokio::test]
    async fn test_no_view_loaded() {
        let mut provider = HttpViewProvider::new(&create_test_config()).unwrap();
        let err = provider.current_view().await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
