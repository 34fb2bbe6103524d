//! Location markers
//!
//! String conventions the classifier and pager rely on:
//! - a substring identifying results locations
//! - a substring identifying login locations
//! - a `<param>=<n>` query pair carrying the page number
//!
//! Every helper works on parsed URLs and falls back to plain string handling
//! when the location is not an absolute URL.

use regex::Regex;
use url::Url;

/// Checks if a location is a login/authentication location
///
/// The comparison ignores ASCII case.
///
/// # Examples
///
/// ```
/// use paged_harvest::view::is_login_location;
///
/// assert!(is_login_location("https://example.com/Login?next=/", "login"));
/// assert!(!is_login_location("https://example.com/search", "login"));
/// ```
pub fn is_login_location(location: &str, login_pattern: &str) -> bool {
    !login_pattern.is_empty()
        && location
            .to_ascii_lowercase()
            .contains(&login_pattern.to_ascii_lowercase())
}

/// Checks if a location identifies the results view
///
/// Only the path is inspected for absolute URLs, so a results location that
/// appears inside a query (`?redirect=/batch-query-result`) does not count.
///
/// # Examples
///
/// ```
/// use paged_harvest::view::is_results_location;
///
/// assert!(is_results_location("https://qiye.example.com/batch-query-result?page=2", "batch-query-result"));
/// assert!(!is_results_location("https://qiye.example.com/home?from=batch-query-result", "batch-query-result"));
/// ```
pub fn is_results_location(location: &str, results_pattern: &str) -> bool {
    if results_pattern.is_empty() {
        return false;
    }

    match Url::parse(location) {
        Ok(url) => url.path().contains(results_pattern),
        Err(_) => location
            .split(['?', '#'])
            .next()
            .is_some_and(|path| path.contains(results_pattern)),
    }
}

/// Reads the page number carried by `param` in the location's query
///
/// # Examples
///
/// ```
/// use paged_harvest::view::page_marker;
///
/// assert_eq!(page_marker("https://example.com/r?kw=x&page=4", "page"), Some(4));
/// assert_eq!(page_marker("https://example.com/r?kw=x", "page"), None);
/// ```
pub fn page_marker(location: &str, param: &str) -> Option<u32> {
    match Url::parse(location) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == param)
            .and_then(|(_, value)| value.trim().parse().ok()),
        Err(_) => param_regex(param)?
            .captures(location)
            .and_then(|caps| caps.get(2))
            .and_then(|value| value.as_str().trim().parse().ok()),
    }
}

/// Sets the page parameter of a location, appending it when absent
///
/// # Arguments
///
/// * `location` - The location to rewrite
/// * `param` - The query key carrying the page number
/// * `page` - The page to point at
///
/// # Returns
///
/// The rewritten location
///
/// # Examples
///
/// ```
/// use paged_harvest::view::rewrite_page_param;
///
/// assert_eq!(
///     rewrite_page_param("https://example.com/r?kw=x&page=1", "page", 2),
///     "https://example.com/r?kw=x&page=2"
/// );
/// assert_eq!(
///     rewrite_page_param("https://example.com/r", "page", 3),
///     "https://example.com/r?page=3"
/// );
/// ```
pub fn rewrite_page_param(location: &str, param: &str, page: u32) -> String {
    if let Ok(mut url) = Url::parse(location) {
        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        match pairs.iter_mut().find(|(key, _)| key == param) {
            Some(pair) => pair.1 = page.to_string(),
            None => pairs.push((param.to_string(), page.to_string())),
        }

        url.query_pairs_mut().clear().extend_pairs(pairs);
        return url.to_string();
    }

    if let Some(re) = param_regex(param) {
        if re.is_match(location) {
            return re
                .replace(location, format!("${{1}}{}={}", param, page))
                .into_owned();
        }
    }

    let separator = if location.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", location, separator, param, page)
}

fn param_regex(param: &str) -> Option<Regex> {
    Regex::new(&format!(r"([?&]){}=([^&#]*)", regex::escape(param))).ok()
}
