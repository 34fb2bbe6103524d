//! Page-level facts read alongside the records
//!
//! - Page title
//! - The total result count the page claims (`共找到 1,234 条`)
//! - An explicitly printed page count (`共 42 页`)

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

/// Facts about a results page that are not records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSummary {
    pub title: Option<String>,
    pub claimed_total: Option<u64>,
    pub total_pages: Option<u32>,
}

impl PageSummary {
    /// Reads the summary of a rendered page
    pub fn from_content(content: &str) -> Self {
        let document = Html::parse_document(content);
        let text = document_text(&document);

        Self {
            title: extract_title(&document),
            claimed_total: claimed_total(&text),
            total_pages: printed_page_count(&text),
        }
    }
}

fn count_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"共找到[:：\s]*([\d,]+)",
            r"共\s*([\d,]+)\s*条",
            r"总计[:：\s]*([\d,]+)",
            r"总数[:：\s]*([\d,]+)",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

fn page_count_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"共\s*(\d+)\s*页", r"总\s*(\d+)\s*页"]
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

/// Collects the visible text of a document with whitespace collapsed
pub(crate) fn document_text(document: &Html) -> String {
    document
        .root_element()
        .text()
        .flat_map(|chunk| chunk.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns true if the text carries a record-count phrase
pub fn has_record_count(text: &str) -> bool {
    count_patterns().iter().any(|re| re.is_match(text))
}

/// Total result count claimed by the page text
///
/// # Examples
///
/// ```
/// use paged_harvest::extract::claimed_total;
///
/// assert_eq!(claimed_total("共找到 1,024 家企业"), Some(1024));
/// assert_eq!(claimed_total("共 37 条"), Some(37));
/// assert_eq!(claimed_total("暂无数据"), None);
/// ```
pub fn claimed_total(text: &str) -> Option<u64> {
    count_patterns().iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().replace(',', "").parse().ok())
    })
}

/// Page count printed in the page text
pub fn printed_page_count(text: &str) -> Option<u32> {
    page_count_patterns().iter().find_map(|re| {
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .filter(|pages| *pages > 0)
    })
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_from_content() {
        let html = r#"<html><head><title> 企业查询结果 </title></head>
            <body><div class="total">共找到 <b>1,234</b> 条结果</div>
            <div class="pager">共 62 页</div></body></html>"#;

        let summary = PageSummary::from_content(html);
        assert_eq!(summary.title.as_deref(), Some("企业查询结果"));
        assert_eq!(summary.claimed_total, Some(1234));
        assert_eq!(summary.total_pages, Some(62));
    }

    #[test]
    fn test_summary_empty_page() {
        let summary = PageSummary::from_content("<html><body></body></html>");
        assert_eq!(summary, PageSummary::default());
    }

    #[test]
    fn test_record_count_phrases() {
        assert!(has_record_count("共找到 12 家"));
        assert!(has_record_count("总计: 99"));
        assert!(has_record_count("总数：5"));
        assert!(has_record_count("共 3 条"));
        assert!(!has_record_count("请完成安全验证"));
    }

    #[test]
    fn test_page_count_ignores_record_count() {
        assert_eq!(printed_page_count("共 120 条"), None);
        assert_eq!(printed_page_count("总 8 页"), Some(8));
        assert_eq!(printed_page_count("共 0 页"), None);
    }
}
