use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Paged-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub target: TargetConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

impl Config {
    /// Builds a configuration with defaults for everything but the base location
    pub fn for_location(base_location: impl Into<String>) -> Self {
        Self {
            target: TargetConfig {
                base_location: base_location.into(),
                ..TargetConfig::default()
            },
            crawler: CrawlerConfig::default(),
            user_agent: UserAgentConfig::default(),
            output: OutputConfig::default(),
            vocabulary: VocabularyConfig::default(),
            selectors: SelectorConfig::default(),
        }
    }
}

/// The web property being harvested
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Entry location; also used for resolving relative links and session recovery
    #[serde(rename = "base-location")]
    pub base_location: String,

    /// Substring that identifies a results view location
    #[serde(rename = "results-pattern", default = "default_results_pattern")]
    pub results_pattern: String,

    /// Substring that identifies a login/authentication location
    #[serde(rename = "login-pattern", default = "default_login_pattern")]
    pub login_pattern: String,

    /// Query parameter carrying the page number
    #[serde(rename = "page-param", default = "default_page_param")]
    pub page_param: String,

    /// Title reported when the view carries none
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_location: "https://qiye.qizhidao.com/batch-query-home".to_string(),
            results_pattern: default_results_pattern(),
            login_pattern: default_login_pattern(),
            page_param: default_page_param(),
            title: default_title(),
        }
    }
}

/// Which pagination strategies the pager may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PagerStrategy {
    /// Click pagination controls first, rewrite the location as a fallback
    #[default]
    Interactive,
    /// Only rewrite the page parameter of the location
    Rewrite,
}

/// Crawl loop timing and bounds
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum time to wait for a verification gate to clear (seconds)
    #[serde(rename = "gate-timeout-secs", default = "default_gate_timeout_secs")]
    pub gate_timeout_secs: u64,

    /// Interval between gate polls (milliseconds)
    #[serde(rename = "gate-poll-interval-ms", default = "default_gate_poll_interval_ms")]
    pub gate_poll_interval_ms: u64,

    /// Consecutive non-gate readings required before a gate counts as cleared
    #[serde(rename = "gate-required-clears", default = "default_gate_required_clears")]
    pub gate_required_clears: u32,

    /// Maximum time to wait for an unrelated view to turn into a results view (seconds)
    #[serde(rename = "results-timeout-secs", default = "default_results_timeout_secs")]
    pub results_timeout_secs: u64,

    /// Polls used to confirm a page advance
    #[serde(rename = "verify-attempts", default = "default_verify_attempts")]
    pub verify_attempts: u32,

    /// Interval between advance confirmation polls (milliseconds)
    #[serde(rename = "verify-interval-ms", default = "default_verify_interval_ms")]
    pub verify_interval_ms: u64,

    /// Pause after activating a control or navigating (milliseconds)
    #[serde(rename = "settle-delay-ms", default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// How far past a visited page the stall guard scans for an unvisited one
    #[serde(rename = "stall-horizon", default = "default_stall_horizon")]
    pub stall_horizon: u32,

    /// Consecutive pager failures tolerated while a known total is unmet
    #[serde(rename = "max-advance-failures", default = "default_max_advance_failures")]
    pub max_advance_failures: u32,

    /// Re-drives of the current page after a stale re-read
    #[serde(rename = "max-stale-retries", default = "default_max_stale_retries")]
    pub max_stale_retries: u32,

    /// Optional page cap
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,

    #[serde(default)]
    pub strategy: PagerStrategy,
}

impl CrawlerConfig {
    pub fn gate_timeout(&self) -> Duration {
        Duration::from_secs(self.gate_timeout_secs)
    }

    pub fn gate_poll_interval(&self) -> Duration {
        Duration::from_millis(self.gate_poll_interval_ms)
    }

    pub fn results_timeout(&self) -> Duration {
        Duration::from_secs(self.results_timeout_secs)
    }

    pub fn verify_interval(&self) -> Duration {
        Duration::from_millis(self.verify_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            gate_timeout_secs: default_gate_timeout_secs(),
            gate_poll_interval_ms: default_gate_poll_interval_ms(),
            gate_required_clears: default_gate_required_clears(),
            results_timeout_secs: default_results_timeout_secs(),
            verify_attempts: default_verify_attempts(),
            verify_interval_ms: default_verify_interval_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            stall_horizon: default_stall_horizon(),
            max_advance_failures: default_max_advance_failures(),
            max_stale_retries: default_max_stale_retries(),
            max_pages: None,
            strategy: PagerStrategy::default(),
        }
    }
}

/// User agent identification and HTTP behaviour for the HTTP provider
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    #[serde(default = "default_agent_version")]
    pub version: String,

    /// URL with information about the harvester
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,

    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries for timeouts and server errors
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,
}

impl UserAgentConfig {
    /// Formats the agent string: `Name/Version` or `Name/Version (+ContactURL)`
    pub fn agent_string(&self) -> String {
        match &self.contact_url {
            Some(url) => format!("{}/{} (+{})", self.name, self.version, url),
            None => format!("{}/{}", self.name, self.version),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            version: default_agent_version(),
            contact_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OutputConfig {
    /// Path of the JSON result file; a timestamped name is used when absent
    #[serde(rename = "json-path", default)]
    pub json_path: Option<String>,
}

/// Domain vocabulary used by the classifier, extractor and deduplicator
#[derive(Debug, Clone, Deserialize)]
pub struct VocabularyConfig {
    /// Words that signal a human-verification challenge
    #[serde(rename = "challenge-keywords", default = "default_challenge_keywords")]
    pub challenge_keywords: Vec<String>,

    /// Words that mark a row as a header row
    #[serde(rename = "header-keywords", default = "default_header_keywords")]
    pub header_keywords: Vec<String>,

    /// Subset checked when deciding if the first row is the header
    #[serde(rename = "primary-header-keywords", default = "default_primary_header_keywords")]
    pub primary_header_keywords: Vec<String>,

    /// Column names used when the table carries no header
    #[serde(rename = "default-headers", default = "default_headers")]
    pub default_headers: Vec<String>,

    /// Stable business identifier column
    #[serde(rename = "identifier-field", default = "default_identifier_field")]
    pub identifier_field: String,

    /// Entity name column
    #[serde(rename = "name-field", default = "default_name_field")]
    pub name_field: String,

    /// Sequence number column
    #[serde(rename = "sequence-field", default = "default_sequence_field")]
    pub sequence_field: String,

    /// Fragment identifying name-like columns when the name column is absent
    #[serde(rename = "name-hint", default = "default_name_hint")]
    pub name_hint: String,

    #[serde(rename = "link-suffix", default = "default_link_suffix")]
    pub link_suffix: String,

    /// Prefix for cells beyond the header count
    #[serde(rename = "positional-prefix", default = "default_positional_prefix")]
    pub positional_prefix: String,

    /// Cells longer than this never belong to a repeated header row
    #[serde(rename = "max-header-cell-len", default = "default_max_header_cell_len")]
    pub max_header_cell_len: usize,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            challenge_keywords: default_challenge_keywords(),
            header_keywords: default_header_keywords(),
            primary_header_keywords: default_primary_header_keywords(),
            default_headers: default_headers(),
            identifier_field: default_identifier_field(),
            name_field: default_name_field(),
            sequence_field: default_sequence_field(),
            name_hint: default_name_hint(),
            link_suffix: default_link_suffix(),
            positional_prefix: default_positional_prefix(),
            max_header_cell_len: default_max_header_cell_len(),
        }
    }
}

/// CSS selectors for pagination and challenge widgets
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Pagination containers, tried in order
    #[serde(default = "default_pagination_selectors")]
    pub pagination: Vec<String>,

    #[serde(rename = "page-number", default = "default_page_number_selector")]
    pub page_number: String,

    #[serde(rename = "active-page", default = "default_active_page_selector")]
    pub active_page: String,

    #[serde(rename = "next-page", default = "default_next_page_selector")]
    pub next_page: String,

    /// Elements whose presence signals a challenge widget
    #[serde(default = "default_challenge_selectors")]
    pub challenge: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            pagination: default_pagination_selectors(),
            page_number: default_page_number_selector(),
            active_page: default_active_page_selector(),
            next_page: default_next_page_selector(),
            challenge: default_challenge_selectors(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_results_pattern() -> String {
    "batch-query-result".to_string()
}

fn default_login_pattern() -> String {
    "login".to_string()
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_title() -> String {
    "企知道".to_string()
}

fn default_gate_timeout_secs() -> u64 {
    300
}

fn default_gate_poll_interval_ms() -> u64 {
    2000
}

fn default_gate_required_clears() -> u32 {
    3
}

fn default_results_timeout_secs() -> u64 {
    60
}

fn default_verify_attempts() -> u32 {
    5
}

fn default_verify_interval_ms() -> u64 {
    300
}

fn default_settle_delay_ms() -> u64 {
    800
}

fn default_stall_horizon() -> u32 {
    10
}

fn default_max_advance_failures() -> u32 {
    3
}

fn default_max_stale_retries() -> u32 {
    2
}

fn default_agent_name() -> String {
    "PagedHarvest".to_string()
}

fn default_agent_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_challenge_keywords() -> Vec<String> {
    strings(&[
        "验证码",
        "captcha",
        "人机校验",
        "verify",
        "安全验证",
        "滑动验证",
        "点击验证",
        "geetest",
    ])
}

fn default_header_keywords() -> Vec<String> {
    strings(&[
        "序号",
        "企业名称",
        "企业名",
        "公司名称",
        "登记状态",
        "状态",
        "统一社会信用代码",
        "法定代表人",
        "成立日期",
        "注册资本",
        "实缴资本",
        "核准日期",
        "营业期限",
        "所属省份",
        "所属城市",
        "所属区县",
        "电话",
        "邮箱",
        "纳税人识别号",
    ])
}

fn default_primary_header_keywords() -> Vec<String> {
    strings(&["序号", "企业名称", "企业名", "公司名称", "登记状态", "状态"])
}

fn default_headers() -> Vec<String> {
    strings(&[
        "序号",
        "企业名称",
        "登记状态",
        "统一社会信用代码",
        "法定代表人",
        "成立日期",
        "注册资本",
        "实缴资本",
    ])
}

fn default_identifier_field() -> String {
    "统一社会信用代码".to_string()
}

fn default_name_field() -> String {
    "企业名称".to_string()
}

fn default_sequence_field() -> String {
    "序号".to_string()
}

fn default_name_hint() -> String {
    "名称".to_string()
}

fn default_link_suffix() -> String {
    "_link".to_string()
}

fn default_positional_prefix() -> String {
    "column_".to_string()
}

fn default_max_header_cell_len() -> usize {
    20
}

fn default_pagination_selectors() -> Vec<String> {
    strings(&[
        "ul.el-pager",
        "ul.pagination",
        "div.pagination",
        "nav[class*=\"pagination\"]",
        "ul[class*=\"page\"]",
        "div[class*=\"page\"]",
    ])
}

fn default_page_number_selector() -> String {
    "li.number".to_string()
}

fn default_active_page_selector() -> String {
    "li.number.active, li.active, li.current".to_string()
}

fn default_next_page_selector() -> String {
    "button.btn-next, a.btn-next, li.next, a.next".to_string()
}

fn default_challenge_selectors() -> Vec<String> {
    strings(&[
        "iframe[src*=\"captcha\"]",
        "iframe[src*=\"geetest\"]",
        "div[id*=\"captcha\"]",
        "div[class*=\"captcha\"]",
        "div[class*=\"geetest\"]",
    ])
}
