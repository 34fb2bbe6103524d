//! Scripted view providers shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use paged_harvest::view::{page_marker, rewrite_page_param};
use paged_harvest::{ControlHandle, ControlSpec, ProviderError, ProviderResult, View, ViewProvider};
use std::collections::{HashMap, VecDeque};

pub const BASE: &str = "https://qiye.test/batch-query-result?kw=acme";
pub const GATE_LOCATION: &str = "https://qiye.test/verify";
pub const LANDING_LOCATION: &str = "https://qiye.test/search";
pub const LOGIN_LOCATION: &str = "https://qiye.test/login?redirect=batch-query-result";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    pub seq: u32,
    pub name: String,
    pub code: String,
}

/// `pages` pages of `per_page` distinct companies, numbered across pages
pub fn companies(pages: u32, per_page: u32) -> Vec<Vec<Company>> {
    (0..pages)
        .map(|page| {
            (1..=per_page)
                .map(|i| {
                    let seq = page * per_page + i;
                    Company {
                        seq,
                        name: format!("测试科技{}有限公司", seq),
                        code: format!("91110000MA{:08}", seq),
                    }
                })
                .collect()
        })
        .collect()
}

pub fn gate_html() -> String {
    r#"<html><head><title>安全验证</title></head>
       <body><div class="captcha-panel">请完成安全验证</div></body></html>"#
        .to_string()
}

pub fn landing_html() -> String {
    r#"<html><head><title>企业查询</title></head>
       <body><form><input name="kw"><button>查询</button></form></body></html>"#
        .to_string()
}

/// What the site does with a `page` marker beyond the last page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutOfRange {
    /// Shows the last page
    Clamp,
    /// Redirects to the first page
    RedirectToFirst,
    /// Redirects to the login page
    RedirectToLogin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Container,
    Number(u32),
    Next,
}

/// A single-page-application style results site
///
/// Clicking pagination controls changes what is shown without changing the
/// location; navigating to a location shows the page its `page` marker names.
pub struct ScriptedSite {
    pages: Vec<Vec<Company>>,
    window: u32,
    location: String,
    page: u32,
    stale: bool,
    header_only: bool,
    gate_polls: u32,
    landing_polls: u32,
    failing_calls: u32,
    header_only_clicks: bool,
    stale_moves: HashMap<u32, u32>,
    gates: HashMap<u32, u32>,
    outages: HashMap<u32, u32>,
    bounce: Option<u32>,
    printed_pages: Option<u32>,
    pager: bool,
    out_of_range: OutOfRange,
    logged_out: bool,
    handles: HashMap<u64, Target>,
    next_handle: u64,
    pub navigations: Vec<String>,
    pub clicks: Vec<u32>,
    pub next_clicks: u32,
}

impl ScriptedSite {
    pub fn new(pages: Vec<Vec<Company>>) -> Self {
        Self {
            pages,
            window: 3,
            location: String::new(),
            page: 1,
            stale: false,
            header_only: false,
            gate_polls: 0,
            landing_polls: 0,
            failing_calls: 0,
            header_only_clicks: false,
            stale_moves: HashMap::new(),
            gates: HashMap::new(),
            outages: HashMap::new(),
            bounce: None,
            printed_pages: None,
            pager: true,
            out_of_range: OutOfRange::Clamp,
            logged_out: false,
            handles: HashMap::new(),
            next_handle: 0,
            navigations: Vec::new(),
            clicks: Vec::new(),
            next_clicks: 0,
        }
    }

    /// Page numbers rendered on each side of the active one
    pub fn with_window(mut self, window: u32) -> Self {
        self.window = window;
        self
    }

    /// Clicked pages report the new active page but render a header-only table
    pub fn header_only_after_click(mut self) -> Self {
        self.header_only_clicks = true;
        self
    }

    /// The next `times` arrivals at `page` still lead with the previous page's last row
    pub fn stale_on(mut self, page: u32, times: u32) -> Self {
        self.stale_moves.insert(page, times);
        self
    }

    /// Arriving at `page` raises a gate for `polls` captures
    pub fn gate_on(mut self, page: u32, polls: u32) -> Self {
        self.gates.insert(page, polls);
        self
    }

    /// The first `polls` captures show an unrelated landing view
    pub fn landing_for(mut self, polls: u32) -> Self {
        self.landing_polls = polls;
        self
    }

    /// Arriving at `page` fails the next `calls` provider calls
    pub fn outage_on(mut self, page: u32, calls: u32) -> Self {
        self.outages.insert(page, calls);
        self
    }

    /// Prints `共 N 页` next to the pagination control
    pub fn claiming_pages(mut self, pages: u32) -> Self {
        self.printed_pages = Some(pages);
        self
    }

    /// Every move lands on `page` instead of the requested one
    pub fn bouncing_to(mut self, page: u32) -> Self {
        self.bounce = Some(page);
        self
    }

    /// Renders the table without any pagination control
    pub fn without_pager(mut self) -> Self {
        self.pager = false;
        self
    }

    /// Locations naming a page past the last one redirect to `page=1`
    pub fn redirecting_out_of_range_to_first(mut self) -> Self {
        self.out_of_range = OutOfRange::RedirectToFirst;
        self
    }

    /// Locations naming a page past the last one redirect to the login page
    pub fn redirecting_out_of_range_to_login(mut self) -> Self {
        self.out_of_range = OutOfRange::RedirectToLogin;
        self
    }

    /// Every later move lands on `page` instead of the requested one
    pub fn bounce_to(&mut self, page: u32) {
        self.bounce = Some(page);
    }

    pub fn shown_page(&self) -> u32 {
        self.page
    }

    fn last_page(&self) -> u32 {
        self.pages.len() as u32
    }

    fn check_alive(&mut self) -> ProviderResult<()> {
        if self.failing_calls > 0 {
            self.failing_calls -= 1;
            return Err(ProviderError::Unavailable("browser session closed".to_string()));
        }
        Ok(())
    }

    fn overlay(&self) -> Option<&'static str> {
        if self.landing_polls > 0 {
            Some(LANDING_LOCATION)
        } else if self.gate_polls > 0 {
            Some(GATE_LOCATION)
        } else {
            None
        }
    }

    fn move_to(&mut self, requested: u32, via_click: bool) {
        let page = self.bounce.unwrap_or(requested).clamp(1, self.last_page());
        self.page = page;
        self.header_only = via_click && self.header_only_clicks;
        self.stale = match self.stale_moves.get_mut(&page) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };
        if let Some(polls) = self.gates.remove(&page) {
            self.gate_polls = polls;
        }
        if let Some(calls) = self.outages.remove(&page) {
            self.failing_calls = calls;
        }
    }

    fn numbers(&self) -> Vec<u32> {
        let last = self.last_page();
        let low = self.page.saturating_sub(self.window).max(1);
        let high = (self.page + self.window).min(last);

        let mut numbers: Vec<u32> = (low..=high).collect();
        if low > 1 {
            numbers.insert(0, 1);
        }
        if high < last {
            numbers.push(last);
        }
        numbers
    }

    fn rows(&self) -> Vec<&Company> {
        if self.header_only {
            return Vec::new();
        }

        let index = (self.page - 1) as usize;
        let mut rows = Vec::new();
        if self.stale && index > 0 {
            rows.extend(self.pages[index - 1].last());
        }
        rows.extend(self.pages[index].iter());
        rows
    }

    fn render(&self) -> String {
        let total: usize = self.pages.iter().map(Vec::len).sum();
        let mut html = String::from("<html><head><title>批量查询结果</title></head><body>");

        html.push_str("<table><thead><tr><th>序号</th><th>企业名称</th><th>统一社会信用代码</th></tr></thead><tbody>");
        for company in self.rows() {
            html.push_str(&format!(
                r#"<tr><td>{}</td><td><a href="/firm/{}">{}</a></td><td>{}</td></tr>"#,
                company.seq, company.code, company.name, company.code
            ));
        }
        html.push_str("</tbody></table>");

        if !self.pager {
            html.push_str("</body></html>");
            return html;
        }

        html.push_str(r#"<div class="el-pagination">"#);
        html.push_str(&format!(r#"<span class="el-pagination__total">共 {} 条</span>"#, total));
        if let Some(pages) = self.printed_pages {
            html.push_str(&format!(r#"<span class="el-pagination__pages">共 {} 页</span>"#, pages));
        }
        html.push_str(r#"<ul class="el-pager">"#);
        for number in self.numbers() {
            let class = if number == self.page { "number active" } else { "number" };
            html.push_str(&format!(r#"<li class="{}">{}</li>"#, class, number));
        }
        html.push_str("</ul>");
        let disabled = if self.page >= self.last_page() { " disabled" } else { "" };
        html.push_str(&format!(
            r#"<button type="button" class="btn-next"{}>下一页</button></div>"#,
            disabled
        ));

        html.push_str("</body></html>");
        html
    }

    fn target(&self, handle: &ControlHandle) -> ProviderResult<Target> {
        self.handles
            .get(&handle.id)
            .copied()
            .ok_or_else(|| ProviderError::NotFound(format!("stale handle {}", handle.id)))
    }
}

#[async_trait]
impl ViewProvider for ScriptedSite {
    async fn current_view(&mut self) -> ProviderResult<View> {
        self.check_alive()?;

        if self.landing_polls > 0 {
            self.landing_polls -= 1;
            return Ok(View::new(LANDING_LOCATION, landing_html()));
        }

        if self.gate_polls > 0 {
            self.gate_polls -= 1;
            return Ok(View::new(GATE_LOCATION, gate_html()));
        }

        if self.logged_out {
            return Ok(View::new(self.location.clone(), landing_html()));
        }

        Ok(View::new(self.location.clone(), self.render()))
    }

    async fn navigate(&mut self, location: &str) -> ProviderResult<()> {
        self.check_alive()?;
        self.navigations.push(location.to_string());
        self.location = location.to_string();
        self.handles.clear();
        self.logged_out = false;

        let mut page = page_marker(location, "page").unwrap_or(1);
        if page > self.last_page() {
            match self.out_of_range {
                OutOfRange::Clamp => {}
                OutOfRange::RedirectToFirst => {
                    self.location = rewrite_page_param(location, "page", 1);
                    page = 1;
                }
                OutOfRange::RedirectToLogin => {
                    self.location = LOGIN_LOCATION.to_string();
                    self.logged_out = true;
                }
            }
        }

        self.move_to(page, false);
        Ok(())
    }

    async fn locate_control(&mut self, spec: &ControlSpec) -> ProviderResult<ControlHandle> {
        self.check_alive()?;

        let target = if self.overlay().is_some() {
            None
        } else if spec.css == "ul.el-pager" {
            Some(Target::Container)
        } else if spec.css.contains("btn-next") {
            Some(Target::Next)
        } else if spec.css == "li.number" {
            spec.text
                .as_deref()
                .and_then(|text| text.trim().parse().ok())
                .filter(|number| self.numbers().contains(number))
                .map(Target::Number)
        } else {
            None
        };

        let target = target.ok_or_else(|| ProviderError::NotFound(spec.css.clone()))?;
        self.next_handle += 1;
        self.handles.insert(self.next_handle, target);

        Ok(ControlHandle {
            id: self.next_handle,
            spec: spec.clone(),
        })
    }

    async fn activate(&mut self, handle: &ControlHandle) -> ProviderResult<()> {
        self.check_alive()?;

        match self.target(handle)? {
            Target::Container => Err(ProviderError::Unsupported("container".to_string())),
            Target::Number(number) => {
                self.clicks.push(number);
                self.move_to(number, true);
                Ok(())
            }
            Target::Next => {
                self.next_clicks += 1;
                if self.page < self.last_page() {
                    self.move_to(self.page + 1, true);
                }
                Ok(())
            }
        }
    }

    async fn element_text(&mut self, handle: &ControlHandle) -> ProviderResult<String> {
        self.check_alive()?;

        Ok(match self.target(handle)? {
            Target::Container => self
                .numbers()
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(" "),
            Target::Number(number) => number.to_string(),
            Target::Next => "下一页".to_string(),
        })
    }

    async fn element_attribute(
        &mut self,
        handle: &ControlHandle,
        name: &str,
    ) -> ProviderResult<Option<String>> {
        self.check_alive()?;

        let target = self.target(handle)?;
        if name != "class" {
            return Ok(None);
        }

        Ok(Some(match target {
            Target::Container => "el-pager".to_string(),
            Target::Number(number) if number == self.page => "number active".to_string(),
            Target::Number(_) => "number".to_string(),
            Target::Next => "btn-next".to_string(),
        }))
    }

    async fn current_location(&mut self) -> ProviderResult<String> {
        self.check_alive()?;
        Ok(self
            .overlay()
            .map(str::to_string)
            .unwrap_or_else(|| self.location.clone()))
    }
}

/// Replays a fixed sequence of capture results, repeating the last view
pub struct SequenceProvider {
    script: VecDeque<ProviderResult<View>>,
    last: View,
    pub polls: u32,
    pub navigations: Vec<String>,
}

impl SequenceProvider {
    pub fn new(script: Vec<ProviderResult<View>>, last: View) -> Self {
        Self {
            script: script.into(),
            last,
            polls: 0,
            navigations: Vec::new(),
        }
    }
}

pub fn gate_view() -> View {
    View::new(GATE_LOCATION, gate_html())
}

pub fn results_view() -> View {
    let site = ScriptedSite::new(companies(1, 2));
    View::new(BASE, site.render())
}

#[async_trait]
impl ViewProvider for SequenceProvider {
    async fn current_view(&mut self) -> ProviderResult<View> {
        self.polls += 1;
        match self.script.pop_front() {
            Some(Ok(view)) => {
                self.last = view.clone();
                Ok(view)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last.clone()),
        }
    }

    async fn navigate(&mut self, location: &str) -> ProviderResult<()> {
        self.navigations.push(location.to_string());
        Ok(())
    }

    async fn locate_control(&mut self, spec: &ControlSpec) -> ProviderResult<ControlHandle> {
        Err(ProviderError::NotFound(spec.css.clone()))
    }

    async fn activate(&mut self, _handle: &ControlHandle) -> ProviderResult<()> {
        Err(ProviderError::Unsupported("scripted".to_string()))
    }

    async fn element_text(&mut self, handle: &ControlHandle) -> ProviderResult<String> {
        Err(ProviderError::NotFound(handle.spec.css.clone()))
    }

    async fn element_attribute(
        &mut self,
        handle: &ControlHandle,
        _name: &str,
    ) -> ProviderResult<Option<String>> {
        Err(ProviderError::NotFound(handle.spec.css.clone()))
    }

    async fn current_location(&mut self) -> ProviderResult<String> {
        Ok(self.last.location.clone())
    }
}
