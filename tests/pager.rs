//! Pager behaviour against a scripted site

mod common;

use common::{companies, ScriptedSite, BASE, LOGIN_LOCATION};
use paged_harvest::config::PagerStrategy;
use paged_harvest::crawler::Pager;
use paged_harvest::state::SessionState;
use paged_harvest::{Config, ViewProvider};

fn create_test_config() -> Config {
    Config::for_location(BASE)
}

async fn site_at(site: ScriptedSite, page: u32) -> ScriptedSite {
    let mut site = site;
    let location = if page > 1 {
        format!("{}&page={}", BASE, page)
    } else {
        BASE.to_string()
    };
    site.navigate(&location).await.unwrap();
    site.navigations.clear();
    site
}

#[tokio::test(start_paused = true)]
async fn test_advance_clicks_next_number() {
    let mut site = site_at(ScriptedSite::new(companies(3, 2)), 1).await;
    let mut state = SessionState::resumed_at(1, [1]);
    let mut pager = Pager::new(&create_test_config());

    assert!(pager.advance(&mut site, &mut state).await.unwrap());
    assert_eq!(state.current_page(), 2);
    assert_eq!(site.clicks, vec![2]);
    assert!(site.navigations.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_header_only_table_falls_back_to_location_rewrite() {
    let site = ScriptedSite::new(companies(3, 2)).header_only_after_click();
    let mut site = site_at(site, 1).await;
    let mut state = SessionState::resumed_at(1, [1]);
    let mut pager = Pager::new(&create_test_config());

    assert!(pager.advance(&mut site, &mut state).await.unwrap());
    assert_eq!(state.current_page(), 2);
    assert_eq!(site.clicks, vec![2]);
    assert_eq!(
        site.navigations,
        vec!["https://qiye.test/batch-query-result?kw=acme&page=2".to_string()]
    );
    assert_eq!(site.shown_page(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stall_guard_jumps_to_first_unvisited_page() {
    let mut site = site_at(ScriptedSite::new(companies(20, 2)), 5).await;
    let mut state = SessionState::resumed_at(5, [5, 6, 7]);
    let mut pager = Pager::new(&create_test_config());

    assert!(pager.advance(&mut site, &mut state).await.unwrap());
    assert_eq!(state.current_page(), 8);
    assert_eq!(site.clicks, vec![8]);
}

#[tokio::test(start_paused = true)]
async fn test_stall_guard_gives_up_beyond_horizon() {
    let mut site = site_at(ScriptedSite::new(companies(20, 2)), 2).await;
    let mut state = SessionState::resumed_at(2, 1..=15);
    let mut config = create_test_config();
    config.crawler.stall_horizon = 3;
    let mut pager = Pager::new(&config);

    assert!(!pager.advance(&mut site, &mut state).await.unwrap());
    assert_eq!(state.current_page(), 2);
    assert!(site.clicks.is_empty());
    assert!(site.navigations.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disabled_next_means_no_further_page() {
    let site = ScriptedSite::new(companies(3, 2)).with_window(0);
    let mut site = site_at(site, 3).await;
    let mut state = SessionState::resumed_at(3, [1, 2, 3]);
    let mut pager = Pager::new(&create_test_config());

    assert!(!pager.advance(&mut site, &mut state).await.unwrap());
    assert_eq!(state.current_page(), 3);
    assert_eq!(site.next_clicks, 0);
    assert!(site.navigations.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_regression_to_visited_page_is_terminal() {
    let mut site = site_at(ScriptedSite::new(companies(5, 2)), 3).await;
    site.bounce_to(2);
    let mut state = SessionState::resumed_at(3, [1, 2, 3]);
    let mut pager = Pager::new(&create_test_config());

    assert!(!pager.advance(&mut site, &mut state).await.unwrap());
    assert_eq!(state.current_page(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_regression_to_unvisited_page_corrects_index() {
    let mut site = site_at(ScriptedSite::new(companies(5, 2)), 3).await;
    site.bounce_to(2);
    let mut state = SessionState::resumed_at(3, [1, 3]);
    let mut pager = Pager::new(&create_test_config());

    assert!(pager.advance(&mut site, &mut state).await.unwrap());
    assert_eq!(state.current_page(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_rewrite_strategy_navigates_directly() {
    let mut site = site_at(ScriptedSite::new(companies(3, 2)), 1).await;
    let mut state = SessionState::resumed_at(1, [1]);
    let mut config = create_test_config();
    config.crawler.strategy = PagerStrategy::Rewrite;
    let mut pager = Pager::new(&config);

    assert!(pager.advance(&mut site, &mut state).await.unwrap());
    assert_eq!(state.current_page(), 2);
    assert!(site.clicks.is_empty());
    assert_eq!(site.navigations.len(), 1);
}

fn create_rewrite_config() -> Config {
    let mut config = create_test_config();
    config.crawler.strategy = PagerStrategy::Rewrite;
    config
}

#[tokio::test(start_paused = true)]
async fn test_rewrite_rejects_redirect_to_another_page() {
    let site = ScriptedSite::new(companies(3, 2))
        .without_pager()
        .redirecting_out_of_range_to_first();
    let mut site = site_at(site, 3).await;
    let mut state = SessionState::resumed_at(3, [1, 2, 3]);
    let mut pager = Pager::new(&create_rewrite_config());

    assert!(!pager.advance(&mut site, &mut state).await.unwrap());
    assert_eq!(state.current_page(), 3);
    assert_eq!(
        site.navigations,
        vec!["https://qiye.test/batch-query-result?kw=acme&page=4".to_string()]
    );
    assert_eq!(site.shown_page(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rewrite_rejects_bounce_out_of_results() {
    let site = ScriptedSite::new(companies(3, 2))
        .without_pager()
        .redirecting_out_of_range_to_login();
    let mut site = site_at(site, 3).await;
    let mut state = SessionState::resumed_at(3, [1, 2, 3]);
    let mut pager = Pager::new(&create_rewrite_config());

    assert!(!pager.advance(&mut site, &mut state).await.unwrap());
    assert_eq!(state.current_page(), 3);
    assert_eq!(site.current_location().await.unwrap(), LOGIN_LOCATION);
}

#[tokio::test(start_paused = true)]
async fn test_rewrite_accepts_page_without_pager() {
    let site = ScriptedSite::new(companies(3, 2)).without_pager();
    let mut site = site_at(site, 1).await;
    let mut state = SessionState::resumed_at(1, [1]);
    let mut pager = Pager::new(&create_rewrite_config());

    assert!(pager.advance(&mut site, &mut state).await.unwrap());
    assert_eq!(state.current_page(), 2);
    assert_eq!(site.shown_page(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reload_redrives_current_page() {
    let mut site = site_at(ScriptedSite::new(companies(3, 2)), 2).await;
    let state = SessionState::resumed_at(2, [1]);
    let mut pager = Pager::new(&create_test_config());

    assert!(pager.reload(&mut site, &state).await.unwrap());
    assert_eq!(
        site.navigations,
        vec!["https://qiye.test/batch-query-result?kw=acme&page=2".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_provider_propagates() {
    let site = ScriptedSite::new(companies(3, 2)).outage_on(2, u32::MAX);
    let mut site = site_at(site, 1).await;
    let mut state = SessionState::resumed_at(1, [1]);
    let mut pager = Pager::new(&create_test_config());

    let err = pager.advance(&mut site, &mut state).await.unwrap_err();
    assert!(err.is_unavailable());
    assert_eq!(state.current_page(), 1);
}
