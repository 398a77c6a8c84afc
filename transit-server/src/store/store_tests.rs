//! Tests for cache-first lookups and snapshot refresh.

use super::*;
use crate::browser::mock::{MockBrowser, PageEvent};
use crate::scrape::ScraperConfig;
use chrono::NaiveDate;
use reqwest::Url;

const BASE: &str = "https://ctpcj.ro/index.php/ro/orare-linii/";

fn listing(links: &[(&str, &str)]) -> String {
    let anchors: String = links
        .iter()
        .map(|(id, href)| format!(r#"<a href="{href}">Linia {id}</a>"#))
        .collect();
    format!(r#"<html><body><div class="tzPortfolio">{anchors}</div></body></html>"#)
}

fn detail(station: &str, first: &str) -> String {
    format!(
        r#"<table class="tztable">
             <thead><tr><th>{station}</th></tr></thead>
             <tbody><tr><td>{first}</td></tr></tbody>
           </table>"#
    )
}

fn url(slug: &str) -> String {
    format!("{BASE}{slug}")
}

fn id(s: &str) -> LineId {
    LineId::parse_normalized(s).unwrap()
}

fn friday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

/// Three urban lines, one metropolitan, one night; express and supermarket empty.
fn site() -> MockBrowser {
    MockBrowser::new()
        .with_page(
            url("linii-urbane/"),
            listing(&[("1", "/l/1"), ("25", "/l/25"), ("35", "/l/35")]),
        )
        .with_page(url("linii-metropolitane/"), listing(&[("M12", "/l/m12")]))
        .with_page(url("transport-noapte/"), listing(&[("24N", "/l/24n")]))
        .with_page(url("linie-expres/"), listing(&[]))
        .with_page(url("linii-supermarket/"), listing(&[]))
        .with_page("https://ctpcj.ro/l/1", detail("Gara", "05:01"))
        .with_page("https://ctpcj.ro/l/25", detail("Unirii", "05:25"))
        .with_page("https://ctpcj.ro/l/35", detail("Zorilor", "05:35"))
        .with_page("https://ctpcj.ro/l/m12", detail("Baciu", "06:12"))
        .with_page("https://ctpcj.ro/l/24n", detail("Manastur", "00:24"))
}

/// Listing pages plus detail pages for every line in `site()`.
const FULL_REFRESH_LOADS: usize = 5 + 5;

fn make_store(browser: Arc<MockBrowser>) -> LineStore<MockBrowser> {
    let scraper =
        Scraper::new(browser, ScraperConfig::new(Url::parse(BASE).unwrap())).with_clock(friday);
    LineStore::new(scraper, &CacheConfig::default())
}

#[tokio::test]
async fn empty_until_first_refresh() {
    let store = make_store(Arc::new(site()));
    assert!(store.snapshot().await.is_none());
    assert!(!store.is_refreshing());

    let status = store.status().await;
    assert!(status.last_started.is_none());
    assert!(status.last_success.is_none());
}

#[tokio::test]
async fn refresh_builds_snapshot() {
    let browser = Arc::new(site());
    let store = make_store(browser.clone());

    let summary = store.refresh().await.unwrap();
    assert_eq!(summary, RefreshSummary { lines: 5, schedules: 5 });
    assert_eq!(browser.load_count(), FULL_REFRESH_LOADS);
    assert_eq!(browser.closed_count(), FULL_REFRESH_LOADS);

    let snapshot = store.snapshot().await.unwrap();
    assert_eq!(snapshot.lines.len(), 5);
    assert_eq!(snapshot.lines[&id("M12")].line_type, LineType::Metropolitan);
    assert_eq!(snapshot.schedules[&id("24N")][0].station, "Manastur");
}

#[tokio::test]
async fn snapshot_hits_never_touch_the_browser() {
    let browser = Arc::new(site());
    let store = make_store(browser.clone());
    store.refresh().await.unwrap();
    let before = browser.load_count();

    assert_eq!(store.get_url(&id("25")).await.unwrap(), "https://ctpcj.ro/l/25");
    let schedule = store.get_schedule(&id("35")).await.unwrap();
    assert_eq!(
        schedule[0].departures,
        vec![friday().and_hms_opt(5, 35, 0).unwrap()]
    );
    assert_eq!(store.get_catalog().await.unwrap().len(), 5);
    assert_eq!(
        store.get_catalog_by_type(LineType::Night).await.unwrap().len(),
        1
    );
    let line = store.get_line(&id("m12")).await.unwrap();
    assert_eq!(line.stations.unwrap()[0].station, "Baciu");

    assert_eq!(browser.load_count(), before);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_snapshot() {
    let browser = Arc::new(site());
    let store = make_store(browser.clone());
    store.refresh().await.unwrap();
    let before = store.snapshot().await.unwrap();

    browser.set_page("https://ctpcj.ro/l/1", detail("Gara Noua", "05:11"));
    browser.fail_url("https://ctpcj.ro/l/35");

    let err = store.refresh().await.unwrap_err();
    assert_eq!(err.status(), 500);

    let after = store.snapshot().await.unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(after.schedules[&id("1")][0].station, "Gara");

    let status = store.status().await;
    assert!(status.last_error.unwrap().contains("l/35"));
    assert_eq!(status.last_summary, Some(RefreshSummary { lines: 5, schedules: 5 }));
}

#[tokio::test]
async fn one_bad_schedule_of_ten_fails_the_refresh() {
    let links: Vec<(String, String)> = (1..=10)
        .map(|n| (n.to_string(), format!("/l/{n}")))
        .collect();
    let link_refs: Vec<(&str, &str)> = links
        .iter()
        .map(|(id, href)| (id.as_str(), href.as_str()))
        .collect();

    let mut browser = MockBrowser::new()
        .with_page(url("linii-urbane/"), listing(&link_refs))
        .with_page(url("linii-metropolitane/"), listing(&[]))
        .with_page(url("transport-noapte/"), listing(&[]))
        .with_page(url("linie-expres/"), listing(&[]))
        .with_page(url("linii-supermarket/"), listing(&[]));
    for n in 1..=10 {
        browser = browser.with_page(format!("https://ctpcj.ro/l/{n}"), detail("Gara", "05:00"));
    }
    browser.fail_url("https://ctpcj.ro/l/7");
    let browser = Arc::new(browser);
    let store = make_store(browser.clone());

    assert!(store.refresh().await.is_err());
    assert!(store.snapshot().await.is_none());

    // Every sibling fetch still ran and released its page
    assert_eq!(browser.load_count(), 5 + 10);
    assert_eq!(browser.closed_count(), 5 + 9);
}

#[tokio::test]
async fn successful_refresh_replaces_snapshot() {
    let browser = Arc::new(site());
    let store = make_store(browser.clone());
    store.refresh().await.unwrap();

    browser.set_page("https://ctpcj.ro/l/1", detail("Gara Noua", "05:11"));
    store.refresh().await.unwrap();

    let schedule = store.get_schedule(&id("1")).await.unwrap();
    assert_eq!(schedule[0].station, "Gara Noua");
    assert!(store.status().await.last_error.is_none());
}

#[tokio::test]
async fn concurrent_refreshes_run_one_after_another() {
    let browser = Arc::new(site());
    let store = make_store(browser.clone());

    let (first, second) = tokio::join!(store.refresh(), store.refresh());
    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(browser.load_count(), 2 * FULL_REFRESH_LOADS);
    assert!(!store.is_refreshing());

    // The second refresh opens its first listing only after the first
    // refresh has closed every page it opened
    let events = browser.events();
    let first_done = events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, PageEvent::Closed(_)))
        .nth(FULL_REFRESH_LOADS - 1)
        .map(|(i, _)| i)
        .unwrap();
    let second_start = events
        .iter()
        .enumerate()
        .filter(|(_, e)| matches!(e, PageEvent::Opened(url) if url.starts_with(BASE)))
        .nth(LineType::ALL.len())
        .map(|(i, _)| i)
        .unwrap();
    assert!(
        second_start > first_done,
        "second refresh started at event {second_start}, first finished at {first_done}"
    );
}

#[tokio::test]
async fn live_lookups_are_memoised() {
    let browser = Arc::new(site());
    let store = make_store(browser.clone());

    let first = store.get_url(&id("35")).await.unwrap();
    let second = store.get_url(&id("35")).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(browser.load_count(), 1);

    store.get_schedule(&id("35")).await.unwrap();
    store.get_schedule(&id("35")).await.unwrap();
    // One detail page on top of the memoised URL lookup
    assert_eq!(browser.load_count(), 2);
}

#[tokio::test]
async fn live_misses_propagate_not_found() {
    let browser = Arc::new(site());
    let store = make_store(browser.clone());

    let err = store.get_schedule(&id("99")).await.unwrap_err();
    assert_eq!(err, ScrapeError::line_not_found(&id("99")));
    assert_eq!(err.status(), 404);
}

#[tokio::test]
async fn unknown_line_after_refresh_falls_back_to_live() {
    let browser = Arc::new(site());
    let store = make_store(browser.clone());
    store.refresh().await.unwrap();
    let before = browser.load_count();

    let err = store.get_url(&id("48")).await.unwrap_err();
    assert_eq!(err.status(), 404);
    assert_eq!(browser.load_count(), before + 1);
}

#[tokio::test]
async fn line_in_snapshot_without_schedule_is_fetched_live() {
    let browser = Arc::new(site());
    let store = make_store(browser.clone());

    let mut lines = Catalog::new();
    lines.insert(
        id("25"),
        LineRecord::new("https://ctpcj.ro/l/25", LineType::Urban),
    );
    *store.snapshot.write().await = Some(Arc::new(Snapshot {
        lines,
        schedules: Schedules::new(),
    }));

    let schedule = store.get_schedule(&id("25")).await.unwrap();
    assert_eq!(schedule[0].station, "Unirii");
    // URL came from the snapshot, so only the detail page was loaded
    assert_eq!(browser.load_count(), 1);
}

#[tokio::test]
async fn catalog_by_type_is_subset_of_full_catalog() {
    for refreshed in [false, true] {
        let store = make_store(Arc::new(site()));
        if refreshed {
            store.refresh().await.unwrap();
        }

        let full = store.get_catalog().await.unwrap();
        for line_type in LineType::ALL {
            let by_type = store.get_catalog_by_type(line_type).await.unwrap();
            for (line, record) in &by_type {
                assert_eq!(record.line_type, line_type);
                assert_eq!(full.get(line), Some(record));
            }
        }
    }
}

#[tokio::test]
async fn live_get_line_classifies_from_id() {
    let store = make_store(Arc::new(site()));

    let line = store.get_line(&id("24n")).await.unwrap();
    assert_eq!(line.url, "https://ctpcj.ro/l/24n");
    assert_eq!(line.line_type, LineType::Night);
    assert_eq!(line.stations.unwrap().len(), 1);
}

#[tokio::test]
async fn refresh_clears_live_memo() {
    let browser = Arc::new(site());
    let store = make_store(browser.clone());

    store.get_url(&id("35")).await.unwrap();
    assert!(store.live.get_url(&id("35")).await.is_some());
    store.refresh().await.unwrap();

    assert!(store.live.get_url(&id("35")).await.is_none());
    let status = store.status().await;
    assert!(status.last_started.is_some());
    assert!(status.last_success.is_some());
}

#[tokio::test(start_paused = true)]
async fn live_result_outlived_by_refresh_is_not_memoised() {
    let browser = Arc::new(site());
    browser.set_page("https://ctpcj.ro/l/slow", detail("Sopor", "05:07"));
    browser.delay_url("https://ctpcj.ro/l/slow", std::time::Duration::from_secs(1));
    let store = make_store(browser.clone());

    // Known to the snapshot without a schedule, so the lookup goes live
    let mut lines = Catalog::new();
    lines.insert(
        id("77"),
        LineRecord::new("https://ctpcj.ro/l/slow", LineType::Urban),
    );
    *store.snapshot.write().await = Some(Arc::new(Snapshot {
        lines,
        schedules: Schedules::new(),
    }));

    // The refresh finishes while the slow detail page is still loading
    let line_id = id("77");
    let (lookup, refresh) = tokio::join!(store.get_schedule(&line_id), store.refresh());
    assert_eq!(lookup.unwrap()[0].station, "Sopor");
    refresh.unwrap();

    assert!(store.live.get_schedule(&id("77")).await.is_none());
}
