//! Live scraping operations.
//!
//! Every operation here loads pages through the browser; nothing is cached.
//! Cache-first lookups live in [`crate::store`].

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use scraper::Html;
use tracing::{debug, warn};

use crate::browser::{Browser, BrowserError, Page};
use crate::domain::{Catalog, LineId, LineType, Schedules, StationDeparture};

use super::catalog::{LISTING_SELECTOR, extract_catalog, find_line_url};
use super::config::ScraperConfig;
use super::error::ScrapeError;
use super::fanout::gather;
use super::timetable::{TIMETABLE_SELECTOR, extract_timetable};

/// Source of the current service day.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Scrapes line listings and timetables through a [`Browser`].
pub struct Scraper<B> {
    browser: Arc<B>,
    config: ScraperConfig,
    today: Clock,
}

impl<B: Browser> Scraper<B> {
    /// Create a scraper using the local calendar day for timetable selection.
    pub fn new(browser: Arc<B>, config: ScraperConfig) -> Self {
        Self {
            browser,
            config,
            today: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Replace the service-day clock (for tests).
    pub fn with_clock(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }

    pub fn browser(&self) -> &Arc<B> {
        &self.browser
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// The service day timetables are currently read for.
    pub fn service_day(&self) -> NaiveDate {
        (self.today)()
    }

    /// Load `url`, wait for `selector`, run `extract` on the DOM, and close
    /// the page whatever happened.
    async fn with_page<T, F>(&self, url: &str, selector: &str, extract: F) -> Result<T, ScrapeError>
    where
        F: FnOnce(&Html) -> T + Send,
        T: Send,
    {
        debug!(url, "Loading page");
        let page = self.browser.load_page(url, &self.config.filter).await?;

        let outcome: Result<T, BrowserError> = async {
            page.wait_for(selector, self.config.page_timeout).await?;
            page.evaluate(extract).await
        }
        .await;

        if let Err(e) = page.close().await {
            warn!(url, error = %e, "Failed to close page");
        }

        Ok(outcome?)
    }

    /// Resolve a line's detail-page URL from its type's listing page.
    pub async fn fetch_url(&self, id: &LineId) -> Result<String, ScrapeError> {
        let listing = self.config.listing_url(id.line_type())?;

        self.with_page(listing.as_str(), LISTING_SELECTOR, |document| {
            find_line_url(document, &listing, id)
        })
        .await?
        .ok_or_else(|| ScrapeError::line_not_found(id))
    }

    /// Resolve a line's URL, then read today's timetable from it.
    pub async fn fetch_schedule(&self, id: &LineId) -> Result<Vec<StationDeparture>, ScrapeError> {
        let url = self.fetch_url(id).await?;
        self.fetch_schedule_at(&url).await
    }

    /// Read today's timetable from a known detail-page URL.
    pub async fn fetch_schedule_at(&self, url: &str) -> Result<Vec<StationDeparture>, ScrapeError> {
        let service_day = self.service_day();

        self.with_page(url, TIMETABLE_SELECTOR, move |document| {
            extract_timetable(document, service_day)
        })
        .await
    }

    /// All lines advertised on one type's listing page.
    pub async fn fetch_catalog_by_type(&self, line_type: LineType) -> Result<Catalog, ScrapeError> {
        let listing = self.config.listing_url(line_type)?;

        self.with_page(listing.as_str(), LISTING_SELECTOR, |document| {
            extract_catalog(document, &listing, line_type)
        })
        .await
    }

    /// All lines of every type, fetched concurrently and merged.
    ///
    /// Fails with the first error any listing produces.
    pub async fn fetch_catalog(&self) -> Result<Catalog, ScrapeError> {
        let parts = gather(
            LineType::ALL.map(|line_type| self.fetch_catalog_by_type(line_type)),
        )
        .await?;

        // Identifiers are unique across types; on collision the later part wins.
        let catalog: Catalog = parts.into_iter().flatten().collect();
        debug!(lines = catalog.len(), "Fetched full catalog");
        Ok(catalog)
    }

    /// Today's timetable for every line in `catalog`, fetched concurrently.
    ///
    /// All-or-nothing: any failed line fails the whole batch.
    pub async fn fetch_schedules(&self, catalog: &Catalog) -> Result<Schedules, ScrapeError> {
        let fetches = catalog.iter().map(|(id, record)| async move {
            let schedule = self.fetch_schedule_at(&record.url).await.map_err(|e| {
                warn!(line = %id, error = %e, "Failed to fetch schedule");
                e
            })?;
            Ok::<_, ScrapeError>((id.clone(), schedule))
        });

        Ok(gather(fetches).await?.into_iter().collect())
    }
}
