//! Scraper configuration.

use std::time::Duration;

use reqwest::Url;

use crate::browser::ResourceFilter;
use crate::domain::LineType;

use super::error::ScrapeError;

/// Root of the source site's timetable section.
pub const DEFAULT_BASE_URL: &str = "https://ctpcj.ro/index.php/ro/orare-linii/";

/// Default time to wait for a page's content to render.
const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`Scraper`](super::Scraper).
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Timetable root; listing pages live directly below it.
    pub base_url: Url,

    /// How long to wait for a listing or timetable to appear.
    pub page_timeout: Duration,

    /// Sub-resources page loads may fetch.
    pub filter: ResourceFilter,
}

impl ScraperConfig {
    /// Create a configuration rooted at `base_url`.
    ///
    /// A trailing slash is added if missing so listing slugs resolve
    /// beneath the root rather than replacing its last segment.
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Self {
            base_url,
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            filter: ResourceFilter::default(),
        }
    }

    /// Set the render timeout.
    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    /// Set the resource filter.
    pub fn with_filter(mut self, filter: ResourceFilter) -> Self {
        self.filter = filter;
        self
    }

    /// URL of the listing page for `line_type`.
    pub fn listing_url(&self, line_type: LineType) -> Result<Url, ScrapeError> {
        self.base_url
            .join(line_type.slug())
            .map_err(|e| ScrapeError::Upstream {
                message: format!("cannot build {line_type} listing URL: {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ScraperConfig::new(Url::parse(DEFAULT_BASE_URL).unwrap());
        assert_eq!(config.page_timeout, Duration::from_secs(30));
        assert_eq!(config.filter, ResourceFilter::default());
    }

    #[test]
    fn listing_urls() {
        let config = ScraperConfig::new(Url::parse(DEFAULT_BASE_URL).unwrap());
        assert_eq!(
            config.listing_url(LineType::Urban).unwrap().as_str(),
            "https://ctpcj.ro/index.php/ro/orare-linii/linii-urbane/"
        );
        assert_eq!(
            config.listing_url(LineType::Night).unwrap().as_str(),
            "https://ctpcj.ro/index.php/ro/orare-linii/transport-noapte/"
        );
        assert_eq!(
            config.listing_url(LineType::Supermarket).unwrap().as_str(),
            "https://ctpcj.ro/index.php/ro/orare-linii/linii-supermarket/"
        );
    }

    #[test]
    fn adds_missing_trailing_slash() {
        let config = ScraperConfig::new(Url::parse("http://localhost:8000/orare").unwrap());
        assert_eq!(
            config.listing_url(LineType::Express).unwrap().as_str(),
            "http://localhost:8000/orare/linie-expres/"
        );
    }

    #[test]
    fn builders() {
        let config = ScraperConfig::new(Url::parse(DEFAULT_BASE_URL).unwrap())
            .with_page_timeout(Duration::from_secs(5))
            .with_filter(ResourceFilter::allow_all());
        assert_eq!(config.page_timeout, Duration::from_secs(5));
        assert_eq!(config.filter, ResourceFilter::allow_all());
    }
}
