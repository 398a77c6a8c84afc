//! Headless browser capability.
//!
//! The source site renders its timetables client-side, so pages are loaded
//! in a real browser and the rendered DOM is handed to extractors. The core
//! only depends on the [`Browser`] and [`Page`] traits:
//!
//! - [`webdriver::WebDriverBrowser`] drives Chrome through a WebDriver server
//! - [`mock::MockBrowser`] serves fixture HTML for tests and offline runs

mod error;
mod filter;
pub mod mock;
pub mod webdriver;

use std::future::Future;
use std::time::Duration;

use scraper::Html;

pub use error::BrowserError;
pub use filter::{ResourceFilter, ResourceType};
pub use webdriver::{WebDriverBrowser, WebDriverConfig};

/// A browser able to open pages.
///
/// Implementations are shared across concurrent lookups, so each page load
/// must be independent of the others.
pub trait Browser: Send + Sync + 'static {
    type Page: Page;

    /// Open a new page and navigate to `url`, fetching only the
    /// sub-resources `filter` allows.
    fn load_page(
        &self,
        url: &str,
        filter: &ResourceFilter,
    ) -> impl Future<Output = Result<Self::Page, BrowserError>> + Send;

    /// Release browser resources. Pages can no longer be opened afterwards.
    fn shutdown(&self) -> impl Future<Output = ()> + Send;
}

/// A loaded page. Must be [`closed`](Page::close) once the caller is done.
pub trait Page: Send + Sync {
    /// Wait until an element matching the CSS `selector` is present.
    fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), BrowserError>> + Send;

    /// Serialized HTML of the current DOM.
    fn content(&self) -> impl Future<Output = Result<String, BrowserError>> + Send;

    /// Run `extract` against the current DOM.
    fn evaluate<T, F>(&self, extract: F) -> impl Future<Output = Result<T, BrowserError>> + Send
    where
        F: FnOnce(&Html) -> T + Send,
        T: Send,
    {
        async move {
            let source = self.content().await?;
            let document = Html::parse_document(&source);
            Ok(extract(&document))
        }
    }

    fn close(self) -> impl Future<Output = Result<(), BrowserError>> + Send;
}
