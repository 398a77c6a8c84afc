//! In-memory browser for tests and offline development.
//!
//! Serves fixture HTML keyed by URL and records every page load, so tests
//! can assert how (and whether) the browser was driven.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scraper::{Html, Selector};

use super::{Browser, BrowserError, Page, ResourceFilter};

/// A recorded page load.
#[derive(Debug, Clone)]
pub struct PageLoad {
    pub url: String,
    pub filter: ResourceFilter,
}

/// A page opening or closing, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Opened(String),
    Closed(String),
}

/// Mock browser serving pre-registered pages.
#[derive(Default)]
pub struct MockBrowser {
    pages: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    loads: Mutex<Vec<PageLoad>>,
    events: Arc<Mutex<Vec<PageEvent>>>,
    closed: Arc<AtomicUsize>,
    shut_down: AtomicBool,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `html` as the content served for `url`.
    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.set_page(url, html);
        self
    }

    /// Register or replace the content served for `url`.
    pub fn set_page(&self, url: impl Into<String>, html: impl Into<String>) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.into(), html.into());
    }

    /// Make loads of `url` fail with a navigation error.
    pub fn fail_url(&self, url: impl Into<String>) {
        self.failing.lock().unwrap().insert(url.into());
    }

    /// Let loads of `url` succeed again.
    pub fn restore_url(&self, url: &str) {
        self.failing.lock().unwrap().remove(url);
    }

    /// Make loads of `url` take `delay` before the page is ready.
    pub fn delay_url(&self, url: impl Into<String>, delay: Duration) {
        self.delays.lock().unwrap().insert(url.into(), delay);
    }

    /// Every page load attempted so far, in order.
    pub fn loads(&self) -> Vec<PageLoad> {
        self.loads.lock().unwrap().clone()
    }

    pub fn load_count(&self) -> usize {
        self.loads.lock().unwrap().len()
    }

    /// Successful opens and closes so far, in order.
    pub fn events(&self) -> Vec<PageEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Number of pages closed so far.
    pub fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl Browser for MockBrowser {
    type Page = MockPage;

    async fn load_page(&self, url: &str, filter: &ResourceFilter) -> Result<MockPage, BrowserError> {
        if self.is_shut_down() {
            return Err(BrowserError::ShutDown);
        }

        self.loads.lock().unwrap().push(PageLoad {
            url: url.to_string(),
            filter: filter.clone(),
        });

        if self.failing.lock().unwrap().contains(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                message: "injected failure".to_string(),
            });
        }

        let html = self.pages.lock().unwrap().get(url).cloned().ok_or_else(|| {
            BrowserError::Navigation {
                url: url.to_string(),
                message: "404 Not Found".to_string(),
            }
        })?;

        let delay = self.delays.lock().unwrap().get(url).copied();
        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            // Yield so concurrent loads interleave like real navigation would
            None => tokio::task::yield_now().await,
        }

        self.events
            .lock()
            .unwrap()
            .push(PageEvent::Opened(url.to_string()));

        Ok(MockPage {
            url: url.to_string(),
            html,
            events: self.events.clone(),
            closed: self.closed.clone(),
        })
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}

/// A page served by [`MockBrowser`].
pub struct MockPage {
    url: String,
    html: String,
    events: Arc<Mutex<Vec<PageEvent>>>,
    closed: Arc<AtomicUsize>,
}

impl Page for MockPage {
    async fn wait_for(&self, selector: &str, _timeout: Duration) -> Result<(), BrowserError> {
        let parsed =
            Selector::parse(selector).map_err(|_| BrowserError::InvalidSelector(selector.into()))?;
        let found = Html::parse_document(&self.html)
            .select(&parsed)
            .next()
            .is_some();

        if found {
            Ok(())
        } else {
            Err(BrowserError::SelectorTimeout {
                selector: selector.to_string(),
                message: "element never appeared".to_string(),
            })
        }
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.html.clone())
    }

    async fn close(self) -> Result<(), BrowserError> {
        self.events.lock().unwrap().push(PageEvent::Closed(self.url));
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
