//! Chrome driven over the WebDriver protocol.
//!
//! Pages are served by a small pool of long-lived WebDriver sessions, so
//! each Chrome process is started once and reused across page loads. The
//! server is probed lazily on the first page load; a semaphore bounds how
//! many pages (and so how many sessions) are in use at once.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thirtyfour::extensions::cdp::ChromeDevTools;
use thirtyfour::ChromeCapabilities;
use thirtyfour::prelude::*;
use tokio::sync::{Mutex, OnceCell, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use super::{Browser, BrowserError, Page, ResourceFilter};

/// Default chromedriver endpoint.
const DEFAULT_SERVER_URL: &str = "http://localhost:9515";

/// Default maximum number of simultaneously open pages.
const DEFAULT_MAX_CONCURRENT_PAGES: usize = 4;

/// How often to poll for an awaited selector.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Configuration for the WebDriver-backed browser.
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// Base URL of the WebDriver server
    pub server_url: String,
    /// Maximum simultaneously open pages (sessions)
    pub max_concurrent_pages: usize,
    /// Timeout for the readiness probe, in seconds
    pub probe_timeout_secs: u64,
}

impl WebDriverConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            max_concurrent_pages: DEFAULT_MAX_CONCURRENT_PAGES,
            probe_timeout_secs: 10,
        }
    }

    /// Set maximum simultaneously open pages.
    pub fn with_max_concurrent_pages(mut self, n: usize) -> Self {
        self.max_concurrent_pages = n.max(1);
        self
    }
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

/// Body of the WebDriver `GET /status` response.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    value: StatusValue,
}

#[derive(Debug, Deserialize)]
struct StatusValue {
    ready: bool,
    #[serde(default)]
    message: String,
}

/// Idle sessions waiting for their next page.
#[derive(Debug)]
struct SessionPool<S> {
    state: Mutex<PoolState<S>>,
}

#[derive(Debug)]
struct PoolState<S> {
    idle: Vec<S>,
    shut_down: bool,
}

impl<S> SessionPool<S> {
    fn new() -> Self {
        Self {
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                shut_down: false,
            }),
        }
    }

    /// An idle session, if there is one.
    async fn take(&self) -> Option<S> {
        self.state.lock().await.idle.pop()
    }

    /// Return a session for reuse. Hands it back if the pool is shut down.
    async fn put_back(&self, session: S) -> Result<(), S> {
        let mut state = self.state.lock().await;
        if state.shut_down {
            return Err(session);
        }
        state.idle.push(session);
        Ok(())
    }

    /// Refuse further sessions and hand over every idle one.
    async fn drain(&self) -> Vec<S> {
        let mut state = self.state.lock().await;
        state.shut_down = true;
        std::mem::take(&mut state.idle)
    }
}

/// Headless Chrome reached through a WebDriver server.
#[derive(Debug)]
pub struct WebDriverBrowser {
    server_url: String,
    http: reqwest::Client,
    ready: OnceCell<()>,
    pages: Arc<Semaphore>,
    sessions: Arc<SessionPool<WebDriver>>,
}

impl WebDriverBrowser {
    /// Create the browser handle. No connection is made until the first page load.
    pub fn new(config: WebDriverConfig) -> Result<Self, BrowserError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.probe_timeout_secs))
            .build()?;

        Ok(Self {
            server_url: config.server_url.trim_end_matches('/').to_string(),
            http,
            ready: OnceCell::new(),
            pages: Arc::new(Semaphore::new(config.max_concurrent_pages.max(1))),
            sessions: Arc::new(SessionPool::new()),
        })
    }

    /// Check once that the WebDriver server accepts sessions.
    async fn ensure_ready(&self) -> Result<(), BrowserError> {
        self.ready
            .get_or_try_init(|| self.probe())
            .await
            .map(|_| ())
    }

    async fn probe(&self) -> Result<(), BrowserError> {
        let url = format!("{}/status", self.server_url);
        let status: StatusResponse = self.http.get(&url).send().await?.json().await?;

        if !status.value.ready {
            return Err(BrowserError::Unavailable {
                message: status.value.message,
            });
        }

        debug!(server = %self.server_url, "WebDriver server ready");
        Ok(())
    }

    /// Reuse an idle session or start a new one.
    async fn session(&self) -> Result<WebDriver, BrowserError> {
        if let Some(driver) = self.sessions.take().await {
            return Ok(driver);
        }

        debug!(server = %self.server_url, "Starting WebDriver session");
        Ok(WebDriver::new(self.server_url.as_str(), Self::capabilities()).await?)
    }

    fn capabilities() -> ChromeCapabilities {
        let mut caps = DesiredCapabilities::chrome();
        let chrome_options = json!({
            "args": [
                "--headless",
                "--disable-gpu",
                "--no-sandbox",
                "--disable-dev-shm-usage"
            ]
        });
        caps.insert_base_capability("goog:chromeOptions".to_string(), chrome_options);
        // Return once the DOM is parsed; we don't wait for sub-resources
        caps.insert_base_capability("pageLoadStrategy".to_string(), json!("eager"));
        caps
    }
}

/// Block filtered resources, then navigate.
///
/// The block list is set on every load, even when empty, since a reused
/// session still carries the previous page's list.
async fn prepare(
    driver: &WebDriver,
    url: &str,
    filter: &ResourceFilter,
) -> Result<(), BrowserError> {
    let dev_tools = ChromeDevTools::new(driver.handle.clone());
    dev_tools.execute_cdp("Network.enable").await?;
    dev_tools
        .execute_cdp_with_params(
            "Network.setBlockedURLs",
            json!({ "urls": filter.blocked_url_patterns() }),
        )
        .await?;

    driver
        .goto(url)
        .await
        .map_err(|e| BrowserError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })
}

impl Browser for WebDriverBrowser {
    type Page = WebDriverPage;

    async fn load_page(
        &self,
        url: &str,
        filter: &ResourceFilter,
    ) -> Result<WebDriverPage, BrowserError> {
        let permit = self
            .pages
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| BrowserError::ShutDown)?;

        self.ensure_ready().await?;

        let driver = self.session().await?;

        // A session that failed to navigate may be broken, so it is not reused
        if let Err(e) = prepare(&driver, url, filter).await {
            if let Err(quit_err) = driver.quit().await {
                warn!(error = %quit_err, "Failed to end WebDriver session");
            }
            return Err(e);
        }

        debug!(url, "Page loaded");
        Ok(WebDriverPage {
            driver,
            sessions: self.sessions.clone(),
            _permit: permit,
        })
    }

    async fn shutdown(&self) {
        self.pages.close();

        for driver in self.sessions.drain().await {
            if let Err(e) = driver.quit().await {
                warn!(error = %e, "Failed to end WebDriver session");
            }
        }
        debug!(server = %self.server_url, "Browser shut down");
    }
}

/// One page, shown in a session borrowed from the pool.
pub struct WebDriverPage {
    driver: WebDriver,
    sessions: Arc<SessionPool<WebDriver>>,
    _permit: OwnedSemaphorePermit,
}

impl Page for WebDriverPage {
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.driver
            .query(By::Css(selector))
            .wait(timeout, POLL_INTERVAL)
            .first()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::SelectorTimeout {
                selector: selector.to_string(),
                message: e.to_string(),
            })
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.driver.source().await?)
    }

    /// Hand the session back for the next page; it is only ended once the
    /// browser has shut down.
    async fn close(self) -> Result<(), BrowserError> {
        if let Err(driver) = self.sessions.put_back(self.driver).await {
            driver.quit().await?;
        }
        Ok(())
    }
}
