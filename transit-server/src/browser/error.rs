//! Browser error types.

/// Errors raised while driving the headless browser.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// The WebDriver protocol call failed
    #[error("webdriver error: {0}")]
    WebDriver(#[from] thirtyfour::error::WebDriverError),

    /// Probing the WebDriver server failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The WebDriver server answered but is not accepting sessions
    #[error("browser unavailable: {message}")]
    Unavailable { message: String },

    /// Navigation to a page failed
    #[error("failed to load {url}: {message}")]
    Navigation { url: String, message: String },

    /// The expected element never appeared
    #[error("timed out waiting for {selector:?}: {message}")]
    SelectorTimeout { selector: String, message: String },

    /// The selector itself is not valid CSS
    #[error("invalid selector {0:?}")]
    InvalidSelector(String),

    /// The browser has been shut down
    #[error("browser has been shut down")]
    ShutDown,
}
