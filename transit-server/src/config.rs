//! Process configuration read from environment variables.
//!
//! | Variable               | Default                                       |
//! |------------------------|-----------------------------------------------|
//! | `BIND_ADDR`            | `127.0.0.1:8080`                              |
//! | `WEBDRIVER_URL`        | `http://localhost:9515`                       |
//! | `SOURCE_BASE_URL`      | `https://ctpcj.ro/index.php/ro/orare-linii/`  |
//! | `MAX_CONCURRENT_PAGES` | `4`                                           |
//! | `PAGE_TIMEOUT_SECS`    | `30`                                          |
//! | `REFRESH_AT`           | `03:00`                                       |
//! | `LIVE_CACHE_TTL_SECS`  | `600`                                         |

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;
use reqwest::Url;
use thiserror::Error;

use crate::browser::WebDriverConfig;
use crate::cache::CacheConfig;
use crate::scrape::{DEFAULT_BASE_URL, ScraperConfig};
use crate::store::RefreshSchedule;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
const DEFAULT_MAX_CONCURRENT_PAGES: usize = 4;
const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REFRESH_AT: &str = "03:00";
const DEFAULT_LIVE_CACHE_TTL_SECS: u64 = 600;

/// A variable was set but could not be parsed.
#[derive(Debug, Error)]
#[error("invalid {name}={value:?}: {reason}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub webdriver: WebDriverConfig,
    pub scraper: ScraperConfig,
    pub cache: CacheConfig,
    pub refresh: RefreshSchedule,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for
    /// unset or empty variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &'static str, default: &str| -> (&'static str, String) {
            let value = lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string());
            (name, value)
        };

        let bind_addr: SocketAddr = parse(get("BIND_ADDR", DEFAULT_BIND_ADDR))?;
        let webdriver_url = get("WEBDRIVER_URL", DEFAULT_WEBDRIVER_URL).1;
        let base_url: Url = parse(get("SOURCE_BASE_URL", DEFAULT_BASE_URL))?;
        let max_pages: usize = parse(get(
            "MAX_CONCURRENT_PAGES",
            &DEFAULT_MAX_CONCURRENT_PAGES.to_string(),
        ))?;
        let page_timeout: u64 = parse(get(
            "PAGE_TIMEOUT_SECS",
            &DEFAULT_PAGE_TIMEOUT_SECS.to_string(),
        ))?;
        let refresh_at = parse_time(get("REFRESH_AT", DEFAULT_REFRESH_AT))?;
        let ttl: u64 = parse(get(
            "LIVE_CACHE_TTL_SECS",
            &DEFAULT_LIVE_CACHE_TTL_SECS.to_string(),
        ))?;

        Ok(Self {
            bind_addr,
            webdriver: WebDriverConfig::new(webdriver_url).with_max_concurrent_pages(max_pages),
            scraper: ScraperConfig::new(base_url)
                .with_page_timeout(Duration::from_secs(page_timeout)),
            cache: CacheConfig::default().with_ttl(Duration::from_secs(ttl)),
            refresh: RefreshSchedule::daily_at(refresh_at),
        })
    }
}

fn parse<T>((name, value): (&'static str, String)) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError {
        name,
        reason: e.to_string(),
        value,
    })
}

fn parse_time((name, value): (&'static str, String)) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(&value, "%H:%M").map_err(|e| ConfigError {
        name,
        reason: e.to_string(),
        value,
    })
}
