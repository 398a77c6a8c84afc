//! Scraping of line listings and timetables.
//!
//! Extractors are pure functions over a rendered DOM; [`Scraper`] drives
//! the browser to produce that DOM and fans out across lines and types.

mod catalog;
mod client;
mod config;
mod error;
mod fanout;
mod timetable;

pub use catalog::{LISTING_SELECTOR, anchor_line_id, extract_catalog, find_line_url};
pub use client::{Clock, Scraper};
pub use config::{DEFAULT_BASE_URL, ScraperConfig};
pub use error::ScrapeError;
pub use fanout::gather;
pub use timetable::{TIMETABLE_SELECTOR, extract_table, extract_timetable};
