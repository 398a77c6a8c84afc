//! Public-transport timetable server.
//!
//! Scrapes line listings and per-line timetables from a JavaScript-rendered
//! transit website through a headless browser, keeps a daily snapshot of
//! everything, and serves lookups over HTTP.

pub mod browser;
pub mod cache;
pub mod config;
pub mod domain;
pub mod scrape;
pub mod store;
pub mod web;
