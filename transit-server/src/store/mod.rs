//! Cached line data with periodic refresh.
//!
//! [`LineStore`] keeps the last successfully scraped catalog and schedules
//! as one immutable [`Snapshot`]. Lookups read the snapshot first and only
//! drive the browser on a miss. The snapshot is replaced wholesale by
//! [`LineStore::refresh`], never patched in place.

mod schedule;
#[cfg(test)]
mod store_tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::browser::Browser;
use crate::cache::{CacheConfig, LiveCache};
use crate::domain::{Catalog, LineId, LineRecord, LineType, Schedules, StationDeparture};
use crate::scrape::{ScrapeError, Scraper};

pub use schedule::{RefreshSchedule, spawn_refresh_loop};

/// Catalog and schedules from one complete refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub lines: Catalog,

    /// Not every line in `lines` is guaranteed an entry here.
    pub schedules: Schedules,
}

impl Snapshot {
    /// Lines of one type.
    pub fn lines_of_type(&self, line_type: LineType) -> Catalog {
        self.lines
            .iter()
            .filter(|(_, record)| record.line_type == line_type)
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }
}

/// Counts from a successful refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub lines: usize,
    pub schedules: usize,
}

/// Observable state of the refresh lifecycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshStatus {
    /// When the most recent refresh started.
    pub last_started: Option<DateTime<Local>>,

    /// When a refresh last replaced the snapshot.
    pub last_success: Option<DateTime<Local>>,

    /// Counts from the last successful refresh.
    pub last_summary: Option<RefreshSummary>,

    /// Error from the most recent refresh, if it failed.
    pub last_error: Option<String>,
}

/// Cache-first access to line data.
pub struct LineStore<B> {
    scraper: Scraper<B>,

    /// `None` until the first successful refresh.
    snapshot: RwLock<Option<Arc<Snapshot>>>,

    /// Results of live lookups made on snapshot misses.
    live: LiveCache,

    /// Held for the whole of a refresh so refreshes never interleave.
    refresh_lock: Mutex<()>,

    /// Bumped by every successful refresh, so live results fetched across
    /// a refresh are not memoised past it.
    generation: AtomicU64,

    status: RwLock<RefreshStatus>,
}

impl<B: Browser> LineStore<B> {
    /// Create an empty store. Nothing is fetched until a lookup or refresh.
    pub fn new(scraper: Scraper<B>, cache_config: &CacheConfig) -> Self {
        Self {
            scraper,
            snapshot: RwLock::new(None),
            live: LiveCache::new(cache_config),
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            status: RwLock::new(RefreshStatus::default()),
        }
    }

    pub fn scraper(&self) -> &Scraper<B> {
        &self.scraper
    }

    /// The current snapshot, or `None` if no refresh has succeeded yet.
    pub async fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.read().await.clone()
    }

    pub async fn status(&self) -> RefreshStatus {
        self.status.read().await.clone()
    }

    /// Whether a refresh is currently running.
    pub fn is_refreshing(&self) -> bool {
        self.refresh_lock.try_lock().is_err()
    }

    /// Approximate number of memoised live results.
    pub fn live_entry_count(&self) -> u64 {
        self.live.entry_count()
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether a successful refresh has completed since `started`.
    fn refreshed_since(&self, started: u64) -> bool {
        self.generation() != started
    }

    /// Detail-page URL of a line.
    pub async fn get_url(&self, id: &LineId) -> Result<String, ScrapeError> {
        if let Some(snapshot) = self.snapshot().await
            && let Some(record) = snapshot.lines.get(id)
        {
            return Ok(record.url.clone());
        }

        if let Some(url) = self.live.get_url(id).await {
            return Ok(url);
        }

        debug!(line = %id, "URL cache miss");
        let started = self.generation();
        let url = self.scraper.fetch_url(id).await?;

        // Checked after inserting: a refresh finishing in between either
        // clears the entry itself or is seen here
        self.live.insert_url(id.clone(), url.clone()).await;
        if self.refreshed_since(started) {
            self.live.invalidate_url(id).await;
        }
        Ok(url)
    }

    /// Today's departures for a line, per station.
    pub async fn get_schedule(&self, id: &LineId) -> Result<Vec<StationDeparture>, ScrapeError> {
        if let Some(snapshot) = self.snapshot().await
            && let Some(schedule) = snapshot.schedules.get(id)
        {
            return Ok(schedule.clone());
        }

        if let Some(schedule) = self.live.get_schedule(id).await {
            return Ok(schedule);
        }

        debug!(line = %id, "Schedule cache miss");
        let started = self.generation();
        let url = self.get_url(id).await?;
        let schedule = self.scraper.fetch_schedule_at(&url).await?;

        self.live.insert_schedule(id.clone(), schedule.clone()).await;
        if self.refreshed_since(started) {
            self.live.invalidate_schedule(id).await;
        }
        Ok(schedule)
    }

    /// A line's record with its schedule joined in.
    pub async fn get_line(&self, id: &LineId) -> Result<LineRecord, ScrapeError> {
        let cached = self
            .snapshot()
            .await
            .and_then(|snapshot| snapshot.lines.get(id).cloned());

        let record = match cached {
            Some(record) => record,
            None => LineRecord::new(self.get_url(id).await?, id.line_type()),
        };

        let stations = self.get_schedule(id).await?;
        Ok(record.with_stations(stations))
    }

    /// Every line of every type.
    pub async fn get_catalog(&self) -> Result<Catalog, ScrapeError> {
        if let Some(snapshot) = self.snapshot().await {
            return Ok(snapshot.lines.clone());
        }

        if let Some(catalog) = self.live.get_catalog(None).await {
            return Ok(catalog);
        }

        debug!("Catalog cache miss");
        let started = self.generation();
        let catalog = self.scraper.fetch_catalog().await?;

        self.live.insert_catalog(None, catalog.clone()).await;
        if self.refreshed_since(started) {
            self.live.invalidate_catalog(None).await;
        }
        Ok(catalog)
    }

    /// Every line of one type.
    pub async fn get_catalog_by_type(&self, line_type: LineType) -> Result<Catalog, ScrapeError> {
        if let Some(snapshot) = self.snapshot().await {
            return Ok(snapshot.lines_of_type(line_type));
        }

        if let Some(catalog) = self.live.get_catalog(Some(line_type)).await {
            return Ok(catalog);
        }

        debug!(%line_type, "Catalog cache miss");
        let started = self.generation();
        let catalog = self.scraper.fetch_catalog_by_type(line_type).await?;

        self.live
            .insert_catalog(Some(line_type), catalog.clone())
            .await;
        if self.refreshed_since(started) {
            self.live.invalidate_catalog(Some(line_type)).await;
        }
        Ok(catalog)
    }

    /// Re-scrape the full catalog and every schedule, then swap the snapshot.
    ///
    /// All-or-nothing: if the catalog or any single schedule fails, the
    /// previous snapshot is kept untouched and the error is returned.
    /// Concurrent calls queue behind each other.
    pub async fn refresh(&self) -> Result<RefreshSummary, ScrapeError> {
        let _guard = self.refresh_lock.lock().await;

        info!("Started data refresh");
        self.status.write().await.last_started = Some(Local::now());

        match self.scrape_snapshot().await {
            Ok(snapshot) => {
                let summary = RefreshSummary {
                    lines: snapshot.lines.len(),
                    schedules: snapshot.schedules.len(),
                };

                *self.snapshot.write().await = Some(Arc::new(snapshot));
                self.generation.fetch_add(1, Ordering::SeqCst);
                self.live.invalidate_all();

                let mut status = self.status.write().await;
                status.last_success = Some(Local::now());
                status.last_summary = Some(summary);
                status.last_error = None;

                info!(
                    lines = summary.lines,
                    schedules = summary.schedules,
                    "Finished data refresh"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, "Failed data refresh, keeping previous snapshot");
                self.status.write().await.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn scrape_snapshot(&self) -> Result<Snapshot, ScrapeError> {
        let lines = self.scraper.fetch_catalog().await?;
        let schedules = self.scraper.fetch_schedules(&lines).await?;
        Ok(Snapshot { lines, schedules })
    }
}
