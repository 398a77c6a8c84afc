//! Short-lived memo of live lookup results.
//!
//! The snapshot only changes on refresh, so a line the snapshot doesn't
//! know about would otherwise be re-scraped on every request. Results of
//! such live lookups are kept here for a bounded time and dropped after
//! each successful refresh.

use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::domain::{Catalog, LineId, LineType, StationDeparture};

/// Cache key for catalogs: `None` is the full catalog.
type CatalogKey = Option<LineType>;

/// Configuration for the live-result cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries per kind.
    pub max_capacity: u64,
}

impl CacheConfig {
    /// Set a custom TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            max_capacity: 1000,
        }
    }
}

/// Memo of URLs, schedules and catalogs fetched on cache misses.
pub struct LiveCache {
    urls: MokaCache<LineId, String>,
    schedules: MokaCache<LineId, Vec<StationDeparture>>,
    catalogs: MokaCache<CatalogKey, Catalog>,
}

impl LiveCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            urls: MokaCache::builder()
                .time_to_live(config.ttl)
                .max_capacity(config.max_capacity)
                .build(),
            schedules: MokaCache::builder()
                .time_to_live(config.ttl)
                .max_capacity(config.max_capacity)
                .build(),
            catalogs: MokaCache::builder()
                .time_to_live(config.ttl)
                .max_capacity(config.max_capacity)
                .build(),
        }
    }

    pub async fn get_url(&self, id: &LineId) -> Option<String> {
        self.urls.get(id).await
    }

    pub async fn insert_url(&self, id: LineId, url: String) {
        self.urls.insert(id, url).await;
    }

    pub async fn invalidate_url(&self, id: &LineId) {
        self.urls.invalidate(id).await;
    }

    pub async fn get_schedule(&self, id: &LineId) -> Option<Vec<StationDeparture>> {
        self.schedules.get(id).await
    }

    pub async fn insert_schedule(&self, id: LineId, schedule: Vec<StationDeparture>) {
        self.schedules.insert(id, schedule).await;
    }

    pub async fn invalidate_schedule(&self, id: &LineId) {
        self.schedules.invalidate(id).await;
    }

    /// Cached catalog for one type, or the full catalog for `None`.
    pub async fn get_catalog(&self, line_type: Option<LineType>) -> Option<Catalog> {
        self.catalogs.get(&line_type).await
    }

    pub async fn insert_catalog(&self, line_type: Option<LineType>, catalog: Catalog) {
        self.catalogs.insert(line_type, catalog).await;
    }

    pub async fn invalidate_catalog(&self, line_type: Option<LineType>) {
        self.catalogs.invalidate(&line_type).await;
    }

    /// Approximate number of cached entries (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.urls.entry_count() + self.schedules.entry_count() + self.catalogs.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.urls.invalidate_all();
        self.schedules.invalidate_all();
        self.catalogs.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LineRecord;

    fn id(s: &str) -> LineId {
        LineId::parse_normalized(s).unwrap()
    }

    #[test]
    fn default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(600));
        assert_eq!(config.max_capacity, 1000);
    }

    #[test]
    fn cache_creation() {
        let cache = LiveCache::new(&CacheConfig::default());
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn stores_and_returns_entries() {
        let cache = LiveCache::new(&CacheConfig::default());

        cache.insert_url(id("35"), "https://ctpcj.ro/l/35".into()).await;
        assert_eq!(
            cache.get_url(&id("35")).await.as_deref(),
            Some("https://ctpcj.ro/l/35")
        );
        assert_eq!(cache.get_url(&id("36")).await, None);

        let schedule = vec![StationDeparture::new("Gara")];
        cache.insert_schedule(id("35"), schedule.clone()).await;
        assert_eq!(cache.get_schedule(&id("35")).await, Some(schedule));
    }

    #[tokio::test]
    async fn catalogs_keyed_by_type() {
        let cache = LiveCache::new(&CacheConfig::default());
        let mut urban = Catalog::new();
        urban.insert(id("35"), LineRecord::new("https://ctpcj.ro/l/35", LineType::Urban));

        cache.insert_catalog(Some(LineType::Urban), urban.clone()).await;
        assert_eq!(cache.get_catalog(Some(LineType::Urban)).await, Some(urban));
        assert_eq!(cache.get_catalog(None).await, None);
        assert_eq!(cache.get_catalog(Some(LineType::Night)).await, None);
    }

    #[tokio::test]
    async fn invalidate_all_clears_everything() {
        let cache = LiveCache::new(&CacheConfig::default());
        cache.insert_url(id("35"), "u".into()).await;
        cache.insert_catalog(None, Catalog::new()).await;

        cache.invalidate_all();

        assert_eq!(cache.get_url(&id("35")).await, None);
        assert_eq!(cache.get_catalog(None).await, None);
    }

    #[tokio::test]
    async fn invalidate_single_entries() {
        let cache = LiveCache::new(&CacheConfig::default());
        cache.insert_url(id("35"), "u".into()).await;
        cache.insert_url(id("36"), "v".into()).await;
        cache.insert_schedule(id("35"), Vec::new()).await;
        cache.insert_catalog(Some(LineType::Night), Catalog::new()).await;

        cache.invalidate_url(&id("35")).await;
        cache.invalidate_schedule(&id("35")).await;
        cache.invalidate_catalog(Some(LineType::Night)).await;

        assert_eq!(cache.get_url(&id("35")).await, None);
        assert_eq!(cache.get_url(&id("36")).await.as_deref(), Some("v"));
        assert_eq!(cache.get_schedule(&id("35")).await, None);
        assert_eq!(cache.get_catalog(Some(LineType::Night)).await, None);
    }
}
