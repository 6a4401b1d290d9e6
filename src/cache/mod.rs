//! Shared caches for expensive reads performed by concurrent validators
//!
//! Validators running in parallel often need the same data: the list of
//! posts, each post's parsed frontmatter, the status of an external link.
//! [`CacheManager`] owns one cache per concern, each with its own policy:
//!
//! - **Frontmatter**: keyed by path, revalidated against mtime and size on
//!   every lookup, so an edited file is never served from a stale parse
//! - **HTTP**: keyed by normalized URL, expires after a fixed TTL; concurrent
//!   requests for one URL share a single fetch
//! - **Discovery**: directory listings, expire after a short TTL
//!
//! Each cache guards its map with its own mutex and never holds it across
//! I/O. Hit/miss counters are shared atomics.

pub mod clock;
pub mod discovery;
pub mod frontmatter;
pub mod http;
pub mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use discovery::DiscoveryCache;
pub use frontmatter::{Document, FrontmatterCache};
pub use http::{FetchedResponse, HttpCache, HttpFetcher, HttpResponse, ReqwestFetcher};
pub use stats::{CacheKind, CacheStats, HitMiss, StatsSnapshot};

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::config::CacheConfig;

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// TTLs, timeouts and discovery patterns for a [`CacheManager`]
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub http_ttl: Duration,
    pub http_timeout: Duration,
    pub discovery_ttl: Duration,
    pub discovery_patterns: Vec<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            http_ttl: Duration::from_secs(600),
            http_timeout: Duration::from_secs(10),
            discovery_ttl: Duration::from_secs(60),
            discovery_patterns: vec!["*.md".to_string()],
        }
    }
}

impl CacheSettings {
    pub fn from_config(config: &CacheConfig, discovery_patterns: &[String]) -> Self {
        Self {
            http_ttl: Duration::from_secs(config.http_ttl_secs),
            http_timeout: Duration::from_secs(config.http_timeout_secs),
            discovery_ttl: Duration::from_secs(config.discovery_ttl_secs),
            discovery_patterns: discovery_patterns.to_vec(),
        }
    }
}

/// Owns every cache and their shared statistics.
///
/// Create one per process (or per test) and share it with validators via
/// `Arc`.
pub struct CacheManager {
    frontmatter: FrontmatterCache,
    http: HttpCache,
    discovery: DiscoveryCache,
    stats: Arc<CacheStats>,
}

impl CacheManager {
    /// Production manager: wall clock and a reqwest fetcher
    pub fn new(settings: CacheSettings) -> Result<Self> {
        Self::with_parts(settings, Arc::new(ReqwestFetcher::new()?), Arc::new(SystemClock))
    }

    /// Manager with an injected fetcher and clock
    pub fn with_parts(
        settings: CacheSettings,
        fetcher: Arc<dyn HttpFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let stats = Arc::new(CacheStats::default());
        Ok(Self {
            frontmatter: FrontmatterCache::new(stats.clone()),
            http: HttpCache::new(
                fetcher,
                clock.clone(),
                settings.http_ttl,
                settings.http_timeout,
                stats.clone(),
            ),
            discovery: DiscoveryCache::new(
                &settings.discovery_patterns,
                clock,
                settings.discovery_ttl,
                stats.clone(),
            )?,
            stats,
        })
    }

    /// Parsed frontmatter and body of a file
    pub fn frontmatter(&self, path: &Path) -> Result<Arc<Document>> {
        self.frontmatter.get(path)
    }

    /// GET a URL, reusing a response fetched within the TTL
    pub fn http_get(&self, url: &str) -> Result<Arc<HttpResponse>> {
        self.http.get(url)
    }

    /// Sorted matching files below a directory
    pub fn discover(&self, dir: &Path) -> Result<Arc<Vec<PathBuf>>> {
        self.discovery.list(dir)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Empty every cache; counters are kept
    pub fn clear(&self) {
        self.frontmatter.clear();
        self.http.clear();
        self.discovery.clear();
    }
}
