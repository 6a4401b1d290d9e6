use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Which cache a lookup went through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Frontmatter,
    Http,
    Discovery,
}

#[derive(Debug, Default)]
struct Counter {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Counter {
    fn snapshot(&self) -> HitMiss {
        HitMiss {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// Shared hit/miss counters, one pair per cache kind
#[derive(Debug, Default)]
pub struct CacheStats {
    frontmatter: Counter,
    http: Counter,
    discovery: Counter,
}

impl CacheStats {
    fn counter(&self, kind: CacheKind) -> &Counter {
        match kind {
            CacheKind::Frontmatter => &self.frontmatter,
            CacheKind::Http => &self.http,
            CacheKind::Discovery => &self.discovery,
        }
    }

    pub fn record_hit(&self, kind: CacheKind) {
        self.counter(kind).hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self, kind: CacheKind) {
        self.counter(kind).misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frontmatter: self.frontmatter.snapshot(),
            http: self.http.snapshot(),
            discovery: self.discovery.snapshot(),
        }
    }

    pub fn reset(&self) {
        self.frontmatter.reset();
        self.http.reset();
        self.discovery.reset();
    }
}

/// Raw counts for one cache
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HitMiss {
    pub hits: u64,
    pub misses: u64,
}

impl HitMiss {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of lookups served from cache, 0.0 when nothing was looked up
    pub fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            total => self.hits as f64 / total as f64,
        }
    }
}

/// Point-in-time copy of every cache's counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub frontmatter: HitMiss,
    pub http: HitMiss,
    pub discovery: HitMiss,
}

impl StatsSnapshot {
    pub fn get(&self, kind: CacheKind) -> HitMiss {
        match kind {
            CacheKind::Frontmatter => self.frontmatter,
            CacheKind::Http => self.http,
            CacheKind::Discovery => self.discovery,
        }
    }

    pub fn total(&self) -> HitMiss {
        HitMiss {
            hits: self.frontmatter.hits + self.http.hits + self.discovery.hits,
            misses: self.frontmatter.misses + self.http.misses + self.discovery.misses,
        }
    }

    pub fn hit_rate(&self) -> f64 {
        self.total().hit_rate()
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("frontmatter", self.frontmatter),
            ("http", self.http),
            ("discovery", self.discovery),
            ("total", self.total()),
        ];
        for (label, counts) in rows {
            writeln!(
                f,
                "{:<12} {:>6} hits {:>6} misses {:>6.1}% hit rate",
                label,
                counts.hits,
                counts.misses,
                counts.hit_rate() * 100.0
            )?;
        }
        Ok(())
    }
}
